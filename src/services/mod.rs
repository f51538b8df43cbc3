pub mod auth;
pub mod availability;
pub mod colors;
pub mod dates;
pub mod groups;
pub mod users;
