pub mod auth;
pub mod availability;
pub mod color;
pub mod date;
pub mod group;
pub mod user;
