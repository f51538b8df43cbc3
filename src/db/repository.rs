//! Storage ports, one per entity kind. `PgStore` and `MemoryStore` both
//! implement every trait here.

use async_trait::async_trait;

use super::StoreResult;
use crate::{
    interval::{RecurrenceLink, TimeWindow},
    models::{
        availability::{Availability, NewAvailability},
        color::{Color, NewColor},
        date::{Date, NewDate},
        group::{Group, Membership, NewGroup},
        user::{NewUser, User},
    },
};

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn create(&self, user: &NewUser) -> StoreResult<User>;
    async fn find_all(&self) -> StoreResult<Vec<User>>;
    async fn find_by_id(&self, id: i64) -> StoreResult<User>;
    async fn find_by_email(&self, email: &str) -> StoreResult<User>;
    async fn find_by_username(&self, username: &str) -> StoreResult<User>;
    async fn update_by_id(&self, id: i64, user: &NewUser) -> StoreResult<User>;
    /// Soft delete. The user's dates, availabilities, created groups and
    /// memberships are removed with it.
    async fn delete_by_id(&self, id: i64) -> StoreResult<()>;
}

#[async_trait]
pub trait GroupRepository: Send + Sync {
    async fn create(&self, group: &NewGroup) -> StoreResult<Group>;
    async fn find_all(&self) -> StoreResult<Vec<Group>>;
    async fn find_by_id(&self, id: i64) -> StoreResult<Group>;
    async fn find_by_creator_id(&self, creator_id: i64) -> StoreResult<Vec<Group>>;
    async fn update_by_id(&self, id: i64, group: &NewGroup) -> StoreResult<Group>;
    async fn delete_by_id(&self, id: i64) -> StoreResult<()>;
}

#[async_trait]
pub trait ColorRepository: Send + Sync {
    async fn create(&self, color: &NewColor) -> StoreResult<Color>;
    async fn find_all(&self) -> StoreResult<Vec<Color>>;
    async fn find_by_id(&self, id: i64) -> StoreResult<Color>;
    async fn find_by_hex_code(&self, hex_code: &str) -> StoreResult<Color>;
    async fn update_by_id(&self, id: i64, color: &NewColor) -> StoreResult<Color>;
    /// References from users, dates and memberships are set to null.
    async fn delete_by_id(&self, id: i64) -> StoreResult<()>;
}

#[async_trait]
pub trait AvailabilityRepository: Send + Sync {
    async fn create(&self, availability: &NewAvailability) -> StoreResult<Availability>;
    async fn find_all(&self) -> StoreResult<Vec<Availability>>;
    async fn find_by_id(&self, id: i64) -> StoreResult<Availability>;
    /// Looks `user_id` up as the availability's *primary key*. Kept as the
    /// legacy behaviour of `GET /availability/user/{id}`; see `find_by_owner`.
    async fn find_by_user_id(&self, user_id: i64) -> StoreResult<Availability>;
    async fn find_by_owner(&self, user_id: i64) -> StoreResult<Vec<Availability>>;
    async fn update_by_id(&self, id: i64, availability: &NewAvailability)
        -> StoreResult<Availability>;
    async fn delete_by_id(&self, id: i64) -> StoreResult<()>;
}

#[async_trait]
pub trait DateRepository: Send + Sync {
    async fn create(&self, date: &NewDate) -> StoreResult<Date>;
    async fn find_all(&self) -> StoreResult<Vec<Date>>;
    async fn find_by_id(&self, id: i64) -> StoreResult<Date>;
    async fn find_by_owner(&self, user_id: i64) -> StoreResult<Vec<Date>>;
    /// The date whose primary key is `recurrence_id`, with its own
    /// recurrence parent loaded.
    async fn find_by_recurrence_id(&self, recurrence_id: i64) -> StoreResult<RecurrenceLink>;
    /// Dates whose `recurrence_id` points at `parent_id`.
    async fn find_recurrence_children(&self, parent_id: i64) -> StoreResult<Vec<Date>>;
    /// Dates of `user_id` fully contained in `window`.
    async fn find_by_day_range(&self, window: &TimeWindow, user_id: i64)
        -> StoreResult<Vec<Date>>;
    /// Fails with `InvalidReference` when the new `recurrence_id` would make
    /// the date its own ancestor. The check and the write are atomic.
    async fn update_by_id(&self, id: i64, date: &NewDate) -> StoreResult<Date>;
    /// Children of the deleted date lose their `recurrence_id`.
    async fn delete_by_id(&self, id: i64) -> StoreResult<()>;
}

#[async_trait]
pub trait MembershipRepository: Send + Sync {
    async fn create(&self, membership: &Membership) -> StoreResult<Membership>;
    /// Groups `user_id` belongs to, one row per membership.
    async fn find_by_user_id(&self, user_id: i64) -> StoreResult<Vec<Membership>>;
    async fn find_by_group_id(&self, group_id: i64) -> StoreResult<Vec<Membership>>;
    async fn update_color(
        &self,
        user_id: i64,
        group_id: i64,
        color_id: Option<i64>,
    ) -> StoreResult<Membership>;
    async fn delete_by_user_and_group(&self, user_id: i64, group_id: i64) -> StoreResult<()>;
    async fn delete_by_group_id(&self, group_id: i64) -> StoreResult<u64>;
}
