use crate::{
    db::Store,
    error::AppResult,
    models::availability::{Availability, AvailabilityRequest, UpdateAvailabilityRequest},
    services::users::require_user,
};

pub struct AvailabilityService;

impl AvailabilityService {
    pub async fn list(store: &Store) -> AppResult<Vec<Availability>> {
        Ok(store.availabilities.find_all().await?)
    }

    pub async fn get(store: &Store, id: i64) -> AppResult<Availability> {
        Ok(store.availabilities.find_by_id(id).await?)
    }

    /// Legacy lookup: `user_id` is matched against the availability id.
    pub async fn get_by_user_id(store: &Store, user_id: i64) -> AppResult<Availability> {
        Ok(store.availabilities.find_by_user_id(user_id).await?)
    }

    pub async fn list_by_owner(store: &Store, user_id: i64) -> AppResult<Vec<Availability>> {
        Ok(store.availabilities.find_by_owner(user_id).await?)
    }

    pub async fn create(store: &Store, req: &AvailabilityRequest) -> AppResult<Availability> {
        let new = req.validate()?;
        require_user(store, "user_id", new.user_id).await?;
        Ok(store.availabilities.create(&new).await?)
    }

    pub async fn update(
        store: &Store,
        id: i64,
        req: &UpdateAvailabilityRequest,
    ) -> AppResult<Availability> {
        let current = store.availabilities.find_by_id(id).await?;
        let changes = req.apply(&current)?;
        if changes.user_id != current.user_id {
            require_user(store, "user_id", changes.user_id).await?;
        }
        Ok(store.availabilities.update_by_id(id, &changes).await?)
    }

    pub async fn delete(store: &Store, id: i64) -> AppResult<()> {
        store.availabilities.delete_by_id(id).await?;
        Ok(())
    }
}
