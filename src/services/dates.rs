use crate::{
    db::{Store, StoreError},
    error::{AppError, AppResult},
    interval::{RecurrenceLink, TimeWindow},
    models::date::{Date, DateRequest, RangeQuery, UpdateDateRequest},
    services::users::require_user,
};

pub struct DateService;

impl DateService {
    pub async fn list(store: &Store) -> AppResult<Vec<Date>> {
        Ok(store.dates.find_all().await?)
    }

    pub async fn get(store: &Store, id: i64) -> AppResult<Date> {
        Ok(store.dates.find_by_id(id).await?)
    }

    pub async fn list_by_owner(store: &Store, user_id: i64) -> AppResult<Vec<Date>> {
        Ok(store.dates.find_by_owner(user_id).await?)
    }

    pub async fn get_by_recurrence(store: &Store, recurrence_id: i64) -> AppResult<RecurrenceLink> {
        Ok(store.dates.find_by_recurrence_id(recurrence_id).await?)
    }

    pub async fn recurrence_children(store: &Store, parent_id: i64) -> AppResult<Vec<Date>> {
        store.dates.find_by_id(parent_id).await?;
        Ok(store.dates.find_recurrence_children(parent_id).await?)
    }

    /// Dates of `user_id` lying entirely inside `[begin, end]`.
    pub async fn in_range(store: &Store, query: &RangeQuery) -> AppResult<Vec<Date>> {
        if query.user_id < 1 {
            return Err(AppError::validation("user_id must be >= 1"));
        }
        let window = TimeWindow::new(query.begin, query.end)?;
        let dates = store.dates.find_by_day_range(&window, query.user_id).await?;
        tracing::debug!(
            user_id = query.user_id,
            begin = %window.begin(),
            end = %window.end(),
            hits = dates.len(),
            "range query"
        );
        Ok(dates)
    }

    pub async fn create(store: &Store, req: &DateRequest) -> AppResult<Date> {
        let new = req.validate()?;
        require_user(store, "user_id", new.user_id).await?;
        if let Some(parent) = new.recurrence_id {
            require_date(store, parent).await?;
        }
        let date = store.dates.create(&new).await?;
        tracing::info!(date_id = date.id, user_id = date.user_id, "date created");
        Ok(date)
    }

    pub async fn update(store: &Store, id: i64, req: &UpdateDateRequest) -> AppResult<Date> {
        let current = store.dates.find_by_id(id).await?;
        let changes = req.apply(&current)?;
        if changes.user_id != current.user_id {
            require_user(store, "user_id", changes.user_id).await?;
        }
        if changes.recurrence_id != current.recurrence_id {
            if let Some(parent) = changes.recurrence_id {
                require_date(store, parent).await?;
            }
        }
        // The store rejects a link that would close a recurrence loop.
        Ok(store.dates.update_by_id(id, &changes).await?)
    }

    pub async fn delete(store: &Store, id: i64) -> AppResult<()> {
        store.dates.delete_by_id(id).await?;
        Ok(())
    }
}

async fn require_date(store: &Store, id: i64) -> AppResult<Date> {
    match store.dates.find_by_id(id).await {
        Ok(date) => Ok(date),
        Err(StoreError::NotFound { .. }) => Err(AppError::Validation(format!(
            "recurrence_id {id} does not reference an existing date"
        ))),
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, Duration, TimeZone, Utc};

    use super::*;
    use crate::models::user::NewUser;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 9, 2, 9, 0, 0).unwrap()
    }

    async fn seed_user(store: &Store) -> i64 {
        store
            .users
            .create(&NewUser {
                username: "alice".into(),
                email: "a@x.com".into(),
                password_hash: "hash".into(),
                name: None,
                surname: None,
                color_id: None,
            })
            .await
            .unwrap()
            .id
    }

    fn request(user_id: i64, recurrence_id: Option<i64>) -> DateRequest {
        DateRequest {
            title: "standup".into(),
            body: String::new(),
            begin_time: Some(t0()),
            end_time: Some(t0() + Duration::minutes(30)),
            user_id,
            private: false,
            recurrence_id,
            color_id: None,
        }
    }

    fn relink(recurrence_id: i64) -> UpdateDateRequest {
        UpdateDateRequest {
            title: None,
            body: None,
            begin_time: None,
            end_time: None,
            user_id: None,
            private: None,
            recurrence_id: Some(recurrence_id),
            color_id: None,
        }
    }

    #[tokio::test]
    async fn range_query_uses_containment() {
        let store = Store::in_memory();
        let user_id = seed_user(&store).await;
        let date = DateService::create(&store, &request(user_id, None)).await.unwrap();

        let exact = RangeQuery { begin: t0(), end: t0() + Duration::minutes(30), user_id };
        let hits = DateService::in_range(&store, &exact).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, date.id);

        let short = RangeQuery {
            begin: t0(),
            end: t0() + Duration::minutes(30) - Duration::milliseconds(1),
            user_id,
        };
        assert!(DateService::in_range(&store, &short).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn missing_owner_or_parent_is_a_validation_error() {
        let store = Store::in_memory();
        assert!(matches!(
            DateService::create(&store, &request(5, None)).await,
            Err(AppError::Validation(_))
        ));

        let user_id = seed_user(&store).await;
        assert!(matches!(
            DateService::create(&store, &request(user_id, Some(77))).await,
            Err(AppError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn recurrence_cycles_are_rejected_on_update() {
        let store = Store::in_memory();
        let user_id = seed_user(&store).await;
        let a = DateService::create(&store, &request(user_id, None)).await.unwrap();
        let b = DateService::create(&store, &request(user_id, Some(a.id))).await.unwrap();
        let c = DateService::create(&store, &request(user_id, Some(b.id))).await.unwrap();

        // a -> c would close a -> c -> b -> a.
        let err = DateService::update(&store, a.id, &relink(c.id)).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        let err = DateService::update(&store, a.id, &relink(a.id)).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        // Re-parenting c directly under a is fine.
        let c = DateService::update(&store, c.id, &relink(a.id)).await.unwrap();
        assert_eq!(c.recurrence_id, Some(a.id));
    }

    #[tokio::test]
    async fn recurrence_lookup_loads_the_parent() {
        let store = Store::in_memory();
        let user_id = seed_user(&store).await;
        let a = DateService::create(&store, &request(user_id, None)).await.unwrap();
        let b = DateService::create(&store, &request(user_id, Some(a.id))).await.unwrap();

        let link = DateService::get_by_recurrence(&store, b.id).await.unwrap();
        assert_eq!(link.date.id, b.id);
        assert_eq!(link.recurrence.unwrap().id, a.id);

        let children = DateService::recurrence_children(&store, a.id).await.unwrap();
        assert_eq!(children.iter().map(|d| d.id).collect::<Vec<_>>(), vec![b.id]);
    }

    #[tokio::test]
    async fn concurrent_relinks_cannot_close_a_loop() {
        let store = Store::in_memory();
        let user_id = seed_user(&store).await;
        let a = DateService::create(&store, &request(user_id, None)).await.unwrap();
        let b = DateService::create(&store, &request(user_id, None)).await.unwrap();

        let relink_ab = relink(b.id);
        let relink_ba = relink(a.id);
        let (ab, ba) = tokio::join!(
            DateService::update(&store, a.id, &relink_ab),
            DateService::update(&store, b.id, &relink_ba),
        );
        assert_eq!(ab.is_ok() as u8 + ba.is_ok() as u8, 1);
        let loser = if ab.is_ok() { ba } else { ab };
        assert!(matches!(loser, Err(AppError::Validation(_))));
    }
}
