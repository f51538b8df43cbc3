use crate::{
    db::{Store, StoreError},
    error::{AppError, AppResult},
    models::{
        group::Membership,
        user::{LookupUserQuery, NewUser, UpdateUserRequest, User},
    },
};

pub struct UserService;

impl UserService {
    pub async fn list(store: &Store) -> AppResult<Vec<User>> {
        Ok(store.users.find_all().await?)
    }

    pub async fn get(store: &Store, id: i64) -> AppResult<User> {
        Ok(store.users.find_by_id(id).await?)
    }

    /// Username takes precedence when both keys are given.
    pub async fn lookup(store: &Store, query: &LookupUserQuery) -> AppResult<User> {
        let username = query.username.as_deref().map(str::trim).filter(|s| !s.is_empty());
        let email = query.email.as_deref().map(str::trim).filter(|s| !s.is_empty());
        let user = match (username, email) {
            (Some(username), _) => store.users.find_by_username(username).await?,
            (None, Some(email)) => store.users.find_by_email(email).await?,
            (None, None) => {
                return Err(AppError::validation(
                    "Either username or email must be provided",
                ))
            }
        };
        Ok(user)
    }

    pub async fn update(
        store: &Store,
        id: i64,
        req: &UpdateUserRequest,
        bcrypt_cost: u32,
    ) -> AppResult<User> {
        req.validate()?;
        let current = store.users.find_by_id(id).await?;

        let mut changes = NewUser::from(&current);
        if let Some(username) = &req.username {
            changes.username = username.trim().to_string();
        }
        if let Some(email) = &req.email {
            changes.email = email.trim().to_string();
        }
        if let Some(password) = &req.password {
            changes.password_hash = bcrypt::hash(password, bcrypt_cost)
                .map_err(|e| anyhow::anyhow!("password hashing failed: {e}"))?;
        }
        if req.name.is_some() {
            changes.name = req.name.clone();
        }
        if req.surname.is_some() {
            changes.surname = req.surname.clone();
        }
        if req.color_id.is_some() {
            changes.color_id = req.color_id;
        }

        Ok(store.users.update_by_id(id, &changes).await?)
    }

    /// Memberships of a live user, ordered by group.
    pub async fn groups(store: &Store, id: i64) -> AppResult<Vec<Membership>> {
        store.users.find_by_id(id).await?;
        Ok(store.memberships.find_by_user_id(id).await?)
    }

    pub async fn delete(store: &Store, id: i64) -> AppResult<()> {
        store.users.delete_by_id(id).await?;
        Ok(())
    }
}

/// Resolve a user id carried in a request body. A missing user is a
/// validation failure of that body, not a 404 of the route.
pub async fn require_user(store: &Store, field: &str, id: i64) -> AppResult<User> {
    match store.users.find_by_id(id).await {
        Ok(user) => Ok(user),
        Err(StoreError::NotFound { .. }) => Err(AppError::Validation(format!(
            "{field} {id} does not reference an existing user"
        ))),
        Err(e) => Err(e.into()),
    }
}
