use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::error::{AppError, AppResult};

/// DB row struct. Soft-deleted rows keep `deleted_at` and are never returned
/// by the stores.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub name: Option<String>,
    pub surname: Option<String>,
    /// Favourite color.
    pub color_id: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing)]
    pub deleted_at: Option<DateTime<Utc>>,
}

/// Column values written on insert and on update.
#[derive(Debug, Clone, PartialEq)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub name: Option<String>,
    pub surname: Option<String>,
    pub color_id: Option<i64>,
}

impl From<&User> for NewUser {
    fn from(u: &User) -> Self {
        Self {
            username: u.username.clone(),
            email: u.email.clone(),
            password_hash: u.password_hash.clone(),
            name: u.name.clone(),
            surname: u.surname.clone(),
            color_id: u.color_id,
        }
    }
}

// Request/Response DTOs
#[derive(Debug, Clone, Deserialize)]
pub struct RegisterRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

impl RegisterRequest {
    pub fn validate(&self) -> AppResult<()> {
        if self.email.trim().is_empty() {
            return Err(AppError::validation("email must not be null"));
        }
        if !self.email.contains('@') {
            return Err(AppError::validation("email is malformed"));
        }
        if self.username.trim().is_empty() {
            return Err(AppError::validation("username must not be null"));
        }
        if self.password.is_empty() {
            return Err(AppError::validation("password must not be null"));
        }
        Ok(())
    }
}

/// Either `email` or `username` identifies the account; email wins when both
/// are present.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub username: Option<String>,
    #[serde(default)]
    pub password: String,
}

impl LoginRequest {
    pub fn validate(&self) -> AppResult<()> {
        let has = |v: &Option<String>| v.as_deref().is_some_and(|s| !s.trim().is_empty());
        if !has(&self.email) && !has(&self.username) {
            return Err(AppError::validation("email or username must be provided"));
        }
        if self.password.is_empty() {
            return Err(AppError::validation("password must not be null"));
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
pub struct UpdateUserRequest {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub name: Option<String>,
    pub surname: Option<String>,
    pub color_id: Option<i64>,
}

impl UpdateUserRequest {
    pub fn validate(&self) -> AppResult<()> {
        if self.username.as_deref().is_some_and(|s| s.trim().is_empty()) {
            return Err(AppError::validation("username must not be empty"));
        }
        if let Some(email) = self.email.as_deref() {
            if email.trim().is_empty() || !email.contains('@') {
                return Err(AppError::validation("email is malformed"));
            }
        }
        if self.password.as_deref().is_some_and(str::is_empty) {
            return Err(AppError::validation("password must not be empty"));
        }
        if self.color_id.is_some_and(|id| id < 1) {
            return Err(AppError::validation("color_id must be >= 1"));
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
pub struct LookupUserQuery {
    pub email: Option<String>,
    pub username: Option<String>,
}
