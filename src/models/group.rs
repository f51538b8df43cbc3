use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::error::{AppError, AppResult};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Group {
    pub id: i64,
    pub name: String,
    pub creator_id: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewGroup {
    pub name: String,
    pub creator_id: i64,
}

/// Row of the `user_groups` join table: a member and the color they use in
/// this group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Membership {
    pub user_id: i64,
    pub group_id: i64,
    pub color_id: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct CreateGroupRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub creator_id: i64,
}

impl CreateGroupRequest {
    pub fn validate(&self) -> AppResult<NewGroup> {
        if self.name.trim().is_empty() {
            return Err(AppError::validation("name must not be null"));
        }
        if self.creator_id < 1 {
            return Err(AppError::validation("invalid creator ID"));
        }
        Ok(NewGroup {
            name: self.name.trim().to_string(),
            creator_id: self.creator_id,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct UpdateGroupRequest {
    pub name: Option<String>,
    pub creator_id: Option<i64>,
}

impl UpdateGroupRequest {
    pub fn apply(&self, current: &Group) -> AppResult<NewGroup> {
        let req = CreateGroupRequest {
            name: self.name.clone().unwrap_or_else(|| current.name.clone()),
            creator_id: self.creator_id.unwrap_or(current.creator_id),
        };
        req.validate()
    }
}

#[derive(Debug, Deserialize)]
pub struct AddMemberRequest {
    #[serde(default)]
    pub user_id: i64,
    pub color_id: Option<i64>,
}

impl AddMemberRequest {
    pub fn validate(&self) -> AppResult<()> {
        if self.user_id < 1 {
            return Err(AppError::validation("user_id must be >= 1"));
        }
        if self.color_id.is_some_and(|id| id < 1) {
            return Err(AppError::validation("color_id must be >= 1"));
        }
        Ok(())
    }
}

/// `color_id: null` clears the member's color.
#[derive(Debug, Deserialize)]
pub struct UpdateMemberRequest {
    pub color_id: Option<i64>,
}
