use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::{
    error::{AppError, AppResult},
    interval::TimeWindow,
};

/// A `[begin_time, end_time)` window in which a user is free.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Availability {
    pub id: i64,
    pub user_id: i64,
    pub begin_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewAvailability {
    pub user_id: i64,
    pub window: TimeWindow,
}

#[derive(Debug, Deserialize)]
pub struct AvailabilityRequest {
    #[serde(alias = "date_begin")]
    pub begin_time: Option<DateTime<Utc>>,
    #[serde(alias = "date_end")]
    pub end_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub user_id: i64,
}

impl AvailabilityRequest {
    pub fn validate(&self) -> AppResult<NewAvailability> {
        let begin = self
            .begin_time
            .ok_or_else(|| AppError::validation("begin_time must not be null"))?;
        let end = self
            .end_time
            .ok_or_else(|| AppError::validation("end_time must not be null"))?;
        if self.user_id < 1 {
            return Err(AppError::validation("user_id must be >= 1"));
        }
        Ok(NewAvailability {
            user_id: self.user_id,
            window: TimeWindow::new(begin, end)?,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct UpdateAvailabilityRequest {
    #[serde(alias = "date_begin")]
    pub begin_time: Option<DateTime<Utc>>,
    #[serde(alias = "date_end")]
    pub end_time: Option<DateTime<Utc>>,
    pub user_id: Option<i64>,
}

impl UpdateAvailabilityRequest {
    pub fn apply(&self, current: &Availability) -> AppResult<NewAvailability> {
        AvailabilityRequest {
            begin_time: Some(self.begin_time.unwrap_or(current.begin_time)),
            end_time: Some(self.end_time.unwrap_or(current.end_time)),
            user_id: self.user_id.unwrap_or(current.user_id),
        }
        .validate()
    }
}
