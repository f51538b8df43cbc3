use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::{
    error::{AppError, AppResult},
    interval::TimeWindow,
};

/// A calendar event. `recurrence_id` points at the recurrence parent.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Date {
    pub id: i64,
    pub title: String,
    pub body: String,
    pub user_id: i64,
    pub begin_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub private: bool,
    pub recurrence_id: Option<i64>,
    pub color_id: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewDate {
    pub title: String,
    pub body: String,
    pub user_id: i64,
    pub window: TimeWindow,
    pub private: bool,
    pub recurrence_id: Option<i64>,
    pub color_id: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DateRequest {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub body: String,
    #[serde(alias = "date_begin")]
    pub begin_time: Option<DateTime<Utc>>,
    #[serde(alias = "date_end")]
    pub end_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub user_id: i64,
    #[serde(default)]
    pub private: bool,
    pub recurrence_id: Option<i64>,
    pub color_id: Option<i64>,
}

impl DateRequest {
    pub fn validate(&self) -> AppResult<NewDate> {
        if self.title.trim().is_empty() {
            return Err(AppError::validation("title must not be null"));
        }
        let begin = self
            .begin_time
            .ok_or_else(|| AppError::validation("begin_time must not be null"))?;
        let end = self
            .end_time
            .ok_or_else(|| AppError::validation("end_time must not be null"))?;
        if self.user_id < 1 {
            return Err(AppError::validation("user_id must be >= 1"));
        }
        if self.recurrence_id.is_some_and(|id| id < 1) {
            return Err(AppError::validation("recurrence_id must be >= 1"));
        }
        if self.color_id.is_some_and(|id| id < 1) {
            return Err(AppError::validation("color_id must be >= 1"));
        }
        Ok(NewDate {
            title: self.title.clone(),
            body: self.body.clone(),
            user_id: self.user_id,
            window: TimeWindow::new(begin, end)?,
            private: self.private,
            recurrence_id: self.recurrence_id,
            color_id: self.color_id,
        })
    }
}

/// Partial update; absent fields keep their stored value.
#[derive(Debug, Deserialize)]
pub struct UpdateDateRequest {
    pub title: Option<String>,
    pub body: Option<String>,
    #[serde(alias = "date_begin")]
    pub begin_time: Option<DateTime<Utc>>,
    #[serde(alias = "date_end")]
    pub end_time: Option<DateTime<Utc>>,
    pub user_id: Option<i64>,
    pub private: Option<bool>,
    pub recurrence_id: Option<i64>,
    pub color_id: Option<i64>,
}

impl UpdateDateRequest {
    pub fn apply(&self, current: &Date) -> AppResult<NewDate> {
        DateRequest {
            title: self.title.clone().unwrap_or_else(|| current.title.clone()),
            body: self.body.clone().unwrap_or_else(|| current.body.clone()),
            begin_time: Some(self.begin_time.unwrap_or(current.begin_time)),
            end_time: Some(self.end_time.unwrap_or(current.end_time)),
            user_id: self.user_id.unwrap_or(current.user_id),
            private: self.private.unwrap_or(current.private),
            recurrence_id: self.recurrence_id.or(current.recurrence_id),
            color_id: self.color_id.or(current.color_id),
        }
        .validate()
    }
}

/// Query string of `GET /api/date/range`.
#[derive(Debug, Deserialize)]
pub struct RangeQuery {
    #[serde(alias = "date_begin")]
    pub begin: DateTime<Utc>,
    #[serde(alias = "date_end")]
    pub end: DateTime<Utc>,
    pub user_id: i64,
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone};

    use super::*;

    fn request() -> DateRequest {
        let t = Utc.with_ymd_and_hms(2024, 6, 3, 9, 0, 0).unwrap();
        DateRequest {
            title: "standup".into(),
            body: String::new(),
            begin_time: Some(t),
            end_time: Some(t + Duration::minutes(30)),
            user_id: 1,
            private: false,
            recurrence_id: None,
            color_id: None,
        }
    }

    #[test]
    fn valid_request_builds_a_new_date() {
        let new = request().validate().unwrap();
        assert_eq!(new.title, "standup");
        assert_eq!(new.window.end() - new.window.begin(), Duration::minutes(30));
    }

    #[test]
    fn empty_title_is_rejected() {
        let req = DateRequest { title: "  ".into(), ..request() };
        assert!(matches!(req.validate(), Err(AppError::Validation(_))));
    }

    #[test]
    fn zero_length_window_is_rejected() {
        let mut req = request();
        req.end_time = req.begin_time;
        assert!(req.validate().is_err());
    }

    #[test]
    fn non_positive_references_are_rejected() {
        let req = DateRequest { recurrence_id: Some(0), ..request() };
        assert!(req.validate().is_err());
        let req = DateRequest { user_id: 0, ..request() };
        assert!(req.validate().is_err());
    }

    #[test]
    fn update_merges_onto_the_stored_date() {
        let new = request().validate().unwrap();
        let now = Utc::now();
        let stored = Date {
            id: 9,
            title: new.title,
            body: "notes".into(),
            user_id: 1,
            begin_time: new.window.begin(),
            end_time: new.window.end(),
            private: true,
            recurrence_id: Some(4),
            color_id: None,
            created_at: now,
            updated_at: now,
        };
        let patch = UpdateDateRequest {
            title: Some("retro".into()),
            body: None,
            begin_time: None,
            end_time: Some(stored.begin_time + Duration::hours(1)),
            user_id: None,
            private: None,
            recurrence_id: None,
            color_id: Some(2),
        };
        let merged = patch.apply(&stored).unwrap();
        assert_eq!(merged.title, "retro");
        assert_eq!(merged.body, "notes");
        assert!(merged.private);
        assert_eq!(merged.recurrence_id, Some(4));
        assert_eq!(merged.color_id, Some(2));
        assert_eq!(merged.window.end(), stored.begin_time + Duration::hours(1));
    }
}
