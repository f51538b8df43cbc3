//! Time-window arithmetic shared by the date and availability queries.
//!
//! Range queries use *containment*: an entry matches a window only when its
//! whole interval lies inside it. Entries straddling either boundary are
//! excluded. The Postgres store mirrors [`TimeWindow::contains`] in SQL.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::{
    error::{AppError, AppResult},
    models::date::Date,
};

/// A validated `[begin, end)` window with `begin < end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    begin: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl TimeWindow {
    pub fn new(begin: DateTime<Utc>, end: DateTime<Utc>) -> AppResult<Self> {
        if begin >= end {
            return Err(AppError::validation(format!(
                "begin_time ({begin}) must be before end_time ({end})"
            )));
        }
        Ok(Self { begin, end })
    }

    pub fn begin(&self) -> DateTime<Utc> {
        self.begin
    }

    pub fn end(&self) -> DateTime<Utc> {
        self.end
    }

    /// True when `[begin, end)` lies entirely inside this window.
    pub fn contains(&self, begin: DateTime<Utc>, end: DateTime<Utc>) -> bool {
        begin >= self.begin && end <= self.end
    }
}

/// Dates owned by `user_id` and contained in `window`, ordered by start.
pub fn dates_in_window<'a, I>(window: &TimeWindow, user_id: i64, dates: I) -> Vec<Date>
where
    I: IntoIterator<Item = &'a Date>,
{
    let mut hits: Vec<Date> = dates
        .into_iter()
        .filter(|d| d.user_id == user_id && window.contains(d.begin_time, d.end_time))
        .cloned()
        .collect();
    hits.sort_by_key(|d| (d.begin_time, d.id));
    hits
}

/// A date looked up by recurrence id, with its own recurrence parent loaded.
#[derive(Debug, Clone, Serialize)]
pub struct RecurrenceLink {
    #[serde(flatten)]
    pub date: Date,
    pub recurrence: Option<Date>,
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone};

    use super::*;

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 4, h, m, 0).unwrap()
    }

    fn date(id: i64, user_id: i64, begin: DateTime<Utc>, end: DateTime<Utc>) -> Date {
        Date {
            id,
            title: format!("date {id}"),
            body: String::new(),
            user_id,
            begin_time: begin,
            end_time: end,
            private: false,
            recurrence_id: None,
            color_id: None,
            created_at: begin,
            updated_at: begin,
        }
    }

    #[test]
    fn window_rejects_empty_and_inverted_ranges() {
        assert!(TimeWindow::new(at(9, 0), at(9, 0)).is_err());
        assert!(TimeWindow::new(at(10, 0), at(9, 0)).is_err());
        assert!(TimeWindow::new(at(9, 0), at(9, 1)).is_ok());
    }

    #[test]
    fn exact_window_contains_the_entry() {
        let w = TimeWindow::new(at(9, 0), at(9, 30)).unwrap();
        assert!(w.contains(at(9, 0), at(9, 30)));
    }

    #[test]
    fn shrinking_the_window_by_one_millisecond_excludes_the_entry() {
        let w = TimeWindow::new(at(9, 0), at(9, 30) - Duration::milliseconds(1)).unwrap();
        assert!(!w.contains(at(9, 0), at(9, 30)));
    }

    #[test]
    fn straddling_entries_do_not_match() {
        let w = TimeWindow::new(at(9, 0), at(10, 0)).unwrap();
        assert!(!w.contains(at(8, 30), at(9, 30)));
        assert!(!w.contains(at(9, 30), at(10, 30)));
        assert!(!w.contains(at(8, 0), at(11, 0)));
        assert!(w.contains(at(9, 15), at(9, 45)));
    }

    #[test]
    fn dates_in_window_filters_by_owner_and_sorts_by_start() {
        let w = TimeWindow::new(at(8, 0), at(12, 0)).unwrap();
        let dates = vec![
            date(1, 1, at(11, 0), at(11, 30)),
            date(2, 2, at(9, 0), at(9, 30)),
            date(3, 1, at(9, 0), at(9, 30)),
            date(4, 1, at(11, 30), at(12, 30)),
        ];
        let hits = dates_in_window(&w, 1, &dates);
        let ids: Vec<i64> = hits.iter().map(|d| d.id).collect();
        assert_eq!(ids, vec![3, 1]);
    }
}
