//! Per-subject and per-day totals for dashboards.

use std::collections::BTreeMap;

use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::session::{StudySession, Subject};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayActivity {
    pub date: NaiveDate,
    pub total_secs: u64,
}

/// Sum of durations logged on `date`.
pub fn total_for(sessions: &[StudySession], date: NaiveDate) -> u64 {
    sessions
        .iter()
        .filter(|s| s.date == date)
        .fold(0u64, |total, s| total.saturating_add(s.duration_secs))
}

/// Seconds per subject, optionally restricted to one day.
pub fn by_subject(sessions: &[StudySession], date: Option<NaiveDate>) -> BTreeMap<Subject, u64> {
    let mut totals = BTreeMap::new();
    for session in sessions
        .iter()
        .filter(|s| date.map_or(true, |d| s.date == d))
    {
        let total = totals.entry(session.subject).or_insert(0u64);
        *total = total.saturating_add(session.duration_secs);
    }
    totals
}

/// The last `days` days ending at `today`, oldest first.
pub fn activity_grid(sessions: &[StudySession], today: NaiveDate, days: u32) -> Vec<DayActivity> {
    let mut grid: Vec<DayActivity> = (0..days)
        .filter_map(|offset| today.checked_sub_days(Days::new(u64::from(offset))))
        .map(|date| DayActivity {
            date,
            total_secs: total_for(sessions, date),
        })
        .collect();
    grid.reverse();
    grid
}
