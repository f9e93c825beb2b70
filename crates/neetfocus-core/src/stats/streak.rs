//! Consecutive-day streak derived from the session log.
//!
//! The streak is a pure function of the log and "today". It is always
//! recomputed from scratch; nothing is patched incrementally.

use std::collections::HashMap;

use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::session::StudySession;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreakState {
    pub count: u32,
    pub last_qualifying_date: Option<NaiveDate>,
}

/// Streak rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreakTracker {
    /// Upper bound on how far back a single run is walked.
    pub window_days: u32,
    /// A day qualifies when its total exceeds this many seconds.
    pub min_qualifying_secs: u64,
}

impl Default for StreakTracker {
    fn default() -> Self {
        Self {
            window_days: 365,
            min_qualifying_secs: 0,
        }
    }
}

impl StreakTracker {
    pub fn new(window_days: u32, min_qualifying_secs: u64) -> Self {
        Self {
            window_days,
            min_qualifying_secs,
        }
    }

    fn daily_totals(sessions: &[StudySession]) -> HashMap<NaiveDate, u64> {
        let mut totals = HashMap::new();
        for session in sessions {
            let total = totals.entry(session.date).or_insert(0u64);
            *total = total.saturating_add(session.duration_secs);
        }
        totals
    }

    fn qualifies(&self, totals: &HashMap<NaiveDate, u64>, day: NaiveDate) -> bool {
        totals
            .get(&day)
            .is_some_and(|secs| *secs > self.min_qualifying_secs)
    }

    /// Current streak ending today or yesterday.
    pub fn compute(&self, sessions: &[StudySession], today: NaiveDate) -> StreakState {
        let totals = Self::daily_totals(sessions);

        let start = if self.qualifies(&totals, today) {
            today
        } else {
            match today.checked_sub_days(Days::new(1)) {
                Some(yesterday) if self.qualifies(&totals, yesterday) => yesterday,
                _ => return StreakState::default(),
            }
        };

        let count = self.run_length(&totals, start);
        StreakState {
            count,
            last_qualifying_date: Some(start),
        }
    }

    /// Longest run of consecutive qualifying days anywhere in the log.
    pub fn longest(&self, sessions: &[StudySession]) -> u32 {
        let totals = Self::daily_totals(sessions);
        totals
            .keys()
            .filter(|day| self.qualifies(&totals, **day))
            // only walk from the last day of each run
            .filter(|day| {
                day.checked_add_days(Days::new(1))
                    .map_or(true, |next| !self.qualifies(&totals, next))
            })
            .map(|day| self.run_length(&totals, *day))
            .max()
            .unwrap_or(0)
    }

    fn run_length(&self, totals: &HashMap<NaiveDate, u64>, start: NaiveDate) -> u32 {
        let mut count = 0;
        let mut day = start;
        while count < self.window_days && self.qualifies(totals, day) {
            count += 1;
            match day.checked_sub_days(Days::new(1)) {
                Some(prev) => day = prev,
                None => break,
            }
        }
        count
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::{Difficulty, Subject};

    fn day(offset: i64) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 5, 20).unwrap() + chrono::Duration::days(offset)
    }

    fn session(id: i64, date: NaiveDate, secs: u64) -> StudySession {
        StudySession {
            id,
            subject: Subject::Physics,
            topic: "Optics".into(),
            duration_secs: secs,
            difficulty: Difficulty::Medium,
            date,
            created_at: None,
        }
    }

    #[test]
    fn empty_log_has_no_streak() {
        let state = StreakTracker::default().compute(&[], day(0));
        assert_eq!(state, StreakState::default());
    }

    #[test]
    fn counts_back_from_today() {
        let log: Vec<_> = (0..4).map(|i| session(i, day(-i), 600)).collect();
        let state = StreakTracker::default().compute(&log, day(0));
        assert_eq!(state.count, 4);
        assert_eq!(state.last_qualifying_date, Some(day(0)));
    }

    #[test]
    fn yesterday_keeps_streak_alive() {
        let log = vec![session(1, day(-1), 600), session(2, day(-2), 600)];
        let state = StreakTracker::default().compute(&log, day(0));
        assert_eq!(state.count, 2);
        assert_eq!(state.last_qualifying_date, Some(day(-1)));
    }

    #[test]
    fn one_day_gap_resets_to_zero() {
        let log = vec![session(1, day(-2), 600), session(2, day(-3), 600)];
        assert_eq!(StreakTracker::default().compute(&log, day(0)).count, 0);
    }

    #[test]
    fn gap_stops_the_walk() {
        let log = vec![
            session(1, day(0), 600),
            session(2, day(-1), 600),
            session(3, day(-3), 600),
        ];
        assert_eq!(StreakTracker::default().compute(&log, day(0)).count, 2);
    }

    #[test]
    fn zero_duration_sessions_do_not_qualify() {
        let log = vec![session(1, day(0), 0), session(2, day(-1), 300)];
        let state = StreakTracker::default().compute(&log, day(0));
        assert_eq!(state.count, 1);
        assert_eq!(state.last_qualifying_date, Some(day(-1)));
    }

    #[test]
    fn threshold_applies_to_daily_total() {
        let tracker = StreakTracker::new(365, 1200);
        let log = vec![
            session(1, day(0), 700),
            session(2, day(0), 700),
            session(3, day(-1), 900),
        ];
        assert_eq!(tracker.compute(&log, day(0)).count, 1);
    }

    #[test]
    fn window_bounds_the_walk() {
        let tracker = StreakTracker::new(3, 0);
        let log: Vec<_> = (0..10).map(|i| session(i, day(-i), 60)).collect();
        assert_eq!(tracker.compute(&log, day(0)).count, 3);
    }

    #[test]
    fn compute_is_deterministic() {
        let log = vec![session(1, day(0), 60), session(2, day(-1), 60)];
        let tracker = StreakTracker::default();
        assert_eq!(tracker.compute(&log, day(0)), tracker.compute(&log, day(0)));
    }

    #[test]
    fn longest_finds_older_runs() {
        let log = vec![
            session(1, day(-10), 60),
            session(2, day(-11), 60),
            session(3, day(-12), 60),
            session(4, day(0), 60),
        ];
        assert_eq!(StreakTracker::default().longest(&log), 3);
        assert_eq!(StreakTracker::default().longest(&[]), 0);
    }

    #[test]
    fn huge_durations_on_one_day_do_not_overflow() {
        let log = vec![session(1, day(0), u64::MAX), session(2, day(0), u64::MAX)];
        assert_eq!(StreakTracker::default().compute(&log, day(0)).count, 1);
    }
}
