use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::breakdown::total_for;
use crate::error::ConfigError;
use crate::session::StudySession;

/// Six hours, the default daily target.
pub const DEFAULT_DAILY_GOAL_SECS: u64 = 6 * 3600;

/// User-configured target of focused seconds per day. Always positive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyGoal {
    target_secs: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GoalProgress {
    pub date: NaiveDate,
    pub logged_secs: u64,
    pub target_secs: u64,
    /// 0..=100
    pub percent: u8,
    pub achieved: bool,
}

impl Default for DailyGoal {
    fn default() -> Self {
        Self {
            target_secs: DEFAULT_DAILY_GOAL_SECS,
        }
    }
}

impl DailyGoal {
    pub fn new(target_secs: u64) -> Result<Self, ConfigError> {
        if target_secs == 0 {
            return Err(ConfigError::invalid(
                "goal.daily_goal_secs",
                "daily goal must be positive",
            ));
        }
        Ok(Self { target_secs })
    }

    pub fn target_secs(&self) -> u64 {
        self.target_secs
    }

    pub fn progress(&self, sessions: &[StudySession], date: NaiveDate) -> GoalProgress {
        let logged_secs = total_for(sessions, date);
        GoalProgress {
            date,
            logged_secs,
            target_secs: self.target_secs,
            percent: progress_percent(logged_secs, self.target_secs),
            achieved: self.target_secs > 0 && logged_secs >= self.target_secs,
        }
    }
}

/// `min(100, round(logged / target * 100))`, 0 when the target is 0.
pub fn progress_percent(logged_secs: u64, target_secs: u64) -> u8 {
    if target_secs == 0 {
        return 0;
    }
    let logged = u128::from(logged_secs);
    let target = u128::from(target_secs);
    let rounded = (logged * 200 + target) / (target * 2);
    rounded.min(100) as u8
}
