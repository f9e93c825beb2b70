//! Aggregates over the session log.

pub mod breakdown;
pub mod goal;
pub mod streak;

pub use breakdown::{activity_grid, by_subject, total_for, DayActivity};
pub use goal::{progress_percent, DailyGoal, GoalProgress, DEFAULT_DAILY_GOAL_SECS};
pub use streak::{StreakState, StreakTracker};
