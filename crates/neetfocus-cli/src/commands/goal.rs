use clap::Subcommand;
use neetfocus_core::Config;

use crate::common::{format_duration, loaded_tracker, progress_bar, runtime, CliResult};

#[derive(Subcommand)]
pub enum GoalAction {
    /// Show the daily goal and today's progress
    Show,
    /// Set the daily goal in hours (e.g. 6 or 4.5)
    Set { hours: f64 },
}

pub fn run(action: GoalAction) -> CliResult {
    let mut config = Config::load()?;
    let rt = runtime()?;
    let mut tracker = loaded_tracker(&rt, &config)?;

    match action {
        GoalAction::Show => {
            rt.block_on(tracker.load_remote_settings())?;
            let p = tracker.goal_progress();
            println!("Daily goal: {}", format_duration(p.target_secs));
            println!(
                "Today: {} {} {}%",
                format_duration(p.logged_secs),
                progress_bar(p.percent),
                p.percent
            );
        }
        GoalAction::Set { hours } => {
            let secs = if hours.is_finite() && hours > 0.0 {
                (hours * 3600.0).round() as u64
            } else {
                0
            };
            rt.block_on(tracker.set_daily_goal(secs))?;
            // Local copy is the fallback when the server is unreachable.
            config.set("goal.daily_goal_secs", &secs.to_string())?;
            println!("Daily goal set to {}", format_duration(secs));
        }
    }
    Ok(())
}
