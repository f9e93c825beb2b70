use std::collections::BTreeMap;

use chrono::NaiveDate;
use clap::Subcommand;
use neetfocus_core::stats::by_subject;
use neetfocus_core::{Config, GoalProgress, Subject};
use serde::Serialize;

use crate::common::{format_duration, loaded_tracker, progress_bar, runtime, CliResult};

#[derive(Subcommand)]
pub enum StatsAction {
    /// Current and longest streak
    Streak,
    /// Today's goal progress and subject split
    Today {
        #[arg(long)]
        json: bool,
    },
    /// Time per subject
    Subjects {
        /// Only this day (YYYY-MM-DD); all time if omitted
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    /// Daily totals for recent days
    Activity {
        #[arg(long, default_value = "30")]
        days: u32,
    },
}

#[derive(Serialize)]
struct TodayReport {
    #[serde(flatten)]
    progress: GoalProgress,
    by_subject: BTreeMap<Subject, u64>,
    streak: u32,
}

pub fn run(action: StatsAction) -> CliResult {
    let config = Config::load()?;
    let rt = runtime()?;
    let mut tracker = loaded_tracker(&rt, &config)?;
    if let Err(e) = rt.block_on(tracker.load_remote_settings()) {
        tracing::warn!(error = %e, "using local daily goal");
    }

    match action {
        StatsAction::Streak => {
            let streak = tracker.streak();
            println!("Current streak: {} day(s)", streak.count);
            match streak.last_qualifying_date {
                Some(date) => println!("Last study day: {date}"),
                None => println!("Last study day: none"),
            }
            println!("Longest streak: {} day(s)", tracker.longest_streak());
        }
        StatsAction::Today { json } => {
            let report = TodayReport {
                progress: tracker.goal_progress(),
                by_subject: tracker.by_subject_today(),
                streak: tracker.streak().count,
            };
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
                return Ok(());
            }
            let p = report.progress;
            println!(
                "{}  {} {}% of {} ({})",
                p.date,
                progress_bar(p.percent),
                p.percent,
                format_duration(p.target_secs),
                format_duration(p.logged_secs)
            );
            if p.achieved {
                println!("Daily goal reached");
            }
            print_subjects(&report.by_subject);
            println!("Streak: {} day(s)", report.streak);
        }
        StatsAction::Subjects { date } => {
            print_subjects(&by_subject(tracker.sessions(), date));
        }
        StatsAction::Activity { days } => {
            let target = tracker.goal().target_secs();
            for day in tracker.activity(days) {
                let percent = neetfocus_core::stats::progress_percent(day.total_secs, target);
                println!(
                    "{}  {} {:>8}",
                    day.date,
                    progress_bar(percent),
                    format_duration(day.total_secs)
                );
            }
        }
    }
    Ok(())
}

fn print_subjects(totals: &BTreeMap<Subject, u64>) {
    if totals.is_empty() {
        println!("No study time logged.");
        return;
    }
    for (subject, secs) in totals {
        println!("  {:<13} {:>8}", subject.label(), format_duration(*secs));
    }
}
