use chrono::NaiveDate;
use clap::Subcommand;
use neetfocus_core::{Config, SessionId};

use crate::common::{format_duration, loaded_tracker, runtime, CliResult};

#[derive(Subcommand)]
pub enum SessionsAction {
    /// List logged sessions, newest first
    List {
        /// Only sessions from this day (YYYY-MM-DD)
        #[arg(long)]
        date: Option<NaiveDate>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Delete a session by id
    Delete {
        id: SessionId,
    },
}

pub fn run(action: SessionsAction) -> CliResult {
    let config = Config::load()?;
    let rt = runtime()?;
    let mut tracker = loaded_tracker(&rt, &config)?;

    match action {
        SessionsAction::List { date, json } => {
            let mut sessions: Vec<_> = tracker
                .sessions()
                .iter()
                .filter(|s| date.map_or(true, |d| s.date == d))
                .collect();
            sessions.sort_by(|a, b| b.date.cmp(&a.date).then(b.id.cmp(&a.id)));

            if json {
                println!("{}", serde_json::to_string_pretty(&sessions)?);
                return Ok(());
            }
            if sessions.is_empty() {
                println!("No sessions logged.");
            }
            for s in sessions {
                println!(
                    "#{:<5} {}  {:<13} {:>8}  {:<6}  {}",
                    s.id,
                    s.date,
                    s.subject.label(),
                    format_duration(s.duration_secs),
                    s.difficulty,
                    s.topic
                );
            }
        }
        SessionsAction::Delete { id } => {
            rt.block_on(tracker.delete_session(id))?;
            println!("Deleted session #{id}");
            println!("Streak: {} day(s)", tracker.streak().count);
        }
    }
    Ok(())
}
