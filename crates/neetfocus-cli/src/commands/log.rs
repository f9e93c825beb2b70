use chrono::NaiveDate;
use clap::Args;
use neetfocus_core::{Clock, Config, Difficulty, LocalClock, StudySessionDraft, Subject};

use crate::common::{format_duration, loaded_tracker, runtime, CliResult};

#[derive(Args)]
pub struct LogArgs {
    /// physics, chemistry, biology or general
    #[arg(long)]
    subject: Option<Subject>,
    #[arg(long, default_value = "")]
    topic: String,
    /// Time studied in minutes
    #[arg(long)]
    minutes: u64,
    #[arg(long, default_value = "medium")]
    difficulty: Difficulty,
    /// Day studied (YYYY-MM-DD), today if omitted
    #[arg(long)]
    date: Option<NaiveDate>,
}

pub fn run(args: LogArgs) -> CliResult {
    let config = Config::load()?;
    let duration_secs = args
        .minutes
        .checked_mul(60)
        .ok_or("--minutes is too large")?;
    let draft = StudySessionDraft {
        subject: args.subject,
        topic: args.topic,
        duration_secs,
        difficulty: args.difficulty,
        date: args.date.unwrap_or_else(|| LocalClock.today()),
    };
    // Reject bad input before any network round trip.
    draft.validate()?;

    let rt = runtime()?;
    let mut tracker = loaded_tracker(&rt, &config)?;
    let stored = rt.block_on(tracker.log_manual(draft))?;
    println!(
        "Logged session #{}: {} of {} ({}) on {}",
        stored.id,
        format_duration(stored.duration_secs),
        stored.subject,
        stored.topic,
        stored.date
    );
    println!("Streak: {} day(s)", tracker.streak().count);
    Ok(())
}
