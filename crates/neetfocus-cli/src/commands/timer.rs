use std::io::{IsTerminal, Write};

use clap::{Args, Subcommand};
use neetfocus_core::timer::format_clock;
use neetfocus_core::{
    BreakKind, Config, Difficulty, Event, HttpBackend, StoreError, StudyTracker, Subject, Tick,
    TimerEngine, TimerMode, TimerPhase, TokioTicker,
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::warn;

use crate::common::{format_duration, progress_bar, runtime, tracker_with, CliResult};

type Tracker = StudyTracker<HttpBackend, TokioTicker>;

const CONTROLS: &str = "controls: n start, p pause, r resume, f finish early, x reset, \
b break, s skip break, t status, q quit";

#[derive(Subcommand)]
pub enum TimerAction {
    /// Run a focus timer in the foreground
    Run(RunArgs),
    /// Show the configured mode and break lengths
    Modes,
}

#[derive(Args)]
pub struct RunArgs {
    /// pomodoro, deep-work, mock-test or custom
    #[arg(long)]
    mode: Option<TimerMode>,
    /// Length in minutes (overrides the mode preset)
    #[arg(long)]
    minutes: Option<u64>,
    /// Subject to study; the configured default is used if omitted
    #[arg(long)]
    subject: Option<Subject>,
    /// Topic to log when the run finishes; asked for if omitted
    #[arg(long)]
    topic: Option<String>,
    #[arg(long, default_value = "medium")]
    difficulty: Difficulty,
    /// Do not contact the server or log the run
    #[arg(long)]
    no_log: bool,
    /// Print events as JSON lines
    #[arg(long)]
    json: bool,
}

pub fn run(action: TimerAction) -> CliResult {
    let config = Config::load()?;
    match action {
        TimerAction::Run(args) => {
            let rt = runtime()?;
            let (ticker, ticks) = TokioTicker::every_second();
            let mut tracker = tracker_with(&config, ticker)?;
            rt.block_on(timer_loop(&mut tracker, ticks, &args))
        }
        TimerAction::Modes => {
            let presets = config.presets();
            for mode in [TimerMode::Pomodoro, TimerMode::DeepWork, TimerMode::MockTest] {
                println!("{:<10} {} min", mode.label(), presets.minutes_for(mode));
            }
            for kind in [BreakKind::Short, BreakKind::Long] {
                println!("{:<12} {} min", kind.to_string(), presets.break_minutes(kind));
            }
            println!(
                "long break after every {} pomodoros",
                presets.pomodoros_before_long_break
            );
            Ok(())
        }
    }
}

struct Output {
    json: bool,
    tty: bool,
}

impl Output {
    fn event(&self, event: &Event) {
        if self.json {
            match serde_json::to_string(event) {
                Ok(line) => println!("{line}"),
                Err(e) => warn!(error = %e, "failed to encode event"),
            }
        } else {
            self.clear_status();
            println!("{}", describe(event));
        }
    }

    fn note(&self, message: &str) {
        if self.json {
            eprintln!("{message}");
        } else {
            self.clear_status();
            println!("{message}");
        }
    }

    fn status(&self, engine: &TimerEngine) {
        if self.json || !self.tty {
            return;
        }
        let label = match engine.phase() {
            TimerPhase::BreakRunning | TimerPhase::BreakPaused => "break",
            _ => engine.mode().label(),
        };
        print!(
            "\r{label} {} {}",
            format_clock(engine.display_secs()),
            progress_bar((engine.progress() * 100.0) as u8)
        );
        let _ = std::io::stdout().flush();
    }

    fn clear_status(&self) {
        if self.tty && !self.json {
            print!("\r\x1b[2K");
        }
    }
}

fn describe(event: &Event) -> String {
    match event {
        Event::TimerStarted {
            mode,
            subject,
            auto_selected_subject,
            duration_secs,
            ..
        } => {
            let note = if *auto_selected_subject { " (default subject)" } else { "" };
            format!("{mode} started: {} of {subject}{note}", format_clock(*duration_secs))
        }
        Event::TimerPaused { remaining_secs, .. } => {
            format!("Paused with {} left", format_clock(*remaining_secs))
        }
        Event::TimerResumed { remaining_secs, .. } => {
            format!("Resumed with {} left", format_clock(*remaining_secs))
        }
        Event::TimerReset { .. } => "Timer reset".to_string(),
        Event::SessionCompleted(run) => {
            let mut line = format!(
                "Session complete: {} of {}",
                format_duration(run.elapsed_secs),
                run.subject
            );
            if let Some(kind) = run.suggested_break {
                line.push_str(&format!(". Time for a {kind} (press b)"));
            }
            line
        }
        Event::BreakStarted {
            kind,
            duration_secs,
            ..
        } => format!("{kind} started: {}", format_clock(*duration_secs)),
        Event::BreakCompleted { kind, .. } => format!("{kind} over (press s to continue)"),
        Event::BreakEnded { kind, skipped, .. } => {
            if *skipped {
                format!("{kind} skipped")
            } else {
                "Back to focus".to_string()
            }
        }
        Event::ModeSwitched {
            mode,
            duration_secs,
            ..
        } => format!("Mode: {mode} ({})", format_clock(*duration_secs)),
        Event::SubjectSelected { subject, .. } => match subject {
            Some(subject) => format!("Subject: {subject}"),
            None => "Subject cleared".to_string(),
        },
        Event::StateSnapshot {
            phase,
            mode,
            subject,
            remaining_secs,
            pomodoro_count,
            ..
        } => {
            let subject = subject.map(|s| s.to_string()).unwrap_or_else(|| "no subject".into());
            format!(
                "{phase:?} ({mode}, {subject}): {} left, {pomodoro_count} pomodoro(s) done",
                format_clock(*remaining_secs)
            )
        }
    }
}

enum Command {
    Applied(Option<Event>),
    Status,
    Help,
    Quit,
    Unknown,
}

fn command(tracker: &mut Tracker, input: &str) -> Command {
    match input {
        "" => Command::Applied(None),
        "n" => Command::Applied(tracker.start()),
        "p" => Command::Applied(tracker.pause()),
        "r" => Command::Applied(tracker.resume()),
        "f" => Command::Applied(tracker.finish_early()),
        "x" => Command::Applied(tracker.reset()),
        "b" => {
            let kind = tracker.engine().suggested_break().unwrap_or(BreakKind::Short);
            Command::Applied(tracker.start_break(kind).ok())
        }
        "s" => Command::Applied(tracker.end_break()),
        "t" => Command::Status,
        "q" => Command::Quit,
        "h" | "?" => Command::Help,
        _ => Command::Unknown,
    }
}

async fn timer_loop(
    tracker: &mut Tracker,
    mut ticks: UnboundedReceiver<Tick>,
    args: &RunArgs,
) -> CliResult {
    let out = Output {
        json: args.json,
        tty: std::io::stdout().is_terminal(),
    };

    if !args.no_log {
        if let Err(e) = tracker.refresh().await {
            warn!(error = %e, "could not load session log");
        }
        if let Err(e) = tracker.load_remote_settings().await {
            warn!(error = %e, "could not load daily goal");
        }
    }

    match args.minutes {
        Some(minutes) => tracker.switch_mode(args.mode.unwrap_or(TimerMode::Custom), minutes)?,
        None => tracker.switch_preset(args.mode.unwrap_or(TimerMode::Pomodoro))?,
    };
    if let Some(subject) = args.subject {
        tracker.select_subject(Some(subject))?;
    }

    if !args.json {
        out.note(CONTROLS);
    }
    if let Some(event) = tracker.start() {
        out.event(&event);
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;
    let mut awaiting_topic = false;
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            Some(tick) = ticks.recv() => {
                match tracker.handle_tick(tick) {
                    Some(event) => awaiting_topic |= on_event(tracker, event, args, &out).await?,
                    None => out.status(tracker.engine()),
                }
            }
            line = lines.next_line(), if stdin_open => {
                match line? {
                    None => stdin_open = false,
                    Some(line) if awaiting_topic => {
                        awaiting_topic = log_with_topic(tracker, line.trim(), args.difficulty, &out).await?;
                    }
                    Some(line) => match command(tracker, line.trim()) {
                        Command::Applied(Some(event)) => {
                            awaiting_topic |= on_event(tracker, event, args, &out).await?;
                        }
                        Command::Applied(None) => {}
                        Command::Status => out.event(&tracker.engine().snapshot()),
                        Command::Help => out.note(CONTROLS),
                        Command::Unknown => out.note(&format!("unknown command '{}'", line.trim())),
                        Command::Quit => break,
                    },
                }
            }
            _ = &mut ctrl_c => {
                out.note("interrupted");
                break;
            }
        }

        if !stdin_open {
            if awaiting_topic {
                tracker.discard_pending();
                out.note("No topic given; session not logged");
                awaiting_topic = false;
            }
            if !tracker.engine().is_ticking() {
                break;
            }
        }
    }

    if tracker.discard_pending().is_some() {
        out.note("Unlogged session discarded");
    }
    Ok(())
}

/// Print an event and handle a finished run. Returns true when a topic
/// should be read from stdin next.
async fn on_event(
    tracker: &mut Tracker,
    event: Event,
    args: &RunArgs,
    out: &Output,
) -> CliResult<bool> {
    out.event(&event);
    if !matches!(event, Event::SessionCompleted(_)) {
        return Ok(false);
    }
    if args.no_log {
        tracker.discard_pending();
        return Ok(false);
    }
    if let Err(e) = tracker.save_pomodoro_count().await {
        warn!(error = %e, "could not save pomodoro count");
    }
    match &args.topic {
        Some(topic) => log_with_topic(tracker, topic, args.difficulty, out).await,
        None => {
            out.note("Topic for this session (empty line to skip):");
            Ok(true)
        }
    }
}

/// Returns true when the topic should be asked for again.
async fn log_with_topic(
    tracker: &mut Tracker,
    topic: &str,
    difficulty: Difficulty,
    out: &Output,
) -> CliResult<bool> {
    if topic.trim().is_empty() {
        tracker.discard_pending();
        out.note("Session not logged");
        return Ok(false);
    }

    match tracker.log_pending(topic, difficulty).await {
        Ok(stored) => {
            let progress = tracker.goal_progress();
            out.note(&format!(
                "Logged {} of {} ({}). Today {} {}% of goal. Streak: {} day(s)",
                format_duration(stored.duration_secs),
                stored.subject,
                stored.topic,
                progress_bar(progress.percent),
                progress.percent,
                tracker.streak().count
            ));
            Ok(false)
        }
        Err(StoreError::AuthExpired) => Err(StoreError::AuthExpired.into()),
        Err(e) => {
            out.note(&format!("{e}. Enter the topic to retry, or an empty line to skip:"));
            Ok(true)
        }
    }
}
