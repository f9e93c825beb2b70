//! Timer engine implementation.
//!
//! The timer engine is a tick-driven state machine. It does not own a
//! clock or a thread: whoever hosts it feeds one `tick()` per wall-clock
//! second while it is ticking (see [`super::TickSource`]).
//!
//! ## State Transitions
//!
//! ```text
//! Idle -> Running <-> Paused -> Idle            (expire / finish early / reset)
//! Idle -> BreakRunning <-> BreakPaused -> BreakIdle -> Idle
//! ```
//!
//! ## Usage
//!
//! ```ignore
//! let mut engine = TimerEngine::new(Presets::default(), Subject::General);
//! engine.start();
//! // once per second:
//! if let Some(Event::SessionCompleted(run)) = engine.tick() { /* log it */ }
//! ```

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use super::mode::{BreakKind, Presets, TimerMode};
use crate::error::TimerError;
use crate::events::{CompletedRun, CompletionReason, Event};
use crate::session::Subject;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimerPhase {
    Idle,
    Running,
    Paused,
    BreakRunning,
    BreakPaused,
    /// Break countdown finished, waiting to be dismissed.
    BreakIdle,
}

impl TimerPhase {
    /// Phases that need a tick source attached.
    pub fn is_ticking(self) -> bool {
        matches!(self, TimerPhase::Running | TimerPhase::BreakRunning)
    }

    pub fn is_break(self) -> bool {
        matches!(
            self,
            TimerPhase::BreakRunning | TimerPhase::BreakPaused | TimerPhase::BreakIdle
        )
    }
}

/// Core timer engine.
///
/// Invariants: `remaining_secs <= initial_secs` and
/// `break_remaining_secs <= break_initial_secs` at all times.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimerEngine {
    presets: Presets,
    default_subject: Subject,
    mode: TimerMode,
    phase: TimerPhase,
    initial_secs: u64,
    remaining_secs: u64,
    selected_subject: Option<Subject>,
    /// Identity of the current focus run, set on start and cleared when it ends.
    #[serde(default)]
    run_id: Option<Uuid>,
    #[serde(default)]
    pomodoro_count: u32,
    #[serde(default)]
    suggested_break: Option<BreakKind>,
    #[serde(default)]
    break_kind: Option<BreakKind>,
    #[serde(default)]
    break_initial_secs: u64,
    #[serde(default)]
    break_remaining_secs: u64,
    #[serde(default)]
    editing: bool,
}

impl Default for TimerEngine {
    fn default() -> Self {
        Self::new(Presets::default(), Subject::General)
    }
}

impl TimerEngine {
    /// Create an idle engine in Pomodoro mode.
    ///
    /// `default_subject` is selected when a run starts without one.
    pub fn new(presets: Presets, default_subject: Subject) -> Self {
        let initial_secs = presets.minutes_for(TimerMode::Pomodoro).saturating_mul(60);
        Self {
            presets,
            default_subject,
            mode: TimerMode::Pomodoro,
            phase: TimerPhase::Idle,
            initial_secs,
            remaining_secs: initial_secs,
            selected_subject: None,
            run_id: None,
            pomodoro_count: 0,
            suggested_break: None,
            break_kind: None,
            break_initial_secs: 0,
            break_remaining_secs: 0,
            editing: false,
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn phase(&self) -> TimerPhase {
        self.phase
    }

    pub fn mode(&self) -> TimerMode {
        self.mode
    }

    pub fn presets(&self) -> &Presets {
        &self.presets
    }

    pub fn is_ticking(&self) -> bool {
        self.phase.is_ticking()
    }

    pub fn initial_secs(&self) -> u64 {
        self.initial_secs
    }

    /// Remaining focus time. Unaffected by breaks.
    pub fn remaining_secs(&self) -> u64 {
        self.remaining_secs
    }

    /// Zero when a restored state has `remaining_secs > initial_secs`.
    pub fn elapsed_secs(&self) -> u64 {
        self.initial_secs.saturating_sub(self.remaining_secs)
    }

    pub fn break_kind(&self) -> Option<BreakKind> {
        self.break_kind
    }

    pub fn break_remaining_secs(&self) -> u64 {
        self.break_remaining_secs
    }

    /// Seconds left on whichever countdown is on screen.
    pub fn display_secs(&self) -> u64 {
        if self.phase.is_break() {
            self.break_remaining_secs
        } else {
            self.remaining_secs
        }
    }

    pub fn selected_subject(&self) -> Option<Subject> {
        self.selected_subject
    }

    pub fn pomodoro_count(&self) -> u32 {
        self.pomodoro_count
    }

    pub fn suggested_break(&self) -> Option<BreakKind> {
        self.suggested_break
    }

    pub fn run_id(&self) -> Option<Uuid> {
        self.run_id
    }

    pub fn is_editing(&self) -> bool {
        self.editing
    }

    /// 0.0 .. 1.0 progress of the visible countdown.
    pub fn progress(&self) -> f64 {
        let (total, left) = if self.phase.is_break() {
            (self.break_initial_secs, self.break_remaining_secs)
        } else {
            (self.initial_secs, self.remaining_secs)
        };
        if total == 0 {
            return 0.0;
        }
        1.0 - (left as f64 / total as f64)
    }

    /// Build a full state snapshot event.
    pub fn snapshot(&self) -> Event {
        let total_secs = if self.phase.is_break() {
            self.break_initial_secs
        } else {
            self.initial_secs
        };
        Event::StateSnapshot {
            phase: self.phase,
            mode: self.mode,
            subject: self.selected_subject,
            remaining_secs: self.display_secs(),
            total_secs,
            pomodoro_count: self.pomodoro_count,
            suggested_break: self.suggested_break,
            at: Utc::now(),
        }
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Start a run from `Idle`, or resume a paused run or break.
    /// Ignored while already ticking.
    pub fn start(&mut self) -> Option<Event> {
        match self.phase {
            TimerPhase::Idle => {
                if self.initial_secs == 0 {
                    return None;
                }
                let auto_selected_subject = self.selected_subject.is_none();
                let subject = *self.selected_subject.get_or_insert(self.default_subject);
                let run_id = Uuid::new_v4();
                self.run_id = Some(run_id);
                self.remaining_secs = self.initial_secs;
                self.suggested_break = None;
                self.editing = false;
                self.phase = TimerPhase::Running;
                debug!(%run_id, mode = %self.mode, %subject, "timer started");
                Some(Event::TimerStarted {
                    run_id,
                    mode: self.mode,
                    subject,
                    auto_selected_subject,
                    duration_secs: self.initial_secs,
                    at: Utc::now(),
                })
            }
            TimerPhase::Paused | TimerPhase::BreakPaused => self.resume(),
            TimerPhase::Running | TimerPhase::BreakRunning | TimerPhase::BreakIdle => None,
        }
    }

    pub fn resume(&mut self) -> Option<Event> {
        let on_break = match self.phase {
            TimerPhase::Paused => {
                self.phase = TimerPhase::Running;
                false
            }
            TimerPhase::BreakPaused => {
                self.phase = TimerPhase::BreakRunning;
                true
            }
            _ => return None,
        };
        Some(Event::TimerResumed {
            remaining_secs: self.display_secs(),
            on_break,
            at: Utc::now(),
        })
    }

    pub fn pause(&mut self) -> Option<Event> {
        let on_break = match self.phase {
            TimerPhase::Running => {
                self.phase = TimerPhase::Paused;
                false
            }
            TimerPhase::BreakRunning => {
                self.phase = TimerPhase::BreakPaused;
                true
            }
            _ => return None,
        };
        Some(Event::TimerPaused {
            remaining_secs: self.display_secs(),
            on_break,
            at: Utc::now(),
        })
    }

    /// Start/pause toggle.
    pub fn toggle(&mut self) -> Option<Event> {
        if self.phase.is_ticking() {
            self.pause()
        } else {
            self.start()
        }
    }

    /// Abandon the current run without a completion event.
    /// During a break this skips the break.
    pub fn reset(&mut self) -> Option<Event> {
        if self.phase.is_break() {
            return self.end_break();
        }
        if let Some(run_id) = self.run_id.take() {
            debug!(%run_id, elapsed_secs = self.elapsed_secs(), "timer reset");
        }
        self.phase = TimerPhase::Idle;
        self.remaining_secs = self.initial_secs;
        self.editing = false;
        Some(Event::TimerReset { at: Utc::now() })
    }

    /// Advance one second. Returns the completion event when a countdown hits zero.
    pub fn tick(&mut self) -> Option<Event> {
        match self.phase {
            TimerPhase::Running => {
                self.remaining_secs = self.remaining_secs.saturating_sub(1);
                if self.remaining_secs == 0 {
                    return Some(self.complete(CompletionReason::Expired));
                }
                None
            }
            TimerPhase::BreakRunning => {
                self.break_remaining_secs = self.break_remaining_secs.saturating_sub(1);
                if self.break_remaining_secs == 0 {
                    self.phase = TimerPhase::BreakIdle;
                    let kind = self.break_kind.unwrap_or(BreakKind::Short);
                    debug!(%kind, "break finished");
                    return Some(Event::BreakCompleted {
                        kind,
                        at: Utc::now(),
                    });
                }
                None
            }
            _ => None,
        }
    }

    /// End a running or paused focus run now and report the time spent.
    ///
    /// Ignored when no time has elapsed yet.
    pub fn finish_early(&mut self) -> Option<Event> {
        match self.phase {
            TimerPhase::Running | TimerPhase::Paused if self.elapsed_secs() > 0 => {
                Some(self.complete(CompletionReason::FinishedEarly))
            }
            _ => None,
        }
    }

    /// Start a break countdown. Only from `Idle`.
    pub fn start_break(&mut self, kind: BreakKind) -> Result<Event, TimerError> {
        self.ensure_idle()?;
        let secs = self.presets.break_minutes(kind).saturating_mul(60);
        if secs == 0 {
            return Err(TimerError::InvalidDuration {
                input: "0".to_string(),
            });
        }
        self.break_kind = Some(kind);
        self.break_initial_secs = secs;
        self.break_remaining_secs = secs;
        self.suggested_break = None;
        self.editing = false;
        self.phase = TimerPhase::BreakRunning;
        debug!(%kind, secs, "break started");
        Ok(Event::BreakStarted {
            kind,
            duration_secs: secs,
            at: Utc::now(),
        })
    }

    /// Start the break offered after the last Pomodoro, if any.
    pub fn start_suggested_break(&mut self) -> Option<Event> {
        let kind = self.suggested_break?;
        self.start_break(kind).ok()
    }

    /// Dismiss a finished break or skip one in progress.
    pub fn end_break(&mut self) -> Option<Event> {
        if !self.phase.is_break() {
            return None;
        }
        let skipped = self.phase != TimerPhase::BreakIdle;
        let kind = self.break_kind.take().unwrap_or(BreakKind::Short);
        self.break_initial_secs = 0;
        self.break_remaining_secs = 0;
        self.phase = TimerPhase::Idle;
        Some(Event::BreakEnded {
            kind,
            skipped,
            at: Utc::now(),
        })
    }

    /// Switch mode with an explicit length. Only from `Idle`.
    pub fn switch_mode(&mut self, mode: TimerMode, minutes: u64) -> Result<Event, TimerError> {
        self.ensure_idle()?;
        let secs = minutes_to_secs(minutes).ok_or_else(|| TimerError::InvalidDuration {
            input: minutes.to_string(),
        })?;
        self.mode = mode;
        self.initial_secs = secs;
        self.remaining_secs = secs;
        self.editing = false;
        Ok(Event::ModeSwitched {
            mode,
            duration_secs: secs,
            at: Utc::now(),
        })
    }

    /// Switch to a mode using its configured length.
    pub fn switch_preset(&mut self, mode: TimerMode) -> Result<Event, TimerError> {
        self.switch_mode(mode, self.presets.minutes_for(mode))
    }

    pub fn begin_edit(&mut self) -> Result<(), TimerError> {
        self.ensure_editable()?;
        self.editing = true;
        Ok(())
    }

    /// Apply a manually typed length in minutes. On error the previous
    /// length stays and the edit remains open.
    pub fn commit_edit(&mut self, input: &str) -> Result<Event, TimerError> {
        self.ensure_editable()?;
        let secs = input
            .trim()
            .parse::<u64>()
            .ok()
            .and_then(minutes_to_secs)
            .ok_or_else(|| TimerError::InvalidDuration {
                input: input.to_string(),
            })?;
        self.mode = TimerMode::Custom;
        self.initial_secs = secs;
        self.remaining_secs = secs;
        self.editing = false;
        Ok(Event::ModeSwitched {
            mode: TimerMode::Custom,
            duration_secs: secs,
            at: Utc::now(),
        })
    }

    pub fn cancel_edit(&mut self) {
        self.editing = false;
    }

    /// Change the subject for the next run. Only from `Idle`.
    pub fn select_subject(&mut self, subject: Option<Subject>) -> Result<Event, TimerError> {
        self.ensure_idle()?;
        self.selected_subject = subject;
        Ok(Event::SubjectSelected {
            subject,
            at: Utc::now(),
        })
    }

    /// Carry over the Pomodoro count from an earlier session so the
    /// long-break cadence continues where it left off.
    pub fn restore_pomodoro_count(&mut self, count: u32) {
        self.pomodoro_count = count;
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn ensure_idle(&self) -> Result<(), TimerError> {
        if self.phase != TimerPhase::Idle {
            return Err(TimerError::NotIdle { phase: self.phase });
        }
        Ok(())
    }

    fn ensure_editable(&self) -> Result<(), TimerError> {
        if self.phase.is_break() {
            return Err(TimerError::OnBreak);
        }
        self.ensure_idle()
    }

    fn complete(&mut self, reason: CompletionReason) -> Event {
        let elapsed_secs = match reason {
            CompletionReason::Expired => self.initial_secs,
            CompletionReason::FinishedEarly => self.elapsed_secs(),
        };

        let suggested_break = if reason == CompletionReason::Expired && self.mode.supports_breaks() {
            self.pomodoro_count = self.pomodoro_count.saturating_add(1);
            Some(self.presets.break_after(self.pomodoro_count))
        } else {
            None
        };
        self.suggested_break = suggested_break;

        let run_id = self.run_id.take().unwrap_or_else(Uuid::new_v4);
        let subject = self.selected_subject.unwrap_or(self.default_subject);
        self.phase = TimerPhase::Idle;
        self.remaining_secs = self.initial_secs;
        debug!(%run_id, elapsed_secs, ?reason, "focus run completed");

        Event::SessionCompleted(CompletedRun {
            run_id,
            mode: self.mode,
            subject,
            elapsed_secs,
            reason,
            suggested_break,
            at: Utc::now(),
        })
    }
}

fn minutes_to_secs(minutes: u64) -> Option<u64> {
    if minutes == 0 {
        return None;
    }
    minutes.checked_mul(60)
}
