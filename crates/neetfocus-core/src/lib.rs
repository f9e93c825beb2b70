//! # neetfocus Core Library
//!
//! Business logic for the neetfocus study timer: a focus/break countdown,
//! the log of completed study sessions, the consecutive-day streak and the
//! daily study goal. The `neetfocus` CLI is a thin layer over this crate.
//!
//! ## Architecture
//!
//! - **Timer Engine**: a tick-driven state machine; the host feeds one tick
//!   per second from a [`TickSource`] while it is running
//! - **Session Store**: append-only session log persisted through a
//!   [`SessionBackend`] (the study-logs REST API in production)
//! - **Stats**: streak, daily goal progress and per-subject breakdowns,
//!   all pure functions of the log
//! - **Storage**: TOML configuration and keyring-backed API token
//!
//! ## Key Components
//!
//! - [`StudyTracker`]: owns one of each of the above and keeps them in step
//! - [`TimerEngine`]: core timer state machine
//! - [`SessionStore`]: session log and cached streak
//! - [`Config`]: application configuration management

pub mod clock;
pub mod error;
pub mod events;
pub mod session;
pub mod stats;
pub mod storage;
pub mod timer;
pub mod tracker;

pub use clock::{Clock, FixedClock, LocalClock};
pub use error::{
    BackendError, ConfigError, CoreError, CredentialError, StoreError, TimerError,
    ValidationError,
};
pub use events::{CompletedRun, CompletionReason, Event, EventBus, Subscription};
pub use session::{
    Difficulty, HttpBackend, InMemoryBackend, SessionBackend, SessionId, SessionStore,
    StudySession, StudySessionDraft, Subject,
};
pub use stats::{DailyGoal, GoalProgress, StreakState, StreakTracker};
pub use storage::Config;
pub use timer::{
    BreakKind, ManualTicker, Presets, Tick, TickSource, TimerEngine, TimerMode, TimerPhase,
    TokioTicker,
};
pub use tracker::{PendingSession, StudyTracker};
