//! Remote persistence seams.
//!
//! The store and tracker only talk to these traits; [`super::HttpBackend`]
//! is the production implementation and [`InMemoryBackend`] backs tests and
//! offline use.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;

use super::model::{NewSession, SessionId, StudySession};
use crate::error::BackendError;

/// Session persistence API: append, delete, whole-log fetch.
#[async_trait]
pub trait SessionBackend: Send + Sync {
    async fn create(&self, session: &NewSession) -> Result<StudySession, BackendError>;

    async fn delete(&self, id: SessionId) -> Result<(), BackendError>;

    /// The user's whole session log, in no particular order.
    async fn list(&self) -> Result<Vec<StudySession>, BackendError>;
}

/// Per-user timer settings: the daily goal (seconds) and the number of
/// Pomodoros completed so far, which drives the long-break cadence.
#[async_trait]
pub trait GoalSettingsBackend: Send + Sync {
    async fn load_daily_goal(&self) -> Result<Option<u64>, BackendError>;

    async fn save_daily_goal(&self, target_secs: u64) -> Result<(), BackendError>;

    async fn load_pomodoro_count(&self) -> Result<Option<u32>, BackendError>;

    async fn save_pomodoro_count(&self, count: u32) -> Result<(), BackendError>;
}

#[derive(Default)]
struct MemoryState {
    sessions: Vec<StudySession>,
    next_id: SessionId,
    daily_goal: Option<u64>,
    pomodoro_count: Option<u32>,
    fail_with: Option<BackendError>,
}

/// Process-local backend. Counts calls so tests can assert that nothing was sent.
#[derive(Default)]
pub struct InMemoryBackend {
    state: Mutex<MemoryState>,
    calls: AtomicUsize,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the log with already-stored sessions.
    pub fn with_sessions(sessions: Vec<StudySession>) -> Self {
        let next_id = sessions.iter().map(|s| s.id).max().unwrap_or(0);
        Self {
            state: Mutex::new(MemoryState {
                sessions,
                next_id,
                ..MemoryState::default()
            }),
            calls: AtomicUsize::new(0),
        }
    }

    /// Make every following call fail with `err` until [`Self::recover`].
    pub fn fail_with(&self, err: BackendError) {
        self.lock().fail_with = Some(err);
    }

    pub fn recover(&self) {
        self.lock().fail_with = None;
    }

    /// Number of calls received so far, failed ones included.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn stored(&self) -> Vec<StudySession> {
        self.lock().sessions.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn enter(&self) -> Result<std::sync::MutexGuard<'_, MemoryState>, BackendError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let guard = self.lock();
        match &guard.fail_with {
            Some(err) => Err(err.clone()),
            None => Ok(guard),
        }
    }
}

#[async_trait]
impl SessionBackend for InMemoryBackend {
    async fn create(&self, session: &NewSession) -> Result<StudySession, BackendError> {
        let mut state = self.enter()?;
        state.next_id += 1;
        let stored = StudySession {
            id: state.next_id,
            subject: session.subject,
            topic: session.topic.clone(),
            duration_secs: session.duration_secs,
            difficulty: session.difficulty,
            date: session.date,
            created_at: Some(Utc::now()),
        };
        state.sessions.push(stored.clone());
        Ok(stored)
    }

    async fn delete(&self, id: SessionId) -> Result<(), BackendError> {
        let mut state = self.enter()?;
        let before = state.sessions.len();
        state.sessions.retain(|s| s.id != id);
        if state.sessions.len() == before {
            return Err(BackendError::NotFound);
        }
        Ok(())
    }

    async fn list(&self) -> Result<Vec<StudySession>, BackendError> {
        let state = self.enter()?;
        Ok(state.sessions.clone())
    }
}

#[async_trait]
impl GoalSettingsBackend for InMemoryBackend {
    async fn load_daily_goal(&self) -> Result<Option<u64>, BackendError> {
        Ok(self.enter()?.daily_goal)
    }

    async fn save_daily_goal(&self, target_secs: u64) -> Result<(), BackendError> {
        self.enter()?.daily_goal = Some(target_secs);
        Ok(())
    }

    async fn load_pomodoro_count(&self) -> Result<Option<u32>, BackendError> {
        Ok(self.enter()?.pomodoro_count)
    }

    async fn save_pomodoro_count(&self, count: u32) -> Result<(), BackendError> {
        self.enter()?.pomodoro_count = Some(count);
        Ok(())
    }
}
