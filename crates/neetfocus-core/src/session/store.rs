//! Append-only session log backed by a remote API.
//!
//! The store keeps a local copy of the log and the derived [`StreakState`].
//! Local state only changes after the backend confirms a write, and the
//! streak is recomputed in full after every change.

use std::sync::Arc;

use tracing::{debug, info, warn};

use super::backend::SessionBackend;
use super::model::{SessionId, StudySession, StudySessionDraft};
use crate::clock::Clock;
use crate::error::{BackendError, StoreError};
use crate::stats::{StreakState, StreakTracker};

pub struct SessionStore<B> {
    backend: B,
    clock: Arc<dyn Clock>,
    streak_rules: StreakTracker,
    sessions: Vec<StudySession>,
    streak: StreakState,
}

impl<B: SessionBackend> SessionStore<B> {
    pub fn new(backend: B, clock: Arc<dyn Clock>, streak_rules: StreakTracker) -> Self {
        Self {
            backend,
            clock,
            streak_rules,
            sessions: Vec::new(),
            streak: StreakState::default(),
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn sessions(&self) -> &[StudySession] {
        &self.sessions
    }

    pub fn get(&self, id: SessionId) -> Option<&StudySession> {
        self.sessions.iter().find(|s| s.id == id)
    }

    pub fn streak(&self) -> StreakState {
        self.streak
    }

    pub fn streak_rules(&self) -> StreakTracker {
        self.streak_rules
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Validate and persist a new session.
    ///
    /// Validation failures never reach the backend.
    pub async fn record(&mut self, draft: StudySessionDraft) -> Result<StudySession, StoreError> {
        let new_session = draft.validate()?;
        let stored = self
            .backend
            .create(&new_session)
            .await
            .map_err(|err| {
                warn!(error = %err, "failed to record session");
                StoreError::from_backend("record session", err)
            })?;

        info!(
            id = stored.id,
            subject = %stored.subject,
            duration_secs = stored.duration_secs,
            "recorded study session"
        );
        self.sessions.push(stored.clone());
        self.recompute();
        Ok(stored)
    }

    /// Delete a session once the backend confirms it.
    ///
    /// A session the backend no longer knows about is treated as deleted.
    pub async fn delete(&mut self, id: SessionId) -> Result<(), StoreError> {
        match self.backend.delete(id).await {
            Ok(()) => {}
            Err(BackendError::NotFound) => debug!(id, "session already gone on server"),
            Err(err) => {
                warn!(id, error = %err, "failed to delete session");
                return Err(StoreError::from_backend("delete session", err));
            }
        }

        self.sessions.retain(|s| s.id != id);
        info!(id, "deleted study session");
        self.recompute();
        Ok(())
    }

    /// Replace the local log with the backend's full log.
    pub async fn refresh(&mut self) -> Result<(), StoreError> {
        let sessions = self
            .backend
            .list()
            .await
            .map_err(|err| StoreError::from_backend("load sessions", err))?;
        debug!(count = sessions.len(), "loaded session log");
        self.sessions = sessions;
        self.recompute();
        Ok(())
    }

    /// Recompute derived state, e.g. after the local date rolled over.
    pub fn recompute(&mut self) {
        self.streak = self.streak_rules.compute(&self.sessions, self.clock.today());
    }
}
