//! App root that wires the timer, tick source, session store and goal together.
//!
//! A front end owns exactly one [`StudyTracker`] and drives it with user
//! commands and ticks. After every command the tracker attaches or detaches
//! the tick source so that a loop is alive exactly while the engine is in a
//! ticking phase, publishes the resulting event, and keeps the last
//! completed focus run as the pending session until it is logged or
//! discarded.

use std::sync::Arc;

use chrono::NaiveDate;
use tracing::{debug, info, trace, warn};

use crate::clock::Clock;
use crate::error::{Result, StoreError, TimerError, ValidationError};
use crate::events::{CompletedRun, Event, EventBus, Subscription};
use crate::session::{
    Difficulty, GoalSettingsBackend, SessionBackend, SessionId, SessionStore, StudySession,
    StudySessionDraft, Subject,
};
use crate::stats::{self, DailyGoal, DayActivity, GoalProgress, StreakState};
use crate::storage::Config;
use crate::timer::{BreakKind, Tick, TickSource, TimerEngine, TimerMode, TimerPhase};

/// A finished focus run waiting for a topic before it is logged.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingSession {
    pub run: CompletedRun,
    /// Local date the run finished on; the logged session keeps this date.
    pub date: NaiveDate,
}

pub struct StudyTracker<B, T> {
    engine: TimerEngine,
    ticker: T,
    store: SessionStore<B>,
    goal: DailyGoal,
    clock: Arc<dyn Clock>,
    bus: EventBus,
    pending: Option<PendingSession>,
    /// Pomodoro count last read from or written to the settings backend.
    synced_pomodoro_count: u32,
}

impl<B: SessionBackend, T: TickSource> StudyTracker<B, T> {
    pub fn new(
        engine: TimerEngine,
        ticker: T,
        store: SessionStore<B>,
        goal: DailyGoal,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            engine,
            ticker,
            store,
            goal,
            clock,
            bus: EventBus::new(),
            pending: None,
            synced_pomodoro_count: 0,
        }
    }

    /// Build a tracker with presets, goal and streak rules taken from `config`.
    pub fn from_config(
        config: &Config,
        backend: B,
        ticker: T,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        config.validate()?;
        let engine = TimerEngine::new(config.presets(), config.default_subject()?);
        let store = SessionStore::new(backend, clock.clone(), config.streak_tracker());
        Ok(Self::new(engine, ticker, store, config.daily_goal()?, clock))
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn engine(&self) -> &TimerEngine {
        &self.engine
    }

    pub fn phase(&self) -> TimerPhase {
        self.engine.phase()
    }

    pub fn ticker(&self) -> &T {
        &self.ticker
    }

    pub fn store(&self) -> &SessionStore<B> {
        &self.store
    }

    pub fn sessions(&self) -> &[StudySession] {
        self.store.sessions()
    }

    pub fn pending(&self) -> Option<&PendingSession> {
        self.pending.as_ref()
    }

    pub fn goal(&self) -> DailyGoal {
        self.goal
    }

    pub fn today(&self) -> NaiveDate {
        self.clock.today()
    }

    /// Progress towards the daily goal for today.
    pub fn goal_progress(&self) -> GoalProgress {
        self.goal.progress(self.store.sessions(), self.clock.today())
    }

    pub fn goal_progress_on(&self, date: NaiveDate) -> GoalProgress {
        self.goal.progress(self.store.sessions(), date)
    }

    /// Cached streak as of the last log change or [`Self::recompute`].
    pub fn streak(&self) -> StreakState {
        self.store.streak()
    }

    pub fn longest_streak(&self) -> u32 {
        self.store.streak_rules().longest(self.store.sessions())
    }

    pub fn by_subject_today(&self) -> std::collections::BTreeMap<Subject, u64> {
        stats::by_subject(self.store.sessions(), Some(self.clock.today()))
    }

    /// Daily totals for the last `days` days, oldest first.
    pub fn activity(&self, days: u32) -> Vec<DayActivity> {
        stats::activity_grid(self.store.sessions(), self.clock.today(), days)
    }

    // ── Subscriptions ────────────────────────────────────────────────

    pub fn subscribe<F>(&mut self, handler: F) -> Subscription
    where
        F: FnMut(&Event) + Send + 'static,
    {
        self.bus.subscribe(handler)
    }

    pub fn on_session_completed<F>(&mut self, handler: F) -> Subscription
    where
        F: FnMut(&CompletedRun) + Send + 'static,
    {
        self.bus.on_session_completed(handler)
    }

    pub fn unsubscribe(&mut self, subscription: Subscription) -> bool {
        self.bus.unsubscribe(subscription)
    }

    // ── Timer commands ───────────────────────────────────────────────

    pub fn start(&mut self) -> Option<Event> {
        let event = self.engine.start();
        self.apply(event)
    }

    pub fn pause(&mut self) -> Option<Event> {
        let event = self.engine.pause();
        self.apply(event)
    }

    pub fn resume(&mut self) -> Option<Event> {
        let event = self.engine.resume();
        self.apply(event)
    }

    pub fn toggle(&mut self) -> Option<Event> {
        let event = self.engine.toggle();
        self.apply(event)
    }

    pub fn reset(&mut self) -> Option<Event> {
        let event = self.engine.reset();
        self.apply(event)
    }

    pub fn finish_early(&mut self) -> Option<Event> {
        let event = self.engine.finish_early();
        self.apply(event)
    }

    pub fn start_break(&mut self, kind: BreakKind) -> std::result::Result<Event, TimerError> {
        let event = self.engine.start_break(kind)?;
        Ok(self.publish(event))
    }

    pub fn start_suggested_break(&mut self) -> Option<Event> {
        let event = self.engine.start_suggested_break();
        self.apply(event)
    }

    pub fn end_break(&mut self) -> Option<Event> {
        let event = self.engine.end_break();
        self.apply(event)
    }

    pub fn switch_mode(
        &mut self,
        mode: TimerMode,
        minutes: u64,
    ) -> std::result::Result<Event, TimerError> {
        let event = self.engine.switch_mode(mode, minutes)?;
        Ok(self.publish(event))
    }

    pub fn switch_preset(&mut self, mode: TimerMode) -> std::result::Result<Event, TimerError> {
        let event = self.engine.switch_preset(mode)?;
        Ok(self.publish(event))
    }

    pub fn begin_edit(&mut self) -> std::result::Result<(), TimerError> {
        self.engine.begin_edit()
    }

    pub fn commit_edit(&mut self, input: &str) -> std::result::Result<Event, TimerError> {
        let event = self.engine.commit_edit(input)?;
        Ok(self.publish(event))
    }

    pub fn cancel_edit(&mut self) {
        self.engine.cancel_edit();
    }

    pub fn select_subject(
        &mut self,
        subject: Option<Subject>,
    ) -> std::result::Result<Event, TimerError> {
        let event = self.engine.select_subject(subject)?;
        Ok(self.publish(event))
    }

    /// Feed one tick. Ticks from a replaced or detached loop are dropped.
    pub fn handle_tick(&mut self, tick: Tick) -> Option<Event> {
        if !self.ticker.is_current(tick) {
            trace!(generation = tick.generation, "dropping stale tick");
            return None;
        }
        let event = self.engine.tick();
        self.apply(event)
    }

    // ── Session log ──────────────────────────────────────────────────

    /// Log the pending run with the given topic.
    ///
    /// On success the pending run is cleared. Validation and persistence
    /// failures keep it so the user can retry. An expired login drops it and
    /// is returned so the caller can send the user to sign in.
    pub async fn log_pending(
        &mut self,
        topic: &str,
        difficulty: Difficulty,
    ) -> std::result::Result<StudySession, StoreError> {
        let pending = self
            .pending
            .as_ref()
            .ok_or(ValidationError::NoPendingSession)?;
        let draft = StudySessionDraft {
            subject: Some(pending.run.subject),
            topic: topic.to_string(),
            duration_secs: pending.run.elapsed_secs,
            difficulty,
            date: pending.date,
        };

        match self.store.record(draft).await {
            Ok(stored) => {
                self.pending = None;
                Ok(stored)
            }
            Err(StoreError::AuthExpired) => {
                warn!("login expired; dropping unsaved timer run");
                self.pending = None;
                Err(StoreError::AuthExpired)
            }
            Err(err) => Err(err),
        }
    }

    /// Forget the pending run without logging it.
    pub fn discard_pending(&mut self) -> Option<PendingSession> {
        let dropped = self.pending.take();
        if let Some(p) = &dropped {
            debug!(run_id = %p.run.run_id, "pending run discarded");
        }
        dropped
    }

    /// Log a session that was not timed here.
    pub async fn log_manual(
        &mut self,
        draft: StudySessionDraft,
    ) -> std::result::Result<StudySession, StoreError> {
        self.store.record(draft).await
    }

    pub async fn delete_session(&mut self, id: SessionId) -> std::result::Result<(), StoreError> {
        self.store.delete(id).await
    }

    /// Reload the session log from the backend.
    pub async fn refresh(&mut self) -> std::result::Result<(), StoreError> {
        self.store.refresh().await
    }

    /// Recompute the streak against the current date.
    pub fn recompute(&mut self) {
        self.store.recompute();
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn apply(&mut self, event: Option<Event>) -> Option<Event> {
        match event {
            Some(event) => Some(self.publish(event)),
            None => {
                self.sync_ticker();
                None
            }
        }
    }

    fn publish(&mut self, event: Event) -> Event {
        self.sync_ticker();
        if let Event::SessionCompleted(run) = &event {
            if let Some(previous) = &self.pending {
                debug!(run_id = %previous.run.run_id, "unlogged run replaced by a newer one");
            }
            self.pending = Some(PendingSession {
                run: run.clone(),
                date: self.clock.today(),
            });
        }
        self.bus.publish(&event);
        event
    }

    fn sync_ticker(&mut self) {
        match (self.engine.is_ticking(), self.ticker.is_attached()) {
            (true, false) => self.ticker.attach(),
            (false, true) => self.ticker.detach(),
            _ => {}
        }
    }
}

impl<B: SessionBackend + GoalSettingsBackend, T: TickSource> StudyTracker<B, T> {
    /// Change the daily goal. The backend is updated first; the local goal
    /// only changes once it accepts.
    pub async fn set_daily_goal(&mut self, target_secs: u64) -> Result<()> {
        let goal = DailyGoal::new(target_secs)?;
        self.store
            .backend()
            .save_daily_goal(target_secs)
            .await
            .map_err(|err| StoreError::from_backend("save daily goal", err))?;
        info!(target_secs, "daily goal updated");
        self.goal = goal;
        Ok(())
    }

    /// Pull the daily goal and Pomodoro count from the backend. Keeps the
    /// current values when the server has none. Returns whether the goal
    /// changed.
    pub async fn load_remote_settings(&mut self) -> std::result::Result<bool, StoreError> {
        let backend = self.store.backend();
        let remote_goal = backend
            .load_daily_goal()
            .await
            .map_err(|err| StoreError::from_backend("load settings", err))?;
        let remote_count = backend
            .load_pomodoro_count()
            .await
            .map_err(|err| StoreError::from_backend("load settings", err))?;

        if let Some(count) = remote_count {
            debug!(count, "restoring pomodoro count from server");
            self.engine.restore_pomodoro_count(count);
            self.synced_pomodoro_count = count;
        }

        match remote_goal.map(DailyGoal::new) {
            Some(Ok(goal)) if goal != self.goal => {
                debug!(target_secs = goal.target_secs(), "using daily goal from server");
                self.goal = goal;
                Ok(true)
            }
            Some(Err(err)) => {
                warn!(error = %err, "ignoring invalid daily goal from server");
                Ok(false)
            }
            _ => Ok(false),
        }
    }

    /// Push the Pomodoro count to the backend if it moved since the last
    /// sync. Returns whether anything was sent.
    pub async fn save_pomodoro_count(&mut self) -> std::result::Result<bool, StoreError> {
        let count = self.engine.pomodoro_count();
        if count == self.synced_pomodoro_count {
            return Ok(false);
        }
        self.store
            .backend()
            .save_pomodoro_count(count)
            .await
            .map_err(|err| StoreError::from_backend("save pomodoro count", err))?;
        debug!(count, "pomodoro count saved");
        self.synced_pomodoro_count = count;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::error::{BackendError, CoreError};
    use crate::session::InMemoryBackend;
    use crate::stats::StreakTracker;
    use crate::timer::{ManualTicker, Presets};
    use std::sync::Mutex;

    type Tracker = StudyTracker<InMemoryBackend, ManualTicker>;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 4, d).unwrap()
    }

    fn tracker_with(backend: InMemoryBackend, clock: Arc<FixedClock>) -> Tracker {
        let store = SessionStore::new(backend, clock.clone(), StreakTracker::default());
        StudyTracker::new(
            TimerEngine::new(Presets::default(), Subject::General),
            ManualTicker::new(),
            store,
            DailyGoal::default(),
            clock,
        )
    }

    fn tracker() -> (Tracker, Arc<FixedClock>) {
        let clock = Arc::new(FixedClock::new(day(10)));
        (tracker_with(InMemoryBackend::new(), clock.clone()), clock)
    }

    fn run_ticks(tracker: &mut Tracker, n: u64) -> Vec<Event> {
        let mut events = Vec::new();
        for _ in 0..n {
            let Some(tick) = tracker.ticker().tick() else {
                break;
            };
            events.extend(tracker.handle_tick(tick));
        }
        events
    }

    fn complete_minutes(tracker: &mut Tracker, minutes: u64) {
        tracker.switch_mode(TimerMode::Custom, minutes).unwrap();
        tracker.start();
        run_ticks(tracker, minutes * 60);
        assert!(tracker.pending().is_some());
    }

    #[test]
    fn tick_source_follows_phase() {
        let (mut tracker, _) = tracker();
        assert!(!tracker.ticker().is_attached());

        tracker.start();
        assert!(tracker.ticker().is_attached());
        tracker.start();
        assert_eq!(tracker.ticker().attach_count(), 1);

        tracker.pause();
        assert!(!tracker.ticker().is_attached());
        tracker.resume();
        assert!(tracker.ticker().is_attached());
        assert_eq!(tracker.ticker().attach_count(), 2);

        tracker.reset();
        assert!(!tracker.ticker().is_attached());

        tracker.start_break(BreakKind::Short).unwrap();
        assert!(tracker.ticker().is_attached());
        run_ticks(&mut tracker, 5 * 60);
        assert_eq!(tracker.phase(), TimerPhase::BreakIdle);
        assert!(!tracker.ticker().is_attached());
    }

    #[test]
    fn stale_tick_after_pause_is_dropped() {
        let (mut tracker, _) = tracker();
        tracker.start();
        let stale = tracker.ticker().tick().unwrap();
        tracker.pause();
        tracker.resume();
        let before = tracker.engine().remaining_secs();
        assert!(tracker.handle_tick(stale).is_none());
        assert_eq!(tracker.engine().remaining_secs(), before);
    }

    #[test]
    fn completion_is_published_and_kept_pending() {
        let (mut tracker, _) = tracker();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let sub = tracker.on_session_completed(move |run| sink.lock().unwrap().push(run.elapsed_secs));

        complete_minutes(&mut tracker, 1);
        assert_eq!(*seen.lock().unwrap(), vec![60]);
        let pending = tracker.pending().unwrap();
        assert_eq!(pending.run.subject, Subject::General);
        assert_eq!(pending.date, day(10));

        assert!(tracker.unsubscribe(sub));
        complete_minutes(&mut tracker, 1);
        assert_eq!(seen.lock().unwrap().len(), 1);
    }

    #[test]
    fn reset_produces_no_pending_run() {
        let (mut tracker, _) = tracker();
        tracker.start();
        run_ticks(&mut tracker, 100);
        tracker.reset();
        assert!(tracker.pending().is_none());
    }

    #[tokio::test]
    async fn logging_pending_run_updates_goal_and_streak() {
        let (mut tracker, _) = tracker();
        tracker.select_subject(Some(Subject::Physics)).unwrap();
        tracker.start();
        run_ticks(&mut tracker, 30 * 60);

        let stored = tracker.log_pending("Rotational motion", Difficulty::Hard).await.unwrap();
        assert_eq!(stored.subject, Subject::Physics);
        assert_eq!(stored.duration_secs, 25 * 60);
        assert_eq!(stored.difficulty, Difficulty::Hard);
        assert!(tracker.pending().is_none());
        assert_eq!(tracker.streak().count, 1);
        assert_eq!(tracker.goal_progress().logged_secs, 1500);
        assert_eq!(tracker.by_subject_today()[&Subject::Physics], 1500);
    }

    #[tokio::test]
    async fn logging_keeps_completion_date() {
        let (mut tracker, clock) = tracker();
        complete_minutes(&mut tracker, 1);
        clock.advance_days(1);
        let stored = tracker.log_pending("Organic", Difficulty::Medium).await.unwrap();
        assert_eq!(stored.date, day(10));
    }

    #[tokio::test]
    async fn blank_topic_keeps_pending() {
        let (mut tracker, _) = tracker();
        complete_minutes(&mut tracker, 1);
        let err = tracker.log_pending("   ", Difficulty::Easy).await.unwrap_err();
        assert!(matches!(err, StoreError::Validation(ValidationError::MissingTopic)));
        assert!(tracker.pending().is_some());
        assert_eq!(tracker.store().backend().calls(), 0);
    }

    #[tokio::test]
    async fn persistence_failure_keeps_pending_for_retry() {
        let (mut tracker, _) = tracker();
        complete_minutes(&mut tracker, 1);
        tracker
            .store()
            .backend()
            .fail_with(BackendError::Transport("offline".into()));
        let err = tracker.log_pending("Optics", Difficulty::Medium).await.unwrap_err();
        assert!(matches!(err, StoreError::PersistenceFailed { .. }));
        assert!(tracker.pending().is_some());

        tracker.store().backend().recover();
        tracker.log_pending("Optics", Difficulty::Medium).await.unwrap();
        assert_eq!(tracker.sessions().len(), 1);
    }

    #[tokio::test]
    async fn auth_expiry_drops_pending() {
        let (mut tracker, _) = tracker();
        complete_minutes(&mut tracker, 1);
        tracker.store().backend().fail_with(BackendError::Unauthorized);
        let err = tracker.log_pending("Optics", Difficulty::Medium).await.unwrap_err();
        assert!(err.is_auth_expired());
        assert!(tracker.pending().is_none());
        assert!(tracker.sessions().is_empty());
    }

    #[tokio::test]
    async fn log_without_pending_run_is_rejected() {
        let (mut tracker, _) = tracker();
        let err = tracker.log_pending("Optics", Difficulty::Medium).await.unwrap_err();
        assert!(matches!(
            err,
            StoreError::Validation(ValidationError::NoPendingSession)
        ));
    }

    #[tokio::test]
    async fn streak_drops_when_only_session_of_today_is_deleted() {
        let (mut tracker, clock) = tracker();
        for d in 7..=10 {
            clock.set(day(d));
            complete_minutes(&mut tracker, 1);
            tracker.log_pending("Revision", Difficulty::Medium).await.unwrap();
        }
        assert_eq!(tracker.streak().count, 4);
        assert_eq!(tracker.longest_streak(), 4);

        let today_id = tracker
            .sessions()
            .iter()
            .find(|s| s.date == day(10))
            .map(|s| s.id)
            .unwrap();
        tracker.delete_session(today_id).await.unwrap();
        assert_eq!(tracker.streak().count, 3);
        assert_eq!(tracker.activity(4).len(), 4);
    }

    #[tokio::test]
    async fn daily_goal_changes_only_after_backend_accepts() {
        let (mut tracker, _) = tracker();
        assert!(matches!(
            tracker.set_daily_goal(0).await,
            Err(CoreError::Config(_))
        ));

        tracker.store().backend().fail_with(BackendError::Transport("offline".into()));
        assert!(tracker.set_daily_goal(3600).await.is_err());
        assert_eq!(tracker.goal().target_secs(), 21_600);

        tracker.store().backend().recover();
        tracker.set_daily_goal(3600).await.unwrap();
        assert_eq!(tracker.goal().target_secs(), 3600);
    }

    #[tokio::test]
    async fn remote_goal_replaces_local_default() {
        let clock = Arc::new(FixedClock::new(day(10)));
        let backend = InMemoryBackend::new();
        backend.save_daily_goal(7200).await.unwrap();
        let mut tracker = tracker_with(backend, clock);

        assert!(tracker.load_remote_settings().await.unwrap());
        assert_eq!(tracker.goal().target_secs(), 7200);
        assert!(!tracker.load_remote_settings().await.unwrap());
    }

    #[tokio::test]
    async fn missing_remote_goal_keeps_local() {
        let (mut tracker, _) = tracker();
        assert!(!tracker.load_remote_settings().await.unwrap());
        assert_eq!(tracker.goal().target_secs(), 21_600);
    }

    #[tokio::test]
    async fn pomodoro_count_survives_a_restart() {
        let clock = Arc::new(FixedClock::new(day(10)));
        let backend = InMemoryBackend::new();
        backend.save_pomodoro_count(3).await.unwrap();
        let mut tracker = tracker_with(backend, clock);

        tracker.load_remote_settings().await.unwrap();
        assert_eq!(tracker.engine().pomodoro_count(), 3);
        assert!(!tracker.save_pomodoro_count().await.unwrap());

        tracker.start();
        let mut completed = None;
        while let Some(tick) = tracker.ticker().tick() {
            completed = completed.or(tracker.handle_tick(tick));
        }
        match completed {
            Some(Event::SessionCompleted(run)) => {
                assert_eq!(run.suggested_break, Some(BreakKind::Long));
            }
            other => panic!("unexpected {other:?}"),
        }

        assert!(tracker.save_pomodoro_count().await.unwrap());
        assert_eq!(
            tracker.store().backend().load_pomodoro_count().await.unwrap(),
            Some(4)
        );
        assert!(!tracker.save_pomodoro_count().await.unwrap());
    }

    #[tokio::test]
    async fn failed_count_save_is_retried() {
        let (mut tracker, _) = tracker();
        tracker.start();
        while let Some(tick) = tracker.ticker().tick() {
            tracker.handle_tick(tick);
        }
        assert_eq!(tracker.engine().pomodoro_count(), 1);

        tracker.store().backend().fail_with(BackendError::Unauthorized);
        assert!(matches!(
            tracker.save_pomodoro_count().await,
            Err(StoreError::AuthExpired)
        ));

        tracker.store().backend().recover();
        assert!(tracker.save_pomodoro_count().await.unwrap());
    }

    #[test]
    fn from_config_applies_presets() {
        let mut config = Config::default();
        config.apply("timer.pomodoro_minutes", "30").unwrap();
        config.apply("timer.default_subject", "bio").unwrap();
        let clock: Arc<dyn Clock> = Arc::new(FixedClock::new(day(10)));
        let mut tracker =
            StudyTracker::from_config(&config, InMemoryBackend::new(), ManualTicker::new(), clock)
                .unwrap();
        assert_eq!(tracker.engine().initial_secs(), 30 * 60);
        match tracker.start() {
            Some(Event::TimerStarted { subject, .. }) => assert_eq!(subject, Subject::Biology),
            other => panic!("unexpected {other:?}"),
        }
    }
}
