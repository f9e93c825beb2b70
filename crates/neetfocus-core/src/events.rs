use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::session::Subject;
use crate::timer::{BreakKind, TimerMode, TimerPhase};

/// Every timer state change produces an Event.
/// Front ends render them; subscribers react to them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    TimerStarted {
        run_id: Uuid,
        mode: TimerMode,
        subject: Subject,
        /// The configured default subject was picked because none was selected.
        auto_selected_subject: bool,
        duration_secs: u64,
        at: DateTime<Utc>,
    },
    TimerPaused {
        remaining_secs: u64,
        on_break: bool,
        at: DateTime<Utc>,
    },
    TimerResumed {
        remaining_secs: u64,
        on_break: bool,
        at: DateTime<Utc>,
    },
    TimerReset {
        at: DateTime<Utc>,
    },
    /// A focus run ended, naturally or by finishing early.
    SessionCompleted(CompletedRun),
    BreakStarted {
        kind: BreakKind,
        duration_secs: u64,
        at: DateTime<Utc>,
    },
    /// Break countdown reached zero; waiting to be dismissed.
    BreakCompleted {
        kind: BreakKind,
        at: DateTime<Utc>,
    },
    BreakEnded {
        kind: BreakKind,
        skipped: bool,
        at: DateTime<Utc>,
    },
    ModeSwitched {
        mode: TimerMode,
        duration_secs: u64,
        at: DateTime<Utc>,
    },
    SubjectSelected {
        subject: Option<Subject>,
        at: DateTime<Utc>,
    },
    StateSnapshot {
        phase: TimerPhase,
        mode: TimerMode,
        subject: Option<Subject>,
        remaining_secs: u64,
        total_secs: u64,
        pomodoro_count: u32,
        suggested_break: Option<BreakKind>,
        at: DateTime<Utc>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompletionReason {
    Expired,
    FinishedEarly,
}

/// Payload of [`Event::SessionCompleted`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletedRun {
    pub run_id: Uuid,
    pub mode: TimerMode,
    pub subject: Subject,
    pub elapsed_secs: u64,
    pub reason: CompletionReason,
    /// Set after a natural Pomodoro expiry.
    pub suggested_break: Option<BreakKind>,
    pub at: DateTime<Utc>,
}

/// Handle returned by [`EventBus::subscribe`]. Pass it back to unsubscribe.
#[must_use = "dropping a Subscription leaves the handler registered"]
#[derive(Debug, PartialEq, Eq)]
pub struct Subscription(u64);

type Handler = Box<dyn FnMut(&Event) + Send>;

/// Ordered list of event handlers.
#[derive(Default)]
pub struct EventBus {
    next_id: u64,
    handlers: Vec<(u64, Handler)>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe<F>(&mut self, handler: F) -> Subscription
    where
        F: FnMut(&Event) + Send + 'static,
    {
        self.next_id += 1;
        self.handlers.push((self.next_id, Box::new(handler)));
        Subscription(self.next_id)
    }

    /// Subscribe to completed focus runs only.
    pub fn on_session_completed<F>(&mut self, mut handler: F) -> Subscription
    where
        F: FnMut(&CompletedRun) + Send + 'static,
    {
        self.subscribe(move |event| {
            if let Event::SessionCompleted(run) = event {
                handler(run);
            }
        })
    }

    /// Returns false if the subscription was already removed.
    pub fn unsubscribe(&mut self, subscription: Subscription) -> bool {
        let before = self.handlers.len();
        self.handlers.retain(|(id, _)| *id != subscription.0);
        self.handlers.len() != before
    }

    pub fn publish(&mut self, event: &Event) {
        for (_, handler) in self.handlers.iter_mut() {
            handler(event);
        }
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("handlers", &self.handlers.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    fn completed() -> Event {
        Event::SessionCompleted(CompletedRun {
            run_id: Uuid::new_v4(),
            mode: TimerMode::Pomodoro,
            subject: Subject::Physics,
            elapsed_secs: 1500,
            reason: CompletionReason::Expired,
            suggested_break: Some(BreakKind::Short),
            at: Utc::now(),
        })
    }

    #[test]
    fn completion_handlers_only_see_completions() {
        let mut bus = EventBus::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let _sub = bus.on_session_completed(move |run| sink.lock().unwrap().push(run.elapsed_secs));

        bus.publish(&Event::TimerReset { at: Utc::now() });
        bus.publish(&completed());
        assert_eq!(*seen.lock().unwrap(), vec![1500]);
    }

    #[test]
    fn unsubscribe_stops_delivery() {
        let mut bus = EventBus::new();
        let count = Arc::new(Mutex::new(0));
        let c = count.clone();
        let sub = bus.subscribe(move |_| *c.lock().unwrap() += 1);
        bus.publish(&completed());
        assert!(bus.unsubscribe(sub));
        bus.publish(&completed());
        assert_eq!(*count.lock().unwrap(), 1);
        assert!(bus.is_empty());
    }

    #[test]
    fn completed_event_serializes_with_type_tag() {
        let json = serde_json::to_value(completed()).unwrap();
        assert_eq!(json["type"], "SessionCompleted");
        assert_eq!(json["reason"], "expired");
        assert_eq!(json["suggested_break"], "short");
    }
}
