//! One-second tick sources for [`super::TimerEngine`].
//!
//! At most one tick loop is alive per source. Every attach bumps the
//! generation, and each [`Tick`] carries the generation it was produced
//! under so a consumer can drop ticks that were already queued when the
//! loop was replaced.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant};
use tracing::trace;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tick {
    pub generation: u64,
}

pub trait TickSource: Send {
    /// Start delivering ticks, replacing any running loop.
    fn attach(&mut self);

    /// Stop delivering ticks. No-op when detached.
    fn detach(&mut self);

    fn is_attached(&self) -> bool;

    /// Generation of the current (or most recent) loop.
    fn generation(&self) -> u64;

    /// True if `tick` came from the loop that is attached right now.
    fn is_current(&self, tick: Tick) -> bool {
        self.is_attached() && tick.generation == self.generation()
    }
}

/// Tokio interval task feeding an unbounded channel.
///
/// `attach` must be called from within a Tokio runtime.
#[derive(Debug)]
pub struct TokioTicker {
    period: Duration,
    tx: mpsc::UnboundedSender<Tick>,
    handle: Option<JoinHandle<()>>,
    generation: u64,
}

impl TokioTicker {
    pub fn new(period: Duration) -> (Self, mpsc::UnboundedReceiver<Tick>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let ticker = Self {
            period,
            tx,
            handle: None,
            generation: 0,
        };
        (ticker, rx)
    }

    pub fn every_second() -> (Self, mpsc::UnboundedReceiver<Tick>) {
        Self::new(Duration::from_secs(1))
    }
}

impl TickSource for TokioTicker {
    fn attach(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
        self.generation += 1;

        let tick = Tick {
            generation: self.generation,
        };
        let tx = self.tx.clone();
        let period = self.period;
        self.handle = Some(tokio::spawn(async move {
            // First tick one full period after attaching.
            let mut interval = time::interval_at(Instant::now() + period, period);
            loop {
                interval.tick().await;
                if tx.send(tick).is_err() {
                    break;
                }
            }
        }));
        trace!(generation = self.generation, "tick loop attached");
    }

    fn detach(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
            trace!(generation = self.generation, "tick loop detached");
        }
    }

    fn is_attached(&self) -> bool {
        self.handle.is_some()
    }

    fn generation(&self) -> u64 {
        self.generation
    }
}

impl Drop for TokioTicker {
    fn drop(&mut self) {
        self.detach();
    }
}

/// Tick source driven by hand, for tests and replays.
#[derive(Debug, Default)]
pub struct ManualTicker {
    attached: bool,
    generation: u64,
    attach_count: usize,
}

impl ManualTicker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Produce one tick, or `None` while detached.
    pub fn tick(&self) -> Option<Tick> {
        self.attached.then_some(Tick {
            generation: self.generation,
        })
    }

    /// How many times a loop was attached.
    pub fn attach_count(&self) -> usize {
        self.attach_count
    }
}

impl TickSource for ManualTicker {
    fn attach(&mut self) {
        self.generation += 1;
        self.attach_count += 1;
        self.attached = true;
    }

    fn detach(&mut self) {
        self.attached = false;
    }

    fn is_attached(&self) -> bool {
        self.attached
    }

    fn generation(&self) -> u64 {
        self.generation
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn tokio_ticker_delivers_after_one_period() {
        let (mut ticker, mut rx) = TokioTicker::every_second();
        ticker.attach();
        tokio::task::yield_now().await;
        assert!(rx.try_recv().is_err());

        time::advance(Duration::from_secs(1)).await;
        let tick = rx.recv().await.unwrap();
        assert_eq!(tick.generation, 1);
        assert!(ticker.is_current(tick));
    }

    #[tokio::test(start_paused = true)]
    async fn reattach_replaces_previous_loop() {
        let (mut ticker, mut rx) = TokioTicker::every_second();
        ticker.attach();
        ticker.attach();
        assert_eq!(ticker.generation(), 2);

        time::advance(Duration::from_secs(1)).await;
        let first = rx.recv().await.unwrap();
        assert_eq!(first.generation, 2);

        ticker.detach();
        while let Ok(tick) = rx.try_recv() {
            assert_eq!(tick.generation, 2);
        }
        assert!(!ticker.is_attached());
    }

    #[test]
    fn stale_manual_tick_is_not_current() {
        let mut ticker = ManualTicker::new();
        assert!(ticker.tick().is_none());
        ticker.attach();
        let old = ticker.tick().unwrap();
        ticker.attach();
        assert!(!ticker.is_current(old));
        assert!(ticker.is_current(ticker.tick().unwrap()));
        ticker.detach();
        assert!(!ticker.is_current(old));
        assert_eq!(ticker.attach_count(), 2);
    }
}
