//! Shared setup for CLI commands.

use std::error::Error;
use std::sync::Arc;

use neetfocus_core::storage::credentials;
use neetfocus_core::{
    Clock, Config, HttpBackend, LocalClock, ManualTicker, StudyTracker, TickSource,
};
use tokio::runtime::Runtime;
use tracing::warn;

pub type CliResult<T = ()> = Result<T, Box<dyn Error>>;

pub fn runtime() -> CliResult<Runtime> {
    Ok(Runtime::new()?)
}

/// HTTP backend for the configured API, authenticated if a token is stored.
pub fn backend(config: &Config) -> CliResult<HttpBackend> {
    let token = match credentials::load_token() {
        Ok(token) => token.map(|(token, _)| token),
        Err(e) => {
            warn!(error = %e, "keyring unavailable, continuing without a token");
            None
        }
    };
    Ok(HttpBackend::new(config.api_url()?, token, config.timeout())?)
}

pub fn tracker_with<T: TickSource>(
    config: &Config,
    ticker: T,
) -> CliResult<StudyTracker<HttpBackend, T>> {
    let clock: Arc<dyn Clock> = Arc::new(LocalClock);
    Ok(StudyTracker::from_config(config, backend(config)?, ticker, clock)?)
}

/// Tracker for one-shot commands, with the session log already fetched.
pub fn loaded_tracker(
    rt: &Runtime,
    config: &Config,
) -> CliResult<StudyTracker<HttpBackend, ManualTicker>> {
    let mut tracker = tracker_with(config, ManualTicker::new())?;
    rt.block_on(tracker.refresh())?;
    Ok(tracker)
}

/// `2h 05m`, `25m` or `40s`.
pub fn format_duration(secs: u64) -> String {
    let h = secs / 3600;
    let m = (secs % 3600) / 60;
    match (h, m) {
        (0, 0) => format!("{secs}s"),
        (0, m) => format!("{m}m"),
        (h, m) => format!("{h}h {m:02}m"),
    }
}

/// Ten-cell progress bar for a 0..=100 percentage.
pub fn progress_bar(percent: u8) -> String {
    let filled = usize::from(percent.min(100)) / 10;
    format!("[{}{}]", "#".repeat(filled), "-".repeat(10 - filled))
}
