mod config;
pub mod credentials;

pub use config::{ApiConfig, Config, GoalConfig, StreakConfig, TimerConfig, DEFAULT_BASE_URL};

use std::path::PathBuf;

use crate::error::ConfigError;

/// Environment variable that replaces the whole data directory.
pub const CONFIG_DIR_ENV: &str = "NEETFOCUS_CONFIG_DIR";

/// Returns `~/.config/neetfocus[-dev]/` based on NEETFOCUS_ENV.
///
/// Set NEETFOCUS_ENV=dev to use the development data directory, or
/// NEETFOCUS_CONFIG_DIR to point somewhere else entirely.
///
/// # Errors
/// Returns an error if creating the directory fails.
pub fn data_dir() -> Result<PathBuf, ConfigError> {
    let dir = match std::env::var_os(CONFIG_DIR_ENV) {
        Some(dir) if !dir.is_empty() => PathBuf::from(dir),
        _ => {
            let base_dir = dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".config");
            let env = std::env::var("NEETFOCUS_ENV").unwrap_or_else(|_| "production".to_string());
            if env == "dev" {
                base_dir.join("neetfocus-dev")
            } else {
                base_dir.join("neetfocus")
            }
        }
    };

    std::fs::create_dir_all(&dir).map_err(|e| ConfigError::LoadFailed {
        path: dir.clone(),
        message: e.to_string(),
    })?;
    Ok(dir)
}
