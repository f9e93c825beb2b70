//! TOML-based application configuration.
//!
//! Stores:
//! - API endpoint and request timeout
//! - Mode and break lengths for the timer
//! - Daily goal fallback used until the server copy is loaded
//! - Streak rules
//!
//! Configuration is stored at `~/.config/neetfocus/config.toml`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use super::data_dir;
use crate::error::ConfigError;
use crate::session::Subject;
use crate::stats::{DailyGoal, StreakTracker, DEFAULT_DAILY_GOAL_SECS};
use crate::timer::Presets;

pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8000/api";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

/// Lengths in minutes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimerConfig {
    #[serde(default = "default_pomodoro")]
    pub pomodoro_minutes: u64,
    #[serde(default = "default_deep_work")]
    pub deep_work_minutes: u64,
    #[serde(default = "default_mock_test")]
    pub mock_test_minutes: u64,
    #[serde(default = "default_short_break")]
    pub short_break_minutes: u64,
    #[serde(default = "default_long_break")]
    pub long_break_minutes: u64,
    #[serde(default = "default_pomodoros_before_long_break")]
    pub pomodoros_before_long_break: u32,
    /// Subject picked when a run starts without one.
    #[serde(default = "default_subject")]
    pub default_subject: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GoalConfig {
    #[serde(default = "default_daily_goal_secs")]
    pub daily_goal_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreakConfig {
    #[serde(default = "default_window_days")]
    pub window_days: u32,
    /// A day counts once its total is above this.
    #[serde(default)]
    pub min_qualifying_secs: u64,
}

/// Application configuration.
///
/// Serialized to/from TOML at `~/.config/neetfocus/config.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub timer: TimerConfig,
    #[serde(default)]
    pub goal: GoalConfig,
    #[serde(default)]
    pub streak: StreakConfig,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.into()
}
fn default_timeout_secs() -> u64 {
    10
}
fn default_pomodoro() -> u64 {
    25
}
fn default_deep_work() -> u64 {
    50
}
fn default_mock_test() -> u64 {
    180
}
fn default_short_break() -> u64 {
    5
}
fn default_long_break() -> u64 {
    15
}
fn default_pomodoros_before_long_break() -> u32 {
    4
}
fn default_subject() -> String {
    "general".into()
}
fn default_daily_goal_secs() -> u64 {
    DEFAULT_DAILY_GOAL_SECS
}
fn default_window_days() -> u32 {
    365
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl Default for TimerConfig {
    fn default() -> Self {
        Self {
            pomodoro_minutes: default_pomodoro(),
            deep_work_minutes: default_deep_work(),
            mock_test_minutes: default_mock_test(),
            short_break_minutes: default_short_break(),
            long_break_minutes: default_long_break(),
            pomodoros_before_long_break: default_pomodoros_before_long_break(),
            default_subject: default_subject(),
        }
    }
}

impl Default for GoalConfig {
    fn default() -> Self {
        Self {
            daily_goal_secs: default_daily_goal_secs(),
        }
    }
}

impl Default for StreakConfig {
    fn default() -> Self {
        Self {
            window_days: default_window_days(),
            min_qualifying_secs: 0,
        }
    }
}

impl Config {
    fn get_json_value_by_path<'a>(
        root: &'a serde_json::Value,
        key: &str,
    ) -> Option<&'a serde_json::Value> {
        if key.is_empty() {
            return None;
        }

        let mut current = root;
        for part in key.split('.') {
            current = current.get(part)?;
        }
        Some(current)
    }

    fn set_json_value_by_path(
        root: &mut serde_json::Value,
        key: &str,
        value: &str,
    ) -> Result<(), ConfigError> {
        let unknown = || ConfigError::UnknownKey(key.to_string());
        let mut parts = key.split('.').peekable();
        if key.is_empty() {
            return Err(unknown());
        }

        let mut current = root;
        while let Some(part) = parts.next() {
            if parts.peek().is_some() {
                current = current.get_mut(part).ok_or_else(unknown)?;
                continue;
            }

            let obj = current.as_object_mut().ok_or_else(unknown)?;
            let new_value = match obj.get(part).ok_or_else(unknown)? {
                serde_json::Value::Bool(_) => value
                    .trim()
                    .parse::<bool>()
                    .map(serde_json::Value::Bool)
                    .map_err(|_| ConfigError::invalid(key, format!("'{value}' is not a boolean")))?,
                serde_json::Value::Number(_) => value
                    .trim()
                    .parse::<u64>()
                    .map(|n| serde_json::Value::Number(n.into()))
                    .map_err(|_| {
                        ConfigError::invalid(key, format!("'{value}' is not a whole number"))
                    })?,
                serde_json::Value::String(_) => serde_json::Value::String(value.trim().into()),
                _ => return Err(unknown()),
            };
            obj.insert(part.to_string(), new_value);
            return Ok(());
        }

        Err(unknown())
    }

    fn collect_entries(prefix: &str, value: &serde_json::Value, out: &mut Vec<(String, String)>) {
        match value {
            serde_json::Value::Object(map) => {
                for (k, v) in map {
                    let key = if prefix.is_empty() {
                        k.clone()
                    } else {
                        format!("{prefix}.{k}")
                    };
                    Self::collect_entries(&key, v, out);
                }
            }
            serde_json::Value::String(s) => out.push((prefix.to_string(), s.clone())),
            other => out.push((prefix.to_string(), other.to_string())),
        }
    }

    /// Default location, `<data_dir>/config.toml`.
    pub fn path() -> Result<PathBuf, ConfigError> {
        Ok(data_dir()?.join("config.toml"))
    }

    /// Load from the default location, writing defaults on first run.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::path()?)
    }

    /// Load from `path`, writing defaults there if the file does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed, if
    /// a value is out of range, or if the defaults cannot be written.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => {
                let cfg: Config = toml::from_str(&content)
                    .map_err(|e| ConfigError::ParseFailed(e.to_string()))?;
                cfg.validate()?;
                Ok(cfg)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let cfg = Self::default();
                cfg.save_to(path)?;
                Ok(cfg)
            }
            Err(e) => Err(ConfigError::LoadFailed {
                path: path.to_path_buf(),
                message: e.to_string(),
            }),
        }
    }

    /// Persist to the default location.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let save_failed = |message: String| ConfigError::SaveFailed {
            path: path.to_path_buf(),
            message,
        };
        let content = toml::to_string_pretty(self).map_err(|e| save_failed(e.to_string()))?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| save_failed(e.to_string()))?;
        }
        std::fs::write(path, content).map_err(|e| save_failed(e.to_string()))
    }

    /// Get a config value as string by dot-separated key.
    pub fn get(&self, key: &str) -> Option<String> {
        let json = serde_json::to_value(self).ok()?;
        match Self::get_json_value_by_path(&json, key)? {
            serde_json::Value::String(s) => Some(s.clone()),
            serde_json::Value::Object(_) => None,
            other => Some(other.to_string()),
        }
    }

    /// Every leaf setting as `(dot.path, value)`.
    pub fn entries(&self) -> Vec<(String, String)> {
        let mut out = Vec::new();
        if let Ok(json) = serde_json::to_value(self) {
            Self::collect_entries("", &json, &mut out);
        }
        out
    }

    /// Change a value in memory. The config is left untouched on error.
    pub fn apply(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let mut json =
            serde_json::to_value(&*self).map_err(|e| ConfigError::ParseFailed(e.to_string()))?;
        Self::set_json_value_by_path(&mut json, key, value)?;
        let updated: Config =
            serde_json::from_value(json).map_err(|e| ConfigError::invalid(key, e.to_string()))?;
        updated.validate()?;
        *self = updated;
        Ok(())
    }

    /// Change a value and save to the default location.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        self.apply(key, value)?;
        self.save()
    }

    /// Check ranges and formats of every value.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.api_url()?;
        if self.api.timeout_secs == 0 {
            return Err(ConfigError::invalid("api.timeout_secs", "must be positive"));
        }

        let minutes = [
            ("timer.pomodoro_minutes", self.timer.pomodoro_minutes),
            ("timer.deep_work_minutes", self.timer.deep_work_minutes),
            ("timer.mock_test_minutes", self.timer.mock_test_minutes),
            ("timer.short_break_minutes", self.timer.short_break_minutes),
            ("timer.long_break_minutes", self.timer.long_break_minutes),
        ];
        for (key, value) in minutes {
            if value == 0 {
                return Err(ConfigError::invalid(key, "must be at least 1 minute"));
            }
            if value.checked_mul(60).is_none() {
                return Err(ConfigError::invalid(key, "too large"));
            }
        }
        if self.timer.pomodoros_before_long_break == 0 {
            return Err(ConfigError::invalid(
                "timer.pomodoros_before_long_break",
                "must be positive",
            ));
        }
        self.default_subject()?;
        self.daily_goal()?;
        if self.streak.window_days == 0 {
            return Err(ConfigError::invalid("streak.window_days", "must be positive"));
        }
        Ok(())
    }

    pub fn api_url(&self) -> Result<Url, ConfigError> {
        Url::parse(&self.api.base_url).map_err(|e| ConfigError::invalid("api.base_url", e.to_string()))
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.api.timeout_secs)
    }

    pub fn default_subject(&self) -> Result<Subject, ConfigError> {
        self.timer
            .default_subject
            .parse()
            .map_err(|e: String| ConfigError::invalid("timer.default_subject", e))
    }

    pub fn daily_goal(&self) -> Result<DailyGoal, ConfigError> {
        DailyGoal::new(self.goal.daily_goal_secs)
    }

    pub fn presets(&self) -> Presets {
        Presets {
            pomodoro_minutes: self.timer.pomodoro_minutes,
            deep_work_minutes: self.timer.deep_work_minutes,
            mock_test_minutes: self.timer.mock_test_minutes,
            custom_minutes: self.timer.pomodoro_minutes,
            short_break_minutes: self.timer.short_break_minutes,
            long_break_minutes: self.timer.long_break_minutes,
            pomodoros_before_long_break: self.timer.pomodoros_before_long_break,
        }
    }

    pub fn streak_tracker(&self) -> StreakTracker {
        StreakTracker::new(self.streak.window_days, self.streak.min_qualifying_secs)
    }
}
