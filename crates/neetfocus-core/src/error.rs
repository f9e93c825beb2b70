//! Core error types for neetfocus-core.
//!
//! Every failure in this crate is local-recoverable: validation problems are
//! surfaced inline, persistence problems keep the timer context intact, and
//! an expired login is reported so the caller can send the user back to
//! authentication.

use std::path::PathBuf;
use thiserror::Error;

use crate::timer::TimerPhase;

/// Core error type for neetfocus-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Session store errors (validation, persistence, auth)
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Timer command rejected
    #[error("Timer error: {0}")]
    Timer(#[from] TimerError),

    /// Credential storage errors
    #[error("Credential error: {0}")]
    Credential(#[from] CredentialError),
}

/// Rejections raised before a session draft reaches the backend.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("a topic is required to log a session")]
    MissingTopic,

    #[error("a subject is required to log a session")]
    MissingSubject,

    #[error("cannot log a session with zero duration")]
    ZeroDuration,

    #[error("there is no finished timer run to log")]
    NoPendingSession,
}

/// Errors returned by [`crate::session::SessionStore`].
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Network or server failure. Nothing was changed locally.
    #[error("Failed to {operation}: {message}")]
    PersistenceFailed {
        operation: &'static str,
        message: String,
    },

    /// The backend answered 401; the caller should re-authenticate.
    #[error("Login expired, please sign in again")]
    AuthExpired,
}

impl StoreError {
    pub(crate) fn from_backend(operation: &'static str, err: BackendError) -> Self {
        match err {
            BackendError::Unauthorized => StoreError::AuthExpired,
            other => StoreError::PersistenceFailed {
                operation,
                message: other.to_string(),
            },
        }
    }

    pub fn is_auth_expired(&self) -> bool {
        matches!(self, StoreError::AuthExpired)
    }
}

/// Raw failures from a remote backend.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    #[error("unauthorized")]
    Unauthorized,

    #[error("not found")]
    NotFound,

    #[error("server returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("transport error: {0}")]
    Transport(String),

    #[error("malformed response: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for BackendError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            BackendError::Decode(err.to_string())
        } else {
            BackendError::Transport(err.to_string())
        }
    }
}

impl From<serde_json::Error> for BackendError {
    fn from(err: serde_json::Error) -> Self {
        BackendError::Decode(err.to_string())
    }
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// Unknown dot-path key
    #[error("unknown config key: {0}")]
    UnknownKey(String),

    /// Failed to parse configuration
    #[error("Failed to parse configuration: {0}")]
    ParseFailed(String),
}

impl ConfigError {
    pub(crate) fn invalid(key: &str, message: impl Into<String>) -> Self {
        ConfigError::InvalidValue {
            key: key.to_string(),
            message: message.into(),
        }
    }
}

/// Timer commands that were refused. State is unchanged when these are returned.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TimerError {
    #[error("timer must be idle for this action (currently {phase:?})")]
    NotIdle { phase: TimerPhase },

    #[error("not available during a break")]
    OnBreak,

    #[error("invalid duration '{input}': expected a positive number of minutes")]
    InvalidDuration { input: String },
}

/// Keyring failures.
#[derive(Error, Debug)]
pub enum CredentialError {
    #[error("keyring error: {0}")]
    Keyring(#[from] keyring::Error),
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
