//! Study session log: model, persistence backends and the store.

mod backend;
mod http;
mod model;
mod store;

pub use backend::{GoalSettingsBackend, InMemoryBackend, SessionBackend};
pub use http::HttpBackend;
pub use model::{Difficulty, NewSession, SessionId, StudySession, StudySessionDraft, Subject};
pub use store::SessionStore;
