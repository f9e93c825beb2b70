pub mod auth;
pub mod config;
pub mod goal;
pub mod log;
pub mod sessions;
pub mod stats;
pub mod timer;
