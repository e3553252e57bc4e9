//! Cacheman - An in-memory TTL cache server
//!
//! Couples an expiring key/value store with a tick-based expiration scheduler
//! and a three-generation replication log.

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod models;
pub mod replication;
pub mod scheduler;
pub mod tasks;

pub use api::AppState;
pub use config::Config;
pub use tasks::{spawn_background_tasks, BackgroundTasks};
