//! Replication Module
//!
//! Change-log feed of cache mutations, buffered in rotating generations.

mod changelog;
mod item;

pub use changelog::{GenerationIds, ReplicationLog, DEFAULT_ADD_BACKOFF};
pub use item::{LogInfo, ReplAction, ReplItem, ReplLog};
