//! Scheduler Module
//!
//! Tick-based expiration scheduling feeding the store's eviction path.

mod expirer;
mod heap;

pub use expirer::{round_to_next_tick, ExpirationScheduler, ExpiredKey, ExpiredKeys};
pub use heap::{ScheduleHeap, ScheduledKey};
