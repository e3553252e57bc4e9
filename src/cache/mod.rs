//! Cache Module
//!
//! Provides the expiring key/value store and the record types it holds.

mod record;
mod store;


// Re-export public types
pub use record::{current_unix_secs, KeyInfo, Record, RecordIdAllocator};
pub use store::ExpiringStore;
