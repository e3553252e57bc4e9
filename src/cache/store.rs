//! Expiring Store Module
//!
//! Concurrent key/value map with read-time expiration checks and
//! threshold-guarded deletes.

use std::collections::HashMap;

use tokio::sync::RwLock;
use tracing::trace;

use crate::cache::Record;

// == Expiring Store ==
/// Concurrent map from key to [`Record`].
///
/// A single reader/writer lock guards the map. Lookups share it, inserts and
/// deletes take it exclusively. No other lock is ever taken while it is held.
#[derive(Debug, Default)]
pub struct ExpiringStore {
    entries: RwLock<HashMap<String, Record>>,
}

impl ExpiringStore {
    // == Constructor ==
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    // == Insert ==
    /// Stores `record` under `key`, overwriting any existing entry.
    pub async fn insert(&self, key: String, record: Record) {
        let mut entries = self.entries.write().await;
        entries.insert(key, record);
    }

    // == Lookup ==
    /// Returns the record for `key` if it is still valid at `now`.
    ///
    /// A record whose expiry is less than or equal to `now` is reported as
    /// missing even though it may still sit in the map waiting for eviction.
    pub async fn lookup(&self, key: &str, now: i64) -> Option<Record> {
        let entries = self.entries.read().await;
        entries
            .get(key)
            .filter(|record| !record.is_expired_at(now))
            .cloned()
    }

    // == Delete ==
    /// Removes the entry for `key` if its expiry is at or before `threshold`.
    ///
    /// An entry overwritten with a later expiry after the delete was
    /// scheduled survives. Returns the removed record, if any.
    pub async fn delete(&self, key: &str, threshold: i64) -> Option<Record> {
        let mut entries = self.entries.write().await;
        match entries.get(key) {
            Some(record) if record.expires <= threshold => entries.remove(key),
            Some(record) => {
                trace!(
                    key,
                    expires = record.expires,
                    threshold,
                    "delete skipped, entry was overwritten"
                );
                None
            }
            None => None,
        }
    }

    // == Length ==
    /// Returns the number of entries, including expired ones not yet evicted.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    // == Is Empty ==
    /// Returns true if the store holds no entries.
    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}
