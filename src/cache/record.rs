//! Record Module
//!
//! Defines stored records, key descriptors and the record id allocator.

use std::sync::atomic::{AtomicU64, Ordering};

// == Key Info ==
/// A key together with the actual expiration instant of its record.
///
/// Used on the write path: store insert, scheduler add and replication items.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyInfo {
    /// Logical cache key
    pub key: String,
    /// Expiration instant (Unix seconds)
    pub expires: i64,
}

impl KeyInfo {
    /// Creates a new KeyInfo.
    pub fn new(key: impl Into<String>, expires: i64) -> Self {
        Self {
            key: key.into(),
            expires,
        }
    }
}

// == Record ==
/// A stored value with its absolute expiration instant.
///
/// Records can only be created through a [`RecordIdAllocator`], which stamps
/// each one with a unique, strictly increasing id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    /// The stored payload
    pub value: Vec<u8>,
    /// Expiration instant (Unix seconds)
    pub expires: i64,
    rec_id: u64,
}

impl Record {
    /// Returns the id assigned to this record at creation.
    pub fn rec_id(&self) -> u64 {
        self.rec_id
    }

    // == Is Expired ==
    /// Checks whether the record is expired at `now`.
    ///
    /// Boundary condition: a record expiring exactly at `now` counts as expired.
    pub fn is_expired_at(&self, now: i64) -> bool {
        self.expires <= now
    }
}

// == Record Id Allocator ==
/// Process-wide monotonic counter that stamps every new [`Record`].
///
/// Built once at startup and shared by reference; the counter is only touched
/// through atomic operations.
#[derive(Debug, Default)]
pub struct RecordIdAllocator {
    current: AtomicU64,
}

impl RecordIdAllocator {
    // == Constructor ==
    /// Creates a fresh allocator. The first allocated id is 1.
    pub fn new() -> Self {
        Self::default()
    }

    // == Next Id ==
    /// Allocates the next id.
    pub fn next_id(&self) -> u64 {
        self.current.fetch_add(1, Ordering::SeqCst) + 1
    }

    // == Latest ==
    /// Returns the most recently allocated id, or 0 if none was allocated yet.
    pub fn latest(&self) -> u64 {
        self.current.load(Ordering::SeqCst)
    }

    // == New Record ==
    /// Creates a record stamped with a freshly allocated id.
    pub fn new_record(&self, expires: i64, value: impl Into<Vec<u8>>) -> Record {
        Record {
            value: value.into(),
            expires,
            rec_id: self.next_id(),
        }
    }
}

// == Utility Functions ==
/// Returns current Unix timestamp in seconds.
pub fn current_unix_secs() -> i64 {
    chrono::Utc::now().timestamp()
}
