//! Replication Item Module
//!
//! Mutation records and the generation buffers that collect them.

use crate::cache::{KeyInfo, Record};

// == Replication Action ==
/// Kind of mutation carried by a [`ReplItem`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplAction {
    Insert,
}

// == Replication Item ==
/// One mutation as seen by the replication feed.
///
/// Holds its own copy of the record; nothing is shared with the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplItem {
    pub action: ReplAction,
    pub key: KeyInfo,
    pub value: Record,
}

impl ReplItem {
    /// Creates an insert item.
    pub fn insert(key: KeyInfo, value: Record) -> Self {
        Self {
            action: ReplAction::Insert,
            key,
            value,
        }
    }

    /// Id of the record this item carries.
    pub fn rec_id(&self) -> u64 {
        self.value.rec_id()
    }
}

// == Log Info ==
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LogInfo {
    /// Generation sequence number
    pub id: i64,
    /// Unix seconds of the rotation that last advanced this generation
    pub time: i64,
}

// == Replication Log Generation ==
/// A generation buffer: its info header plus the items it holds.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReplLog {
    pub info: LogInfo,
    pub data: Vec<ReplItem>,
}

impl ReplLog {
    pub(crate) fn with_id(id: i64) -> Self {
        Self {
            info: LogInfo { id, time: 0 },
            data: Vec::new(),
        }
    }
}
