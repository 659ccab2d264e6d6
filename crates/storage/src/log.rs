//! Per-group log storage.
//!
//! Entries live under `compose_key(group, LogEntries, index)` so a prefix
//! scan walks them in index order. Replication reads the log backwards: a
//! leader computing what a follower is missing starts from its newest entry
//! and walks down to the follower's `next_index`.

use crate::keys::{self, Table};
use crate::kv::{KvStore, StorageError};
use conclave_types::{GroupId, LogEntry};
use sbor::prelude::{basic_decode, basic_encode};
use std::sync::Arc;
use tracing::warn;

/// Log store for all groups hosted by a node.
#[derive(Clone)]
pub struct GroupLog {
    kv: Arc<dyn KvStore>,
}

impl GroupLog {
    /// Create a log store over `kv`.
    pub fn new(kv: Arc<dyn KvStore>) -> Self {
        Self { kv }
    }

    /// Append an entry at its own index. The caller owns index assignment;
    /// appending over an existing index overwrites it (leader-directed
    /// conflict resolution).
    pub fn append(&self, group: GroupId, entry: &LogEntry) -> Result<(), StorageError> {
        let key = keys::compose_key(group, Table::LogEntries, entry.index);
        let value = basic_encode(entry)
            .map_err(|e| StorageError::Database(format!("encode log entry: {e:?}")))?;
        self.kv.put(&key, &value)
    }

    /// Point read of one entry.
    pub fn entry(&self, group: GroupId, index: u64) -> Result<Option<LogEntry>, StorageError> {
        let key = keys::compose_key(group, Table::LogEntries, index);
        let Some(value) = self.kv.get(&key)? else {
            return Ok(None);
        };
        Ok(decode_entry(&key, &value))
    }

    /// The newest entry, or `None` for an empty log.
    pub fn last_entry(&self, group: GroupId) -> Result<Option<LogEntry>, StorageError> {
        Ok(self.reverse_iter(group)?.next())
    }

    /// Index of the newest entry, 0 for an empty log.
    pub fn last_index(&self, group: GroupId) -> Result<u64, StorageError> {
        Ok(self.last_entry(group)?.map(|e| e.index).unwrap_or(0))
    }

    /// Iterate the group's entries in strictly descending index order.
    pub fn reverse_iter(&self, group: GroupId) -> Result<ReverseLogIterator, StorageError> {
        let prefix = keys::compose_key_prefix(group, Table::LogEntries);
        let items = self.kv.scan_prefix_rev(&prefix)?;
        Ok(ReverseLogIterator {
            items: items.into_iter(),
        })
    }
}

/// Yields a group's log entries newest-first. Entries that fail to decode
/// are skipped with a warning; the log layer keeps indices dense, so a
/// corrupt row is a storage fault, not a protocol state.
pub struct ReverseLogIterator {
    items: std::vec::IntoIter<(Vec<u8>, Vec<u8>)>,
}

impl Iterator for ReverseLogIterator {
    type Item = LogEntry;

    fn next(&mut self) -> Option<LogEntry> {
        for (key, value) in self.items.by_ref() {
            if let Some(entry) = decode_entry(&key, &value) {
                return Some(entry);
            }
        }
        None
    }
}

fn decode_entry(key: &[u8], value: &[u8]) -> Option<LogEntry> {
    match basic_decode::<LogEntry>(value) {
        Ok(entry) => Some(entry),
        Err(e) => {
            warn!(key = ?key, error = ?e, "undecodable log entry, skipping");
            None
        }
    }
}
