use std::collections::BTreeMap;

use crate::types::{Operator, SortKey};

use super::memtable::{Entry, scan};

/// Immutable sorted snapshot of a flushed memtable.
///
/// Once built it is only read, then replaced wholesale by compaction.
#[derive(Debug, Clone)]
pub struct SSTable {
    id: u64,
    entries: BTreeMap<SortKey, Entry>,
}

impl SSTable {
    pub fn new(id: u64, entries: BTreeMap<SortKey, Entry>) -> Self {
        SSTable { id, entries }
    }

    /// Monotonic identifier; higher means newer.
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn get(&self, key: &SortKey) -> Option<&Entry> {
        self.entries.get(key)
    }

    pub fn scan<'a>(
        &'a self,
        op: Operator,
        key: &SortKey,
    ) -> Box<dyn Iterator<Item = (&'a SortKey, &'a Entry)> + 'a> {
        scan(&self.entries, op, key)
    }

    /// All entries in key order (tombstones included).
    pub fn iter(&self) -> impl Iterator<Item = (&SortKey, &Entry)> {
        self.entries.iter()
    }

    /// Number of keys (tombstones included).
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn has_tombstones(&self) -> bool {
        self.entries.values().any(|e| e.tombstone)
    }
}
