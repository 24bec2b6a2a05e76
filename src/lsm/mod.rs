pub mod compaction;
pub mod memtable;
pub mod sstable;

use std::collections::BTreeMap;

use parking_lot::RwLock;
use tracing::debug;

use crate::types::{Operator, RowId, SortKey};
use memtable::{Entry, MemTable};
use sstable::SSTable;

/// Counts describing the shape of an [`LsmIndex`] at one instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LsmStats {
    /// Distinct keys (tombstones included) in the active memtable.
    pub memtable_entries: usize,
    /// Number of immutable SSTables.
    pub sstables: usize,
    /// Keys summed over all SSTables.
    pub sstable_entries: usize,
}

/// Log-structured column index: a mutable memtable plus immutable SSTables.
///
/// Write path:
///   add/remove → memtable → (full?) freeze to SSTable → compact all SSTables
///
/// Read path (newest first):
///   memtable → SSTables[n-1] → ... → SSTables[0], stopping per key at the
///   first tombstone
///
/// Compaction runs synchronously after every flush, so at rest there is at
/// most one SSTable. All state sits behind one `RwLock`: a write holds it
/// across check-then-flush and flush-then-compact, so readers never see a
/// half-flushed memtable.
pub struct LsmIndex {
    state: RwLock<LsmState>,
}

struct LsmState {
    memtable: MemTable,
    sstables: Vec<SSTable>, // oldest → newest
    limit: usize,
    next_id: u64,
}

impl LsmIndex {
    /// Create an empty index whose memtable flushes at `memtable_limit` keys.
    ///
    /// # Panics
    /// Panics if memtable_limit is 0.
    pub fn new(memtable_limit: usize) -> Self {
        assert!(memtable_limit > 0, "memtable_limit must be > 0");
        LsmIndex {
            state: RwLock::new(LsmState {
                memtable: MemTable::new(memtable_limit),
                sstables: Vec::new(),
                limit: memtable_limit,
                next_id: 0,
            }),
        }
    }

    /// Append `row` to the postings of `key`.
    pub fn add(&self, key: &str, row: RowId) {
        let mut state = self.state.write();
        state.memtable.add(SortKey::new(key), row);
        state.maybe_flush();
    }

    /// Tombstone `key`: every row written under it so far disappears.
    pub fn remove(&self, key: &str) {
        let mut state = self.state.write();
        state.memtable.remove(SortKey::new(key));
        state.maybe_flush();
    }

    /// Remove a single row from under `key`, keeping the others.
    ///
    /// Tombstones the key and re-adds the surviving rows in one critical
    /// section. Returns whether the row was present.
    pub fn remove_row(&self, key: &str, row: RowId) -> bool {
        let key = SortKey::new(key);
        let mut state = self.state.write();

        let current = state.lookup(&key);
        if !current.contains(&row) {
            return false;
        }
        state.memtable.remove(key.clone());
        for r in current.into_iter().filter(|&r| r != row) {
            state.memtable.add(key.clone(), r);
        }
        state.maybe_flush();
        true
    }

    /// All rows currently under exactly `key`.
    pub fn get(&self, key: &str) -> Vec<RowId> {
        self.state.read().lookup(&SortKey::new(key))
    }

    /// All rows whose key satisfies `stored <op> key`, in key order.
    pub fn range(&self, op: Operator, key: &str) -> Vec<RowId> {
        let key = SortKey::new(key);
        let state = self.state.read();

        // Per key: chunks newest → oldest, and whether a tombstone closed it.
        let mut per_key: BTreeMap<&SortKey, (Vec<&[RowId]>, bool)> = BTreeMap::new();
        let sources = std::iter::once(state.memtable.scan(op, &key))
            .chain(state.sstables.iter().rev().map(|t| t.scan(op, &key)));

        for source in sources {
            for (k, entry) in source {
                let (chunks, closed) = per_key.entry(k).or_default();
                if *closed {
                    continue;
                }
                chunks.push(&entry.rows);
                *closed = entry.tombstone;
            }
        }

        per_key
            .into_values()
            .flat_map(|(chunks, _)| chunks.into_iter().rev().flatten().copied())
            .collect()
    }

    /// Freeze the memtable into a new SSTable and compact. No-op when empty.
    pub fn flush(&self) {
        self.state.write().flush();
    }

    /// Merge all SSTables into one.
    pub fn compact(&self) {
        self.state.write().compact();
    }

    pub fn stats(&self) -> LsmStats {
        let state = self.state.read();
        LsmStats {
            memtable_entries: state.memtable.len(),
            sstables: state.sstables.len(),
            sstable_entries: state.sstables.iter().map(SSTable::len).sum(),
        }
    }

    /// Memtable flush threshold.
    pub fn memtable_limit(&self) -> usize {
        self.state.read().limit
    }
}

impl LsmState {
    fn lookup(&self, key: &SortKey) -> Vec<RowId> {
        let mut chunks: Vec<&Entry> = Vec::new();
        let newest_first = std::iter::once(self.memtable.get(key))
            .chain(self.sstables.iter().rev().map(|t| t.get(key)))
            .flatten();

        for entry in newest_first {
            chunks.push(entry);
            if entry.tombstone {
                break;
            }
        }

        chunks
            .into_iter()
            .rev()
            .flat_map(|e| e.rows.iter().copied())
            .collect()
    }

    fn maybe_flush(&mut self) {
        if self.memtable.is_full() {
            self.flush();
        }
    }

    fn flush(&mut self) {
        if self.memtable.is_empty() {
            return;
        }
        let id = self.next_id;
        self.next_id += 1;

        let frozen = std::mem::replace(&mut self.memtable, MemTable::new(self.limit));
        let table = frozen.freeze(id);
        debug!(sstable = id, entries = table.len(), "flushed memtable");
        self.sstables.push(table);
        self.compact();
    }

    fn compact(&mut self) {
        match self.sstables.as_slice() {
            [] => return,
            [only] if !only.has_tombstones() => return,
            _ => {}
        }
        let id = self.next_id;
        self.next_id += 1;

        let inputs = self.sstables.len();
        let merged = compaction::merge(&self.sstables, id);
        debug!(sstable = id, inputs, entries = merged.len(), "compacted sstables");
        self.sstables = vec![merged];
    }
}
