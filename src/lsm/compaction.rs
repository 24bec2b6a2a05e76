use std::collections::BTreeMap;

use crate::types::SortKey;

use super::memtable::Entry;
use super::sstable::SSTable;

/// Merge SSTables (ordered oldest → newest) into a single SSTable.
///
/// Per key, walking from oldest to newest:
///   - a tombstone discards everything accumulated so far
///   - rows are appended in write order
///
/// Keys left with no rows are dropped, so the output holds no tombstones.
/// Nothing older than the output exists once it replaces its inputs.
pub fn merge(tables: &[SSTable], id: u64) -> SSTable {
    let mut merged: BTreeMap<SortKey, Entry> = BTreeMap::new();

    for table in tables {
        for (key, entry) in table.iter() {
            if entry.tombstone {
                merged.remove(key);
            }
            if !entry.rows.is_empty() {
                merged
                    .entry(key.clone())
                    .or_default()
                    .rows
                    .extend_from_slice(&entry.rows);
            }
        }
    }

    merged.retain(|_, e| !e.rows.is_empty());
    SSTable::new(id, merged)
}
