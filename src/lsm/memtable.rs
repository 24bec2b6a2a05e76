use std::cmp::Ordering;
use std::collections::BTreeMap;

use crate::types::{Operator, RowId, SortKey};

use super::sstable::SSTable;

/// Postings for one key inside a memtable or SSTable.
///
/// `tombstone` means "everything older than this entry for this key is
/// gone". `rows` are the row ids written after that point. A plain delete
/// is a tombstone with no rows; a delete followed by adds keeps the
/// tombstone so rows in older SSTables stay hidden.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Entry {
    pub tombstone: bool,
    pub rows: Vec<RowId>,
}

impl Entry {
    pub fn tombstone() -> Self {
        Entry {
            tombstone: true,
            rows: Vec::new(),
        }
    }
}

/// In-memory sorted write buffer.
///
/// Every write goes here first. Once the number of distinct keys reaches
/// the limit, the memtable is frozen into an [`SSTable`] and replaced by an
/// empty one.
#[derive(Debug)]
pub struct MemTable {
    data: BTreeMap<SortKey, Entry>,
    limit: usize,
}

impl MemTable {
    /// Create a new empty memtable that is full at `limit` distinct keys.
    pub fn new(limit: usize) -> Self {
        MemTable {
            data: BTreeMap::new(),
            limit,
        }
    }

    /// Append a row to the key's postings.
    pub fn add(&mut self, key: SortKey, row: RowId) {
        self.data.entry(key).or_default().rows.push(row);
    }

    /// Write a tombstone. Rows buffered earlier for this key are older than
    /// the tombstone, so they go too.
    pub fn remove(&mut self, key: SortKey) {
        self.data.insert(key, Entry::tombstone());
    }

    pub fn get(&self, key: &SortKey) -> Option<&Entry> {
        self.data.get(key)
    }

    /// Entries whose key satisfies `stored <op> key`, in key order.
    pub fn scan<'a>(
        &'a self,
        op: Operator,
        key: &SortKey,
    ) -> Box<dyn Iterator<Item = (&'a SortKey, &'a Entry)> + 'a> {
        scan(&self.data, op, key)
    }

    /// Number of distinct keys (tombstones included).
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Check if memtable has reached the flush threshold.
    pub fn is_full(&self) -> bool {
        self.data.len() >= self.limit
    }

    /// Turn the buffered entries into an immutable SSTable.
    pub fn freeze(self, id: u64) -> SSTable {
        SSTable::new(id, self.data)
    }
}

/// Ordered sub-map selection shared by memtables and SSTables.
///
/// `>`/`>=` take the tail of the map, `<`/`<=` the head, `=` a single key;
/// `!=` walks everything and skips the key itself. Range boundaries compare
/// numbers by value, so the run of keys equal to `key` ("25", "025",
/// "25.0") lands on one side of the bound as a whole.
pub(crate) fn scan<'a>(
    data: &'a BTreeMap<SortKey, Entry>,
    op: Operator,
    key: &SortKey,
) -> Box<dyn Iterator<Item = (&'a SortKey, &'a Entry)> + 'a> {
    let bound = key.clone();
    match op {
        Operator::Eq => Box::new(data.get_key_value(key).into_iter()),
        Operator::Ne => Box::new(data.iter().filter(move |(k, _)| **k != bound)),
        Operator::Lt | Operator::Le => Box::new(
            data.iter()
                .take_while(move |(k, _)| op.accepts(k.cmp_value(&bound))),
        ),
        Operator::Gt | Operator::Ge => {
            // Start at the first stored key of the run equal to `key`.
            let start = data
                .range::<SortKey, _>(..key)
                .rev()
                .take_while(|(k, _)| k.cmp_value(key) == Ordering::Equal)
                .last()
                .map_or(key, |(k, _)| k);
            Box::new(
                data.range::<SortKey, _>(start..)
                    .skip_while(move |(k, _)| !op.accepts(k.cmp_value(&bound))),
            )
        }
    }
}
