use std::collections::HashSet;

use tracing::{debug, info};

use crate::bloom::BloomFilter;
use crate::config::EngineConfig;
use crate::error::{Error, Result};
use crate::index::{ColumnIndex, new_index};
use crate::types::RowId;

/// One record: positional values in table column order plus a logical
/// delete flag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    values: Vec<String>,
    deleted: bool,
}

impl Row {
    /// Value of the column at `position`.
    pub fn get(&self, position: usize) -> Option<&str> {
        self.values.get(position).map(String::as_str)
    }

    pub fn values(&self) -> &[String] {
        &self.values
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted
    }
}

/// Row storage plus one optional index and one bloom filter per column.
///
/// Rows live in an append-only arena addressed by [`RowId`]. A delete only
/// flips the row's flag; indexes keep pointing at it until [`Table::vacuum`]
/// strips their postings and frees the slot (`None`). Row ids are never
/// reused, so a stale posting can only ever resolve to its own row.
pub struct Table {
    name: String,
    columns: Vec<String>,
    rows: Vec<Option<Row>>,
    indexes: Vec<Option<Box<dyn ColumnIndex>>>,
    filters: Vec<BloomFilter>,
    live: usize,
    pending_reclaim: usize,
}

impl Table {
    /// Create a table with every column indexed.
    pub fn new(name: impl Into<String>, columns: Vec<String>, config: &EngineConfig) -> Result<Self> {
        let indexed = columns.clone();
        Self::with_indexes(name, columns, &indexed, config)
    }

    /// Create a table where only the `indexed` columns get an index.
    /// Predicates on other columns are answered by scanning.
    ///
    /// Fails with [`Error::InvalidConfig`] before building any index when
    /// `config` does not validate.
    pub fn with_indexes(
        name: impl Into<String>,
        columns: Vec<String>,
        indexed: &[String],
        config: &EngineConfig,
    ) -> Result<Self> {
        config.validate()?;
        let name = name.into();
        let mut seen = HashSet::new();
        for column in &columns {
            if !seen.insert(column.as_str()) {
                return Err(Error::DuplicateColumn(column.clone()));
            }
        }
        for column in indexed {
            if !seen.contains(column.as_str()) {
                return Err(Error::ColumnNotFound {
                    table: name,
                    column: column.clone(),
                });
            }
        }

        let indexes = columns
            .iter()
            .map(|c| indexed.contains(c).then(|| new_index(config)))
            .collect();
        let filters = columns
            .iter()
            .map(|_| BloomFilter::new(config.bloom_bits, config.bloom_hashes))
            .collect();

        Ok(Table {
            name,
            columns,
            rows: Vec::new(),
            indexes,
            filters,
            live: 0,
            pending_reclaim: 0,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Position of `column`, or `ColumnNotFound`.
    pub fn column_position(&self, column: &str) -> Result<usize> {
        self.columns
            .iter()
            .position(|c| c == column)
            .ok_or_else(|| Error::ColumnNotFound {
                table: self.name.clone(),
                column: column.to_string(),
            })
    }

    /// Append a row. `values` are positional, matching column order.
    pub fn insert(&mut self, values: Vec<String>) -> Result<RowId> {
        if values.len() != self.columns.len() {
            return Err(Error::ColumnCountMismatch {
                expected: self.columns.len(),
                actual: values.len(),
            });
        }

        let id = self.rows.len();
        for (position, value) in values.iter().enumerate() {
            if let Some(index) = &mut self.indexes[position] {
                index.insert(value, id);
            }
            self.filters[position].add(value);
        }
        self.rows.push(Some(Row {
            values,
            deleted: false,
        }));
        self.live += 1;
        Ok(id)
    }

    /// Set `column` to `value` on every live row in `ids`, moving each row
    /// to its new key in the column index. Returns how many rows changed.
    pub fn update(&mut self, ids: &[RowId], column: &str, value: &str) -> Result<usize> {
        let position = self.column_position(column)?;
        let mut updated = 0;

        for &id in ids {
            let Some(row) = self.rows.get_mut(id).and_then(Option::as_mut) else {
                continue;
            };
            if row.deleted {
                continue;
            }
            let old = std::mem::replace(&mut row.values[position], value.to_string());
            updated += 1;
            if old == value {
                continue;
            }
            if let Some(index) = &mut self.indexes[position] {
                index.remove(&old, id);
                index.insert(value, id);
            }
        }

        if updated > 0 {
            self.filters[position].add(value);
        }
        Ok(updated)
    }

    /// Mark every live row in `ids` deleted. Returns how many were marked.
    pub fn delete(&mut self, ids: &[RowId]) -> usize {
        let mut deleted = 0;
        for &id in ids {
            if let Some(Some(row)) = self.rows.get_mut(id) {
                if !row.deleted {
                    row.deleted = true;
                    deleted += 1;
                }
            }
        }
        self.live -= deleted;
        self.pending_reclaim += deleted;
        deleted
    }

    /// Strip index postings of deleted rows and free their slots.
    /// Returns how many rows were reclaimed.
    pub fn vacuum(&mut self) -> usize {
        let mut reclaimed = 0;
        for id in 0..self.rows.len() {
            let Some(row) = self.rows[id].take_if(|r| r.deleted) else {
                continue;
            };
            for (position, index) in self.indexes.iter_mut().enumerate() {
                if let Some(index) = index {
                    index.remove(&row.values[position], id);
                }
            }
            reclaimed += 1;
        }
        self.pending_reclaim = 0;
        if reclaimed > 0 {
            info!(table = %self.name, reclaimed, "vacuumed deleted rows");
        }
        reclaimed
    }

    /// The row at `id` if it has not been deleted.
    pub fn row(&self, id: RowId) -> Option<&Row> {
        self.rows
            .get(id)
            .and_then(Option::as_ref)
            .filter(|r| !r.deleted)
    }

    pub fn is_live(&self, id: RowId) -> bool {
        self.row(id).is_some()
    }

    /// Ids of every live row, in insertion order.
    pub fn live_row_ids(&self) -> Vec<RowId> {
        (0..self.rows.len()).filter(|&id| self.is_live(id)).collect()
    }

    /// Index on the column at `position`, if the column is indexed.
    pub fn index(&self, position: usize) -> Option<&dyn ColumnIndex> {
        self.indexes.get(position)?.as_deref()
    }

    pub fn filter(&self, position: usize) -> Option<&BloomFilter> {
        self.filters.get(position)
    }

    /// Number of live rows.
    pub fn len(&self) -> usize {
        self.live
    }

    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    /// Deleted rows still waiting for a vacuum.
    pub fn pending_reclaim(&self) -> usize {
        self.pending_reclaim
    }

    /// Vacuum if at least `threshold` deleted rows are waiting. 0 never vacuums.
    pub fn maybe_vacuum(&mut self, threshold: usize) -> usize {
        if threshold == 0 || self.pending_reclaim < threshold {
            return 0;
        }
        debug!(table = %self.name, pending = self.pending_reclaim, threshold, "vacuum threshold reached");
        self.vacuum()
    }
}
