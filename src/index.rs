use crate::btree::BPlusTree;
use crate::config::{EngineConfig, IndexKind};
use crate::lsm::LsmIndex;
use crate::types::{Operator, RowId};

/// Per-column secondary index: column value → row ids.
///
/// Tables and the query planner only talk to this trait, so the backend
/// behind a column can change without touching query logic.
///
/// Indexes return *candidates*. They do not know about row deletion flags;
/// the planner drops deleted rows before anything reaches the caller.
pub trait ColumnIndex: Send + Sync {
    /// Which backend this is.
    fn kind(&self) -> IndexKind;

    /// Record that `row` holds `key`.
    fn insert(&mut self, key: &str, row: RowId);

    /// Forget that `row` holds `key`. Returns whether it was recorded.
    fn remove(&mut self, key: &str, row: RowId) -> bool;

    /// Rows holding exactly `key`.
    fn search_equal(&self, key: &str) -> Vec<RowId>;

    /// Rows whose value satisfies `value <op> key`.
    fn search_range(&self, op: Operator, key: &str) -> Vec<RowId>;
}

/// Build an empty index of the configured kind.
pub fn new_index(config: &EngineConfig) -> Box<dyn ColumnIndex> {
    match config.index_kind {
        IndexKind::BPlusTree => Box::new(BPlusTree::new(config.btree_order)),
        IndexKind::Lsm => Box::new(LsmIndex::new(config.memtable_limit)),
    }
}

impl ColumnIndex for BPlusTree {
    fn kind(&self) -> IndexKind {
        IndexKind::BPlusTree
    }

    fn insert(&mut self, key: &str, row: RowId) {
        BPlusTree::insert(self, key, row);
    }

    fn remove(&mut self, key: &str, row: RowId) -> bool {
        self.delete(key, row)
    }

    fn search_equal(&self, key: &str) -> Vec<RowId> {
        BPlusTree::search_equal(self, key)
    }

    fn search_range(&self, op: Operator, key: &str) -> Vec<RowId> {
        BPlusTree::search_range(self, op, key)
    }
}

impl ColumnIndex for LsmIndex {
    fn kind(&self) -> IndexKind {
        IndexKind::Lsm
    }

    fn insert(&mut self, key: &str, row: RowId) {
        self.add(key, row);
    }

    fn remove(&mut self, key: &str, row: RowId) -> bool {
        self.remove_row(key, row)
    }

    fn search_equal(&self, key: &str) -> Vec<RowId> {
        self.get(key)
    }

    fn search_range(&self, op: Operator, key: &str) -> Vec<RowId> {
        self.range(op, key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn exercise(mut index: Box<dyn ColumnIndex>) {
        for (row, age) in ["25", "30", "35", "30"].into_iter().enumerate() {
            index.insert(age, row);
        }
        let mut eq = index.search_equal("30");
        eq.sort();
        assert_eq!(eq, vec![1, 3]);

        let mut ge = index.search_range(Operator::Ge, "30");
        ge.sort();
        assert_eq!(ge, vec![1, 2, 3]);

        assert!(index.remove("30", 1));
        assert!(!index.remove("30", 1));
        assert_eq!(index.search_equal("30"), vec![3]);
        assert_eq!(index.search_range(Operator::Lt, "30"), vec![0]);
    }

    #[test]
    fn btree_backend_behaves_as_column_index() {
        let config = EngineConfig::default().with_btree_order(3);
        let index = new_index(&config);
        assert_eq!(index.kind(), IndexKind::BPlusTree);
        exercise(index);
    }

    #[test]
    fn lsm_backend_behaves_as_column_index() {
        let config = EngineConfig::default()
            .with_index_kind(IndexKind::Lsm)
            .with_memtable_limit(2);
        let index = new_index(&config);
        assert_eq!(index.kind(), IndexKind::Lsm);
        exercise(index);
    }
}
