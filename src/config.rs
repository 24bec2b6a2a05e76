use std::time::Duration;

use crate::error::{Error, Result};

/// Default B+Tree order (max children per internal node).
pub const DEFAULT_BTREE_ORDER: usize = 16;
/// Default number of distinct keys a memtable holds before it is flushed.
pub const DEFAULT_MEMTABLE_LIMIT: usize = 1000;
/// Default bloom filter size in bits. 0 disables filtering.
pub const DEFAULT_BLOOM_BITS: usize = 10_000;
/// Default number of bloom hash seeds.
pub const DEFAULT_BLOOM_HASHES: usize = 3;
/// Default result cache capacity (entries).
pub const DEFAULT_CACHE_CAPACITY: usize = 10_000;
/// Default result cache time-to-live.
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_millis(30_000);
/// Default number of deleted rows that triggers a vacuum. 0 disables it.
pub const DEFAULT_VACUUM_THRESHOLD: usize = 1000;

/// Which ordered structure backs each column index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IndexKind {
    /// Balanced multi-way tree with linked leaves.
    #[default]
    BPlusTree,
    /// Memtable plus immutable sorted runs, compacted on flush.
    Lsm,
}

/// Construction-time configuration for an [`Engine`](crate::Engine).
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Index backend used for every indexed column (default: B+Tree)
    pub index_kind: IndexKind,

    /// B+Tree order: leaves hold `order - 1` keys, internal nodes `order` children (default: 16)
    pub btree_order: usize,

    /// LSM memtable flush threshold in distinct keys (default: 1000)
    pub memtable_limit: usize,

    /// Bloom filter bit-array size, 0 disables pruning (default: 10,000)
    pub bloom_bits: usize,

    /// Bloom filter hash seed count (default: 3)
    pub bloom_hashes: usize,

    /// Result cache capacity, 0 disables caching (default: 10,000)
    pub cache_capacity: usize,

    /// Result cache entry lifetime (default: 30s)
    pub cache_ttl: Duration,

    /// Deleted-row count at which a table is vacuumed, 0 disables (default: 1000)
    pub vacuum_threshold: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            index_kind: IndexKind::default(),
            btree_order: DEFAULT_BTREE_ORDER,
            memtable_limit: DEFAULT_MEMTABLE_LIMIT,
            bloom_bits: DEFAULT_BLOOM_BITS,
            bloom_hashes: DEFAULT_BLOOM_HASHES,
            cache_capacity: DEFAULT_CACHE_CAPACITY,
            cache_ttl: DEFAULT_CACHE_TTL,
            vacuum_threshold: DEFAULT_VACUUM_THRESHOLD,
        }
    }
}

impl EngineConfig {
    /// Set the index backend
    pub fn with_index_kind(mut self, kind: IndexKind) -> Self {
        self.index_kind = kind;
        self
    }

    /// Set the B+Tree order
    pub fn with_btree_order(mut self, order: usize) -> Self {
        self.btree_order = order;
        self
    }

    /// Set the LSM memtable flush threshold
    pub fn with_memtable_limit(mut self, limit: usize) -> Self {
        self.memtable_limit = limit;
        self
    }

    /// Set bloom filter size and hash count
    pub fn with_bloom(mut self, bits: usize, hashes: usize) -> Self {
        self.bloom_bits = bits;
        self.bloom_hashes = hashes;
        self
    }

    /// Disable bloom pruning
    pub fn without_bloom(self) -> Self {
        self.with_bloom(0, 0)
    }

    /// Set result cache capacity and TTL
    pub fn with_cache(mut self, capacity: usize, ttl: Duration) -> Self {
        self.cache_capacity = capacity;
        self.cache_ttl = ttl;
        self
    }

    /// Set the vacuum threshold
    pub fn with_vacuum_threshold(mut self, threshold: usize) -> Self {
        self.vacuum_threshold = threshold;
        self
    }

    /// Reject configurations the index structures cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.btree_order < 3 {
            return Err(Error::InvalidConfig(format!(
                "btree_order must be >= 3, got {}",
                self.btree_order
            )));
        }
        if self.memtable_limit == 0 {
            return Err(Error::InvalidConfig("memtable_limit must be >= 1".into()));
        }
        if self.bloom_bits > 0 && self.bloom_hashes == 0 {
            return Err(Error::InvalidConfig(
                "bloom_hashes must be >= 1 when bloom_bits > 0".into(),
            ));
        }
        Ok(())
    }
}
