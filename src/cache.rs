//! Result cache for SELECT queries.
//!
//! Maps a query fingerprint to the row ids it produced. Entries expire after
//! a fixed TTL and, once the cache is full, the least recently accessed
//! entry makes room for the next one.

use std::collections::{BTreeMap, HashMap};
use std::time::{Duration, Instant};

use tracing::debug;

use crate::types::RowId;

/// Hit/miss/eviction counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
}

struct CacheEntry {
    rows: Vec<RowId>,
    created: Instant,
    last_access: u64,
}

/// Capacity-bounded, time-expiring map from fingerprint to row ids.
///
/// Recency is tracked with a monotonically increasing access tick rather
/// than wall-clock time, so two accesses in the same instant still order.
///
/// The cache cannot tell which queries a write affects; the owner must
/// call [`ResultCache::invalidate_all`] after every insert, update and delete.
pub struct ResultCache {
    capacity: usize,
    ttl: Duration,
    entries: HashMap<String, CacheEntry>,
    /// access tick → fingerprint, oldest first
    recency: BTreeMap<u64, String>,
    tick: u64,
    stats: CacheStats,
}

impl ResultCache {
    /// A capacity of 0 disables caching: `put` stores nothing.
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        ResultCache {
            capacity,
            ttl,
            entries: HashMap::with_capacity(capacity.min(1024)),
            recency: BTreeMap::new(),
            tick: 0,
            stats: CacheStats::default(),
        }
    }

    /// Store a copy of `rows` under `fingerprint`, evicting the least
    /// recently accessed entry if the cache is full.
    pub fn put(&mut self, fingerprint: impl Into<String>, rows: &[RowId]) {
        if self.capacity == 0 {
            return;
        }
        let fingerprint = fingerprint.into();

        if let Some(old) = self.entries.remove(&fingerprint) {
            self.recency.remove(&old.last_access);
        } else if self.entries.len() >= self.capacity {
            self.evict_lru();
        }

        let tick = self.next_tick();
        self.recency.insert(tick, fingerprint.clone());
        self.entries.insert(
            fingerprint,
            CacheEntry {
                rows: rows.to_vec(),
                created: Instant::now(),
                last_access: tick,
            },
        );
    }

    /// Cached rows for `fingerprint`, if present and younger than the TTL.
    /// An expired entry is removed and reported as a miss.
    pub fn get(&mut self, fingerprint: &str) -> Option<Vec<RowId>> {
        let expired = match self.entries.get(fingerprint) {
            None => {
                self.stats.misses += 1;
                return None;
            }
            Some(entry) => entry.created.elapsed() > self.ttl,
        };

        if expired {
            self.remove(fingerprint);
            self.stats.misses += 1;
            return None;
        }

        let tick = self.next_tick();
        let entry = self.entries.get_mut(fingerprint)?;
        self.recency.remove(&entry.last_access);
        entry.last_access = tick;
        self.recency.insert(tick, fingerprint.to_string());
        self.stats.hits += 1;
        Some(entry.rows.clone())
    }

    /// Whether a live entry exists, without touching recency or stats.
    pub fn contains(&self, fingerprint: &str) -> bool {
        self.entries
            .get(fingerprint)
            .is_some_and(|e| e.created.elapsed() <= self.ttl)
    }

    /// Drop every entry.
    pub fn invalidate_all(&mut self) {
        if !self.entries.is_empty() {
            debug!(entries = self.entries.len(), "invalidated result cache");
        }
        self.entries.clear();
        self.recency.clear();
    }

    /// Drop every expired entry. Returns how many were removed.
    pub fn purge_expired(&mut self) -> usize {
        let ttl = self.ttl;
        let expired: Vec<String> = self
            .entries
            .iter()
            .filter(|(_, e)| e.created.elapsed() > ttl)
            .map(|(k, _)| k.clone())
            .collect();
        for fingerprint in &expired {
            self.remove(fingerprint);
        }
        expired.len()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn stats(&self) -> CacheStats {
        self.stats
    }

    fn remove(&mut self, fingerprint: &str) {
        if let Some(entry) = self.entries.remove(fingerprint) {
            self.recency.remove(&entry.last_access);
        }
    }

    fn evict_lru(&mut self) {
        if let Some((_, fingerprint)) = self.recency.pop_first() {
            self.entries.remove(&fingerprint);
            self.stats.evictions += 1;
            debug!(fingerprint = %fingerprint, "evicted least recently used cache entry");
        }
    }

    fn next_tick(&mut self) -> u64 {
        self.tick += 1;
        self.tick
    }
}
