use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use xxhash_rust::xxh3::xxh3_64_with_seed;

/// Seed for the hash-seed generator. Fixed so that two filters built with
/// the same size and hash count set the same bits for the same values.
const SEED_STREAM: u64 = 2_012_024;

/// Probabilistic data structure: "could this value be in the column?"
///
/// - If any bit is 0 → value is DEFINITELY NOT in the set
/// - If all bits are 1 → value is PROBABLY in the set (false positive possible)
///
/// The query planner consults one filter per column before touching an
/// index. A miss on an equality predicate lets the planner drop that
/// predicate's candidate set without a tree descent. A hit proves nothing
/// and the index is still consulted.
///
/// There is no removal: a filter only ever grows for the life of its table.
///
/// Sizing (see [`BloomFilter::with_rate`]):
///   bits_per_key = -1.44 * log2(false_positive_rate)
///   num_hashes = bits_per_key * ln(2)
///
/// A filter with 0 bits is disabled and answers `might_contain = true`.
#[derive(Debug, Clone)]
pub struct BloomFilter {
    bits: Vec<u64>,
    num_bits: u64,
    seeds: Vec<u64>,
}

impl BloomFilter {
    /// Create a filter with `num_bits` bits and `num_hashes` seeded hash functions.
    pub fn new(num_bits: usize, num_hashes: usize) -> Self {
        if num_bits == 0 {
            return Self::disabled();
        }

        let mut rng = StdRng::seed_from_u64(SEED_STREAM);
        let seeds = (0..num_hashes.max(1)).map(|_| rng.next_u64()).collect();

        Self {
            bits: vec![0u64; num_bits.div_ceil(64)],
            num_bits: num_bits as u64,
            seeds,
        }
    }

    /// A filter that never prunes anything.
    pub fn disabled() -> Self {
        Self {
            bits: Vec::new(),
            num_bits: 0,
            seeds: Vec::new(),
        }
    }

    /// Create a filter sized for `expected_items` at the given false positive rate.
    ///
    /// # Panics
    /// Panics if expected_items is 0 or FPR is not in (0, 1).
    pub fn with_rate(expected_items: usize, false_positive_rate: f64) -> Self {
        assert!(expected_items > 0, "expected_items must be > 0");
        assert!(
            false_positive_rate > 0.0 && false_positive_rate < 1.0,
            "FPR must be in (0, 1)"
        );

        let bits_per_key = -1.44 * false_positive_rate.log2();
        let num_bits = ((expected_items as f64) * bits_per_key).ceil() as usize;
        let num_hashes = (bits_per_key * 2.0f64.ln()).ceil() as usize;

        Self::new(num_bits.max(64), num_hashes.max(1))
    }

    /// Whether this filter actually prunes (size > 0).
    pub fn is_enabled(&self) -> bool {
        self.num_bits > 0
    }

    /// Add a value to the filter.
    pub fn add(&mut self, value: &str) {
        if !self.is_enabled() {
            return;
        }
        for i in 0..self.seeds.len() {
            let pos = self.position(value, self.seeds[i]);
            self.set_bit(pos);
        }
    }

    /// Check if a value MIGHT have been added.
    /// false → definitely not added. true → probably added.
    pub fn might_contain(&self, value: &str) -> bool {
        if !self.is_enabled() {
            return true;
        }
        self.seeds
            .iter()
            .all(|&seed| self.check_bit(self.position(value, seed)))
    }

    /// Number of hash seeds in use.
    pub fn num_hashes(&self) -> usize {
        self.seeds.len()
    }

    /// Size of the bit array.
    pub fn num_bits(&self) -> usize {
        self.num_bits as usize
    }

    fn position(&self, value: &str, seed: u64) -> u64 {
        xxh3_64_with_seed(value.as_bytes(), seed) % self.num_bits
    }

    fn set_bit(&mut self, pos: u64) {
        let word_index = (pos / 64) as usize;
        let bit_index = pos % 64;
        self.bits[word_index] |= 1 << bit_index;
    }

    fn check_bit(&self, pos: u64) -> bool {
        let word_index = (pos / 64) as usize;
        let bit_index = pos % 64;
        (self.bits[word_index] >> bit_index) & 1 == 1
    }
}
