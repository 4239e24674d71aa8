//! Bloom filter for seen-transaction tracking
//!
//! Fixed-size bit array with `k` probes per item. Items are never removed, so
//! there are no false negatives and the false-positive rate only grows.

use crate::crypto::sha256;
use serde::{Deserialize, Serialize};

// =============================================================================
// Constants
// =============================================================================

/// Default bloom filter size (in bits)
pub const DEFAULT_BLOOM_SIZE: usize = 8_192;

/// Default number of hash probes
pub const DEFAULT_HASH_COUNT: u32 = 4;

/// Maximum bloom filter size (in bits)
pub const MAX_BLOOM_SIZE: usize = 36_000_000;

/// Maximum number of hash probes
pub const MAX_HASH_COUNT: u32 = 50;

// =============================================================================
// Bloom Filter
// =============================================================================

/// Probabilistic set of transaction ids
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BloomFilter {
    /// Bit array, least significant bit first
    data: Vec<u8>,
    /// Number of usable bits
    size: usize,
    hash_count: u32,
    /// Number of `add` calls so far
    inserted: u64,
}

impl Default for BloomFilter {
    fn default() -> Self {
        Self::new(DEFAULT_BLOOM_SIZE, DEFAULT_HASH_COUNT)
    }
}

impl BloomFilter {
    /// Create a new bloom filter; parameters are clamped to sane bounds
    pub fn new(size_bits: usize, hash_count: u32) -> Self {
        let size = size_bits.clamp(1, MAX_BLOOM_SIZE);
        Self {
            data: vec![0u8; (size + 7) / 8],
            size,
            hash_count: hash_count.clamp(1, MAX_HASH_COUNT),
            inserted: 0,
        }
    }

    /// Create filter sized for N elements with target false positive rate
    pub fn for_elements(n_elements: usize, fp_rate: f64) -> Self {
        let n = n_elements.max(1) as f64;
        let fp_rate = fp_rate.clamp(f64::MIN_POSITIVE, 0.5);

        // Optimal size: -n * ln(p) / ln(2)^2
        let ln2_squared = std::f64::consts::LN_2 * std::f64::consts::LN_2;
        let size_bits = ((-n * fp_rate.ln()) / ln2_squared).ceil() as usize;

        // Optimal probes: (m/n) * ln(2)
        let hash_count = ((size_bits as f64 / n) * std::f64::consts::LN_2).round() as u32;

        Self::new(size_bits.max(8), hash_count)
    }

    /// Mark an item as seen
    pub fn add(&mut self, item: &str) {
        for idx in self.positions(item) {
            self.data[idx / 8] |= 1 << (idx % 8);
        }
        self.inserted += 1;
    }

    /// Check if an item might have been added
    pub fn check(&self, item: &str) -> bool {
        self.positions(item)
            .all(|idx| self.data[idx / 8] & (1 << (idx % 8)) != 0)
    }

    /// Bit array size in bits
    pub fn size(&self) -> usize {
        self.size
    }

    pub fn hash_count(&self) -> u32 {
        self.hash_count
    }

    /// Number of `add` calls so far
    pub fn inserted(&self) -> u64 {
        self.inserted
    }

    /// Check if no bit is set
    pub fn is_empty(&self) -> bool {
        self.data.iter().all(|&b| b == 0)
    }

    /// Expected false positive probability after the current insertions:
    /// (1 - e^(-k*n/m))^k
    pub fn estimated_false_positive_rate(&self) -> f64 {
        let k = self.hash_count as f64;
        let n = self.inserted as f64;
        let m = self.size as f64;
        (1.0 - (-k * n / m).exp()).powf(k)
    }

    /// Probe positions: `h1 XOR (h2(seed) << shift(seed))` modulo the size
    fn positions(&self, item: &str) -> impl Iterator<Item = usize> {
        let digest = sha256(item.as_bytes());
        let h1 = u64::from_le_bytes(first_eight(&digest[..8]));
        let h2_base = u64::from_le_bytes(first_eight(&digest[8..16]));
        let size = self.size as u64;

        (0..self.hash_count).map(move |seed| {
            let h2 = splitmix64(h2_base.wrapping_add(seed as u64));
            let shift = seed % 8 + 1;
            ((h1 ^ (h2 << shift)) % size) as usize
        })
    }
}

fn first_eight(bytes: &[u8]) -> [u8; 8] {
    let mut out = [0u8; 8];
    out.copy_from_slice(&bytes[..8]);
    out
}

fn splitmix64(mut x: u64) -> u64 {
    x = x.wrapping_add(0x9E37_79B9_7F4A_7C15);
    x = (x ^ (x >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    x = (x ^ (x >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    x ^ (x >> 31)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::distributions::Alphanumeric;
    use rand::Rng;

    #[test]
    fn test_add_and_check() {
        let mut filter = BloomFilter::default();
        assert!(filter.is_empty());
        assert!(!filter.check("tx1"));

        filter.add("tx1");
        assert!(filter.check("tx1"));
        assert!(!filter.is_empty());
        assert_eq!(filter.inserted(), 1);
    }

    #[test]
    fn test_no_false_negatives() {
        let mut rng = rand::thread_rng();
        let mut filter = BloomFilter::new(4_096, 5);
        let items: Vec<String> = (0..500)
            .map(|_| {
                (0..16)
                    .map(|_| rng.sample(Alphanumeric) as char)
                    .collect()
            })
            .collect();

        for item in &items {
            filter.add(item);
        }
        for item in &items {
            assert!(filter.check(item), "lost item {}", item);
        }
    }

    #[test]
    fn test_parameters_clamped() {
        let filter = BloomFilter::new(0, 0);
        assert_eq!(filter.size(), 1);
        assert_eq!(filter.hash_count(), 1);

        let mut tiny = filter.clone();
        tiny.add("x");
        assert!(tiny.check("anything"));
    }

    #[test]
    fn test_for_elements_sizing() {
        let filter = BloomFilter::for_elements(1_000, 0.01);
        // ~9.6 bits per element and ~7 probes for a 1% target
        assert!(filter.size() >= 9_000 && filter.size() <= 10_000);
        assert_eq!(filter.hash_count(), 7);
    }

    #[test]
    fn test_false_positive_rate_grows() {
        let mut filter = BloomFilter::new(1_024, 3);
        assert_eq!(filter.estimated_false_positive_rate(), 0.0);

        filter.add("a");
        let after_one = filter.estimated_false_positive_rate();
        for i in 0..100 {
            filter.add(&format!("tx{}", i));
        }
        assert!(filter.estimated_false_positive_rate() > after_one);
    }

    #[test]
    fn test_bit_positions_in_range() {
        let filter = BloomFilter::new(1_000, 10);
        let positions: Vec<usize> = filter.positions("tx-42").collect();
        assert_eq!(positions.len(), 10);
        assert!(positions.iter().all(|&p| p < 1_000));
    }
}
