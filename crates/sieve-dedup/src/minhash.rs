//! MinHash signature generation for document similarity.
//!
//! MinHash is a locality-sensitive hashing technique that approximates
//! the Jaccard similarity between sets: the probability that two sets agree
//! on one signature slot equals their Jaccard similarity.

use crate::shingle::{shingles, ShingleSet, DEFAULT_NGRAM_SIZE};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use sieve_core::hashing::hash_with_seed;

/// Default number of hash functions for MinHash signatures.
pub const DEFAULT_NUM_HASHES: usize = 128;

/// Default seed for generating the hash family.
pub const DEFAULT_SEED: u64 = 42;

/// Slot value of a signature computed over an empty shingle set.
pub const EMPTY_SLOT: u64 = u64::MAX;

/// MinHash signature - a compact representation of a document's shingle set.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MinHashSignature {
    /// The minimum hash values for each hash function.
    pub values: Vec<u64>,
}

impl MinHashSignature {
    /// Create a new signature with the given values.
    #[must_use]
    pub fn new(values: Vec<u64>) -> Self {
        Self { values }
    }

    /// Get the number of slots in this signature.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Check if the signature is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Whether this is the signature of an empty shingle set.
    #[must_use]
    pub fn is_sentinel(&self) -> bool {
        self.values.iter().all(|&v| v == EMPTY_SLOT)
    }
}

/// A family of seeded hash functions, one seed per signature slot.
///
/// Generated once per run; signatures are only comparable when computed
/// with the same family.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HashFamily {
    seeds: Vec<u64>,
}

impl HashFamily {
    /// Draw `num_hashes` seeds from a `StdRng` seeded with `seed`.
    #[must_use]
    pub fn generate(num_hashes: usize, seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let seeds = (0..num_hashes).map(|_| rng.gen()).collect();
        Self { seeds }
    }

    /// Number of hash functions in the family.
    #[must_use]
    pub fn len(&self) -> usize {
        self.seeds.len()
    }

    /// Check if the family is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.seeds.is_empty()
    }

    /// The per-function seeds.
    #[must_use]
    pub fn seeds(&self) -> &[u64] {
        &self.seeds
    }
}

/// MinHash signature generator.
///
/// Uses multiple hash functions (simulated via seeds) to generate
/// compact signatures that preserve Jaccard similarity. `MinHasher` is
/// immutable after construction and safe to share across worker threads.
#[derive(Clone, Debug)]
pub struct MinHasher {
    family: HashFamily,
    /// N-gram size for shingling.
    ngram_size: usize,
}

impl MinHasher {
    /// Create a new MinHasher with `num_hashes` functions.
    ///
    /// Uses a fixed seed for reproducibility.
    #[must_use]
    pub fn new(num_hashes: usize) -> Self {
        Self::with_seed(num_hashes, DEFAULT_SEED)
    }

    /// Create a new MinHasher with a specific random seed.
    #[must_use]
    pub fn with_seed(num_hashes: usize, seed: u64) -> Self {
        Self::from_family(HashFamily::generate(num_hashes, seed))
    }

    /// Create a MinHasher over an existing hash family.
    #[must_use]
    pub fn from_family(family: HashFamily) -> Self {
        Self {
            family,
            ngram_size: DEFAULT_NGRAM_SIZE,
        }
    }

    /// Set the n-gram size for shingling.
    #[must_use]
    pub fn with_ngram_size(mut self, ngram_size: usize) -> Self {
        self.ngram_size = ngram_size;
        self
    }

    /// Get the number of hash functions.
    #[must_use]
    pub fn num_hashes(&self) -> usize {
        self.family.len()
    }

    /// Get the n-gram size.
    #[must_use]
    pub fn ngram_size(&self) -> usize {
        self.ngram_size
    }

    /// The hash family this hasher applies.
    #[must_use]
    pub fn family(&self) -> &HashFamily {
        &self.family
    }

    /// Generate a MinHash signature from a shingle set.
    ///
    /// Each shingle hash is rehashed with each seed, and the minimum
    /// value is kept per slot. An empty set yields [`EMPTY_SLOT`] everywhere.
    #[must_use]
    pub fn signature(&self, set: &ShingleSet) -> MinHashSignature {
        let mut min_hashes = vec![EMPTY_SLOT; self.family.len()];

        for &shingle in set.iter() {
            let bytes = shingle.to_le_bytes();
            for (slot, &seed) in min_hashes.iter_mut().zip(self.family.seeds()) {
                let hash = hash_with_seed(&bytes, seed);
                if hash < *slot {
                    *slot = hash;
                }
            }
        }

        MinHashSignature::new(min_hashes)
    }

    /// Shingle `text` with this hasher's n-gram size.
    #[must_use]
    pub fn shingle(&self, text: &str) -> ShingleSet {
        shingles(text, self.ngram_size)
    }

    /// Generate a MinHash signature directly from text.
    #[must_use]
    pub fn signature_from_text(&self, text: &str) -> MinHashSignature {
        self.signature(&self.shingle(text))
    }

    /// Estimate Jaccard similarity from two MinHash signatures.
    ///
    /// The similarity is approximated by the fraction of slots that match.
    /// Signatures from different families are not comparable.
    #[must_use]
    pub fn similarity(sig1: &MinHashSignature, sig2: &MinHashSignature) -> f64 {
        debug_assert_eq!(
            sig1.len(),
            sig2.len(),
            "Signatures must have the same length"
        );

        let len = sig1.len().min(sig2.len());
        if len == 0 {
            return 0.0;
        }

        let matches = sig1
            .values
            .iter()
            .zip(sig2.values.iter())
            .filter(|(a, b)| a == b)
            .count();

        matches as f64 / len as f64
    }
}

impl Default for MinHasher {
    fn default() -> Self {
        Self::new(DEFAULT_NUM_HASHES)
    }
}
