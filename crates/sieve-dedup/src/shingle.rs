//! Word n-gram shingling.
//!
//! A document is lowercased, split on Unicode whitespace, and every run of
//! `n` consecutive tokens becomes one shingle. Shingles are stored as 64-bit
//! hashes so that set operations stay cheap regardless of n-gram length.

use sieve_core::hashing::hash_with_seed;
use std::collections::HashSet;

/// Default n-gram size for shingling.
pub const DEFAULT_NGRAM_SIZE: usize = 5;

/// Set of shingle hashes for one document.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ShingleSet {
    hashes: HashSet<u64>,
}

impl ShingleSet {
    /// Create an empty shingle set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of distinct shingles.
    #[must_use]
    pub fn len(&self) -> usize {
        self.hashes.len()
    }

    /// Check if the set has no shingles.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.hashes.is_empty()
    }

    /// Insert a shingle hash. Returns false if it was already present.
    pub fn insert(&mut self, hash: u64) -> bool {
        self.hashes.insert(hash)
    }

    /// Check membership of a shingle hash.
    #[must_use]
    pub fn contains(&self, hash: &u64) -> bool {
        self.hashes.contains(hash)
    }

    /// Iterate over the shingle hashes in arbitrary order.
    pub fn iter(&self) -> impl Iterator<Item = &u64> + '_ {
        self.hashes.iter()
    }

    /// Exact Jaccard similarity |A ∩ B| / |A ∪ B|.
    ///
    /// Two empty sets are identical (1.0); an empty set shares nothing with a
    /// non-empty one (0.0).
    #[must_use]
    pub fn jaccard(&self, other: &ShingleSet) -> f64 {
        if self.is_empty() && other.is_empty() {
            return 1.0;
        }

        let (small, large) = if self.len() <= other.len() {
            (self, other)
        } else {
            (other, self)
        };
        let intersection = small.iter().filter(|h| large.contains(h)).count();
        let union = self.len() + other.len() - intersection;

        intersection as f64 / union as f64
    }
}

impl FromIterator<u64> for ShingleSet {
    fn from_iter<I: IntoIterator<Item = u64>>(iter: I) -> Self {
        Self {
            hashes: iter.into_iter().collect(),
        }
    }
}

/// Lowercase and split on whitespace.
#[must_use]
pub fn normalize_tokens(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split_whitespace()
        .map(str::to_owned)
        .collect()
}

/// Build the shingle set of `text` using `n`-token windows.
///
/// Text with fewer than `n` tokens yields a single shingle covering all of
/// its tokens, so short documents can still cluster. Text with no tokens
/// yields an empty set.
#[must_use]
pub fn shingles(text: &str, n: usize) -> ShingleSet {
    let tokens = normalize_tokens(text);
    if tokens.is_empty() {
        return ShingleSet::new();
    }

    if n == 0 || tokens.len() < n {
        return std::iter::once(hash_shingle(&tokens)).collect();
    }

    tokens.windows(n).map(hash_shingle).collect()
}

fn hash_shingle(window: &[String]) -> u64 {
    hash_with_seed(window.join(" ").as_bytes(), 0)
}
