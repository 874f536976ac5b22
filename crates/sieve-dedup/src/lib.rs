//! # sieve-dedup
//!
//! Duplicate removal for web text corpora ahead of model training.
//!
//! Two modes:
//! - **Exact line dedup**: drop every line whose normalized content occurs
//!   more than once across the corpus ([`exact`]).
//! - **Fuzzy document dedup**: word n-gram shingles, MinHash signatures and
//!   LSH banding find candidate pairs, exact Jaccard similarity verifies them,
//!   and union-find collapses each duplicate cluster to one representative.
//!
//! ## Quick Start
//!
//! ```no_run
//! use sieve_dedup::{DedupConfig, Deduplicator, Document};
//!
//! # fn main() -> sieve_core::Result<()> {
//! let docs = vec![
//!     Document::new("a.txt", "the quick brown fox jumps over the lazy dog"),
//!     Document::new("b.txt", "the quick brown fox jumps over the lazy dog"),
//! ];
//! let dedup = Deduplicator::new(DedupConfig::default())?;
//! let result = dedup.deduplicate_documents(&docs)?;
//! assert_eq!(result.keep_indices, vec![0]);
//! # Ok(())
//! # }
//! ```
//!
//! ## Modules
//!
//! - [`shingle`]: word n-gram shingle sets and exact Jaccard similarity
//! - [`minhash`]: seeded MinHash signatures
//! - [`lsh`]: banded LSH index for candidate pairs
//! - [`cluster`]: union-find and duplicate cluster resolution
//! - [`exact`]: two-phase exact line deduplication
//! - [`pii`]: optional email / phone / IP masking
//! - [`io`]: corpus loading and output writing
//! - [`pipeline`]: the end-to-end driver

pub mod cluster;
pub mod exact;
pub mod io;
pub mod lsh;
pub mod minhash;
pub mod pii;
pub mod pipeline;
pub mod shingle;

pub use cluster::{resolve, Resolution, UnionFind};
pub use exact::{deduplicate_exact_lines, LineDedupConfig, LineIndex, LineNormalization, LineStats};
pub use io::{load_documents, write_documents, Corpus, Document, InputFormat, SkippedInput};
pub use lsh::{DocId, LshIndex};
pub use minhash::{HashFamily, MinHashSignature, MinHasher};
pub use pii::{mask_pii, PiiCounts};
pub use pipeline::{
    run_exact_line_deduplication, run_minhash_deduplication, DedupMode, ManifestEntry, Pipeline,
    PipelineConfig, RunReport,
};
pub use shingle::{shingles, ShingleSet};

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use sieve_core::{Result, SieveError};
use std::collections::HashMap;
use tracing::{debug, info};

/// Configuration for fuzzy (MinHash + LSH) deduplication.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DedupConfig {
    /// Number of MinHash functions (signature length).
    pub num_hashes: usize,
    /// Number of LSH bands; must divide `num_hashes` exactly.
    pub num_bands: usize,
    /// Words per shingle.
    pub ngrams: usize,
    /// Jaccard similarity at or above which two documents are duplicates.
    pub jaccard_threshold: f64,
    /// Seed for the MinHash function family.
    pub seed: u64,
    /// Fail before hashing if signatures would need more than this many bytes.
    pub max_signature_bytes: Option<usize>,
}

impl Default for DedupConfig {
    fn default() -> Self {
        Self {
            num_hashes: minhash::DEFAULT_NUM_HASHES,
            num_bands: 16,
            ngrams: shingle::DEFAULT_NGRAM_SIZE,
            jaccard_threshold: 0.8,
            seed: minhash::DEFAULT_SEED,
            max_signature_bytes: None,
        }
    }
}

impl DedupConfig {
    /// Default configuration with a custom threshold.
    #[must_use]
    pub fn with_threshold(jaccard_threshold: f64) -> Self {
        Self {
            jaccard_threshold,
            ..Self::default()
        }
    }

    /// Rows per LSH band under the exact-division policy.
    #[must_use]
    pub fn rows_per_band(&self) -> usize {
        if self.num_bands == 0 {
            0
        } else {
            self.num_hashes / self.num_bands
        }
    }

    /// Check parameter consistency.
    pub fn validate(&self) -> Result<()> {
        if self.num_hashes == 0 {
            return Err(SieveError::Config("num_hashes must be > 0".to_string()));
        }
        if self.num_bands == 0 {
            return Err(SieveError::Config("num_bands must be > 0".to_string()));
        }
        if self.num_hashes % self.num_bands != 0 {
            return Err(SieveError::Config(format!(
                "num_hashes ({}) must be divisible by num_bands ({})",
                self.num_hashes, self.num_bands
            )));
        }
        if self.ngrams == 0 {
            return Err(SieveError::Config("ngrams must be > 0".to_string()));
        }
        if !(0.0..=1.0).contains(&self.jaccard_threshold) {
            return Err(SieveError::Config(format!(
                "jaccard_threshold must be between 0.0 and 1.0, got {}",
                self.jaccard_threshold
            )));
        }
        Ok(())
    }
}

/// Statistics from fuzzy deduplication.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DedupStats {
    /// Documents examined.
    pub total_documents: usize,
    /// Documents retained.
    pub unique_documents: usize,
    /// Documents removed as duplicates.
    pub duplicate_count: usize,
    /// `duplicate_count / total_documents`.
    pub duplicate_ratio: f64,
    /// Duplicate clusters with two or more members.
    pub cluster_count: usize,
    /// Unique candidate pairs produced by LSH.
    pub candidate_pairs: usize,
    /// Candidate pairs confirmed by exact Jaccard similarity.
    pub verified_pairs: usize,
}

/// Result of fuzzy deduplication.
#[derive(Debug, Clone, Default)]
pub struct DedupResult {
    /// Positions of retained documents, in input order.
    pub keep_indices: Vec<usize>,
    /// `(removed, representative)` positions.
    pub removed: Vec<(usize, usize)>,
    /// Duplicate clusters keyed by representative position.
    pub clusters: HashMap<usize, Vec<usize>>,
    /// Run statistics.
    pub stats: DedupStats,
}

/// Fuzzy deduplication engine.
///
/// Holds the hash family and band layout for one run; every document in the
/// run is hashed with the same family.
#[derive(Debug, Clone)]
pub struct Deduplicator {
    config: DedupConfig,
    hasher: MinHasher,
}

impl Deduplicator {
    /// Validate `config` and build the engine.
    pub fn new(config: DedupConfig) -> Result<Self> {
        config.validate()?;
        let hasher =
            MinHasher::with_seed(config.num_hashes, config.seed).with_ngram_size(config.ngrams);
        Ok(Self { config, hasher })
    }

    /// The engine's configuration.
    #[must_use]
    pub fn config(&self) -> &DedupConfig {
        &self.config
    }

    /// The MinHash generator used for every document.
    #[must_use]
    pub fn hasher(&self) -> &MinHasher {
        &self.hasher
    }

    /// Deduplicate documents; the representative of each cluster is the
    /// member with the lowest identifier.
    pub fn deduplicate_documents(&self, docs: &[Document]) -> Result<DedupResult> {
        let texts: Vec<&str> = docs.iter().map(|d| d.text.as_str()).collect();
        self.run(&texts, |i| docs[i].id.as_str())
    }

    /// Deduplicate raw texts; the representative is the earliest position.
    pub fn deduplicate_texts(&self, texts: &[&str]) -> Result<DedupResult> {
        self.run(texts, |i| i)
    }

    fn run<K, F>(&self, texts: &[&str], rank: F) -> Result<DedupResult>
    where
        K: Ord,
        F: Fn(usize) -> K,
    {
        let n = texts.len();
        if let Some(limit) = self.config.max_signature_bytes {
            let needed = n.saturating_mul(self.config.num_hashes).saturating_mul(8);
            if needed > limit {
                return Err(SieveError::ResourceExhausted(format!(
                    "{n} signatures need {needed} bytes, limit is {limit}; retry with smaller batches"
                )));
            }
        }

        let mut index = LshIndex::for_signature_len(self.config.num_hashes, self.config.num_bands)?;
        debug!(
            bands = index.num_bands(),
            rows = index.rows_per_band(),
            threshold_estimate = index.threshold_estimate(),
            "LSH layout"
        );

        // Shingling, signatures and band keys are independent per document.
        let hashed: Vec<(ShingleSet, Vec<u64>)> = texts
            .par_iter()
            .map(|text| {
                let set = self.hasher.shingle(text);
                let signature = self.hasher.signature(&set);
                index.band_buckets(&signature).map(|keys| (set, keys))
            })
            .collect::<Result<_>>()?;

        let mut shingle_sets = Vec::with_capacity(n);
        for (doc_id, (set, keys)) in hashed.into_iter().enumerate() {
            index.insert_keys(doc_id, &keys);
            shingle_sets.push(set);
        }

        let candidates = index.candidates();
        let resolution = resolve(
            &candidates,
            &shingle_sets,
            self.config.jaccard_threshold,
            rank,
        );

        let duplicate_count = resolution.removed.len();
        let stats = DedupStats {
            total_documents: n,
            unique_documents: resolution.keep.len(),
            duplicate_count,
            duplicate_ratio: if n == 0 {
                0.0
            } else {
                duplicate_count as f64 / n as f64
            },
            cluster_count: resolution.clusters.len(),
            candidate_pairs: resolution.candidate_pairs,
            verified_pairs: resolution.verified_pairs,
        };

        info!(
            documents = n,
            candidates = stats.candidate_pairs,
            verified = stats.verified_pairs,
            clusters = stats.cluster_count,
            removed = duplicate_count,
            "Fuzzy deduplication finished"
        );

        Ok(DedupResult {
            keep_indices: resolution.keep,
            removed: resolution.removed,
            clusters: resolution.clusters,
            stats,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_validation() {
        assert!(DedupConfig::default().validate().is_ok());

        let bad = [
            DedupConfig {
                num_hashes: 100,
                num_bands: 16,
                ..DedupConfig::default()
            },
            DedupConfig {
                num_bands: 0,
                ..DedupConfig::default()
            },
            DedupConfig {
                ngrams: 0,
                ..DedupConfig::default()
            },
            DedupConfig::with_threshold(1.5),
            DedupConfig::with_threshold(-0.1),
            DedupConfig::with_threshold(f64::NAN),
        ];
        for config in bad {
            assert!(
                matches!(config.validate(), Err(SieveError::Config(_))),
                "{config:?} should be rejected"
            );
            assert!(Deduplicator::new(config).is_err());
        }
    }

    #[test]
    fn test_rows_per_band() {
        let config = DedupConfig::default();
        assert_eq!(config.rows_per_band(), 8);
    }

    #[test]
    fn test_identical_documents_keep_one() {
        let docs = vec![
            Document::new("b.txt", "the same words in the same order every time"),
            Document::new("a.txt", "the same words in the same order every time"),
        ];
        let result = Deduplicator::new(DedupConfig::default())
            .unwrap()
            .deduplicate_documents(&docs)
            .unwrap();

        // "a.txt" sorts first, so it is the representative.
        assert_eq!(result.keep_indices, vec![1]);
        assert_eq!(result.removed, vec![(0, 1)]);
        assert_eq!(result.stats.cluster_count, 1);
        assert!((result.stats.duplicate_ratio - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_empty_documents_cluster_together_only() {
        let texts = ["", "   ", "real words live in this document today"];
        let result = Deduplicator::new(DedupConfig::default())
            .unwrap()
            .deduplicate_texts(&texts)
            .unwrap();

        assert_eq!(result.keep_indices, vec![0, 2]);
        assert_eq!(result.removed, vec![(1, 0)]);
    }

    #[test]
    fn test_signature_memory_limit() {
        let config = DedupConfig {
            max_signature_bytes: Some(128 * 8),
            ..DedupConfig::default()
        };
        let dedup = Deduplicator::new(config).unwrap();
        assert!(dedup.deduplicate_texts(&["one"]).is_ok());
        assert!(matches!(
            dedup.deduplicate_texts(&["one", "two"]),
            Err(SieveError::ResourceExhausted(_))
        ));
    }

    #[test]
    fn test_no_documents() {
        let result = Deduplicator::new(DedupConfig::default())
            .unwrap()
            .deduplicate_texts(&[])
            .unwrap();
        assert!(result.keep_indices.is_empty());
        assert_eq!(result.stats.duplicate_ratio, 0.0);
    }
}
