//! Locality-Sensitive Hashing (LSH) for efficient candidate pair generation.
//!
//! LSH groups similar documents into buckets based on their MinHash signatures,
//! so candidate generation costs O(n · bands) instead of O(n^2) comparisons.
//!
//! For `b` bands of `r` rows, two documents with Jaccard similarity `s`
//! become candidates with probability `1 - (1 - s^r)^b`. The band count and
//! the verification threshold are independent tunables.

use crate::minhash::MinHashSignature;
use sieve_core::hashing::hash_u64_slice;
use sieve_core::{Result, SieveError};
use std::collections::{BTreeSet, HashMap};

/// Document ID type: the position of the document in the run's input.
pub type DocId = usize;

/// Bucket keys of one signature, one per band, in band order.
pub type BandKeys = Vec<u64>;

/// LSH index for finding candidate duplicate pairs.
///
/// The index divides each MinHash signature into bands of rows.
/// Documents that share at least one (band, bucket key) pair are candidates.
pub struct LshIndex {
    /// Number of bands (groups of rows).
    num_bands: usize,
    /// Rows per band.
    rows_per_band: usize,
    /// Buckets for each band: band_id -> key -> doc_ids.
    buckets: Vec<HashMap<u64, Vec<DocId>>>,
}

impl LshIndex {
    /// Create a new LSH index with the specified band configuration.
    ///
    /// A layout with zero bands or zero rows accepts no signatures:
    /// [`band_buckets`](LshIndex::band_buckets) rejects them with a
    /// configuration error.
    ///
    /// # Arguments
    /// * `num_bands` - Number of bands to divide the signature into
    /// * `rows_per_band` - Number of rows (hash values) per band
    #[must_use]
    pub fn new(num_bands: usize, rows_per_band: usize) -> Self {
        Self {
            num_bands,
            rows_per_band,
            buckets: (0..num_bands).map(|_| HashMap::new()).collect(),
        }
    }

    /// Create an index for signatures of length `num_hashes` split into
    /// `num_bands` equal bands.
    ///
    /// Fails with a configuration error unless `num_bands` divides
    /// `num_hashes` exactly; there is no rounding.
    pub fn for_signature_len(num_hashes: usize, num_bands: usize) -> Result<Self> {
        if num_bands == 0 {
            return Err(SieveError::Config("num_bands must be > 0".to_string()));
        }
        if num_hashes == 0 || num_hashes % num_bands != 0 {
            return Err(SieveError::Config(format!(
                "num_hashes ({num_hashes}) must be a positive multiple of num_bands ({num_bands})"
            )));
        }
        Ok(Self::new(num_bands, num_hashes / num_bands))
    }

    /// Get the number of bands.
    #[must_use]
    pub fn num_bands(&self) -> usize {
        self.num_bands
    }

    /// Get the number of rows per band.
    #[must_use]
    pub fn rows_per_band(&self) -> usize {
        self.rows_per_band
    }

    /// Probability that two documents with Jaccard similarity `s` share at
    /// least one bucket.
    #[must_use]
    pub fn candidate_probability(&self, s: f64) -> f64 {
        1.0 - (1.0 - s.powi(self.rows_per_band as i32)).powi(self.num_bands as i32)
    }

    /// Similarity at which the candidate probability curve is steepest,
    /// approximately `(1/b)^(1/r)`.
    #[must_use]
    pub fn threshold_estimate(&self) -> f64 {
        (1.0 / self.num_bands as f64).powf(1.0 / self.rows_per_band as f64)
    }

    /// Compute the bucket key of every band of `signature`.
    ///
    /// Each band is hashed with its band index as seed. Pure; safe to call
    /// from worker threads before the single-writer [`insert_keys`].
    ///
    /// [`insert_keys`]: LshIndex::insert_keys
    pub fn band_buckets(&self, signature: &MinHashSignature) -> Result<BandKeys> {
        if self.num_bands == 0 || self.rows_per_band == 0 {
            return Err(SieveError::Config(format!(
                "band layout {} bands x {} rows is empty",
                self.num_bands, self.rows_per_band
            )));
        }
        let required = self.num_bands * self.rows_per_band;
        if signature.len() != required {
            return Err(SieveError::Config(format!(
                "signature length {} does not match {} bands x {} rows",
                signature.len(),
                self.num_bands,
                self.rows_per_band
            )));
        }

        Ok(signature
            .values
            .chunks_exact(self.rows_per_band)
            .enumerate()
            .map(|(band, rows)| hash_u64_slice(rows, band as u64))
            .collect())
    }

    /// Add precomputed band keys for a document.
    pub fn insert_keys(&mut self, doc_id: DocId, keys: &[u64]) {
        debug_assert_eq!(keys.len(), self.num_bands);
        for (band, &key) in self.buckets.iter_mut().zip(keys) {
            band.entry(key).or_default().push(doc_id);
        }
    }

    /// Add a document signature to the index.
    pub fn insert(&mut self, doc_id: DocId, signature: &MinHashSignature) -> Result<()> {
        let keys = self.band_buckets(signature)?;
        self.insert_keys(doc_id, &keys);
        Ok(())
    }

    /// Buckets holding more than one document: the candidate clusters.
    pub fn candidate_clusters(&self) -> impl Iterator<Item = &[DocId]> + '_ {
        self.buckets
            .iter()
            .flat_map(|band| band.values())
            .filter(|bucket| bucket.len() > 1)
            .map(Vec::as_slice)
    }

    /// Get all unique candidate pairs from the index.
    ///
    /// Each pair is `(lower, higher)` and appears once even if the two
    /// documents share several bands. Pairs are returned sorted.
    #[must_use]
    pub fn candidates(&self) -> Vec<(DocId, DocId)> {
        let mut pairs = BTreeSet::new();

        for bucket in self.candidate_clusters() {
            for (i, &id1) in bucket.iter().enumerate() {
                for &id2 in &bucket[i + 1..] {
                    if id1 != id2 {
                        pairs.insert((id1.min(id2), id1.max(id2)));
                    }
                }
            }
        }

        pairs.into_iter().collect()
    }

    /// Get the number of buckets with multiple documents.
    #[must_use]
    pub fn num_collision_buckets(&self) -> usize {
        self.candidate_clusters().count()
    }

    /// Get the number of documents in the index.
    #[must_use]
    pub fn num_documents(&self) -> usize {
        // Every document lands in exactly one bucket of band 0.
        self.buckets
            .first()
            .map_or(0, |band| band.values().map(Vec::len).sum())
    }

    /// Clear the index.
    pub fn clear(&mut self) {
        for band in &mut self.buckets {
            band.clear();
        }
    }
}
