//! Hashing functions.
//!
//! Every stage of the dedup engine hashes through these two entry points so
//! that line hashes, shingle hashes and band keys are stable across runs and
//! platforms.

/// Hash with seed for MinHash-style algorithms.
#[inline]
pub fn hash_with_seed(data: &[u8], seed: u64) -> u64 {
    xxhash_rust::xxh3::xxh3_64_with_seed(data, seed)
}

/// Unseeded 64-bit content hash.
#[inline]
pub fn hash64(data: &[u8]) -> u64 {
    xxhash_rust::xxh3::xxh3_64(data)
}

/// Hash a slice of `u64` values as their little-endian byte concatenation.
#[inline]
pub fn hash_u64_slice(values: &[u64], seed: u64) -> u64 {
    let mut bytes = Vec::with_capacity(values.len() * 8);
    for value in values {
        bytes.extend_from_slice(&value.to_le_bytes());
    }
    hash_with_seed(&bytes, seed)
}
