//! # sieve-core
//!
//! Core infrastructure for the sieve corpus cleaning tools.
//!
//! Provides shared abstractions for:
//! - Error taxonomy (configuration, input, resource exhaustion)
//! - Seeded 64-bit hashing (xxh3)

pub mod error;
pub mod hashing;

pub use error::{Result, SieveError};
pub use hashing::{hash64, hash_u64_slice, hash_with_seed};
