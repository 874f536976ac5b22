//! Error types for sieve.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for sieve operations.
pub type Result<T> = std::result::Result<T, SieveError>;

/// Errors that can occur in sieve operations.
#[derive(Error, Debug)]
pub enum SieveError {
    /// Invalid or inconsistent run parameters. Fatal, raised before any work.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A single input could not be read or decoded.
    #[error("Input error in {path}: {message}")]
    Input {
        /// Path of the offending input.
        path: PathBuf,
        /// What went wrong.
        message: String,
    },

    /// The run would exceed a configured memory ceiling.
    #[error("Resource exhausted: {0}")]
    ResourceExhausted(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON encoding or decoding error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration file parse error
    #[error("Config file error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl SieveError {
    /// Build an [`SieveError::Input`] for `path`.
    pub fn input(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Input {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Whether the run may continue after this error (skip the document).
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::Input { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_input_error_display() {
        let err = SieveError::input("/data/a.txt", "invalid UTF-8");
        assert_eq!(err.to_string(), "Input error in /data/a.txt: invalid UTF-8");
        assert!(err.is_recoverable());
    }

    #[test]
    fn test_config_error_is_fatal() {
        let err = SieveError::Config("num_bands must be > 0".to_string());
        assert!(!err.is_recoverable());
        assert!(err.to_string().starts_with("Configuration error"));
    }
}
