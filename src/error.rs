//! Error types for deflect-geoip.
//!
//! Every variant is fatal for the run: the artifact is all-or-nothing.
//! Malformed lines and records never surface here, they are skipped where
//! they are found.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

use crate::record::CountryCode;

/// Result alias used by the library modules.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to fetch {source_name} after {attempts} attempts: {last_error}")]
    FetchExhausted {
        source_name: String,
        attempts: u32,
        last_error: String,
    },

    #[error("Failed to read {source_name} stats at byte offset {offset}: {source}")]
    StreamRead {
        source_name: String,
        offset: u64,
        #[source]
        source: io::Error,
    },

    #[error(
        "Country conflict for prefix {prefix}: {first} (from {first_source}) vs {second} (from {second_source})"
    )]
    Conflict {
        prefix: String,
        first: CountryCode,
        first_source: String,
        second: CountryCode,
        second_source: String,
    },

    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: io::Error,
    },

    #[error("Manifest error: {0}")]
    Manifest(#[from] serde_json::Error),

    #[error("Checksum mismatch for {path:?}: expected {expected}, got {actual}")]
    ChecksumMismatch {
        path: PathBuf,
        expected: String,
        actual: String,
    },

    #[error("Verification failed: {0}")]
    Verify(String),
}

impl Error {
    /// Wrap an I/O error with a description of what was being done.
    pub fn io(context: impl Into<String>, source: io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Whether this error is a cross-source country conflict.
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }
}
