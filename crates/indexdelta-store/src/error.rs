//! Error types for manifest persistence.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised by the manifest store.
///
/// A failed write is always surfaced; nothing is reported as stored unless
/// SQLite accepted it.
#[derive(Debug, Error)]
pub enum StoreError {
    /// SQLite rejected an operation.
    #[error("Database error: {source}")]
    Database {
        #[from]
        source: rusqlite::Error,
    },

    /// The metadata directory could not be prepared.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The database was written by an incompatible version.
    #[error("Manifest schema version {found} does not match expected {expected}")]
    SchemaVersionMismatch { found: i32, expected: i32 },

    /// A stored dependency list is not a JSON array of strings.
    #[error("Invalid dependency list for {path}: {source}")]
    CorruptDependencies {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}
