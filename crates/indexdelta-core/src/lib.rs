//! Core types and configuration for indexdelta.
//!
//! This crate provides the data model shared by the scanner, the manifest
//! store and the reconciler: per-scan file records, persisted manifest
//! entries, the index configuration and the error taxonomy.

mod config;
mod error;
mod path;
mod record;

pub use config::{
    DEFAULT_EXTENSIONS, DEFAULT_IGNORE_LIST, ENV_EXTENSIONS, ENV_IGNORE_LIST, IndexConfig,
    IndexConfigBuilder,
};
pub use error::{ConfigError, FilesystemError};
pub use path::relative_posix_path;
pub use record::{ContentHash, FileRecord, ManifestEntry, ManifestProjection, Summary};
