//! Source tree scanning and fingerprinting for indexdelta.
//!
//! # Overview
//!
//! `indexdelta-scan` discovers the files an indexing run cares about and
//! turns each of them into a [`FileRecord`]:
//!
//! - **Tree walking** via jwalk, pruning ignored directory names at any depth
//! - **Extension filtering** against the configured accepted set
//! - **Fingerprinting** with BLAKE3, parallelized across files with rayon
//! - **Progress updates** via broadcast channels
//!
//! # Example
//!
//! ```rust,no_run
//! use indexdelta_scan::{Fingerprinter, IndexConfig, TreeScanner};
//!
//! let config = IndexConfig::new("/path/to/repo");
//! let scanner = TreeScanner::new();
//! let mut outcome = scanner.scan(&config).unwrap();
//!
//! let records = Fingerprinter::new()
//!     .fingerprint_all(&outcome.root, &outcome.files, &mut outcome.progress)
//!     .unwrap();
//!
//! println!("Fingerprinted {} files", records.len());
//! ```

mod fingerprint;
mod progress;
mod scanner;

pub use fingerprint::{Fingerprinter, HeuristicTokenCounter, TokenCounter, hash_content};
pub use progress::{ScanPhase, ScanProgress};
pub use scanner::{ScanOutcome, TreeScanner};

// Re-export core types for convenience
pub use indexdelta_core::{ContentHash, FileRecord, FilesystemError, IndexConfig};
