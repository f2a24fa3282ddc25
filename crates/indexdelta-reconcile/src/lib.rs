//! Change detection for indexdelta.
//!
//! Compares the live state of a source tree against the persisted manifest
//! and partitions every path into added, modified, unchanged or removed.
//!
//! # Example
//!
//! ```rust,no_run
//! use indexdelta_reconcile::{IndexConfig, Indexer, ManifestStore, Summary, commit, prune_removed};
//!
//! let config = IndexConfig::new("/path/to/repo");
//! let store = ManifestStore::open_in("/path/to/repo/.indexdelta").unwrap();
//!
//! let plan = Indexer::new(config).plan(&store).unwrap();
//! prune_removed(&store, &plan.changes).unwrap();
//! for record in plan.pending_records() {
//!     commit(&store, record, Summary::default()).unwrap();
//! }
//! ```

mod error;
mod pipeline;
mod reconcile;

pub use error::IndexError;
pub use pipeline::{IndexPlan, Indexer, commit, prune_removed};
pub use reconcile::{ChangeCounts, ChangeKind, ChangeSet, reconcile};

pub use indexdelta_core::{FileRecord, IndexConfig, ManifestEntry, ManifestProjection, Summary};
pub use indexdelta_scan::{ScanPhase, ScanProgress, TokenCounter};
pub use indexdelta_store::{ManifestStore, StoreError};
