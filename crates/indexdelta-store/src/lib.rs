//! Persisted manifest for indexdelta.
//!
//! The manifest is a single SQLite table keyed by the file's relative path.
//! Every write replaces a whole row, so a stored hash always travels with the
//! summary computed from that content.
//!
//! ```rust,no_run
//! use indexdelta_store::ManifestStore;
//!
//! let store = ManifestStore::open_in("/path/to/repo/.indexdelta").unwrap();
//! for known in store.list_all().unwrap() {
//!     println!("{} {}", known.path, known.hash);
//! }
//! store.close().unwrap();
//! ```

mod error;
mod store;

pub use error::StoreError;
pub use store::{MANIFEST_FILE_NAME, ManifestStore, SCHEMA_VERSION};

pub use indexdelta_core::{ManifestEntry, ManifestProjection};
