//! Errors for a whole indexing run.

use thiserror::Error;

use indexdelta_core::FilesystemError;
use indexdelta_store::StoreError;

/// Failure of a scan, fingerprint or store step. The run stops at the first one.
#[derive(Debug, Error)]
pub enum IndexError {
    #[error(transparent)]
    Filesystem(#[from] FilesystemError),

    #[error(transparent)]
    Store(#[from] StoreError),
}
