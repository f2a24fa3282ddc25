//! Error types for filesystem access and configuration.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while walking or reading the source tree.
///
/// Filtering outcomes (an ignored directory, a rejected extension, an empty
/// file) are never reported through this type.
#[derive(Debug, Error)]
pub enum FilesystemError {
    /// Permission denied for a path.
    #[error("Permission denied: {path}")]
    PermissionDenied { path: PathBuf },

    /// Path not found, including paths that vanished mid-scan.
    #[error("Path not found: {path}")]
    NotFound { path: PathBuf },

    /// Root path is not a directory.
    #[error("Root path is not a directory: {path}")]
    NotADirectory { path: PathBuf },

    /// A file handed to the fingerprinter does not live under the root.
    #[error("Path {path} is not under root {root}")]
    OutsideRoot { path: PathBuf, root: PathBuf },

    /// Generic I/O error.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl FilesystemError {
    /// Create an I/O error with path context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        match source.kind() {
            std::io::ErrorKind::PermissionDenied => Self::PermissionDenied { path },
            std::io::ErrorKind::NotFound => Self::NotFound { path },
            _ => Self::Io { path, source },
        }
    }

    /// The path the error refers to.
    pub fn path(&self) -> &std::path::Path {
        match self {
            Self::PermissionDenied { path }
            | Self::NotFound { path }
            | Self::NotADirectory { path }
            | Self::OutsideRoot { path, .. }
            | Self::Io { path, .. } => path,
        }
    }
}

/// Invalid index configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {message}")]
    Invalid { message: String },
}

impl From<crate::config::IndexConfigBuilderError> for ConfigError {
    fn from(err: crate::config::IndexConfigBuilderError) -> Self {
        Self::Invalid {
            message: err.to_string(),
        }
    }
}
