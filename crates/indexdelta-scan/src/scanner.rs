//! JWalk-based source tree scanner.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use jwalk::{Parallelism, WalkDir};
use tokio::sync::broadcast;

use indexdelta_core::{FilesystemError, IndexConfig};

use crate::progress::ScanProgress;

/// Matched files between two progress broadcasts.
const PROGRESS_INTERVAL: u64 = 500;

/// Result of walking a source tree.
#[derive(Debug, Clone)]
pub struct ScanOutcome {
    /// Canonicalized root that was walked.
    pub root: PathBuf,
    /// Absolute paths of eligible files, depth-first, sorted by name within
    /// each directory.
    pub files: Vec<PathBuf>,
    /// Counters for this walk.
    pub progress: ScanProgress,
}

/// Directory walker applying the ignore list and the extension filter.
pub struct TreeScanner {
    progress_tx: broadcast::Sender<ScanProgress>,
}

impl TreeScanner {
    /// Create a new scanner.
    pub fn new() -> Self {
        let (progress_tx, _) = broadcast::channel(100);
        Self { progress_tx }
    }

    /// Subscribe to scan progress updates.
    pub fn subscribe(&self) -> broadcast::Receiver<ScanProgress> {
        self.progress_tx.subscribe()
    }

    /// Sender other stages can publish on so one subscription sees the
    /// whole run.
    pub fn progress_sender(&self) -> broadcast::Sender<ScanProgress> {
        self.progress_tx.clone()
    }

    /// Walk `config.root` and collect the eligible files.
    ///
    /// Any entry that cannot be listed or statted aborts the walk.
    pub fn scan(&self, config: &IndexConfig) -> Result<ScanOutcome, FilesystemError> {
        let start = Instant::now();
        let root = config
            .root
            .canonicalize()
            .map_err(|e| FilesystemError::io(&config.root, e))?;

        if !root.is_dir() {
            return Err(FilesystemError::NotADirectory { path: root });
        }

        let parallelism = match config.threads {
            0 => Parallelism::RayonDefaultPool {
                busy_timeout: std::time::Duration::from_millis(100),
            },
            1 => Parallelism::Serial,
            n => Parallelism::RayonNewPool(n),
        };

        let ignored = Arc::new(config.ignore_dirs.clone());
        let pruned = Arc::new(AtomicU64::new(0));

        let walker = WalkDir::new(&root)
            .parallelism(parallelism)
            .sort(true)
            .skip_hidden(false)
            .follow_links(false)
            .process_read_dir({
                let ignored = Arc::clone(&ignored);
                let pruned = Arc::clone(&pruned);
                move |depth, dir, _state, children| {
                    // The synthetic read that yields the root itself.
                    if depth.is_none() {
                        return;
                    }
                    tracing::debug!(dir = %dir.display(), "entering directory");
                    children.retain(|child| {
                        let Ok(entry) = child else {
                            return true;
                        };
                        if !entry.file_type().is_dir() {
                            return true;
                        }
                        let name = entry.file_name().to_string_lossy();
                        if ignored.iter().any(|d| d.as_str() == name.as_ref()) {
                            pruned.fetch_add(1, Ordering::Relaxed);
                            tracing::trace!(dir = %entry.path().display(), "pruned ignored directory");
                            false
                        } else {
                            true
                        }
                    });
                }
            });

        let mut progress = ScanProgress::new();
        let mut files = Vec::new();

        for entry_result in walker {
            let mut entry = entry_result.map_err(|err| walk_error(&root, err))?;
            let file_type = entry.file_type();

            if file_type.is_dir() {
                // jwalk yields an unlistable directory as Ok and parks the failure here.
                if let Some(err) = entry.read_children_error.take() {
                    return Err(walk_error(&entry.path(), err));
                }
                progress.dirs_scanned += 1;
                continue;
            }
            // Symlinks and special files are not indexed.
            if !file_type.is_file() {
                continue;
            }

            let path = entry.path();
            if !config.accepts_file(&path) {
                progress.files_rejected += 1;
                continue;
            }

            let metadata = entry.metadata().map_err(|err| walk_error(&path, err))?;
            progress.files_matched += 1;
            progress.bytes_matched += metadata.len();
            progress.current_path = path.clone();

            if progress.files_matched % PROGRESS_INTERVAL == 0 {
                progress.elapsed = start.elapsed();
                let _ = self.progress_tx.send(progress.clone());
            }

            files.push(path);
        }

        progress.dirs_pruned = pruned.load(Ordering::Relaxed);
        progress.elapsed = start.elapsed();
        let _ = self.progress_tx.send(progress.clone());

        tracing::info!(
            root = %root.display(),
            files = progress.files_matched,
            dirs = progress.dirs_scanned,
            pruned = progress.dirs_pruned,
            "scan complete"
        );

        Ok(ScanOutcome {
            root,
            files,
            progress,
        })
    }
}

impl Default for TreeScanner {
    fn default() -> Self {
        Self::new()
    }
}

/// Convert a walker error into a `FilesystemError` naming the failing path.
fn walk_error(fallback: &Path, err: jwalk::Error) -> FilesystemError {
    let path = err
        .path()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| fallback.to_path_buf());
    let message = err.to_string();
    let source = err
        .into_io_error()
        .unwrap_or_else(|| io::Error::other(message));
    FilesystemError::io(path, source)
}
