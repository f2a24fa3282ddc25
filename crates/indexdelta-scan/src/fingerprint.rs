//! Content fingerprinting.
//!
//! A fingerprint is the BLAKE3 digest of a file's raw bytes together with
//! its token count and modification time. The digest depends on nothing but
//! the bytes, so the same content hashes identically on any machine.

use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Instant, SystemTime, UNIX_EPOCH};

use blake3::Hasher;
use rayon::prelude::*;
use tokio::sync::broadcast;

use indexdelta_core::{ContentHash, FileRecord, FilesystemError, relative_posix_path};

use crate::progress::{ScanPhase, ScanProgress};

/// Files fingerprinted between two progress broadcasts.
const PROGRESS_INTERVAL: u64 = 200;

/// Inputs above this size are hashed with the multithreaded BLAKE3 path.
const PARALLEL_HASH_THRESHOLD: usize = 128 * 1024;

/// Counts the tokens of a piece of text.
pub trait TokenCounter: Send + Sync {
    fn count_tokens(&self, text: &str) -> u64;
}

impl<F> TokenCounter for F
where
    F: Fn(&str) -> u64 + Send + Sync,
{
    fn count_tokens(&self, text: &str) -> u64 {
        self(text)
    }
}

/// Estimates one token per four characters, rounded up.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeuristicTokenCounter;

impl TokenCounter for HeuristicTokenCounter {
    fn count_tokens(&self, text: &str) -> u64 {
        text.chars().count().div_ceil(4) as u64
    }
}

/// Hash a byte slice.
pub fn hash_content(bytes: &[u8]) -> ContentHash {
    let hash = if bytes.len() > PARALLEL_HASH_THRESHOLD {
        let mut hasher = Hasher::new();
        hasher.update_rayon(bytes);
        hasher.finalize()
    } else {
        blake3::hash(bytes)
    };
    ContentHash::new(*hash.as_bytes())
}

/// Builds [`FileRecord`]s from files on disk.
pub struct Fingerprinter {
    counter: Arc<dyn TokenCounter>,
    progress_tx: Option<broadcast::Sender<ScanProgress>>,
}

impl Fingerprinter {
    /// Create a fingerprinter using [`HeuristicTokenCounter`].
    pub fn new() -> Self {
        Self::with_counter(HeuristicTokenCounter)
    }

    /// Create a fingerprinter with a custom token counter.
    pub fn with_counter(counter: impl TokenCounter + 'static) -> Self {
        Self {
            counter: Arc::new(counter),
            progress_tx: None,
        }
    }

    /// Publish progress snapshots on `tx` while fingerprinting in bulk.
    pub fn with_progress(mut self, tx: broadcast::Sender<ScanProgress>) -> Self {
        self.progress_tx = Some(tx);
        self
    }

    /// Read one file under `root` and fingerprint it.
    ///
    /// Invalid UTF-8 is replaced in `content`; the hash always covers the
    /// raw bytes.
    pub fn fingerprint(&self, root: &Path, path: &Path) -> Result<FileRecord, FilesystemError> {
        let relative_path = relative_posix_path(root, path)?;

        let mut file = File::open(path).map_err(|e| FilesystemError::io(path, e))?;
        let metadata = file.metadata().map_err(|e| FilesystemError::io(path, e))?;
        let modified = metadata
            .modified()
            .map_err(|e| FilesystemError::io(path, e))?;

        let mut bytes = Vec::with_capacity(usize::try_from(metadata.len()).unwrap_or(0));
        file.read_to_end(&mut bytes)
            .map_err(|e| FilesystemError::io(path, e))?;

        let content_hash = hash_content(&bytes);
        let size = bytes.len() as u64;
        let content = match String::from_utf8(bytes) {
            Ok(text) => text,
            Err(err) => String::from_utf8_lossy(err.as_bytes()).into_owned(),
        };
        let token_count = self.counter.count_tokens(&content);

        Ok(FileRecord {
            relative_path,
            content,
            token_count,
            content_hash,
            modified_at: millis_since_epoch(modified),
            size,
        })
    }

    /// Fingerprint every path in parallel, keeping input order.
    ///
    /// The first failure aborts the batch. `progress` is advanced with the
    /// number of files and bytes read.
    pub fn fingerprint_all(
        &self,
        root: &Path,
        paths: &[PathBuf],
        progress: &mut ScanProgress,
    ) -> Result<Vec<FileRecord>, FilesystemError> {
        let start = Instant::now();
        progress.phase = ScanPhase::Fingerprinting;
        let base = progress.clone();
        let done = AtomicU64::new(0);
        let bytes = AtomicU64::new(0);

        let records = paths
            .par_iter()
            .map(|path| {
                let record = self.fingerprint(root, path)?;
                let count = done.fetch_add(1, Ordering::Relaxed) + 1;
                let read = bytes.fetch_add(record.size, Ordering::Relaxed) + record.size;
                if count % PROGRESS_INTERVAL == 0 {
                    if let Some(tx) = &self.progress_tx {
                        let mut snapshot = base.clone();
                        snapshot.files_fingerprinted += count;
                        snapshot.bytes_read += read;
                        snapshot.current_path = path.clone();
                        snapshot.elapsed += start.elapsed();
                        let _ = tx.send(snapshot);
                    }
                }
                Ok(record)
            })
            .collect::<Result<Vec<_>, FilesystemError>>()?;

        progress.files_fingerprinted += done.into_inner();
        progress.bytes_read += bytes.into_inner();
        if let Some(last) = paths.last() {
            progress.current_path = last.clone();
        }
        progress.elapsed += start.elapsed();
        if let Some(tx) = &self.progress_tx {
            let _ = tx.send(progress.clone());
        }

        tracing::debug!(
            files = records.len(),
            bytes = progress.bytes_read,
            "fingerprinting complete"
        );

        Ok(records)
    }
}

impl Default for Fingerprinter {
    fn default() -> Self {
        Self::new()
    }
}

/// Milliseconds since the Unix epoch, negative for earlier times.
fn millis_since_epoch(time: SystemTime) -> i64 {
    match time.duration_since(UNIX_EPOCH) {
        Ok(after) => i64::try_from(after.as_millis()).unwrap_or(i64::MAX),
        Err(err) => -i64::try_from(err.duration().as_millis()).unwrap_or(i64::MAX),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::time::Duration;
    use tempfile::TempDir;

    fn create_test_files() -> TempDir {
        let temp = TempDir::new().unwrap();
        let root = temp.path();

        fs::write(root.join("file1.js"), "duplicate content here").unwrap();
        fs::write(root.join("file2.js"), "duplicate content here").unwrap();
        fs::write(root.join("file3.js"), "unique content").unwrap();
        fs::write(root.join("empty.js"), "").unwrap();

        fs::create_dir(root.join("subdir")).unwrap();
        fs::write(root.join("subdir/file4.js"), "duplicate content here").unwrap();

        temp
    }

    #[test]
    fn test_hash_content_is_deterministic() {
        assert_eq!(hash_content(b"x"), hash_content(b"x"));
        assert_ne!(hash_content(b"x"), hash_content(b"y"));
        assert_eq!(
            hash_content(b"").to_hex(),
            "af1349b9f5f9a1a6a0404dea36dcc9499bcb25c9adc112b7cc9a93cae41f3262"
        );
    }

    #[test]
    fn test_large_input_matches_single_threaded_hash() {
        let data = vec![7u8; PARALLEL_HASH_THRESHOLD * 3];
        assert_eq!(hash_content(&data).0, *blake3::hash(&data).as_bytes());
    }

    #[test]
    fn test_same_content_same_hash() {
        let temp = create_test_files();
        let root = temp.path();
        let fp = Fingerprinter::new();

        let one = fp.fingerprint(root, &root.join("file1.js")).unwrap();
        let two = fp.fingerprint(root, &root.join("subdir/file4.js")).unwrap();
        let three = fp.fingerprint(root, &root.join("file3.js")).unwrap();

        assert_eq!(one.content_hash, two.content_hash);
        assert_ne!(one.content_hash, three.content_hash);
        assert_eq!(two.relative_path, "subdir/file4.js");
    }

    #[test]
    fn test_empty_file_is_a_record() {
        let temp = create_test_files();
        let record = Fingerprinter::new()
            .fingerprint(temp.path(), &temp.path().join("empty.js"))
            .unwrap();

        assert!(record.is_empty());
        assert_eq!(record.token_count, 0);
        assert_eq!(record.content, "");
        assert_eq!(record.content_hash, hash_content(b""));
    }

    #[test]
    fn test_custom_counter() {
        let temp = create_test_files();
        let fp = Fingerprinter::with_counter(|text: &str| text.split_whitespace().count() as u64);
        let record = fp
            .fingerprint(temp.path(), &temp.path().join("file1.js"))
            .unwrap();
        assert_eq!(record.token_count, 3);
    }

    #[test]
    fn test_heuristic_counter() {
        assert_eq!(HeuristicTokenCounter.count_tokens(""), 0);
        assert_eq!(HeuristicTokenCounter.count_tokens("abcd"), 1);
        assert_eq!(HeuristicTokenCounter.count_tokens("abcde"), 2);
    }

    #[test]
    fn test_missing_file_is_error() {
        let temp = TempDir::new().unwrap();
        let err = Fingerprinter::new()
            .fingerprint(temp.path(), &temp.path().join("gone.js"))
            .unwrap_err();
        assert!(matches!(err, FilesystemError::NotFound { .. }));
    }

    #[test]
    fn test_invalid_utf8_hashes_raw_bytes() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("bin.js");
        let raw = [0x66u8, 0xff, 0x6f];
        fs::write(&path, raw).unwrap();

        let record = Fingerprinter::new().fingerprint(temp.path(), &path).unwrap();
        assert_eq!(record.content_hash, hash_content(&raw));
        assert_eq!(record.content, "f\u{fffd}o");
        assert_eq!(record.size, 3);
    }

    #[test]
    fn test_fingerprint_all_keeps_order_and_counts() {
        let temp = create_test_files();
        let root = temp.path();
        let paths = vec![root.join("file3.js"), root.join("file1.js"), root.join("empty.js")];
        let mut progress = ScanProgress::new();
        progress.files_matched = 3;

        let records = Fingerprinter::new()
            .fingerprint_all(root, &paths, &mut progress)
            .unwrap();

        let names: Vec<_> = records.iter().map(|r| r.relative_path.as_str()).collect();
        assert_eq!(names, vec!["file3.js", "file1.js", "empty.js"]);
        assert_eq!(progress.files_fingerprinted, 3);
        assert_eq!(progress.phase, ScanPhase::Fingerprinting);
        assert_eq!(
            progress.bytes_read,
            ("unique content".len() + "duplicate content here".len()) as u64
        );
    }

    #[test]
    fn test_fingerprint_all_fails_on_missing_file() {
        let temp = create_test_files();
        let root = temp.path();
        let paths = vec![root.join("file1.js"), root.join("vanished.js")];

        let err = Fingerprinter::new()
            .fingerprint_all(root, &paths, &mut ScanProgress::new())
            .unwrap_err();
        assert_eq!(err.path(), root.join("vanished.js"));
    }

    #[test]
    fn test_millis_since_epoch() {
        assert_eq!(millis_since_epoch(UNIX_EPOCH + Duration::from_millis(1500)), 1500);
        assert_eq!(millis_since_epoch(UNIX_EPOCH - Duration::from_millis(20)), -20);
    }
}
