//! Scan progress reporting.

use std::path::PathBuf;
use std::time::Duration;

/// Stage of an indexing run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanPhase {
    /// Walking the tree and filtering entries.
    Walking,
    /// Reading and hashing matched files.
    Fingerprinting,
    /// Reconciliation finished.
    Finished,
}

/// Progress information for a run.
///
/// The scanner returns one of these and the fingerprinter advances it; the
/// orchestrator owns it between stages.
#[derive(Debug, Clone)]
pub struct ScanProgress {
    /// Current stage.
    pub phase: ScanPhase,
    /// Directories entered, the root included.
    pub dirs_scanned: u64,
    /// Directories skipped because their name is on the ignore list.
    pub dirs_pruned: u64,
    /// Files accepted by the extension filter.
    pub files_matched: u64,
    /// Files rejected by the extension filter.
    pub files_rejected: u64,
    /// Files fingerprinted so far.
    pub files_fingerprinted: u64,
    /// Total size of matched files.
    pub bytes_matched: u64,
    /// Bytes read by the fingerprinter so far.
    pub bytes_read: u64,
    /// Last path touched.
    pub current_path: PathBuf,
    /// Time elapsed since the scan started.
    pub elapsed: Duration,
}

impl ScanProgress {
    /// Create initial progress state.
    pub fn new() -> Self {
        Self {
            phase: ScanPhase::Walking,
            dirs_scanned: 0,
            dirs_pruned: 0,
            files_matched: 0,
            files_rejected: 0,
            files_fingerprinted: 0,
            bytes_matched: 0,
            bytes_read: 0,
            current_path: PathBuf::new(),
            elapsed: Duration::ZERO,
        }
    }

    /// Calculate fingerprint rate in files per second.
    pub fn files_per_second(&self) -> f64 {
        if self.elapsed.as_secs_f64() > 0.0 {
            self.files_fingerprinted as f64 / self.elapsed.as_secs_f64()
        } else {
            0.0
        }
    }

    /// Fraction of matched files already fingerprinted, in `0.0..=1.0`.
    pub fn fingerprint_ratio(&self) -> f64 {
        if self.files_matched == 0 {
            return 0.0;
        }
        (self.files_fingerprinted as f64 / self.files_matched as f64).min(1.0)
    }

    /// Render a single-line textual indicator.
    pub fn render_line(&self) -> String {
        match self.phase {
            ScanPhase::Walking => format!(
                "scanning: {} dirs, {} files matched ({})",
                self.dirs_scanned,
                self.files_matched,
                humansize::format_size(self.bytes_matched, humansize::BINARY),
            ),
            ScanPhase::Fingerprinting => format!(
                "fingerprinting: {}/{} files ({:.1}%) {}",
                self.files_fingerprinted,
                self.files_matched,
                self.fingerprint_ratio() * 100.0,
                self.current_path.display(),
            ),
            ScanPhase::Finished => format!(
                "done: {} files in {} dirs ({} pruned, {} skipped by extension) in {:.2}s",
                self.files_fingerprinted,
                self.dirs_scanned,
                self.dirs_pruned,
                self.files_rejected,
                self.elapsed.as_secs_f64(),
            ),
        }
    }
}

impl Default for ScanProgress {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ratio_handles_no_files() {
        let progress = ScanProgress::new();
        assert_eq!(progress.fingerprint_ratio(), 0.0);
        assert_eq!(progress.files_per_second(), 0.0);
    }

    #[test]
    fn test_render_fingerprinting_line() {
        let mut progress = ScanProgress::new();
        progress.phase = ScanPhase::Fingerprinting;
        progress.files_matched = 4;
        progress.files_fingerprinted = 1;
        progress.current_path = PathBuf::from("src/a.js");

        let line = progress.render_line();
        assert!(line.starts_with("fingerprinting: 1/4 files (25.0%)"));
        assert!(line.ends_with("src/a.js"));
    }

    #[test]
    fn test_render_finished_line() {
        let mut progress = ScanProgress::new();
        progress.phase = ScanPhase::Finished;
        progress.files_fingerprinted = 2;
        progress.dirs_scanned = 1;
        progress.dirs_pruned = 1;

        assert!(progress.render_line().starts_with("done: 2 files in 1 dirs (1 pruned"));
    }
}
