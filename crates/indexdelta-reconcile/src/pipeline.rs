//! One indexing run, from tree walk to change set.

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Instant;

use tokio::sync::broadcast;

use indexdelta_core::{FileRecord, IndexConfig, ManifestEntry, Summary};
use indexdelta_scan::{Fingerprinter, ScanPhase, ScanProgress, TokenCounter, TreeScanner};
use indexdelta_store::{ManifestStore, StoreError};

use crate::error::IndexError;
use crate::reconcile::{ChangeSet, reconcile};

/// Drives scan, fingerprint and reconcile for one configuration.
pub struct Indexer {
    config: IndexConfig,
    scanner: TreeScanner,
    fingerprinter: Fingerprinter,
}

impl Indexer {
    /// Create an indexer with the heuristic token counter.
    pub fn new(config: IndexConfig) -> Self {
        let scanner = TreeScanner::new();
        let fingerprinter = Fingerprinter::new().with_progress(scanner.progress_sender());
        Self {
            config,
            scanner,
            fingerprinter,
        }
    }

    /// Create an indexer with a caller-supplied token counter.
    pub fn with_counter(config: IndexConfig, counter: impl TokenCounter + 'static) -> Self {
        let scanner = TreeScanner::new();
        let fingerprinter =
            Fingerprinter::with_counter(counter).with_progress(scanner.progress_sender());
        Self {
            config,
            scanner,
            fingerprinter,
        }
    }

    pub fn config(&self) -> &IndexConfig {
        &self.config
    }

    /// Subscribe to progress snapshots from every stage of [`Indexer::plan`].
    pub fn subscribe(&self) -> broadcast::Receiver<ScanProgress> {
        self.scanner.subscribe()
    }

    /// Scan the tree and classify it against `store`.
    ///
    /// Nothing is written. The caller applies the plan with [`commit`] and
    /// [`prune_removed`].
    pub fn plan(&self, store: &ManifestStore) -> Result<IndexPlan, IndexError> {
        let start = Instant::now();

        let mut outcome = self.scanner.scan(&self.config)?;
        let mut records =
            self.fingerprinter
                .fingerprint_all(&outcome.root, &outcome.files, &mut outcome.progress)?;

        if self.config.skip_empty {
            let before = records.len();
            records.retain(|record| !record.is_empty());
            tracing::debug!(skipped = before - records.len(), "dropped empty files");
        }

        let manifest = store.list_all()?;
        let changes = reconcile(&records, &manifest);

        let mut progress = outcome.progress;
        progress.phase = ScanPhase::Finished;
        progress.elapsed = progress.elapsed.max(start.elapsed());
        let _ = self.scanner.progress_sender().send(progress.clone());

        tracing::info!(
            root = %outcome.root.display(),
            added = changes.added.len(),
            modified = changes.modified.len(),
            unchanged = changes.unchanged.len(),
            removed = changes.removed.len(),
            "plan ready"
        );

        Ok(IndexPlan::new(outcome.root, records, changes, progress))
    }
}

/// Result of [`Indexer::plan`].
#[derive(Debug, Clone)]
pub struct IndexPlan {
    /// Canonical root the scan ran against.
    pub root: PathBuf,
    /// Every live record, in scan order.
    pub records: Vec<FileRecord>,
    pub changes: ChangeSet,
    /// Final progress, phase [`ScanPhase::Finished`].
    pub progress: ScanProgress,
    positions: HashMap<String, usize>,
}

impl IndexPlan {
    fn new(
        root: PathBuf,
        records: Vec<FileRecord>,
        changes: ChangeSet,
        progress: ScanProgress,
    ) -> Self {
        let mut positions = HashMap::with_capacity(records.len());
        for (idx, record) in records.iter().enumerate() {
            positions.entry(record.relative_path.clone()).or_insert(idx);
        }
        Self {
            root,
            records,
            changes,
            progress,
            positions,
        }
    }

    /// Live record for `path`.
    pub fn record(&self, path: &str) -> Option<&FileRecord> {
        self.positions.get(path).map(|&idx| &self.records[idx])
    }

    /// Records of added paths, then modified ones.
    pub fn pending_records(&self) -> impl Iterator<Item = &FileRecord> {
        self.changes.pending().filter_map(|path| self.record(path))
    }
}

/// Record the downstream result for one file, replacing any previous entry.
pub fn commit(
    store: &ManifestStore,
    record: &FileRecord,
    summary: Summary,
) -> Result<ManifestEntry, StoreError> {
    let entry = ManifestEntry::from_record(record, summary);
    store.upsert(&entry)?;
    tracing::trace!(path = %entry.path, "committed");
    Ok(entry)
}

/// Delete every removed path from `store`. Returns how many rows went away.
pub fn prune_removed(store: &ManifestStore, changes: &ChangeSet) -> Result<usize, StoreError> {
    let mut pruned = 0;
    for path in &changes.removed {
        if store.delete(path)? {
            pruned += 1;
        }
    }
    if pruned > 0 {
        tracing::debug!(pruned, "pruned removed paths");
    }
    Ok(pruned)
}
