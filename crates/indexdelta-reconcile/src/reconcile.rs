//! Classification of a live scan against the manifest.
//!
//! Content hash is the only authority: a file whose modification time moved
//! but whose bytes did not is unchanged. Paths are compared exactly, so two
//! spellings that differ only in case are two different files.

use std::collections::{HashMap, HashSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use indexdelta_core::{FileRecord, ManifestProjection};

/// How a path changed since the manifest was written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    /// Present on disk, unknown to the manifest.
    Added,
    /// Known, but the content hash differs.
    Modified,
    /// Known with the same content hash.
    Unchanged,
    /// Known to the manifest, gone from disk.
    Removed,
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Added => write!(f, "added"),
            Self::Modified => write!(f, "modified"),
            Self::Unchanged => write!(f, "unchanged"),
            Self::Removed => write!(f, "removed"),
        }
    }
}

/// Number of paths in each class.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeCounts {
    pub added: usize,
    pub modified: usize,
    pub unchanged: usize,
    pub removed: usize,
}

/// Four-way partition of every path seen on disk or in the manifest.
///
/// `added`, `modified` and `unchanged` follow the order of the live scan;
/// `removed` follows the order of the manifest listing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeSet {
    pub added: Vec<String>,
    pub modified: Vec<String>,
    pub unchanged: Vec<String>,
    pub removed: Vec<String>,
}

impl ChangeSet {
    /// Class of `path`, if it appeared on either side.
    pub fn kind_of(&self, path: &str) -> Option<ChangeKind> {
        self.changes()
            .find(|(candidate, _)| *candidate == path)
            .map(|(_, kind)| kind)
    }

    /// Paths needing downstream processing: added, then modified.
    pub fn pending(&self) -> impl Iterator<Item = &str> {
        self.added
            .iter()
            .chain(self.modified.iter())
            .map(String::as_str)
    }

    /// True when the manifest already matches the tree.
    pub fn is_clean(&self) -> bool {
        self.added.is_empty() && self.modified.is_empty() && self.removed.is_empty()
    }

    /// Number of classified paths.
    pub fn total(&self) -> usize {
        self.added.len() + self.modified.len() + self.unchanged.len() + self.removed.len()
    }

    pub fn counts(&self) -> ChangeCounts {
        ChangeCounts {
            added: self.added.len(),
            modified: self.modified.len(),
            unchanged: self.unchanged.len(),
            removed: self.removed.len(),
        }
    }

    /// Every classified path with its class.
    pub fn changes(&self) -> impl Iterator<Item = (&str, ChangeKind)> {
        tagged(&self.added, ChangeKind::Added)
            .chain(tagged(&self.modified, ChangeKind::Modified))
            .chain(tagged(&self.unchanged, ChangeKind::Unchanged))
            .chain(tagged(&self.removed, ChangeKind::Removed))
    }
}

fn tagged(paths: &[String], kind: ChangeKind) -> impl Iterator<Item = (&str, ChangeKind)> {
    paths.iter().map(move |p| (p.as_str(), kind))
}

/// Diff the live records against the manifest projection.
///
/// Runs in O(N + M): the manifest is indexed by path once, then each side
/// is walked a single time. A path listed twice on the live side is
/// classified by its first record.
pub fn reconcile(live: &[FileRecord], manifest: &[ManifestProjection]) -> ChangeSet {
    let known: HashMap<&str, &ManifestProjection> =
        manifest.iter().map(|m| (m.path.as_str(), m)).collect();
    let mut seen: HashSet<&str> = HashSet::with_capacity(live.len() + manifest.len());
    let mut changes = ChangeSet::default();

    for record in live {
        let path = record.relative_path.as_str();
        if !seen.insert(path) {
            tracing::warn!(path, "path listed twice in live scan, keeping first");
            continue;
        }

        match known.get(path) {
            None => changes.added.push(path.to_string()),
            Some(stored) if record.content_hash.matches(&stored.hash) => {
                changes.unchanged.push(path.to_string())
            }
            Some(_) => changes.modified.push(path.to_string()),
        }
    }

    for stored in manifest {
        if seen.insert(stored.path.as_str()) {
            changes.removed.push(stored.path.clone());
        }
    }

    tracing::debug!(
        added = changes.added.len(),
        modified = changes.modified.len(),
        unchanged = changes.unchanged.len(),
        removed = changes.removed.len(),
        "reconciled"
    );

    changes
}
