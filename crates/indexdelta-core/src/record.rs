//! File records produced by a scan and entries persisted in the manifest.

use std::fmt;

use serde::{Deserialize, Serialize};

/// BLAKE3 content hash identifying a file's bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct ContentHash(pub [u8; 32]);

impl ContentHash {
    /// Create a new ContentHash from raw bytes.
    pub fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Get the hash as a hex string.
    pub fn to_hex(&self) -> String {
        self.0.iter().map(|b| format!("{b:02x}")).collect()
    }

    /// Parse a 64-character hex digest.
    pub fn from_hex(hex: &str) -> Option<Self> {
        if hex.len() != 64 || !hex.is_ascii() {
            return None;
        }
        let mut bytes = [0u8; 32];
        for (i, byte) in bytes.iter_mut().enumerate() {
            *byte = u8::from_str_radix(&hex[i * 2..i * 2 + 2], 16).ok()?;
        }
        Some(Self(bytes))
    }

    /// Check whether a stored digest string names this hash.
    pub fn matches(&self, digest: &str) -> bool {
        Self::from_hex(digest).is_some_and(|other| other == *self)
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for b in &self.0 {
            write!(f, "{b:02x}")?;
        }
        Ok(())
    }
}

impl From<ContentHash> for String {
    fn from(hash: ContentHash) -> Self {
        hash.to_hex()
    }
}

impl TryFrom<String> for ContentHash {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::from_hex(&value).ok_or_else(|| format!("invalid content hash: {value}"))
    }
}

/// A file observed during the current scan.
///
/// Built fresh on every scan and discarded after reconciliation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    /// POSIX-style path relative to the scanned root.
    pub relative_path: String,
    /// File text at scan time.
    #[serde(skip_serializing)]
    #[serde(default)]
    pub content: String,
    /// Tokens counted over `content`.
    pub token_count: u64,
    /// Digest of the raw bytes.
    pub content_hash: ContentHash,
    /// Modification time in milliseconds since the Unix epoch.
    pub modified_at: i64,
    /// Size in bytes as read.
    pub size: u64,
}

impl FileRecord {
    /// Check if the file had no content.
    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// The lightweight view used for reconciliation.
    pub fn projection(&self) -> ManifestProjection {
        ManifestProjection {
            path: self.relative_path.clone(),
            hash: self.content_hash.to_hex(),
            timestamp: self.modified_at,
        }
    }
}

/// Output of the downstream summarizer for one file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Summary {
    pub text: String,
    pub token_count: u64,
    pub dependencies: Vec<String>,
}

impl Summary {
    pub fn new(text: impl Into<String>, token_count: u64, dependencies: Vec<String>) -> Self {
        Self {
            text: text.into(),
            token_count,
            dependencies,
        }
    }
}

/// A persisted manifest row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestEntry {
    /// Primary key, same domain as [`FileRecord::relative_path`].
    pub path: String,
    pub token_count: u64,
    pub summary: String,
    pub summary_token_count: u64,
    /// Digest of the content that produced `summary`.
    pub hash: String,
    /// Last observed modification time in milliseconds.
    pub timestamp: i64,
    pub dependencies: Vec<String>,
}

impl ManifestEntry {
    /// Build the entry for a processed file.
    ///
    /// The fingerprint and the summary are taken together so the stored hash
    /// always describes the content the summary was computed from.
    pub fn from_record(record: &FileRecord, summary: Summary) -> Self {
        Self {
            path: record.relative_path.clone(),
            token_count: record.token_count,
            summary: summary.text,
            summary_token_count: summary.token_count,
            hash: record.content_hash.to_hex(),
            timestamp: record.modified_at,
            dependencies: summary.dependencies,
        }
    }

    pub fn projection(&self) -> ManifestProjection {
        ManifestProjection {
            path: self.path.clone(),
            hash: self.hash.clone(),
            timestamp: self.timestamp,
        }
    }
}

/// The `{path, hash, timestamp}` view of a manifest entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ManifestProjection {
    pub path: String,
    pub hash: String,
    pub timestamp: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> FileRecord {
        FileRecord {
            relative_path: "src/a.js".to_string(),
            content: "x".to_string(),
            token_count: 1,
            content_hash: ContentHash::new([0x11; 32]),
            modified_at: 1_700_000_000_000,
            size: 1,
        }
    }

    #[test]
    fn test_hex_round_trip() {
        let hash = ContentHash::new([0xab; 32]);
        let hex = hash.to_hex();
        assert_eq!(hex.len(), 64);
        assert_eq!(ContentHash::from_hex(&hex), Some(hash));
        assert_eq!(hash.to_string(), hex);
    }

    #[test]
    fn test_from_hex_rejects_garbage() {
        assert!(ContentHash::from_hex("abc").is_none());
        assert!(ContentHash::from_hex(&"zz".repeat(32)).is_none());
        assert!(ContentHash::from_hex(&"é".repeat(32)).is_none());
    }

    #[test]
    fn test_matches_is_case_insensitive_hex() {
        let hash = ContentHash::new([0xab; 32]);
        assert!(hash.matches(&"AB".repeat(32)));
        assert!(!hash.matches(&"cd".repeat(32)));
        assert!(!hash.matches("not-a-digest"));
    }

    #[test]
    fn test_entry_from_record_pairs_hash_and_summary() {
        let record = record();
        let entry = ManifestEntry::from_record(
            &record,
            Summary::new("does x", 2, vec!["react".to_string()]),
        );

        assert_eq!(entry.path, "src/a.js");
        assert_eq!(entry.hash, record.content_hash.to_hex());
        assert_eq!(entry.summary, "does x");
        assert_eq!(entry.summary_token_count, 2);
        assert_eq!(entry.timestamp, record.modified_at);
        assert_eq!(entry.dependencies, vec!["react"]);
        assert_eq!(entry.projection(), record.projection());
    }

    #[test]
    fn test_content_hash_serializes_as_hex() {
        let hash = ContentHash::new([0x01; 32]);
        let json = serde_json::to_string(&hash).unwrap();
        assert_eq!(json, format!("\"{}\"", "01".repeat(32)));
        let back: ContentHash = serde_json::from_str(&json).unwrap();
        assert_eq!(back, hash);
    }
}
