use indexdelta_core::{
    ContentHash, FileRecord, FilesystemError, IndexConfig, ManifestEntry, Summary,
    relative_posix_path,
};
use std::path::{Path, PathBuf};

fn sample_record(path: &str, hash_byte: u8) -> FileRecord {
    FileRecord {
        relative_path: path.to_string(),
        content: String::new(),
        token_count: 0,
        content_hash: ContentHash::new([hash_byte; 32]),
        modified_at: 42,
        size: 0,
    }
}

#[test]
fn test_content_hash_equality() {
    let hash = ContentHash::new([0xab; 32]);
    let same = ContentHash::new([0xab; 32]);
    let different = ContentHash::new([0xcd; 32]);

    assert_eq!(hash, same);
    assert_ne!(hash, different);
    assert!(hash.to_hex().starts_with("ab"));
}

#[test]
fn test_empty_record_is_representable() {
    let record = sample_record("empty.js", 0);
    assert!(record.is_empty());
    assert_eq!(record.projection().path, "empty.js");
}

#[test]
fn test_record_json_omits_content() {
    let mut record = sample_record("a.js", 1);
    record.content = "secret body".to_string();
    let json = serde_json::to_string(&record).unwrap();

    assert!(!json.contains("secret body"));
    assert!(json.contains("\"relative_path\":\"a.js\""));
}

#[test]
fn test_entry_replacement_changes_every_column() {
    let first = ManifestEntry::from_record(&sample_record("a.js", 1), Summary::default());
    let second = ManifestEntry::from_record(
        &sample_record("a.js", 2),
        Summary::new("new", 3, vec!["lodash".to_string()]),
    );

    assert_eq!(first.path, second.path);
    assert_ne!(first.hash, second.hash);
    assert_ne!(first.summary, second.summary);
    assert_ne!(first.dependencies, second.dependencies);
}

#[test]
fn test_config_defaults() {
    let config = IndexConfig::default();
    assert_eq!(config.root, PathBuf::from("."));
    assert!(config.is_ignored_dir(".git"));
    assert!(config.accepts_file(Path::new("index.ts")));
    assert!(!config.skip_empty);
}

#[test]
fn test_config_serde_defaults() {
    let config: IndexConfig = serde_json::from_str(r#"{"root":"/repo"}"#).unwrap();
    assert_eq!(config.root, PathBuf::from("/repo"));
    assert!(config.is_ignored_dir("node_modules"));
    assert_eq!(config.threads, 0);
}

#[test]
fn test_relative_path_outside_root() {
    let err = relative_posix_path(Path::new("/a"), Path::new("/b/c.js")).unwrap_err();
    assert!(matches!(err, FilesystemError::OutsideRoot { .. }));
}
