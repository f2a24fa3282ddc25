//! Index configuration types.

use std::path::{Path, PathBuf};

use derive_builder::Builder;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Environment variable holding comma-separated ignored directory names.
pub const ENV_IGNORE_LIST: &str = "IGNORE_LIST";

/// Environment variable holding comma-separated accepted extensions.
pub const ENV_EXTENSIONS: &str = "FILE_EXTENSIONS_TO_PROCESS";

/// Directory names skipped when `IGNORE_LIST` is not set.
pub const DEFAULT_IGNORE_LIST: &[&str] = &[".git", "node_modules", ".indexdelta"];

/// Extensions indexed when `FILE_EXTENSIONS_TO_PROCESS` is not set.
pub const DEFAULT_EXTENSIONS: &[&str] = &[
    ".js", ".jsx", ".ts", ".tsx", ".py", ".rs", ".go", ".java", ".md",
];

/// Configuration for an indexing run.
#[derive(Debug, Clone, Builder, Serialize, Deserialize)]
#[builder(setter(into), build_fn(validate = "Self::validate"))]
pub struct IndexConfig {
    /// Root directory of the source tree.
    pub root: PathBuf,

    /// Directory names whose whole subtree is skipped (exact match).
    #[builder(default = "default_ignore_dirs()")]
    #[serde(default = "default_ignore_dirs")]
    pub ignore_dirs: Vec<String>,

    /// Accepted file extensions, leading dot included.
    #[builder(default = "default_extensions()")]
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,

    /// Number of threads for walking and fingerprinting (0 = auto-detect).
    #[builder(default = "0")]
    #[serde(default)]
    pub threads: usize,

    /// Drop zero-length files before reconciliation.
    ///
    /// A dropped file is invisible to the reconciler, so an indexed file that
    /// later becomes empty is classified as removed and a sync prunes its entry.
    #[builder(default = "false")]
    #[serde(default)]
    pub skip_empty: bool,
}

fn default_ignore_dirs() -> Vec<String> {
    DEFAULT_IGNORE_LIST.iter().map(|s| s.to_string()).collect()
}

fn default_extensions() -> Vec<String> {
    DEFAULT_EXTENSIONS.iter().map(|s| s.to_string()).collect()
}

impl IndexConfigBuilder {
    fn validate(&self) -> Result<(), String> {
        match self.root {
            Some(ref root) if root.as_os_str().is_empty() => {
                return Err("Root path cannot be empty".to_string());
            }
            None => return Err("Root path is required".to_string()),
            _ => {}
        }
        if let Some(ref extensions) = self.extensions {
            if extensions.iter().all(|e| e.trim_start_matches('.').is_empty()) {
                return Err("At least one file extension is required".to_string());
            }
        }
        Ok(())
    }
}

impl IndexConfig {
    /// Create a new index config builder.
    pub fn builder() -> IndexConfigBuilder {
        IndexConfigBuilder::default()
    }

    /// Create a config with default ignore list and extensions.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            ignore_dirs: default_ignore_dirs(),
            extensions: default_extensions(),
            threads: 0,
            skip_empty: false,
        }
    }

    /// Build a config from `IGNORE_LIST` and `FILE_EXTENSIONS_TO_PROCESS`.
    pub fn from_env(root: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        Self::from_lookup(root, |key| std::env::var(key).ok())
    }

    /// Build a config reading variables through `lookup`.
    ///
    /// Unset variables fall back to the defaults. A variable that is set
    /// but contains no usable entry is taken as an empty list.
    pub fn from_lookup<F>(root: impl Into<PathBuf>, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut builder = Self::builder();
        builder.root(root.into());

        if let Some(raw) = lookup(ENV_IGNORE_LIST) {
            builder.ignore_dirs(parse_list(&raw));
        }
        if let Some(raw) = lookup(ENV_EXTENSIONS) {
            let extensions: Vec<String> = parse_list(&raw)
                .into_iter()
                .map(|e| normalize_extension(&e))
                .collect();
            builder.extensions(extensions);
        }

        Ok(builder.build()?)
    }

    /// Check whether a directory with this name is pruned from traversal.
    pub fn is_ignored_dir(&self, name: &str) -> bool {
        self.ignore_dirs.iter().any(|d| d == name)
    }

    /// Check whether a file is eligible by its extension.
    ///
    /// Matching is exact and case-sensitive. A dotfile such as `.env` has
    /// no extension and is never accepted.
    pub fn accepts_file(&self, path: &Path) -> bool {
        let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
            return false;
        };
        self.extensions
            .iter()
            .any(|accepted| accepted.strip_prefix('.').unwrap_or(accepted) == ext)
    }
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self::new(".")
    }
}

/// Split a comma-separated list, trimming entries and dropping empty ones.
fn parse_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn normalize_extension(ext: &str) -> String {
    if ext.starts_with('.') {
        ext.to_string()
    } else {
        format!(".{ext}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_config_builder() {
        let config = IndexConfig::builder()
            .root("/home/user/project")
            .threads(4usize)
            .skip_empty(true)
            .build()
            .unwrap();

        assert_eq!(config.root, PathBuf::from("/home/user/project"));
        assert_eq!(config.threads, 4);
        assert!(config.skip_empty);
        assert!(config.is_ignored_dir("node_modules"));
    }

    #[test]
    fn test_builder_requires_root() {
        assert!(IndexConfig::builder().build().is_err());
        assert!(IndexConfig::builder().root("").build().is_err());
    }

    #[test]
    fn test_builder_rejects_empty_extensions() {
        let result = IndexConfig::builder()
            .root("/test")
            .extensions(Vec::<String>::new())
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn test_from_lookup_parses_lists() {
        let lookup = lookup_from(&[
            (ENV_IGNORE_LIST, " node_modules, dist ,,target"),
            (ENV_EXTENSIONS, ".js, ts ,.py"),
        ]);
        let config = IndexConfig::from_lookup("/repo", lookup).unwrap();

        assert_eq!(config.ignore_dirs, vec!["node_modules", "dist", "target"]);
        assert_eq!(config.extensions, vec![".js", ".ts", ".py"]);
    }

    #[test]
    fn test_from_lookup_defaults_when_unset() {
        let config = IndexConfig::from_lookup("/repo", |_| None).unwrap();
        assert_eq!(config.ignore_dirs, default_ignore_dirs());
        assert_eq!(config.extensions, default_extensions());
    }

    #[test]
    fn test_from_lookup_empty_extensions_is_error() {
        let lookup = lookup_from(&[(ENV_EXTENSIONS, " , ")]);
        let err = IndexConfig::from_lookup("/repo", lookup).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { .. }));
    }

    #[test]
    fn test_ignored_dir_is_exact_match() {
        let config = IndexConfig::new("/test");
        assert!(config.is_ignored_dir("node_modules"));
        assert!(!config.is_ignored_dir("node_modules_backup"));
        assert!(!config.is_ignored_dir("Node_Modules"));
    }

    #[test]
    fn test_accepts_file() {
        let config = IndexConfig::builder()
            .root("/test")
            .extensions(vec![".js".to_string(), "rs".to_string()])
            .build()
            .unwrap();

        assert!(config.accepts_file(Path::new("src/a.js")));
        assert!(config.accepts_file(Path::new("lib.rs")));
        assert!(config.accepts_file(Path::new("archive.min.js")));
        assert!(!config.accepts_file(Path::new("a.JS")));
        assert!(!config.accepts_file(Path::new("a.json")));
        assert!(!config.accepts_file(Path::new(".js")));
        assert!(!config.accepts_file(Path::new("Makefile")));
    }
}
