//! SQLite manifest table.

use std::fs;
use std::path::{Path, PathBuf};

use rusqlite::{Connection, OptionalExtension, Row, params};

use indexdelta_core::{ManifestEntry, ManifestProjection};

use crate::error::StoreError;

/// File name of the manifest inside a metadata directory.
pub const MANIFEST_FILE_NAME: &str = "manifest.db";

/// Value kept in `PRAGMA user_version`.
pub const SCHEMA_VERSION: i32 = 1;

const UPSERT_SQL: &str = "
    INSERT INTO files (path, tokensCount, summary, summaryTokensCount, hash, timestamp, dependenciesLibs)
    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
    ON CONFLICT(path) DO UPDATE SET
        tokensCount = excluded.tokensCount,
        summary = excluded.summary,
        summaryTokensCount = excluded.summaryTokensCount,
        hash = excluded.hash,
        timestamp = excluded.timestamp,
        dependenciesLibs = excluded.dependenciesLibs
";

const SELECT_ENTRY_SQL: &str = "
    SELECT path, tokensCount, summary, summaryTokensCount, hash, timestamp, dependenciesLibs
    FROM files
";

/// Handle on the manifest database.
///
/// One handle is opened per indexing run. The connection is released by
/// [`ManifestStore::close`], or when the handle is dropped on an error path.
#[derive(Debug)]
pub struct ManifestStore {
    conn: Connection,
    path: Option<PathBuf>,
}

impl ManifestStore {
    /// Open (or create) the manifest at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        let conn = Connection::open(path)?;
        Self::init_schema(&conn)?;
        tracing::debug!(path = %path.display(), "opened manifest");

        Ok(Self {
            conn,
            path: Some(path.to_path_buf()),
        })
    }

    /// Open the manifest inside a metadata directory, creating the directory
    /// if needed.
    pub fn open_in(metadata_dir: impl AsRef<Path>) -> Result<Self, StoreError> {
        let dir = metadata_dir.as_ref();
        fs::create_dir_all(dir).map_err(|source| StoreError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
        Self::open(dir.join(MANIFEST_FILE_NAME))
    }

    /// Open a private in-memory manifest.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        Self::init_schema(&conn)?;
        Ok(Self { conn, path: None })
    }

    /// Location on disk, `None` for in-memory stores.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn init_schema(conn: &Connection) -> Result<(), StoreError> {
        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA busy_timeout = 5000;
            PRAGMA synchronous = NORMAL;
            ",
        )?;

        let version: i32 = conn.pragma_query_value(None, "user_version", |row| row.get(0))?;

        // No migrations: anything but a fresh file or the current version is refused.
        if version != 0 && version != SCHEMA_VERSION {
            return Err(StoreError::SchemaVersionMismatch {
                found: version,
                expected: SCHEMA_VERSION,
            });
        }

        if version == 0 {
            conn.execute_batch(
                "
                CREATE TABLE IF NOT EXISTS files (
                    path TEXT PRIMARY KEY,
                    tokensCount INTEGER,
                    summary TEXT,
                    summaryTokensCount INTEGER,
                    hash TEXT,
                    timestamp INTEGER,
                    dependenciesLibs TEXT
                );
                ",
            )?;
            conn.pragma_update(None, "user_version", SCHEMA_VERSION)?;
        }

        Ok(())
    }

    /// Insert `entry`, or replace every column of the row at its path.
    pub fn upsert(&self, entry: &ManifestEntry) -> Result<(), StoreError> {
        upsert_on(&self.conn, entry)
    }

    /// Upsert a batch inside one transaction.
    pub fn upsert_many(&mut self, entries: &[ManifestEntry]) -> Result<usize, StoreError> {
        let tx = self.conn.transaction()?;
        for entry in entries {
            upsert_on(&tx, entry)?;
        }
        tx.commit()?;
        Ok(entries.len())
    }

    /// Remove the row at `path`. Returns whether a row existed.
    pub fn delete(&self, path: &str) -> Result<bool, StoreError> {
        let removed = self
            .conn
            .execute("DELETE FROM files WHERE path = ?1", params![path])?;
        if removed > 0 {
            tracing::debug!(path, "evicted manifest entry");
        }
        Ok(removed > 0)
    }

    /// Every stored `{path, hash, timestamp}`, ordered by path.
    pub fn list_all(&self) -> Result<Vec<ManifestProjection>, StoreError> {
        let mut stmt = self
            .conn
            .prepare_cached("SELECT path, hash, timestamp FROM files ORDER BY path")?;
        let rows = stmt.query_map([], |row| {
            Ok(ManifestProjection {
                path: row.get(0)?,
                hash: row.get::<_, Option<String>>(1)?.unwrap_or_default(),
                timestamp: row.get::<_, Option<i64>>(2)?.unwrap_or_default(),
            })
        })?;

        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    /// Fetch the full entry at `path`.
    pub fn get(&self, path: &str) -> Result<Option<ManifestEntry>, StoreError> {
        let mut stmt = self
            .conn
            .prepare_cached(&format!("{SELECT_ENTRY_SQL} WHERE path = ?1"))?;
        let raw = stmt.query_row(params![path], RawEntry::from_row).optional()?;
        raw.map(RawEntry::into_entry).transpose()
    }

    /// Every full entry, ordered by path.
    pub fn entries(&self) -> Result<Vec<ManifestEntry>, StoreError> {
        let mut stmt = self
            .conn
            .prepare_cached(&format!("{SELECT_ENTRY_SQL} ORDER BY path"))?;
        let raws = stmt
            .query_map([], RawEntry::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        raws.into_iter().map(RawEntry::into_entry).collect()
    }

    /// Number of stored entries.
    pub fn len(&self) -> Result<usize, StoreError> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM files", [], |row| row.get(0))?;
        Ok(usize::try_from(count).unwrap_or_default())
    }

    pub fn is_empty(&self) -> Result<bool, StoreError> {
        Ok(self.len()? == 0)
    }

    /// Release the connection, surfacing any error SQLite reports on close.
    pub fn close(self) -> Result<(), StoreError> {
        self.conn.close().map_err(|(_, err)| StoreError::from(err))
    }
}

fn upsert_on(conn: &Connection, entry: &ManifestEntry) -> Result<(), StoreError> {
    let dependencies =
        serde_json::to_string(&entry.dependencies).map_err(|source| StoreError::CorruptDependencies {
            path: entry.path.clone(),
            source,
        })?;

    let mut stmt = conn.prepare_cached(UPSERT_SQL)?;
    stmt.execute(params![
        entry.path,
        to_sql_int(entry.token_count),
        entry.summary,
        to_sql_int(entry.summary_token_count),
        entry.hash,
        entry.timestamp,
        dependencies,
    ])?;
    Ok(())
}

/// SQLite integers are signed 64-bit; counts beyond that saturate.
fn to_sql_int(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

fn from_sql_int(value: Option<i64>) -> u64 {
    value.and_then(|v| u64::try_from(v).ok()).unwrap_or_default()
}

/// A row as stored, before the dependency column is decoded.
struct RawEntry {
    path: String,
    token_count: Option<i64>,
    summary: Option<String>,
    summary_token_count: Option<i64>,
    hash: Option<String>,
    timestamp: Option<i64>,
    dependencies: Option<String>,
}

impl RawEntry {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            path: row.get(0)?,
            token_count: row.get(1)?,
            summary: row.get(2)?,
            summary_token_count: row.get(3)?,
            hash: row.get(4)?,
            timestamp: row.get(5)?,
            dependencies: row.get(6)?,
        })
    }

    fn into_entry(self) -> Result<ManifestEntry, StoreError> {
        let dependencies = match self.dependencies.as_deref().map(str::trim) {
            None | Some("") => Vec::new(),
            Some(json) => {
                serde_json::from_str(json).map_err(|source| StoreError::CorruptDependencies {
                    path: self.path.clone(),
                    source,
                })?
            }
        };

        Ok(ManifestEntry {
            path: self.path,
            token_count: from_sql_int(self.token_count),
            summary: self.summary.unwrap_or_default(),
            summary_token_count: from_sql_int(self.summary_token_count),
            hash: self.hash.unwrap_or_default(),
            timestamp: self.timestamp.unwrap_or_default(),
            dependencies,
        })
    }
}
