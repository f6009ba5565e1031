//! SQLite loader for staged records
//!
//! Reads the staging directory and inserts each record into the relational
//! store. Records already loaded (by staging key) are skipped, so the loader
//! can be re-run after every crawl.

use crate::extract::ItemRecord;
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{LoadError, LoadResult};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::{Path, PathBuf};

/// Counts reported by a loader pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadSummary {
    pub loaded: u64,
    pub skipped: u64,
    pub failed: u64,
}

/// Loads staged item records into SQLite
pub struct SqliteLoader {
    conn: Connection,
}

impl SqliteLoader {
    /// Opens (or creates) the database at `path`
    pub fn new(path: &Path) -> LoadResult<Self> {
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self { conn })
    }

    /// Creates an in-memory database (for testing)
    #[cfg(test)]
    pub fn new_in_memory() -> LoadResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }

    /// Inserts one record and its tracks in a single transaction
    ///
    /// Returns `Ok(false)` if a record with this staging key is already loaded.
    pub fn load_record(&mut self, key: &str, record: &ItemRecord) -> LoadResult<bool> {
        let now = Utc::now().to_rfc3339();
        let tx = self.conn.transaction()?;

        let inserted = tx.execute(
            "INSERT OR IGNORE INTO podcasts
                (staging_key, title, description, poster, original_url, date_created)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                key,
                record.title,
                record.description,
                record.poster,
                record.source_url,
                now
            ],
        )?;

        if inserted == 0 {
            return Ok(false);
        }

        let podcast_id = tx.last_insert_rowid();
        {
            let mut stmt = tx.prepare(
                "INSERT INTO tracks (podcast_id, position, path, date_created)
                 VALUES (?1, ?2, ?3, ?4)",
            )?;
            for (position, track) in record.tracks.iter().enumerate() {
                stmt.execute(params![podcast_id, position as i64, track, now])?;
            }
        }

        tx.commit()?;
        Ok(true)
    }

    /// Loads every `*.json` file in the staging directory
    ///
    /// Files are processed in name order. A file that cannot be read or
    /// decoded is logged and counted as failed; database errors abort.
    pub fn load_staged(&mut self, dir: &Path) -> LoadResult<LoadSummary> {
        let mut summary = LoadSummary::default();

        for path in staged_files(dir)? {
            let Some(key) = path.file_stem().and_then(|s| s.to_str()).map(str::to_string) else {
                continue;
            };

            let record = match read_record(&path) {
                Ok(record) => record,
                Err(e) => {
                    tracing::warn!("{}", e);
                    summary.failed += 1;
                    continue;
                }
            };

            if self.load_record(&key, &record)? {
                tracing::debug!("Loaded '{}' with {} tracks", record.title, record.tracks.len());
                summary.loaded += 1;
            } else {
                tracing::debug!("'{}' already loaded, skipping", record.title);
                summary.skipped += 1;
            }
        }

        tracing::info!(
            "Load complete: {} loaded, {} skipped, {} failed",
            summary.loaded,
            summary.skipped,
            summary.failed
        );

        Ok(summary)
    }

    /// Returns the number of loaded podcasts
    pub fn count_podcasts(&self) -> LoadResult<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM podcasts", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    /// Returns the track paths of a loaded podcast, in order
    pub fn tracks_for(&self, key: &str) -> LoadResult<Option<Vec<String>>> {
        let podcast_id: Option<i64> = self
            .conn
            .query_row(
                "SELECT id FROM podcasts WHERE staging_key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()?;

        let Some(podcast_id) = podcast_id else {
            return Ok(None);
        };

        let mut stmt = self
            .conn
            .prepare("SELECT path FROM tracks WHERE podcast_id = ?1 ORDER BY position")?;
        let paths = stmt
            .query_map(params![podcast_id], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;

        Ok(Some(paths))
    }
}

fn staged_files(dir: &Path) -> LoadResult<Vec<PathBuf>> {
    let entries = std::fs::read_dir(dir).map_err(|source| LoadError::Io {
        path: dir.to_path_buf(),
        source,
    })?;

    let mut files = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|source| LoadError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
        let path = entry.path();
        if path.is_file() && path.extension().map_or(false, |ext| ext == "json") {
            files.push(path);
        }
    }

    files.sort();
    Ok(files)
}

fn read_record(path: &Path) -> LoadResult<ItemRecord> {
    let bytes = std::fs::read(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    serde_json::from_slice(&bytes).map_err(|source| LoadError::Decode {
        path: path.to_path_buf(),
        source,
    })
}
