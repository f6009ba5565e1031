//! Storage traits and error types
//!
//! This module defines the staging interface the crawl hands finished
//! records to, and the errors of the staging loader.

use crate::extract::ItemRecord;
use crate::PersistError;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while loading staged records into SQLite
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Malformed staged record {}: {source}", path.display())]
    Decode {
        path: PathBuf,
        source: serde_json::Error,
    },
}

/// Result type for loader operations
pub type LoadResult<T> = Result<T, LoadError>;

/// What happened when a record was staged
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StageOutcome {
    /// The record was written to this path
    Written(PathBuf),

    /// A record with the same key was already staged; it was left untouched
    Duplicate(PathBuf),
}

impl StageOutcome {
    pub fn path(&self) -> &PathBuf {
        match self {
            Self::Written(path) | Self::Duplicate(path) => path,
        }
    }

    pub fn is_duplicate(&self) -> bool {
        matches!(self, Self::Duplicate(_))
    }
}

/// Durable, append-only store of extracted records keyed by normalized title
///
/// Implementations must be safe to call from concurrent item pipelines and
/// must never replace an already staged record. Calls may block on disk I/O;
/// the coordinator runs them on tokio's blocking pool.
pub trait Staging: Send + Sync {
    /// Persists a record unless one with the same key exists
    fn stage(&self, record: &ItemRecord) -> Result<StageOutcome, PersistError>;

    /// Returns true if a record with the given key is staged
    fn contains(&self, key: &str) -> bool;
}
