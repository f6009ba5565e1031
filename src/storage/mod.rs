//! Storage module for harvested data
//!
//! This module owns everything the harvester writes to disk:
//! - Content-addressed media objects (posters, audio tracks)
//! - Staged item records, one JSON file per item
//! - The SQLite loader that moves staged records into the relational store

mod atomic;
mod media;
mod schema;
mod sqlite;
mod staging;
mod traits;

pub use media::{MediaKind, MediaStore};
pub use sqlite::{LoadSummary, SqliteLoader};
pub use staging::{staging_key, FileStaging};
pub use traits::{LoadError, LoadResult, StageOutcome, Staging};

pub(crate) use atomic::{stream_to_file, StreamFailure};

use std::path::Path;

/// Opens the loader database and loads every staged record in `metadata_dir`
pub fn load_staged_records(database: &Path, metadata_dir: &Path) -> LoadResult<LoadSummary> {
    let mut loader = SqliteLoader::new(database)?;
    loader.load_staged(metadata_dir)
}
