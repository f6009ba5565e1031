//! File-backed staging: one JSON file per item under `metadata/`

use crate::extract::ItemRecord;
use crate::storage::atomic::write_new;
use crate::storage::traits::{StageOutcome, Staging};
use crate::PersistError;
use std::path::PathBuf;

/// Normalizes a title into a staging key
///
/// ASCII letters, digits and spaces are kept, everything else is dropped;
/// the result is lowercased and spaces become underscores.
///
/// # Example
///
/// ```
/// use podcast_harvest::storage::staging_key;
///
/// assert_eq!(staging_key("The Daily: News!"), "the_daily_news");
/// ```
pub fn staging_key(title: &str) -> String {
    title
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == ' ')
        .map(|c| if c == ' ' { '_' } else { c.to_ascii_lowercase() })
        .collect()
}

/// Stages records as `<dir>/<staging-key>.json`
pub struct FileStaging {
    dir: PathBuf,
}

impl FileStaging {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Path a record with this key is staged at
    pub fn record_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }
}

impl Staging for FileStaging {
    fn stage(&self, record: &ItemRecord) -> Result<StageOutcome, PersistError> {
        let key = staging_key(&record.title);
        if key.is_empty() {
            return Err(PersistError::EmptyKey {
                title: record.title.clone(),
            });
        }

        let path = self.record_path(&key);
        if path.exists() {
            tracing::info!("Skipping '{}', already staged", record.title);
            return Ok(StageOutcome::Duplicate(path));
        }

        let contents = serde_json::to_vec(record)?;
        let written = write_new(&path, &contents).map_err(|source| PersistError::Write {
            path: path.clone(),
            source,
        })?;

        if written {
            tracing::info!(
                "Staged '{}' ({} bytes) at {}",
                record.title,
                contents.len(),
                path.display()
            );
            Ok(StageOutcome::Written(path))
        } else {
            tracing::info!("Skipping '{}', staged concurrently", record.title);
            Ok(StageOutcome::Duplicate(path))
        }
    }

    fn contains(&self, key: &str) -> bool {
        self.record_path(key).exists()
    }
}
