//! Content-addressed media store
//!
//! Objects are named by a digest of their source URL, so a source is fetched
//! from the network at most once for the lifetime of the store directory.
//! The filesystem is the only index: an object that exists under its final
//! name is complete (see `atomic`), so existence alone means "already stored".
//! Within one process, downloads of the same object are serialized so
//! concurrent callers share a single fetch; across processes the atomic
//! rename keeps racing writers from corrupting each other.

use crate::storage::atomic::{stream_to_file, StreamFailure};
use crate::DownloadError;
use reqwest::Client;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

/// Kind of media object, selecting subdirectory and extension
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaKind {
    Image,
    Audio,
}

impl MediaKind {
    pub fn directory(&self) -> &'static str {
        match self {
            Self::Image => "images",
            Self::Audio => "tracks",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            Self::Image => "jpeg",
            Self::Audio => "mp3",
        }
    }

    /// File name of the object with the given id
    pub fn file_name(&self, object_id: &str) -> String {
        format!("{}.{}", object_id, self.extension())
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Image => write!(f, "image"),
            Self::Audio => write!(f, "audio"),
        }
    }
}

/// Stores posters and audio tracks under `<root>/images` and `<root>/tracks`
pub struct MediaStore {
    client: Client,
    root: PathBuf,
    in_flight: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl MediaStore {
    pub fn new(client: Client, root: impl Into<PathBuf>) -> Self {
        Self {
            client,
            root: root.into(),
            in_flight: Mutex::new(HashMap::new()),
        }
    }

    fn object_lock(&self, object_id: &str) -> Arc<tokio::sync::Mutex<()>> {
        let mut in_flight = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(in_flight.entry(object_id.to_string()).or_default())
    }

    /// Drops the map entry once no other caller holds or waits on the lock
    fn release_lock(&self, object_id: &str, lock: Arc<tokio::sync::Mutex<()>>) {
        let mut in_flight = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
        let last_user = in_flight
            .get(object_id)
            .map_or(false, |entry| Arc::ptr_eq(entry, &lock) && Arc::strong_count(&lock) == 2);
        if last_user {
            in_flight.remove(object_id);
        }
    }

    #[cfg(test)]
    fn in_flight_len(&self) -> usize {
        self.in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Stable object id for a source URL: lowercase hex SHA-256
    pub fn object_id(source_url: &str) -> String {
        hex::encode(Sha256::digest(source_url.as_bytes()))
    }

    /// Path an object of the given kind is stored at
    pub fn object_path(&self, object_id: &str, kind: MediaKind) -> PathBuf {
        self.root
            .join(kind.directory())
            .join(kind.file_name(object_id))
    }

    /// Returns true if the object for this source is already stored
    pub fn contains(&self, source_url: &str, kind: MediaKind) -> bool {
        self.object_path(&Self::object_id(source_url), kind).exists()
    }

    /// Downloads a media object unless it is already stored
    ///
    /// # Arguments
    ///
    /// * `source_url` - URL of the media resource
    /// * `kind` - Image or audio
    ///
    /// # Returns
    ///
    /// * `Ok(String)` - The object id (same for every call with this URL)
    /// * `Err(DownloadError)` - Request failed, non-success status, or the
    ///   body could not be fully written. No object is left behind.
    pub async fn download(&self, source_url: &str, kind: MediaKind) -> Result<String, DownloadError> {
        let object_id = Self::object_id(source_url);
        let dest = self.object_path(&object_id, kind);

        if dest.exists() {
            tracing::debug!("{} object {} already stored, skipping", kind, object_id);
            return Ok(object_id);
        }

        let lock = self.object_lock(&object_id);
        let result = {
            let _guard = lock.lock().await;
            self.fetch_object(source_url, kind, &dest).await
        };
        self.release_lock(&object_id, lock);

        let bytes = result?;
        if let Some(bytes) = bytes {
            tracing::debug!("Stored {} object {} ({} bytes)", kind, object_id, bytes);
        }

        Ok(object_id)
    }

    /// Fetches into `dest` while holding the object's lock
    ///
    /// Returns `None` if another task finished the object while we waited.
    async fn fetch_object(
        &self,
        source_url: &str,
        kind: MediaKind,
        dest: &Path,
    ) -> Result<Option<u64>, DownloadError> {
        if dest.exists() {
            return Ok(None);
        }

        ensure_dir(&self.root.join(kind.directory())).await?;

        let response = self
            .client
            .get(source_url)
            .send()
            .await
            .map_err(|source| DownloadError::Request {
                url: source_url.to_string(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(DownloadError::Status {
                url: source_url.to_string(),
                status: status.as_u16(),
            });
        }

        let bytes = stream_to_file(response, dest)
            .await
            .map_err(|failure| match failure {
                StreamFailure::Body(source) => DownloadError::Request {
                    url: source_url.to_string(),
                    source,
                },
                StreamFailure::Io(source) => DownloadError::Write {
                    path: dest.to_path_buf(),
                    source,
                },
            })?;

        Ok(Some(bytes))
    }
}

async fn ensure_dir(dir: &Path) -> Result<(), DownloadError> {
    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|source| DownloadError::Write {
            path: dir.to_path_buf(),
            source,
        })
}
