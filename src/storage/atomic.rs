//! Atomic file finalization
//!
//! Every file this crate produces is written to a hidden temporary file in
//! the destination directory and renamed into place once complete, so a
//! file that exists under its final name is always a complete copy.

use reqwest::Response;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tempfile::{Builder, NamedTempFile, TempPath};
use tokio::io::AsyncWriteExt;

/// Failure while streaming a response body to disk
#[derive(Debug)]
pub(crate) enum StreamFailure {
    /// Reading the response body failed
    Body(reqwest::Error),
    /// Writing or finalizing the file failed
    Io(io::Error),
}

fn parent_dir(dest: &Path) -> PathBuf {
    match dest.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

fn temp_file_in(dir: &Path) -> io::Result<NamedTempFile> {
    Builder::new().prefix(".").suffix(".part").tempfile_in(dir)
}

/// Streams a response body into `dest`
///
/// The temporary file is removed if anything fails before the rename. A
/// concurrent writer finalizing the same destination is harmless: the rename
/// replaces one complete copy with another.
pub(crate) async fn stream_to_file(
    mut response: Response,
    dest: &Path,
) -> Result<u64, StreamFailure> {
    let (file, temp_path): (std::fs::File, TempPath) = temp_file_in(&parent_dir(dest))
        .map_err(StreamFailure::Io)?
        .into_parts();
    let mut file = tokio::fs::File::from_std(file);

    let mut written = 0u64;
    while let Some(chunk) = response.chunk().await.map_err(StreamFailure::Body)? {
        file.write_all(&chunk).await.map_err(StreamFailure::Io)?;
        written += chunk.len() as u64;
    }

    file.flush().await.map_err(StreamFailure::Io)?;
    file.sync_all().await.map_err(StreamFailure::Io)?;
    drop(file);

    temp_path
        .persist(dest)
        .map_err(|e| StreamFailure::Io(e.error))?;

    Ok(written)
}

/// Writes `contents` to `dest` unless a file is already there
///
/// Returns `Ok(false)` without touching the existing file when `dest`
/// already exists, including when another writer finalized it first.
pub(crate) fn write_new(dest: &Path, contents: &[u8]) -> io::Result<bool> {
    let mut temp = temp_file_in(&parent_dir(dest))?;
    temp.write_all(contents)?;
    temp.as_file().sync_all()?;

    match temp.into_temp_path().persist_noclobber(dest) {
        Ok(()) => Ok(true),
        Err(e) if e.error.kind() == io::ErrorKind::AlreadyExists => Ok(false),
        Err(e) => Err(e.error),
    }
}
