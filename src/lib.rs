//! Podcast-Harvest: a podcast discovery page harvester
//!
//! This crate crawls a single seed page, follows its item links concurrently,
//! extracts podcast metadata from each item page, stores posters and audio
//! tracks in a content-addressed media store and stages one JSON record per
//! item for a later batch load.

pub mod config;
pub mod crawler;
pub mod extract;
pub mod output;
pub mod state;
pub mod storage;

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for Podcast-Harvest operations
#[derive(Debug, Error)]
pub enum HarvestError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),

    #[error("Download error: {0}")]
    Download(#[from] DownloadError),

    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),

    #[error("Persist error: {0}")]
    Persist(#[from] PersistError),

    #[error("Load error: {0}")]
    Load(#[from] storage::LoadError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("Cannot resolve link '{link}': {source}")]
    UrlResolve {
        link: String,
        source: ::url::ParseError,
    },

    #[error("Invalid state transition: {from:?} -> {to:?}")]
    InvalidTransition {
        from: state::ItemState,
        to: state::ItemState,
    },

    #[error("Blocking task failed: {0}")]
    Blocking(#[from] tokio::task::JoinError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// Errors raised while fetching a page into the content cache
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Request to {url} failed: {source}")]
    Request { url: String, source: reqwest::Error },

    #[error("Request to {url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("Failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Errors raised while downloading a media object
#[derive(Debug, Error)]
pub enum DownloadError {
    #[error("Media request to {url} failed: {source}")]
    Request { url: String, source: reqwest::Error },

    #[error("Media request to {url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("Failed to store media object {}: {source}", path.display())]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Errors raised when a cached document cannot be parsed at all
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("Failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("{} is not a text document", path.display())]
    Encoding { path: PathBuf },
}

/// Errors raised while writing a record to staging
#[derive(Debug, Error)]
pub enum PersistError {
    #[error("Title '{title}' does not produce a staging key")]
    EmptyKey { title: String },

    #[error("Failed to serialize record: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Result type alias for Podcast-Harvest operations
pub type Result<T> = std::result::Result<T, HarvestError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{harvest, Coordinator};
pub use extract::{ItemRecord, MetadataExtractor, SelectorTable};
pub use output::RunSummary;
pub use state::ItemState;
pub use storage::{FileStaging, MediaKind, MediaStore, Staging};
