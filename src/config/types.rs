use crate::extract::SelectorRule;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Main configuration structure for Podcast-Harvest
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub crawler: CrawlerConfig,
    #[serde(default)]
    pub discovery: DiscoveryConfig,
    #[serde(default)]
    pub output: OutputConfig,
    /// Site-specific selector rules. Empty means the built-in table.
    #[serde(default, rename = "selector")]
    pub selectors: Vec<SelectorRule>,
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerConfig {
    /// Page whose outbound item links are harvested
    #[serde(rename = "seed-url")]
    pub seed_url: String,

    /// Number of item pipelines dispatched at once (also the number of items taken)
    #[serde(rename = "concurrency-limit", default = "default_concurrency_limit")]
    pub concurrency_limit: u32,

    /// Upper bound on audio tracks collected per item
    #[serde(rename = "max-tracks-per-item", default = "default_max_tracks")]
    pub max_tracks_per_item: usize,

    /// Whole-request timeout in seconds
    #[serde(rename = "request-timeout-secs", default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Connect timeout in seconds
    #[serde(rename = "connect-timeout-secs", default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    /// Skip TLS certificate validation (the discovery target serves a broken chain)
    #[serde(rename = "accept-invalid-certs", default = "default_accept_invalid_certs")]
    pub accept_invalid_certs: bool,

    /// User-Agent header sent with every request
    #[serde(rename = "user-agent", default = "default_user_agent")]
    pub user_agent: String,
}

/// Seed page link discovery configuration
#[derive(Debug, Clone, Deserialize)]
pub struct DiscoveryConfig {
    /// Path fragment an href must contain to be treated as an item link
    #[serde(rename = "link-marker", default = "default_link_marker")]
    pub link_marker: String,

    /// Minimum href length; shorter hrefs are ignored
    #[serde(rename = "min-link-length", default = "default_min_link_length")]
    pub min_link_length: usize,
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Root directory for cached pages, media objects and staged records
    #[serde(rename = "resources-dir", default = "default_resources_dir")]
    pub resources_dir: String,

    /// Path to the SQLite database the staging loader writes to
    #[serde(rename = "database-path", default = "default_database_path")]
    pub database_path: String,
}

impl OutputConfig {
    pub fn html_dir(&self) -> PathBuf {
        Path::new(&self.resources_dir).join("html")
    }

    pub fn images_dir(&self) -> PathBuf {
        Path::new(&self.resources_dir).join("images")
    }

    pub fn tracks_dir(&self) -> PathBuf {
        Path::new(&self.resources_dir).join("tracks")
    }

    pub fn metadata_dir(&self) -> PathBuf {
        Path::new(&self.resources_dir).join("metadata")
    }
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            link_marker: default_link_marker(),
            min_link_length: default_min_link_length(),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            resources_dir: default_resources_dir(),
            database_path: default_database_path(),
        }
    }
}

fn default_concurrency_limit() -> u32 {
    20
}

fn default_max_tracks() -> usize {
    5
}

fn default_request_timeout() -> u64 {
    30
}

fn default_connect_timeout() -> u64 {
    10
}

fn default_accept_invalid_certs() -> bool {
    true
}

fn default_user_agent() -> String {
    format!("podcast-harvest/{}", env!("CARGO_PKG_VERSION"))
}

fn default_link_marker() -> String {
    "/feed/".to_string()
}

fn default_min_link_length() -> usize {
    6
}

fn default_resources_dir() -> String {
    "./resources".to_string()
}

fn default_database_path() -> String {
    "./resources/podcasts.db".to_string()
}
