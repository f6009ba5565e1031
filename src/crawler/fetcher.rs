//! HTTP fetcher and content cache
//!
//! This module handles all page requests for the harvester:
//! - Building the HTTP clients (timeouts, user agent, seed-scoped TLS policy)
//! - Fetching a page into the on-disk content cache, skipping pages that
//!   are already cached

use crate::config::CrawlerConfig;
use crate::storage::{stream_to_file, StreamFailure};
use crate::FetchError;
use reqwest::Client;
use std::path::Path;
use std::time::Duration;
use url::Url;

/// Builds an HTTP client with proper configuration
///
/// Certificate validation is only relaxed when `accept_invalid_certs` is
/// passed; use [`HttpClients`] to get that scoped to the seed host.
///
/// # Example
///
/// ```no_run
/// use podcast_harvest::config::parse_config;
/// use podcast_harvest::crawler::build_http_client;
///
/// let config = parse_config(r#"
/// [crawler]
/// seed-url = "https://podcasts.example.com/"
/// "#).unwrap();
///
/// let client = build_http_client(&config.crawler, false).unwrap();
/// ```
pub fn build_http_client(
    config: &CrawlerConfig,
    accept_invalid_certs: bool,
) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(config.user_agent.clone())
        .timeout(Duration::from_secs(config.request_timeout_secs))
        .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
        .danger_accept_invalid_certs(accept_invalid_certs)
        .gzip(true)
        .brotli(true)
        .build()
}

fn seed_host(config: &CrawlerConfig) -> Option<String> {
    Url::parse(&config.seed_url)
        .ok()
        .and_then(|seed| seed.host_str().map(str::to_string))
}

/// The clients a harvest uses, split by TLS policy
///
/// `strict` always verifies certificates. `seed` follows
/// `accept-invalid-certs` and is only handed out for URLs on the seed host.
#[derive(Debug, Clone)]
pub struct HttpClients {
    seed_host: Option<String>,
    seed: Client,
    strict: Client,
}

impl HttpClients {
    pub fn new(config: &CrawlerConfig) -> Result<Self, reqwest::Error> {
        let strict = build_http_client(config, false)?;
        if !config.accept_invalid_certs {
            return Ok(Self::single(strict));
        }

        Ok(Self {
            seed_host: seed_host(config),
            seed: build_http_client(config, true)?,
            strict,
        })
    }

    /// Uses one client for every destination
    pub fn single(client: Client) -> Self {
        Self {
            seed_host: None,
            seed: client.clone(),
            strict: client,
        }
    }

    /// Returns true if certificate errors are tolerated for `url`
    ///
    /// Only URLs on the seed URL's exact host qualify, and only when
    /// `accept-invalid-certs` is set. Media CDNs and other hosts are verified.
    pub fn tolerates_invalid_certs(&self, url: &Url) -> bool {
        match (&self.seed_host, url.host_str()) {
            (Some(seed), Some(host)) => seed == host,
            _ => false,
        }
    }

    /// Client to request `url` with
    pub fn for_url(&self, url: &Url) -> &Client {
        if self.tolerates_invalid_certs(url) {
            &self.seed
        } else {
            &self.strict
        }
    }

    /// Certificate-verifying client, for destinations off the seed host
    pub fn strict(&self) -> &Client {
        &self.strict
    }
}

/// Result of a cache fetch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheStatus {
    /// The page was downloaded and written
    Fetched { bytes: u64 },

    /// A file already existed at the destination; nothing was requested
    AlreadyCached,
}

/// Fetch-or-skip page cache
///
/// Pages are stored verbatim at caller-chosen paths. An existing file is
/// taken as valid with no freshness check. Concurrent callers must use
/// distinct destinations.
#[derive(Debug, Clone)]
pub struct ContentCache {
    clients: HttpClients,
}

impl ContentCache {
    pub fn new(client: Client) -> Self {
        Self::with_clients(HttpClients::single(client))
    }

    pub fn with_clients(clients: HttpClients) -> Self {
        Self { clients }
    }

    /// Fetches `url` into `dest` unless `dest` already exists
    ///
    /// # Returns
    ///
    /// * `Ok(CacheStatus)` - Page is cached at `dest`
    /// * `Err(FetchError)` - Request failed, returned a non-success status,
    ///   or the body could not be written
    pub async fn fetch(&self, url: &str, dest: &Path) -> Result<CacheStatus, FetchError> {
        if dest.exists() {
            tracing::debug!("{} already cached at {}", url, dest.display());
            return Ok(CacheStatus::AlreadyCached);
        }

        let client = match Url::parse(url) {
            Ok(parsed) => self.clients.for_url(&parsed),
            Err(_) => self.clients.strict(),
        };

        let response = client
            .get(url)
            .send()
            .await
            .map_err(|source| FetchError::Request {
                url: url.to_string(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let bytes = stream_to_file(response, dest)
            .await
            .map_err(|failure| match failure {
                StreamFailure::Body(source) => FetchError::Request {
                    url: url.to_string(),
                    source,
                },
                StreamFailure::Io(source) => FetchError::Write {
                    path: dest.to_path_buf(),
                    source,
                },
            })?;

        tracing::debug!("Cached {} at {} ({} bytes)", url, dest.display(), bytes);

        Ok(CacheStatus::Fetched { bytes })
    }
}
