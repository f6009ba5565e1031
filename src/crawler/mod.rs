//! Crawler module for page fetching and item orchestration
//!
//! This module contains the core harvesting logic, including:
//! - HTTP client construction and the fetch-or-skip page cache
//! - Item link discovery on the seed page
//! - Concurrent per-item fetch/extract/persist pipelines

mod coordinator;
mod discovery;
mod fetcher;

pub use coordinator::Coordinator;
pub use discovery::{discover_links, find_item_links, ItemLink};
pub use fetcher::{build_http_client, CacheStatus, ContentCache, HttpClients};

use crate::config::Config;
use crate::output::RunSummary;
use crate::Result;
use std::path::Path;

/// File name of the cached seed page inside the html cache directory
pub const SEED_PAGE_FILE: &str = "seed.html";

/// Runs a complete harvest
///
/// This is the main entry point for a run. It will:
/// 1. Create the resource directories
/// 2. Build the HTTP clients
/// 3. Cache the seed page
/// 4. Discover item links on it
/// 5. Run the item pipelines and return their summary
///
/// Failing to cache or read the seed page is fatal; item failures are not.
///
/// # Example
///
/// ```no_run
/// use podcast_harvest::config::load_config;
/// use podcast_harvest::crawler::harvest;
/// use std::path::Path;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = load_config(Path::new("harvest.toml"))?;
/// let summary = harvest(&config).await?;
/// println!("{} items staged", summary.succeeded);
/// # Ok(())
/// # }
/// ```
pub async fn harvest(config: &Config) -> Result<RunSummary> {
    let output = &config.output;
    for dir in [
        output.html_dir(),
        output.images_dir(),
        output.tracks_dir(),
        output.metadata_dir(),
    ] {
        tokio::fs::create_dir_all(&dir).await?;
    }

    let clients = HttpClients::new(&config.crawler)?;

    let seed_page = output.html_dir().join(SEED_PAGE_FILE);
    tracing::info!("Caching seed page {}", config.crawler.seed_url);
    ContentCache::with_clients(clients.clone())
        .fetch(&config.crawler.seed_url, &seed_page)
        .await?;

    let links = discover_links(&seed_page, &config.discovery).await?;
    tracing::info!("Found {} items to harvest", links.len());

    let coordinator = Coordinator::new(config, clients)?;
    let limit = config.crawler.concurrency_limit as usize;
    Ok(coordinator.run(&links, limit).await)
}

/// Removes cached pages so the next run fetches a fresh seed snapshot
///
/// Item pages are cached by ordinal, so they are only meaningful together
/// with the seed page they were discovered from; both go at once.
///
/// Returns the number of files removed. A missing directory is not an error.
pub async fn clear_page_cache(html_dir: &Path) -> Result<usize> {
    let mut entries = match tokio::fs::read_dir(html_dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
        Err(e) => return Err(e.into()),
    };

    let mut removed = 0;
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if path.extension().map_or(false, |ext| ext == "html") {
            tokio::fs::remove_file(&path).await?;
            removed += 1;
        }
    }

    tracing::info!("Cleared {} cached pages from {}", removed, html_dir.display());
    Ok(removed)
}
