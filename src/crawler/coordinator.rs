//! Crawler coordinator - item pipeline orchestration
//!
//! Every selected item link gets its own task running
//! fetch -> extract -> persist. Tasks run concurrently and independently:
//! an error (or a panic) ends only that item, is recorded in the run
//! summary, and never reaches sibling items or the caller.

use crate::config::Config;
use crate::crawler::discovery::ItemLink;
use crate::crawler::fetcher::{ContentCache, HttpClients};
use crate::extract::{MetadataExtractor, SelectorTable};
use crate::output::{ItemFailure, RunSummary};
use crate::state::{ItemProgress, ItemState};
use crate::storage::{FileStaging, MediaStore, StageOutcome, Staging};
use crate::{HarvestError, Result};
use std::path::PathBuf;
use std::sync::Arc;
use url::Url;

/// Main harvest coordinator structure
#[derive(Clone)]
pub struct Coordinator {
    cache: ContentCache,
    extractor: Arc<MetadataExtractor>,
    staging: Arc<dyn Staging>,
    base_url: Url,
    html_dir: PathBuf,
}

impl Coordinator {
    /// Creates a coordinator wired to the configured directories
    ///
    /// # Arguments
    ///
    /// * `config` - The harvester configuration
    /// * `clients` - Page fetches use the seed-scoped TLS policy; media
    ///   downloads always use the certificate-verifying client
    pub fn new(config: &Config, clients: HttpClients) -> Result<Self> {
        let base_url =
            Url::parse(&config.crawler.seed_url).map_err(|source| HarvestError::UrlResolve {
                link: config.crawler.seed_url.clone(),
                source,
            })?;

        let media = Arc::new(MediaStore::new(
            clients.strict().clone(),
            &config.output.resources_dir,
        ));
        let extractor = MetadataExtractor::new(
            SelectorTable::from_rules(config.selectors.clone()),
            media,
            config.crawler.max_tracks_per_item,
        );
        let staging = Arc::new(FileStaging::new(config.output.metadata_dir()));

        Ok(Self::with_parts(
            ContentCache::with_clients(clients),
            Arc::new(extractor),
            staging,
            base_url,
            config.output.html_dir(),
        ))
    }

    /// Creates a coordinator from explicit components
    pub fn with_parts(
        cache: ContentCache,
        extractor: Arc<MetadataExtractor>,
        staging: Arc<dyn Staging>,
        base_url: Url,
        html_dir: PathBuf,
    ) -> Self {
        Self {
            cache,
            extractor,
            staging,
            base_url,
            html_dir,
        }
    }

    /// Cache path of the item with the given ordinal
    pub fn item_page_path(&self, index: usize) -> PathBuf {
        self.html_dir.join(format!("item_{}.html", index))
    }

    /// Runs the pipeline for the first `concurrency_limit` links
    ///
    /// All selected items are dispatched at once and this returns only after
    /// each has finished or failed. Failed items are not retried; a later run
    /// picks them up cheaply because cached pages, stored media and staged
    /// records are all skipped.
    pub async fn run(&self, links: &[ItemLink], concurrency_limit: usize) -> RunSummary {
        let selected = &links[..links.len().min(concurrency_limit)];
        tracing::info!(
            "Dispatching {} of {} discovered items",
            selected.len(),
            links.len()
        );

        let mut tasks = Vec::with_capacity(selected.len());
        for (index, link) in selected.iter().enumerate() {
            let progress = ItemProgress::new();
            let task_state = self.clone();
            let task_link = link.clone();
            let task_progress = progress.clone();

            let handle = tokio::spawn(async move {
                task_state
                    .process_item(index, &task_link, &task_progress)
                    .await
            });
            tasks.push((index, link, progress, handle));
        }

        let mut summary = RunSummary::new();
        for (index, link, progress, handle) in tasks {
            match handle.await {
                Ok(Ok(outcome)) => summary.record_success(outcome.is_duplicate()),
                Ok(Err(failure)) => {
                    tracing::warn!(
                        "Item #{} failed while {}: {} ({})",
                        failure.index,
                        failure.stage,
                        failure.url,
                        failure.message
                    );
                    summary.record_failure(failure);
                }
                Err(join_error) => {
                    let stage = progress.fail();
                    tracing::error!(
                        "Item #{} task aborted while {}: {} ({})",
                        index,
                        stage,
                        link,
                        join_error
                    );
                    summary.record_failure(ItemFailure {
                        index,
                        url: link.to_string(),
                        stage,
                        message: format!("task aborted: {}", join_error),
                    });
                }
            }
        }

        tracing::info!(
            "Run finished: {} attempted, {} succeeded, {} failed",
            summary.attempted,
            summary.succeeded,
            summary.failed
        );

        summary
    }

    /// Processes a single item, converting any error into a failure record
    async fn process_item(
        &self,
        index: usize,
        link: &ItemLink,
        progress: &ItemProgress,
    ) -> std::result::Result<StageOutcome, ItemFailure> {
        let url = self
            .start_item(link, progress)
            .map_err(|e| failure(index, link.to_string(), progress, e))?;

        tracing::debug!("Item #{}: {}", index, url);

        self.run_pipeline(index, &url, progress)
            .await
            .map_err(|e| failure(index, url.to_string(), progress, e))
    }

    fn start_item(&self, link: &ItemLink, progress: &ItemProgress) -> Result<Url> {
        progress.advance(ItemState::Fetching)?;
        link.resolve(&self.base_url)
            .map_err(|source| HarvestError::UrlResolve {
                link: link.to_string(),
                source,
            })
    }

    /// Fetch, extract and persist one item
    ///
    /// Each step consumes the previous step's output, so the stages can
    /// only run in order.
    async fn run_pipeline(
        &self,
        index: usize,
        url: &Url,
        progress: &ItemProgress,
    ) -> Result<StageOutcome> {
        let page = self.item_page_path(index);
        self.cache.fetch(url.as_str(), &page).await?;

        progress.advance(ItemState::Extracting)?;
        let record = self
            .extractor
            .extract(&page)
            .await?
            .with_source_url(url.as_str());

        progress.advance(ItemState::Persisting)?;
        let title = record.title.clone();
        let staging = Arc::clone(&self.staging);
        let outcome = tokio::task::spawn_blocking(move || staging.stage(&record)).await??;

        progress.advance(ItemState::Done)?;
        tracing::info!("Item #{} done: '{}'", index, title);

        Ok(outcome)
    }
}

fn failure(index: usize, url: String, progress: &ItemProgress, error: HarvestError) -> ItemFailure {
    ItemFailure {
        index,
        url,
        stage: progress.fail(),
        message: error.to_string(),
    }
}
