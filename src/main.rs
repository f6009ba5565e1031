//! Podcast-Harvest main entry point
//!
//! This is the command-line interface for the podcast harvester.

use anyhow::Context;
use clap::Parser;
use podcast_harvest::config::{load_config_with_hash, Config};
use podcast_harvest::crawler::{clear_page_cache, harvest};
use podcast_harvest::output::print_summary;
use podcast_harvest::storage::load_staged_records;
use podcast_harvest::SelectorTable;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// Podcast-Harvest: a podcast discovery page harvester
///
/// Fetches the configured seed page, harvests every linked podcast item
/// concurrently, stores posters and tracks once per source URL, and stages
/// one JSON record per podcast. `--load` moves staged records into SQLite.
#[derive(Parser, Debug)]
#[command(name = "podcast-harvest")]
#[command(version)]
#[command(about = "A podcast discovery page harvester", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Discard cached seed and item pages before harvesting
    #[arg(long, conflicts_with_all = ["dry_run", "load"])]
    refresh: bool,

    /// Validate config and show what would be harvested without fetching anything
    #[arg(long, conflicts_with = "load")]
    dry_run: bool,

    /// Load staged records into the SQLite database and exit
    #[arg(long, conflicts_with = "dry_run")]
    load: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("failed to load {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    if cli.dry_run {
        handle_dry_run(&config);
    } else if cli.load {
        handle_load(&config)?;
    } else {
        handle_harvest(&config, cli.refresh).await?;
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("podcast_harvest=info,warn"),
            1 => EnvFilter::new("podcast_harvest=debug,info"),
            2 => EnvFilter::new("podcast_harvest=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Handles the --dry-run mode: shows the effective configuration
fn handle_dry_run(config: &Config) {
    println!("=== Podcast-Harvest Dry Run ===\n");

    println!("Crawler Configuration:");
    println!("  Seed URL: {}", config.crawler.seed_url);
    println!("  Concurrency limit: {}", config.crawler.concurrency_limit);
    println!("  Max tracks per item: {}", config.crawler.max_tracks_per_item);
    println!(
        "  Timeouts: {}s request, {}s connect",
        config.crawler.request_timeout_secs, config.crawler.connect_timeout_secs
    );
    println!("  Accept invalid certs: {}", config.crawler.accept_invalid_certs);

    println!("\nDiscovery:");
    println!("  Link marker: {}", config.discovery.link_marker);
    println!("  Min link length: {}", config.discovery.min_link_length);

    println!("\nOutput:");
    println!("  Resources: {}", config.output.resources_dir);
    println!("  Database: {}", config.output.database_path);

    let table = SelectorTable::from_rules(config.selectors.clone());
    let source = if config.selectors.is_empty() {
        "built-in"
    } else {
        "configured"
    };
    println!("\nSelectors ({}, {}):", table.rules().len(), source);
    for rule in table.rules() {
        let tags: Vec<_> = rule.tags.iter().map(String::as_str).collect();
        let values: Vec<_> = rule.values.iter().map(String::as_str).collect();
        println!(
            "  - {}: <{}> {} in [{}]",
            rule.kind,
            tags.join("|"),
            rule.attribute,
            values.join(", ")
        );
    }

    println!("\n✓ Configuration is valid");
    println!(
        "✓ Would harvest up to {} items from {}",
        config.crawler.concurrency_limit, config.crawler.seed_url
    );
}

/// Handles the --load mode: moves staged records into SQLite
fn handle_load(config: &Config) -> anyhow::Result<()> {
    let database = Path::new(&config.output.database_path);
    let metadata_dir = config.output.metadata_dir();

    println!("=== Loading Staged Records ===\n");
    println!("Staging: {}", metadata_dir.display());
    println!("Database: {}\n", database.display());

    let summary = load_staged_records(database, &metadata_dir)
        .with_context(|| format!("failed to load staged records into {}", database.display()))?;

    println!(
        "✓ {} loaded, {} already present, {} failed",
        summary.loaded, summary.skipped, summary.failed
    );

    Ok(())
}

/// Handles the main harvest operation
async fn handle_harvest(config: &Config, refresh: bool) -> anyhow::Result<()> {
    if refresh {
        clear_page_cache(&config.output.html_dir()).await?;
    }

    match harvest(config).await {
        Ok(summary) => {
            tracing::info!("Harvest completed");
            print_summary(&summary);
            Ok(())
        }
        Err(e) => {
            tracing::error!("Harvest failed: {}", e);
            Err(e.into())
        }
    }
}
