use crate::config::types::{Config, CrawlerConfig, DiscoveryConfig, OutputConfig};
use crate::extract::{SelectorKind, SelectorRule};
use crate::ConfigError;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawler_config(&config.crawler)?;
    validate_discovery_config(&config.discovery)?;
    validate_output_config(&config.output)?;
    validate_selectors(&config.selectors)?;
    Ok(())
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    let seed = Url::parse(&config.seed_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid seed-url '{}': {}", config.seed_url, e)))?;

    if seed.scheme() != "http" && seed.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "seed-url '{}' must use http or https",
            config.seed_url
        )));
    }

    if config.concurrency_limit < 1 || config.concurrency_limit > 100 {
        return Err(ConfigError::Validation(format!(
            "concurrency-limit must be between 1 and 100, got {}",
            config.concurrency_limit
        )));
    }

    if config.max_tracks_per_item < 1 {
        return Err(ConfigError::Validation(
            "max-tracks-per-item must be >= 1".to_string(),
        ));
    }

    if config.request_timeout_secs == 0 || config.connect_timeout_secs == 0 {
        return Err(ConfigError::Validation(
            "request and connect timeouts must be > 0".to_string(),
        ));
    }

    if config.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user-agent cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates link discovery configuration
fn validate_discovery_config(config: &DiscoveryConfig) -> Result<(), ConfigError> {
    if config.link_marker.is_empty() {
        return Err(ConfigError::Validation(
            "link-marker cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.resources_dir.is_empty() {
        return Err(ConfigError::Validation(
            "resources-dir cannot be empty".to_string(),
        ));
    }

    if config.database_path.is_empty() {
        return Err(ConfigError::Validation(
            "database-path cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates user-supplied selector rules
fn validate_selectors(rules: &[SelectorRule]) -> Result<(), ConfigError> {
    for rule in rules {
        if rule.tags.is_empty() || rule.values.is_empty() {
            return Err(ConfigError::Validation(format!(
                "{} selector must list at least one tag and one value",
                rule.kind
            )));
        }

        if rule.attribute.is_empty() {
            return Err(ConfigError::Validation(format!(
                "{} selector attribute cannot be empty",
                rule.kind
            )));
        }

        let needs_source = matches!(rule.kind, SelectorKind::Track | SelectorKind::Poster);
        if needs_source && rule.source_attribute.as_deref().map_or(true, str::is_empty) {
            return Err(ConfigError::Validation(format!(
                "{} selector requires a source-attribute",
                rule.kind
            )));
        }
    }

    Ok(())
}
