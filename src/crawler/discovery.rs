//! Seed page link discovery
//!
//! Collects the item links of the seed page: every `<a href>` whose href
//! contains the configured path marker and is at least the configured
//! length, in document order. Links are classified as absolute or relative
//! but not resolved; resolution against the seed URL happens per item.

use crate::config::DiscoveryConfig;
use crate::extract::read_document;
use crate::ParseError;
use scraper::{ElementRef, Html};
use std::fmt;
use std::path::Path;
use url::Url;

/// A discovered item link
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemLink {
    /// A complete http(s) URL
    Absolute(Url),

    /// Anything else, resolved later against the seed URL
    Relative(String),
}

impl ItemLink {
    /// Classifies a raw href
    pub fn parse(href: &str) -> Self {
        match Url::parse(href) {
            Ok(url) if url.scheme() == "http" || url.scheme() == "https" => Self::Absolute(url),
            _ => Self::Relative(href.to_string()),
        }
    }

    pub fn is_relative(&self) -> bool {
        matches!(self, Self::Relative(_))
    }

    /// Resolves the link to an absolute URL
    ///
    /// # Example
    ///
    /// ```
    /// use podcast_harvest::crawler::ItemLink;
    /// use url::Url;
    ///
    /// let base = Url::parse("https://podcasts.example.com/").unwrap();
    /// let link = ItemLink::parse("./feed/abc?sa=X");
    /// assert_eq!(
    ///     link.resolve(&base).unwrap().as_str(),
    ///     "https://podcasts.example.com/feed/abc?sa=X"
    /// );
    /// ```
    pub fn resolve(&self, base: &Url) -> Result<Url, url::ParseError> {
        match self {
            Self::Absolute(url) => Ok(url.clone()),
            Self::Relative(href) => base.join(href),
        }
    }
}

impl fmt::Display for ItemLink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Absolute(url) => write!(f, "{}", url),
            Self::Relative(href) => write!(f, "{}", href),
        }
    }
}

/// Finds item links in seed page HTML
pub fn find_item_links(html: &str, config: &DiscoveryConfig) -> Vec<ItemLink> {
    let document = Html::parse_document(html);

    document
        .tree
        .root()
        .descendants()
        .filter_map(ElementRef::wrap)
        .filter(|element| element.value().name() == "a")
        .filter_map(|element| element.value().attr("href"))
        .filter(|href| href.len() >= config.min_link_length && href.contains(&config.link_marker))
        .map(ItemLink::parse)
        .collect()
}

/// Reads the cached seed page and returns its item links in document order
///
/// # Returns
///
/// * `Ok(Vec<ItemLink>)` - Links found (possibly none)
/// * `Err(ParseError)` - The cached page could not be read as text
pub async fn discover_links(
    seed_page: &Path,
    config: &DiscoveryConfig,
) -> Result<Vec<ItemLink>, ParseError> {
    let html = read_document(seed_page).await?;
    let links = find_item_links(&html, config);
    tracing::debug!("Discovered {} item links in {}", links.len(), seed_page.display());
    Ok(links)
}
