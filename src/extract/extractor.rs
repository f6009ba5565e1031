//! Item page metadata extraction
//!
//! Extraction runs in two phases. The document is parsed and walked once,
//! depth-first in document order, producing a [`PageScan`]: the title and
//! description text plus the ordered media references. The media references
//! are then downloaded one at a time, in that same order, before the record
//! is returned. The parsed tree never lives across an await point.

use crate::extract::selectors::{SelectorKind, SelectorTable};
use crate::storage::{MediaKind, MediaStore};
use crate::{ParseError, Result};
use scraper::{ElementRef, Html};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;

/// A podcast item as staged for the downstream load
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemRecord {
    pub title: String,
    pub description: String,

    /// File name of the stored poster image, empty if none was found
    pub poster: String,

    /// File names of stored audio tracks, in document order
    pub tracks: Vec<String>,

    /// Absolute URL the item was harvested from
    #[serde(rename = "original_url")]
    pub source_url: String,
}

impl ItemRecord {
    /// Returns the record with its source URL set
    pub fn with_source_url(self, source_url: impl Into<String>) -> Self {
        Self {
            source_url: source_url.into(),
            ..self
        }
    }
}

/// A media reference discovered during the scan
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaRef {
    Poster(String),
    Track(String),
}

/// Result of walking one document
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageScan {
    pub title: String,
    pub description: String,

    /// Poster and track sources in document order. Tracks are already
    /// bounded by the configured maximum.
    pub media: Vec<MediaRef>,
}

/// Walks a parsed document and applies the selector table
///
/// Title and description matches overwrite earlier ones, so the last match
/// in document order wins. Track matches stop being collected once
/// `max_tracks` have been seen; the other rules keep applying.
pub fn scan_document(html: &str, selectors: &SelectorTable, max_tracks: usize) -> PageScan {
    let document = Html::parse_document(html);
    let mut scan = PageScan::default();
    let mut track_count = 0;

    for node in document.tree.root().descendants() {
        let Some(element) = ElementRef::wrap(node) else {
            continue;
        };
        let value = element.value();

        if selectors.matching(SelectorKind::Title, value).is_some() {
            scan.title = element.text().collect();
        }

        if selectors.matching(SelectorKind::Description, value).is_some() {
            scan.description = element.text().collect();
        }

        if track_count < max_tracks {
            if let Some(rule) = selectors.matching(SelectorKind::Track, value) {
                match rule.source(value) {
                    Some(source) => {
                        scan.media.push(MediaRef::Track(source));
                        track_count += 1;
                    }
                    None => tracing::debug!("Track element without a source, skipping"),
                }
            }
        }

        if let Some(rule) = selectors.matching(SelectorKind::Poster, value) {
            match rule.source(value) {
                Some(source) => scan.media.push(MediaRef::Poster(source)),
                None => tracing::debug!("Poster element without a source, skipping"),
            }
        }
    }

    scan
}

/// Builds item records from cached item pages
pub struct MetadataExtractor {
    selectors: SelectorTable,
    media: Arc<MediaStore>,
    max_tracks: usize,
}

impl MetadataExtractor {
    pub fn new(selectors: SelectorTable, media: Arc<MediaStore>, max_tracks: usize) -> Self {
        Self {
            selectors,
            media,
            max_tracks,
        }
    }

    /// Extracts an item record from a cached page
    ///
    /// Absent fields are left empty; only an unreadable document is an
    /// error. Every referenced poster and track is stored before this
    /// returns, and a failed download fails the whole extraction.
    ///
    /// # Returns
    ///
    /// * `Ok(ItemRecord)` - Record with an empty `source_url`
    /// * `Err(HarvestError::Parse)` - The cached page could not be read as text
    /// * `Err(HarvestError::Download)` - A media download failed
    pub async fn extract(&self, page: &Path) -> Result<ItemRecord> {
        let html = read_document(page).await?;
        let scan = scan_document(&html, &self.selectors, self.max_tracks);

        let mut record = ItemRecord {
            title: scan.title,
            description: scan.description,
            ..ItemRecord::default()
        };

        for media_ref in scan.media {
            match media_ref {
                MediaRef::Track(source) => {
                    let id = self.media.download(&source, MediaKind::Audio).await?;
                    record.tracks.push(MediaKind::Audio.file_name(&id));
                }
                MediaRef::Poster(source) => {
                    let id = self.media.download(&source, MediaKind::Image).await?;
                    record.poster = MediaKind::Image.file_name(&id);
                }
            }
        }

        tracing::debug!(
            "Extracted '{}' from {} ({} tracks)",
            record.title,
            page.display(),
            record.tracks.len()
        );

        Ok(record)
    }
}

/// Reads a cached document as UTF-8 text
pub(crate) async fn read_document(path: &Path) -> std::result::Result<String, ParseError> {
    let bytes = tokio::fs::read(path).await.map_err(|source| ParseError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    String::from_utf8(bytes).map_err(|_| ParseError::Encoding {
        path: path.to_path_buf(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn page_with_tracks(base: &str, count: usize) -> String {
        let tracks: String = (0..count)
            .map(|i| {
                format!(
                    r#"<div jsmodel="kY0ub" jsdata="Kwyn5e;{}/audio/{}.mp3"></div>"#,
                    base, i
                )
            })
            .collect();

        format!(
            r#"<html><body>
            <div class="wv3SK">My <b>Show</b></div>
            <div jsname="QpaWg">About the show</div>
            <img class="BhVIWc" src="{}/poster.jpg">
            {}
            </body></html>"#,
            base, tracks
        )
    }

    #[test]
    fn test_scan_collects_text_in_document_order() {
        let html = page_with_tracks("https://cdn.example.com", 2);
        let scan = scan_document(&html, &SelectorTable::default(), 5);

        assert_eq!(scan.title, "My Show");
        assert_eq!(scan.description, "About the show");
        assert_eq!(
            scan.media,
            vec![
                MediaRef::Poster("https://cdn.example.com/poster.jpg".to_string()),
                MediaRef::Track("https://cdn.example.com/audio/0.mp3".to_string()),
                MediaRef::Track("https://cdn.example.com/audio/1.mp3".to_string()),
            ]
        );
    }

    #[test]
    fn test_scan_bounds_tracks_to_first_matches() {
        let html = page_with_tracks("https://cdn.example.com", 8);
        let scan = scan_document(&html, &SelectorTable::default(), 5);

        let tracks: Vec<_> = scan
            .media
            .iter()
            .filter_map(|m| match m {
                MediaRef::Track(url) => Some(url.clone()),
                MediaRef::Poster(_) => None,
            })
            .collect();

        let expected: Vec<_> = (0..5)
            .map(|i| format!("https://cdn.example.com/audio/{}.mp3", i))
            .collect();
        assert_eq!(tracks, expected);
    }

    #[test]
    fn test_scan_keeps_matching_after_track_bound() {
        let html = r#"<html><body>
            <div jsmodel="kY0ub" jsdata="https://cdn.example.com/a.mp3"></div>
            <div jsmodel="kY0ub" jsdata="https://cdn.example.com/b.mp3"></div>
            <div class="ZfMIwb">Late Title</div>
            <img class="BhVIWc" src="https://cdn.example.com/late.jpg">
            </body></html>"#;
        let scan = scan_document(html, &SelectorTable::default(), 1);

        assert_eq!(scan.title, "Late Title");
        assert_eq!(
            scan.media,
            vec![
                MediaRef::Track("https://cdn.example.com/a.mp3".to_string()),
                MediaRef::Poster("https://cdn.example.com/late.jpg".to_string()),
            ]
        );
    }

    #[test]
    fn test_scan_last_title_wins() {
        let html = r#"<html><body>
            <a class="ik7nMd">First</a>
            <div class="ZfMIwb">Second</div>
            </body></html>"#;
        let scan = scan_document(html, &SelectorTable::default(), 5);
        assert_eq!(scan.title, "Second");
    }

    #[test]
    fn test_scan_nested_match_is_deepest() {
        let html = r#"<html><body>
            <div class="wv3SK">Outer <div class="ZfMIwb">Inner</div></div>
            </body></html>"#;
        let scan = scan_document(html, &SelectorTable::default(), 5);
        assert_eq!(scan.title, "Inner");
    }

    #[tokio::test]
    async fn test_extract_without_poster_or_description() {
        let dir = TempDir::new().unwrap();
        let page = dir.path().join("item.html");
        std::fs::write(
            &page,
            r#"<html><body><div class="wv3SK">Only A Title</div></body></html>"#,
        )
        .unwrap();

        let media = Arc::new(MediaStore::new(reqwest::Client::new(), dir.path()));
        let extractor = MetadataExtractor::new(SelectorTable::default(), media, 5);
        let record = extractor.extract(&page).await.unwrap();

        assert_eq!(record.title, "Only A Title");
        assert_eq!(record.description, "");
        assert_eq!(record.poster, "");
        assert!(record.tracks.is_empty());
    }

    #[tokio::test]
    async fn test_extract_downloads_media() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/poster.jpg"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"jpeg".to_vec()))
            .expect(1)
            .mount(&server)
            .await;
        for i in 0..8 {
            Mock::given(method("GET"))
                .and(path(format!("/audio/{}.mp3", i)))
                .respond_with(ResponseTemplate::new(200).set_body_bytes(b"mp3".to_vec()))
                .expect(if i < 5 { 1 } else { 0 })
                .mount(&server)
                .await;
        }

        let dir = TempDir::new().unwrap();
        let page = dir.path().join("item.html");
        std::fs::write(&page, page_with_tracks(&server.uri(), 8)).unwrap();

        let media = Arc::new(MediaStore::new(reqwest::Client::new(), dir.path()));
        let extractor = MetadataExtractor::new(SelectorTable::default(), media, 5);
        let record = extractor.extract(&page).await.unwrap();

        assert_eq!(record.title, "My Show");
        assert_eq!(record.tracks.len(), 5);
        for (i, track) in record.tracks.iter().enumerate() {
            let source = format!("{}/audio/{}.mp3", server.uri(), i);
            assert_eq!(track, &format!("{}.mp3", MediaStore::object_id(&source)));
        }
        let poster_source = format!("{}/poster.jpg", server.uri());
        assert_eq!(
            record.poster,
            format!("{}.jpeg", MediaStore::object_id(&poster_source))
        );
        assert!(dir.path().join("images").join(&record.poster).exists());

        server.verify().await;
    }

    #[tokio::test]
    async fn test_extract_fails_on_media_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let page = dir.path().join("item.html");
        std::fs::write(&page, page_with_tracks(&server.uri(), 1)).unwrap();

        let media = Arc::new(MediaStore::new(reqwest::Client::new(), dir.path()));
        let extractor = MetadataExtractor::new(SelectorTable::default(), media, 5);
        let result = extractor.extract(&page).await;

        assert!(matches!(result, Err(crate::HarvestError::Download(_))));
    }

    #[tokio::test]
    async fn test_extract_missing_file_is_parse_error() {
        let dir = TempDir::new().unwrap();
        let media = Arc::new(MediaStore::new(reqwest::Client::new(), dir.path()));
        let extractor = MetadataExtractor::new(SelectorTable::default(), media, 5);

        let result = extractor.extract(&dir.path().join("missing.html")).await;
        assert!(matches!(result, Err(crate::HarvestError::Parse(_))));
    }

    #[tokio::test]
    async fn test_extract_binary_file_is_parse_error() {
        let dir = TempDir::new().unwrap();
        let page = dir.path().join("item.html");
        std::fs::write(&page, [0xff, 0xfe, 0x00, 0xc3]).unwrap();

        let media = Arc::new(MediaStore::new(reqwest::Client::new(), dir.path()));
        let extractor = MetadataExtractor::new(SelectorTable::default(), media, 5);

        let result = extractor.extract(&page).await;
        assert!(matches!(result, Err(crate::HarvestError::Parse(_))));
    }

    #[test]
    fn test_record_serializes_with_staging_field_names() {
        let record = ItemRecord {
            title: "Show".to_string(),
            description: "About".to_string(),
            poster: "abc.jpeg".to_string(),
            tracks: vec!["def.mp3".to_string()],
            source_url: "https://podcasts.example.com/feed/1".to_string(),
        };

        let json: serde_json::Value = serde_json::to_value(&record).unwrap();
        assert_eq!(json["original_url"], "https://podcasts.example.com/feed/1");
        assert_eq!(json["tracks"][0], "def.mp3");
        assert_eq!(json["poster"], "abc.jpeg");
    }
}
