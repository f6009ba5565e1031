//! Structural selector rules
//!
//! A selector rule is a predicate over an element's tag name and the value of
//! one attribute. The rules describe a third-party page's current markup, so
//! they are data: loaded from configuration, with a built-in default table.

use scraper::node::Element;
use serde::Deserialize;
use std::collections::BTreeSet;
use std::fmt;

/// The field a selector rule populates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SelectorKind {
    Title,
    Description,
    Track,
    Poster,
}

impl SelectorKind {
    /// Returns all selector kinds in evaluation order
    pub fn all() -> [Self; 4] {
        [Self::Title, Self::Description, Self::Track, Self::Poster]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Title => "title",
            Self::Description => "description",
            Self::Track => "track",
            Self::Poster => "poster",
        }
    }
}

impl fmt::Display for SelectorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A single structural match rule
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SelectorRule {
    pub kind: SelectorKind,

    /// Tag names the element may have
    pub tags: BTreeSet<String>,

    /// Attribute whose value is compared against `values`
    pub attribute: String,

    /// Accepted attribute values (exact match)
    pub values: BTreeSet<String>,

    /// Attribute holding the media URL (track and poster rules)
    #[serde(rename = "source-attribute", default)]
    pub source_attribute: Option<String>,

    /// Literal prefix removed from the source value before use
    #[serde(rename = "strip-prefix", default)]
    pub strip_prefix: Option<String>,
}

impl SelectorRule {
    fn new(kind: SelectorKind, tags: &[&str], attribute: &str, values: &[&str]) -> Self {
        Self {
            kind,
            tags: tags.iter().map(|t| t.to_string()).collect(),
            attribute: attribute.to_string(),
            values: values.iter().map(|v| v.to_string()).collect(),
            source_attribute: None,
            strip_prefix: None,
        }
    }

    fn with_source(mut self, attribute: &str) -> Self {
        self.source_attribute = Some(attribute.to_string());
        self
    }

    fn with_strip_prefix(mut self, prefix: &str) -> Self {
        self.strip_prefix = Some(prefix.to_string());
        self
    }

    /// Returns true if the element satisfies this rule
    pub fn matches(&self, element: &Element) -> bool {
        let name = element.name();
        if !self.tags.iter().any(|tag| tag.eq_ignore_ascii_case(name)) {
            return false;
        }

        element
            .attr(&self.attribute)
            .map_or(false, |value| self.values.contains(value))
    }

    /// Extracts the media source URL from a matched element
    ///
    /// Returns None when the rule has no source attribute or the element
    /// carries an empty one.
    pub fn source(&self, element: &Element) -> Option<String> {
        let raw = element.attr(self.source_attribute.as_deref()?)?.trim();
        let value = match self.strip_prefix.as_deref() {
            Some(prefix) => raw.strip_prefix(prefix).unwrap_or(raw),
            None => raw,
        };

        if value.is_empty() {
            None
        } else {
            Some(value.to_string())
        }
    }
}

/// The full set of rules handed to the extractor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectorTable {
    rules: Vec<SelectorRule>,
}

impl SelectorTable {
    /// Builds a table from configured rules, falling back to the default
    /// table when none are configured
    pub fn from_rules(rules: Vec<SelectorRule>) -> Self {
        if rules.is_empty() {
            Self::default()
        } else {
            Self { rules }
        }
    }

    /// Returns the first rule of the given kind that matches the element
    pub fn matching(&self, kind: SelectorKind, element: &Element) -> Option<&SelectorRule> {
        self.rules
            .iter()
            .filter(|rule| rule.kind == kind)
            .find(|rule| rule.matches(element))
    }

    pub fn rules(&self) -> &[SelectorRule] {
        &self.rules
    }
}

impl Default for SelectorTable {
    /// Markup of the podcast discovery site as last observed
    fn default() -> Self {
        Self {
            rules: vec![
                SelectorRule::new(
                    SelectorKind::Title,
                    &["a", "div"],
                    "class",
                    &["ZfMIwb", "ik7nMd", "wv3SK"],
                ),
                SelectorRule::new(
                    SelectorKind::Description,
                    &["div"],
                    "jsname",
                    &["YGHahd", "QpaWg", "GHG3g"],
                ),
                SelectorRule::new(SelectorKind::Track, &["div"], "jsmodel", &["kY0ub"])
                    .with_source("jsdata")
                    .with_strip_prefix("Kwyn5e;"),
                SelectorRule::new(SelectorKind::Poster, &["img"], "class", &["BhVIWc"])
                    .with_source("src"),
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scraper::{Html, Selector};

    fn first_element(html: &str, css: &str) -> Element {
        let document = Html::parse_fragment(html);
        let selector = Selector::parse(css).unwrap();
        let element = document.select(&selector).next().unwrap();
        element.value().clone()
    }

    #[test]
    fn test_default_table_has_every_kind() {
        let table = SelectorTable::default();
        for kind in SelectorKind::all() {
            assert!(
                table.rules().iter().any(|rule| rule.kind == kind),
                "missing rule for {}",
                kind
            );
        }
    }

    #[test]
    fn test_title_rule_matches_tag_and_class() {
        let table = SelectorTable::default();

        let div = first_element(r#"<div class="wv3SK">Show</div>"#, "div");
        assert!(table.matching(SelectorKind::Title, &div).is_some());

        let span = first_element(r#"<span class="wv3SK">Show</span>"#, "span");
        assert!(table.matching(SelectorKind::Title, &span).is_none());

        let other_class = first_element(r#"<div class="wv3SK extra">Show</div>"#, "div");
        assert!(table.matching(SelectorKind::Title, &other_class).is_none());
    }

    #[test]
    fn test_track_source_strips_prefix() {
        let table = SelectorTable::default();
        let div = first_element(
            r#"<div jsmodel="kY0ub" jsdata="Kwyn5e;https://cdn.example.com/ep1.mp3"></div>"#,
            "div",
        );

        let rule = table.matching(SelectorKind::Track, &div).unwrap();
        assert_eq!(
            rule.source(&div),
            Some("https://cdn.example.com/ep1.mp3".to_string())
        );
    }

    #[test]
    fn test_missing_source_is_none() {
        let table = SelectorTable::default();
        let img = first_element(r#"<img class="BhVIWc" src="">"#, "img");

        let rule = table.matching(SelectorKind::Poster, &img).unwrap();
        assert_eq!(rule.source(&img), None);
    }

    #[test]
    fn test_from_rules_falls_back_to_default() {
        assert_eq!(SelectorTable::from_rules(vec![]), SelectorTable::default());

        let custom = vec![SelectorRule::new(SelectorKind::Title, &["h1"], "id", &["t"])];
        assert_eq!(SelectorTable::from_rules(custom).rules().len(), 1);
    }
}
