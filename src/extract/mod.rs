//! Metadata extraction from cached item pages
//!
//! - `selectors`: the data table of structural match rules
//! - `extractor`: document traversal and record assembly

mod extractor;
mod selectors;

pub use extractor::{scan_document, ItemRecord, MediaRef, MetadataExtractor, PageScan};
pub use selectors::{SelectorKind, SelectorRule, SelectorTable};

pub(crate) use extractor::read_document;
