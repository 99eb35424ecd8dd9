//! Document traits
//!
//! Format-agnostic interface for text extraction.

use super::error::DocumentResult;
use super::types::DocumentFormat;

/// Format-agnostic source of extractable text
///
/// Items are pages for PDF and body paragraphs for Word documents.
pub trait TextSource {
    /// Document format
    fn format(&self) -> DocumentFormat;

    /// Number of text items
    fn item_count(&self) -> usize;

    /// Extract plain text from an item
    fn extract_text(&self, item_index: usize) -> DocumentResult<String>;
}
