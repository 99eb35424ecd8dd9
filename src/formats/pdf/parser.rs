//! PDF TextSource implementation
//!
//! Wraps a parsed `lopdf::Document` and exposes its pages as text items.

use lopdf::{Document, ObjectId};

use crate::document::{DocumentError, DocumentFormat, DocumentResult, TextSource};

/// A parsed PDF with its pages in page order
pub struct PdfDocument {
    doc: Document,
    /// (page number, page object id), page numbers are 1-based
    pages: Vec<(u32, ObjectId)>,
}

impl PdfDocument {
    /// Parse a PDF from bytes
    pub fn from_bytes(data: &[u8]) -> DocumentResult<Self> {
        if data.is_empty() {
            return Err(DocumentError::ParseError("empty file".to_string()));
        }

        let doc = Document::load_mem(data)?;
        // BTreeMap iteration is already ordered by page number
        let pages = doc.get_pages().into_iter().collect();

        Ok(Self { doc, pages })
    }

    /// The underlying lopdf document
    pub fn inner(&self) -> &Document {
        &self.doc
    }

    /// Pages as (1-based page number, object id)
    pub fn pages(&self) -> &[(u32, ObjectId)] {
        &self.pages
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }
}

impl TextSource for PdfDocument {
    fn format(&self) -> DocumentFormat {
        DocumentFormat::Pdf
    }

    fn item_count(&self) -> usize {
        self.pages.len()
    }

    fn extract_text(&self, item_index: usize) -> DocumentResult<String> {
        let (page_number, _) = self
            .pages
            .get(item_index)
            .ok_or(DocumentError::ItemNotFound(item_index))?;

        let mut text = self
            .doc
            .extract_text(&[*page_number])
            .map_err(|e| DocumentError::TextExtractionError(e.to_string()))?;

        // The extractor terminates each page with a line break
        let trimmed = text.trim_end_matches(['\n', '\r']).len();
        text.truncate(trimmed);

        Ok(text)
    }
}
