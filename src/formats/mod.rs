//! Format-specific implementations
//!
//! Each format implements `TextSource`. PDF additionally provides
//! embedded image extraction.

pub mod docx;
pub mod pdf;

use crate::document::{DocumentFormat, DocumentResult, TextSource, UploadedDocument};

pub use docx::DocxDocument;
pub use pdf::PdfDocument;

/// Open an upload as a text source according to its declared format
pub fn open_text_source(
    format: DocumentFormat,
    upload: &UploadedDocument,
) -> DocumentResult<Box<dyn TextSource>> {
    Ok(match format {
        DocumentFormat::Pdf => Box::new(PdfDocument::from_bytes(&upload.data)?),
        DocumentFormat::Docx => Box::new(DocxDocument::from_bytes(&upload.data)?),
    })
}
