//! Document types
//!
//! Uploaded documents, batches, and the records produced by analysis.

use std::fmt;

use serde::Serialize;

/// MIME type for PDF uploads
pub const PDF_MIME: &str = "application/pdf";

/// MIME type for Word (OOXML) uploads
pub const DOCX_MIME: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document";

/// Supported document formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentFormat {
    Pdf,
    Docx,
}

impl DocumentFormat {
    /// Map a declared MIME type to a supported format
    pub fn from_mime(mime: &str) -> Option<Self> {
        // Ignore parameters such as "; charset=binary"
        let essence = mime.split(';').next().unwrap_or("").trim();
        if essence.eq_ignore_ascii_case(PDF_MIME) {
            Some(Self::Pdf)
        } else if essence.eq_ignore_ascii_case(DOCX_MIME) {
            Some(Self::Docx)
        } else {
            None
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Pdf => PDF_MIME,
            Self::Docx => DOCX_MIME,
        }
    }
}

/// A single uploaded file
#[derive(Debug, Clone)]
pub struct UploadedDocument {
    pub file_name: String,
    /// Declared MIME type of the upload
    pub mime_type: String,
    pub data: Vec<u8>,
}

impl UploadedDocument {
    /// Build an upload, guessing the MIME type from the file name when the
    /// client did not declare a useful one
    pub fn new(file_name: impl Into<String>, declared: Option<&str>, data: Vec<u8>) -> Self {
        let file_name = file_name.into();
        let mime_type = match declared.map(str::trim) {
            Some(mime) if !mime.is_empty() && mime != "application/octet-stream" => {
                mime.to_string()
            }
            _ => mime_guess::from_path(&file_name)
                .first()
                .map(|m| m.to_string())
                .unwrap_or_else(|| "application/octet-stream".to_string()),
        };

        Self {
            file_name,
            mime_type,
            data,
        }
    }

    pub fn format(&self) -> Option<DocumentFormat> {
        DocumentFormat::from_mime(&self.mime_type)
    }
}

/// Files uploaded together for one analysis, in upload order
#[derive(Debug, Clone, Default)]
pub struct DocumentBatch {
    documents: Vec<UploadedDocument>,
}

impl DocumentBatch {
    pub fn new(documents: Vec<UploadedDocument>) -> Self {
        Self { documents }
    }

    pub fn push(&mut self, document: UploadedDocument) {
        self.documents.push(document);
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Documents declared as PDF
    pub fn pdfs(&self) -> impl Iterator<Item = &UploadedDocument> {
        self.of_format(DocumentFormat::Pdf)
    }

    /// Documents declared as Word
    pub fn word_documents(&self) -> impl Iterator<Item = &UploadedDocument> {
        self.of_format(DocumentFormat::Docx)
    }

    /// Documents of neither supported type
    pub fn unsupported(&self) -> impl Iterator<Item = &UploadedDocument> {
        self.documents.iter().filter(|d| d.format().is_none())
    }

    /// Number of documents that take part in analysis
    pub fn supported_count(&self) -> usize {
        self.documents.iter().filter(|d| d.format().is_some()).count()
    }

    fn of_format(&self, format: DocumentFormat) -> impl Iterator<Item = &UploadedDocument> {
        self.documents
            .iter()
            .filter(move |d| d.format() == Some(format))
    }
}

/// Encoding of re-encoded image bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    Png,
    Jpeg,
}

impl ImageFormat {
    pub fn mime_type(&self) -> &'static str {
        match self {
            ImageFormat::Png => "image/png",
            ImageFormat::Jpeg => "image/jpeg",
        }
    }

    pub fn as_image_format(&self) -> image::ImageFormat {
        match self {
            ImageFormat::Png => image::ImageFormat::Png,
            ImageFormat::Jpeg => image::ImageFormat::Jpeg,
        }
    }
}

/// One embedded raster image found in a PDF
#[derive(Debug, Clone, PartialEq)]
pub struct ImageRecord {
    /// Source file name
    pub document: String,
    /// Page number (1-based)
    pub page: u32,
    /// Position in the page's image list (1-based)
    pub index: u32,
    pub width: u32,
    pub height: u32,
    pub format: ImageFormat,
    /// Opaque re-encoded image
    pub data: Vec<u8>,
}

impl ImageRecord {
    /// Label used for captions, e.g. "Page 2 - Image 1"
    pub fn label(&self) -> String {
        format!("Page {} - Image {}", self.page, self.index)
    }
}

/// Aggregated statistics for one analyzed batch
///
/// `total_images` always equals `images.len()`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AnalysisResult {
    pub total_characters: usize,
    pub total_images: usize,
    pub images: Vec<ImageRecord>,
    /// Number of documents that were analyzed
    pub document_count: usize,
}

impl AnalysisResult {
    pub fn new(total_characters: usize, images: Vec<ImageRecord>, document_count: usize) -> Self {
        Self {
            total_characters,
            total_images: images.len(),
            images,
            document_count,
        }
    }
}

/// Category of a non-fatal analysis problem
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    /// One image could not be decoded and was left out
    ImageSkipped,
    /// A whole PDF could not be opened for image extraction
    DocumentSkipped,
    /// A page produced no text because extraction failed
    PageTextUnavailable,
    /// An upload was neither PDF nor Word
    UnsupportedFile,
}

/// A non-fatal warning collected during analysis
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub document: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_index: Option<u32>,
    pub message: String,
}

impl Diagnostic {
    pub fn image_skipped(document: &str, page: u32, index: u32, message: impl Into<String>) -> Self {
        Self {
            kind: DiagnosticKind::ImageSkipped,
            document: document.to_string(),
            page: Some(page),
            image_index: Some(index),
            message: message.into(),
        }
    }

    pub fn document_skipped(document: &str, message: impl Into<String>) -> Self {
        Self {
            kind: DiagnosticKind::DocumentSkipped,
            document: document.to_string(),
            page: None,
            image_index: None,
            message: message.into(),
        }
    }

    pub fn page_text_unavailable(document: &str, page: u32, message: impl Into<String>) -> Self {
        Self {
            kind: DiagnosticKind::PageTextUnavailable,
            document: document.to_string(),
            page: Some(page),
            image_index: None,
            message: message.into(),
        }
    }

    pub fn unsupported_file(document: &str, mime_type: &str) -> Self {
        Self {
            kind: DiagnosticKind::UnsupportedFile,
            document: document.to_string(),
            page: None,
            image_index: None,
            message: format!("unsupported file type '{}'", mime_type),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            DiagnosticKind::ImageSkipped => write!(
                f,
                "Error processing image (page {}, image {} of {}): {}",
                self.page.unwrap_or_default(),
                self.image_index.unwrap_or_default(),
                self.document,
                self.message
            ),
            DiagnosticKind::DocumentSkipped => {
                write!(f, "Error processing PDF {}: {}", self.document, self.message)
            }
            DiagnosticKind::PageTextUnavailable => write!(
                f,
                "No text extracted from page {} of {}: {}",
                self.page.unwrap_or_default(),
                self.document,
                self.message
            ),
            DiagnosticKind::UnsupportedFile => {
                write!(f, "Skipped {}: {}", self.document, self.message)
            }
        }
    }
}
