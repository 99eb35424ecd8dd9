//! Document error types
//!
//! Error handling shared by the PDF and Word readers.

use thiserror::Error;

/// Unified document error type
#[derive(Debug, Error)]
pub enum DocumentError {
    /// Failed to open or parse the document container
    #[error("Parse error: {0}")]
    ParseError(String),

    /// Item (page/paragraph) not found
    #[error("Item not found: index {0}")]
    ItemNotFound(usize),

    /// A required part of the document is missing
    #[error("Resource not found: {0}")]
    ResourceNotFound(String),

    /// Text extraction error
    #[error("Text extraction error: {0}")]
    TextExtractionError(String),

    /// Stream filter or color space the decoder cannot handle
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    /// Image decoding or encoding error
    #[error("Image error: {0}")]
    ImageError(String),

    /// IO error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Result type alias for document operations
pub type DocumentResult<T> = std::result::Result<T, DocumentError>;

impl From<lopdf::Error> for DocumentError {
    fn from(err: lopdf::Error) -> Self {
        DocumentError::ParseError(err.to_string())
    }
}

impl From<image::ImageError> for DocumentError {
    fn from(err: image::ImageError) -> Self {
        DocumentError::ImageError(err.to_string())
    }
}

impl From<zip::result::ZipError> for DocumentError {
    fn from(err: zip::result::ZipError) -> Self {
        DocumentError::ParseError(err.to_string())
    }
}

impl From<quick_xml::Error> for DocumentError {
    fn from(err: quick_xml::Error) -> Self {
        DocumentError::ParseError(err.to_string())
    }
}
