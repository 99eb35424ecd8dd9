//! Document abstraction
//!
//! Types shared by every supported format:
//!
//! - `types`: uploads, batches, image records, and analysis results
//! - `traits`: the `TextSource` seam implemented by each format
//! - `error`: the unified `DocumentError`

mod error;
mod traits;
mod types;

pub use error::{DocumentError, DocumentResult};
pub use traits::TextSource;
pub use types::{
    AnalysisResult, Diagnostic, DiagnosticKind, DocumentBatch, DocumentFormat, ImageFormat,
    ImageRecord, UploadedDocument, DOCX_MIME, PDF_MIME,
};
