//! PDF format implementation
//!
//! Text comes from `lopdf`'s page text extraction; embedded images are
//! decoded from their XObject streams.

mod filters;
pub mod images;
mod parser;

pub use images::{extract_images, extract_images_from_pdfs, ImageExtraction};
pub use parser::PdfDocument;
