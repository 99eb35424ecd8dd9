//! Document Analyzer Library
//!
//! Character and embedded-image statistics for batches of PDF and Word
//! documents, served as a small web application.
//!
//! # Modules
//!
//! - `document`: Shared document types and the `TextSource` trait
//! - `formats`: PDF and Word parsing, PDF image extraction
//! - `analysis`: Batch aggregation into an `AnalysisResult`
//! - `query`: Free-text questions about a result
//! - `session`: Per-user analysis sessions
//! - `routes`: HTTP endpoints

pub mod analysis;
pub mod config;
pub mod document;
pub mod error;
pub mod formats;
pub mod html;
pub mod preview;
pub mod query;
pub mod routes;
pub mod session;
pub mod state;

#[cfg(test)]
mod fixtures;
