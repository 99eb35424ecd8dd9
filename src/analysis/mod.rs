//! Batch analysis
//!
//! Runs the character count over every supported document, then image
//! extraction over the PDFs, and folds both into one `AnalysisResult`.
//! Recoverable problems come back as diagnostics next to the result; only
//! an empty batch or an unreadable document fails the whole analysis.

use thiserror::Error;

use crate::document::{
    AnalysisResult, Diagnostic, DocumentBatch, DocumentError, DocumentFormat, TextSource,
};
use crate::formats::{self, pdf};

/// Fatal analysis errors; nothing is stored when one occurs
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("No PDF or Word documents were uploaded")]
    EmptyBatch,

    #[error("Could not read {document}: {source}")]
    Unreadable {
        document: String,
        #[source]
        source: DocumentError,
    },
}

/// A completed analysis with its non-fatal warnings
#[derive(Debug, Clone)]
pub struct AnalysisOutcome {
    pub result: AnalysisResult,
    pub diagnostics: Vec<Diagnostic>,
}

/// Analyze a batch of uploads
pub fn analyze_batch(batch: &DocumentBatch) -> Result<AnalysisOutcome, AnalysisError> {
    let document_count = batch.supported_count();
    if document_count == 0 {
        return Err(AnalysisError::EmptyBatch);
    }

    let mut diagnostics: Vec<Diagnostic> = batch
        .unsupported()
        .map(|upload| Diagnostic::unsupported_file(&upload.file_name, &upload.mime_type))
        .collect();

    let total_characters = count_batch_characters(batch, &mut diagnostics)?;

    let images = pdf::extract_images_from_pdfs(batch.pdfs());
    diagnostics.extend(images.diagnostics);

    let result = AnalysisResult::new(total_characters, images.records, document_count);

    tracing::info!(
        documents = document_count,
        characters = result.total_characters,
        images = result.total_images,
        warnings = diagnostics.len(),
        "Analysis complete"
    );

    Ok(AnalysisOutcome {
        result,
        diagnostics,
    })
}

/// Total characters across all PDFs and Word documents in the batch
pub fn count_batch_characters(
    batch: &DocumentBatch,
    diagnostics: &mut Vec<Diagnostic>,
) -> Result<usize, AnalysisError> {
    let uploads = batch
        .pdfs()
        .map(|d| (DocumentFormat::Pdf, d))
        .chain(batch.word_documents().map(|d| (DocumentFormat::Docx, d)));

    let mut total = 0;
    for (format, upload) in uploads {
        let source = formats::open_text_source(format, upload).map_err(|source| {
            AnalysisError::Unreadable {
                document: upload.file_name.clone(),
                source,
            }
        })?;

        let count = count_characters(source.as_ref(), &upload.file_name, diagnostics);
        tracing::debug!(
            document = %upload.file_name,
            format = ?source.format(),
            items = source.item_count(),
            characters = count,
            "Counted characters"
        );
        total += count;
    }

    Ok(total)
}

/// Characters in every item of one document.
///
/// An item that yields no text counts as zero; an item whose extraction
/// fails also counts as zero and is reported.
pub fn count_characters(
    source: &dyn TextSource,
    document_name: &str,
    diagnostics: &mut Vec<Diagnostic>,
) -> usize {
    (0..source.item_count())
        .map(|index| match source.extract_text(index) {
            Ok(text) => text.chars().count(),
            Err(e) => {
                let page = index as u32 + 1;
                tracing::warn!(document = %document_name, page, error = %e, "Text extraction failed");
                diagnostics.push(Diagnostic::page_text_unavailable(document_name, page, e.to_string()));
                0
            }
        })
        .sum()
}
