//! Free-text questions about an analysis result

use crate::document::{AnalysisResult, ImageRecord};

/// Help text shown when a question matches no rule
pub const HELP_TEXT: &str =
    "Please ask about 'character count', 'image count', or 'image details'";

/// Shown for an image details question when the batch had no images
pub const NO_IMAGES_TEXT: &str = "No images found in the document.";

/// What a question is asking for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryKind {
    CharacterCount,
    ImageDetails,
    ImageCount,
    Unrecognized,
}

impl QueryKind {
    /// Classify a question; the first matching rule wins.
    ///
    /// Returns `None` for an empty or whitespace-only question.
    pub fn classify(query: &str) -> Option<Self> {
        let query = query.trim().to_lowercase();
        if query.is_empty() {
            return None;
        }

        let kind = if query.contains("character") {
            Self::CharacterCount
        } else if query.contains("image") && query.contains("detail") {
            Self::ImageDetails
        } else if query.contains("image") {
            Self::ImageCount
        } else {
            Self::Unrecognized
        };
        Some(kind)
    }
}

/// Answer to a question, borrowing image records from the result
#[derive(Debug, Clone, PartialEq)]
pub enum Answer<'a> {
    CharacterCount(usize),
    ImageDetails(&'a [ImageRecord]),
    NoImages,
    ImageCount(usize),
    Help,
}

impl<'a> Answer<'a> {
    /// Plain-text heading line of the answer
    pub fn headline(&self) -> String {
        match self {
            Answer::CharacterCount(n) => format!("Character Count: {}", group_thousands(*n)),
            Answer::ImageDetails(_) => "Images with details:".to_string(),
            Answer::NoImages => NO_IMAGES_TEXT.to_string(),
            Answer::ImageCount(n) => format!("Total Images: {}", n),
            Answer::Help => HELP_TEXT.to_string(),
        }
    }
}

/// Answer a question against a result; `None` for an empty question
pub fn answer<'a>(query: &str, result: &'a AnalysisResult) -> Option<Answer<'a>> {
    let answer = match QueryKind::classify(query)? {
        QueryKind::CharacterCount => Answer::CharacterCount(result.total_characters),
        QueryKind::ImageDetails if result.images.is_empty() => Answer::NoImages,
        QueryKind::ImageDetails => Answer::ImageDetails(&result.images),
        QueryKind::ImageCount => Answer::ImageCount(result.total_images),
        QueryKind::Unrecognized => Answer::Help,
    };
    Some(answer)
}

/// Format an integer with comma thousands separators
pub fn group_thousands(n: usize) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}
