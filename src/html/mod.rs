//! HTML rendering for the analyzer page
//!
//! Pages are built as strings; every piece of user-controlled text (file
//! names, queries, error messages) goes through `html_escape`.

use std::fmt::Write;

use html_escape::{encode_double_quoted_attribute, encode_text};

use crate::document::{Diagnostic, ImageRecord, DOCX_MIME, PDF_MIME};
use crate::preview;
use crate::query::Answer;

const TITLE: &str = "Document Analyzer";

const QUERY_PROMPT: &str =
    "Ask something about the document (e.g., 'character count', 'image count', 'image details'):";

const STYLE: &str = "\
body { font-family: Arial, sans-serif; color: #333; padding: 2rem; }
.notice { padding: 0.75rem 1rem; border-radius: 5px; margin: 1rem 0; }
.success { background: #e6f4ea; }
.error { background: #fce8e6; }
.warning { background: #fef7e0; }
figure img { max-width: 300px; margin: 10px 0; border: 1px solid #ddd; border-radius: 5px; }
";

/// Status banner shown above the query section
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    Success(String),
    Error(String),
}

/// Everything the analyzer page shows for one request
#[derive(Debug, Default)]
pub struct PageView<'a> {
    /// Whether the session holds a completed analysis
    pub analyzed: bool,
    pub notice: Option<Notice>,
    pub warnings: &'a [Diagnostic],
    /// Current query text, echoed into the input
    pub query: &'a str,
    pub answer: Option<Answer<'a>>,
    /// Thumbnail bounding box in pixels
    pub preview_max_px: u32,
}

/// Render the full analyzer page
pub fn render_page(view: &PageView<'_>) -> String {
    let mut body = String::new();

    body.push_str("<h2>Upload your documents to analyze</h2>\n");
    body.push_str(&upload_form());

    if let Some(notice) = &view.notice {
        body.push_str(&render_notice(notice));
    }

    for warning in view.warnings {
        let _ = writeln!(
            body,
            "<div class=\"notice warning\">{}</div>",
            encode_text(&warning.to_string())
        );
    }

    body.push_str(&query_form(view.analyzed, view.query));

    if let Some(answer) = &view.answer {
        body.push_str("<section id=\"answer\">\n");
        body.push_str(&render_answer(answer, view.preview_max_px));
        body.push_str("</section>\n");
    }

    layout(&body)
}

/// Standalone page carrying only an error notice
pub fn error_page(message: &str) -> String {
    let body = format!(
        "{}<p><a href=\"/\">Back to the analyzer</a></p>\n",
        render_notice(&Notice::Error(message.to_string()))
    );
    layout(&body)
}

fn layout(body: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n\
         <title>{title}</title>\n<style>\n{style}</style>\n</head>\n<body>\n\
         <h1>{title}</h1>\n{body}</body>\n</html>\n",
        title = TITLE,
        style = STYLE,
        body = body
    )
}

fn upload_form() -> String {
    let accept = format!(".pdf,.docx,{},{}", PDF_MIME, DOCX_MIME);
    format!(
        "<form method=\"post\" action=\"/analyze\" enctype=\"multipart/form-data\">\n\
         <label for=\"documents\">Upload your Documents</label>\n\
         <input type=\"file\" id=\"documents\" name=\"documents\" multiple accept=\"{}\">\n\
         <button type=\"submit\">Submit &amp; Analyze</button>\n\
         </form>\n",
        encode_double_quoted_attribute(&accept)
    )
}

fn query_form(analyzed: bool, query: &str) -> String {
    let disabled = if analyzed { "" } else { " disabled" };
    format!(
        "<form method=\"get\" action=\"/query\">\n\
         <label for=\"q\">{}</label>\n\
         <input type=\"text\" id=\"q\" name=\"q\" value=\"{}\"{}>\n\
         <button type=\"submit\"{}>Ask</button>\n\
         </form>\n",
        encode_text(QUERY_PROMPT),
        encode_double_quoted_attribute(query),
        disabled,
        disabled
    )
}

fn render_notice(notice: &Notice) -> String {
    let (class, message) = match notice {
        Notice::Success(message) => ("success", message),
        Notice::Error(message) => ("error", message),
    };
    format!(
        "<div class=\"notice {}\">{}</div>\n",
        class,
        encode_text(message)
    )
}

/// Render a query answer as HTML
pub fn render_answer(answer: &Answer<'_>, preview_max_px: u32) -> String {
    let mut out = format!("<p>{}</p>\n", encode_text(&answer.headline()));

    if let Answer::ImageDetails(images) = answer {
        for record in images.iter() {
            out.push_str(&render_image_block(record, preview_max_px));
        }
    }

    out
}

fn render_image_block(record: &ImageRecord, preview_max_px: u32) -> String {
    let label = record.label();
    let mut out = String::from("<div class=\"image\">\n");

    let _ = writeln!(out, "<p>{}</p>", encode_text(&label));
    let _ = writeln!(
        out,
        "<p>Dimensions: {}x{} pixels</p>",
        record.width, record.height
    );

    match preview::thumbnail(record, preview_max_px) {
        Ok(thumb) => {
            let _ = writeln!(
                out,
                "<figure><img src=\"{}\" width=\"{}\" height=\"{}\" alt=\"{}\"><figcaption>{}</figcaption></figure>",
                thumb.data_uri,
                thumb.width,
                thumb.height,
                encode_double_quoted_attribute(&label),
                encode_text(&label)
            );
        }
        Err(e) => {
            tracing::warn!(page = record.page, index = record.index, error = %e, "Thumbnail failed");
            let _ = writeln!(
                out,
                "<div class=\"notice warning\">Could not display image: {}</div>",
                encode_text(&e.to_string())
            );
        }
    }

    out.push_str("<hr>\n</div>\n");
    out
}
