//! Word (OOXML) TextSource implementation
//!
//! A `.docx` file is a ZIP package. The main document part is located via
//! the package relationships (falling back to `word/document.xml`) and its
//! top-level body paragraphs are read with a streaming XML reader.

use std::io::{Cursor, Read};

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use zip::ZipArchive;

use crate::document::{DocumentError, DocumentFormat, DocumentResult, TextSource};

/// Conventional location of the main document part
const DEFAULT_MAIN_PART: &str = "word/document.xml";

/// Relationship type of the main document part
const OFFICE_DOCUMENT_REL: &str = "/officeDocument";

/// A parsed Word document, reduced to its body paragraphs
#[derive(Debug, Clone)]
pub struct DocxDocument {
    paragraphs: Vec<String>,
}

impl DocxDocument {
    /// Parse a `.docx` package from bytes
    pub fn from_bytes(data: &[u8]) -> DocumentResult<Self> {
        let mut archive = ZipArchive::new(Cursor::new(data))?;

        let main_part = read_part(&mut archive, "_rels/.rels")
            .ok()
            .and_then(|rels| main_part_from_rels(&rels))
            .unwrap_or_else(|| DEFAULT_MAIN_PART.to_string());

        let xml = read_part(&mut archive, &main_part)?;
        let paragraphs = parse_body_paragraphs(&xml)?;

        Ok(Self { paragraphs })
    }

    pub fn paragraphs(&self) -> &[String] {
        &self.paragraphs
    }
}

impl TextSource for DocxDocument {
    fn format(&self) -> DocumentFormat {
        DocumentFormat::Docx
    }

    fn item_count(&self) -> usize {
        self.paragraphs.len()
    }

    fn extract_text(&self, item_index: usize) -> DocumentResult<String> {
        self.paragraphs
            .get(item_index)
            .cloned()
            .ok_or(DocumentError::ItemNotFound(item_index))
    }
}

fn read_part<R: Read + std::io::Seek>(archive: &mut ZipArchive<R>, name: &str) -> DocumentResult<String> {
    let mut file = archive
        .by_name(name)
        .map_err(|e| DocumentError::ResourceNotFound(format!("{}: {}", name, e)))?;

    let mut content = String::new();
    file.read_to_string(&mut content)?;
    Ok(content)
}

/// Find the officeDocument target in the package relationships
fn main_part_from_rels(rels: &str) -> Option<String> {
    let mut reader = Reader::from_str(rels);

    loop {
        match reader.read_event() {
            Ok(Event::Empty(e)) | Ok(Event::Start(e)) if e.local_name().as_ref() == b"Relationship" => {
                let mut rel_type = None;
                let mut target = None;

                for attr in e.attributes().flatten() {
                    let value = attr.unescape_value().ok()?.into_owned();
                    match attr.key.local_name().as_ref() {
                        b"Type" => rel_type = Some(value),
                        b"Target" => target = Some(value),
                        _ => {}
                    }
                }

                if rel_type.is_some_and(|t| t.ends_with(OFFICE_DOCUMENT_REL)) {
                    return target.map(|t| t.trim_start_matches('/').to_string());
                }
            }
            Ok(Event::Eof) | Err(_) => return None,
            _ => {}
        }
    }
}

/// Text of each direct `w:p` child of `w:body`, in order.
///
/// Run text (`w:t`) is concatenated; `w:tab` becomes a tab, while `w:cr`
/// and text-wrapping `w:br` become a newline. Page and column breaks add
/// nothing, matching how word processors report paragraph text.
/// Paragraphs nested inside text boxes belong to their own container and
/// are not counted.
fn parse_body_paragraphs(xml: &str) -> DocumentResult<Vec<String>> {
    let mut reader = Reader::from_str(xml);

    // Local names of the currently open elements
    let mut stack: Vec<Vec<u8>> = Vec::new();
    let mut paragraphs = Vec::new();
    let mut current: Option<String> = None;
    let mut paragraph_depth = 0usize;
    let mut in_text = false;

    loop {
        match reader.read_event()? {
            Event::Start(e) => {
                let name = e.local_name().as_ref().to_vec();
                match name.as_slice() {
                    b"p" => {
                        paragraph_depth += 1;
                        if paragraph_depth == 1 && parent_is(&stack, b"body") {
                            current = Some(String::new());
                        }
                    }
                    b"t" => in_text = parent_is(&stack, b"r"),
                    _ => {}
                }
                stack.push(name);
            }
            Event::Empty(e) => {
                let counted = paragraph_depth == 1 && parent_is(&stack, b"r");
                match e.local_name().as_ref() {
                    b"p" if paragraph_depth == 0 && parent_is(&stack, b"body") => {
                        paragraphs.push(String::new());
                    }
                    b"tab" if counted => push_char(&mut current, '\t'),
                    b"br" if counted && is_line_break(&e) => push_char(&mut current, '\n'),
                    b"cr" if counted => push_char(&mut current, '\n'),
                    _ => {}
                }
            }
            Event::Text(t) => {
                if in_text && paragraph_depth == 1 {
                    if let Some(text) = current.as_mut() {
                        text.push_str(&t.unescape()?);
                    }
                }
            }
            Event::CData(c) => {
                if in_text && paragraph_depth == 1 {
                    if let Some(text) = current.as_mut() {
                        text.push_str(&String::from_utf8_lossy(&c));
                    }
                }
            }
            Event::End(_) => {
                match stack.pop().as_deref() {
                    Some(b"p") => {
                        paragraph_depth = paragraph_depth.saturating_sub(1);
                        if paragraph_depth == 0 {
                            if let Some(text) = current.take() {
                                paragraphs.push(text);
                            }
                        }
                    }
                    Some(b"t") => in_text = false,
                    _ => {}
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(paragraphs)
}

/// A `w:br` without `w:type`, or with `textWrapping`, breaks the line
fn is_line_break(element: &BytesStart) -> bool {
    element
        .attributes()
        .flatten()
        .find(|attr| attr.key.local_name().as_ref() == b"type")
        .map_or(true, |attr| attr.value.as_ref() == b"textWrapping")
}

fn parent_is(stack: &[Vec<u8>], name: &[u8]) -> bool {
    stack.last().is_some_and(|parent| parent.as_slice() == name)
}

fn push_char(current: &mut Option<String>, c: char) {
    if let Some(text) = current.as_mut() {
        text.push(c);
    }
}
