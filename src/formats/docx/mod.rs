//! Word (OOXML) format implementation

mod parser;

pub use parser::DocxDocument;
