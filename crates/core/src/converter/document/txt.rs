//! Plain text reading and writing.

use std::path::Path;

use super::model::Document;
use crate::converter::error::ConverterError;

/// Reads a text file, one paragraph per line. Invalid UTF-8 is replaced.
pub fn read(path: &Path) -> Result<Document, ConverterError> {
    let bytes = std::fs::read(path)?;
    let text = String::from_utf8_lossy(&bytes);
    let text = text.strip_prefix('\u{feff}').unwrap_or(&text);
    Ok(Document::from_lines(text))
}

/// Writes each paragraph as one line.
pub fn write(doc: &Document, path: &Path) -> Result<(), ConverterError> {
    std::fs::write(path, doc.plain_text())?;
    Ok(())
}
