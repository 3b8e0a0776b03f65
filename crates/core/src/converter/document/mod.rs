//! Document conversion between PDF, DOCX, TXT, RTF and ODT.
//!
//! Every supported (input, target) pair is a cell in [`CELLS`]. A cell
//! either copies the file (same format) or reads the input into the shared
//! [`Document`] model and writes it back out with the target's writer.

mod docx;
mod model;
mod odt;
mod pdf;
mod rtf;
mod txt;

pub use model::{Document, Paragraph, Run};

use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

use super::config::ConverterConfig;
use super::error::ConverterError;
use super::traits::CategoryConverter;
use super::types::ConversionRequest;
use crate::format::FormatCategory;

/// Document formats handled by [`DocumentConverter`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DocumentFormat {
    Pdf,
    Docx,
    Txt,
    Rtf,
    Odt,
}

impl DocumentFormat {
    /// Parses a bare extension such as `docx`.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.trim_start_matches('.').to_ascii_lowercase().as_str() {
            "pdf" => Some(Self::Pdf),
            "docx" => Some(Self::Docx),
            "txt" => Some(Self::Txt),
            "rtf" => Some(Self::Rtf),
            "odt" => Some(Self::Odt),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pdf => "pdf",
            Self::Docx => "docx",
            Self::Txt => "txt",
            Self::Rtf => "rtf",
            Self::Odt => "odt",
        }
    }

    fn read(self, path: &Path) -> Result<Document, ConverterError> {
        match self {
            Self::Pdf => pdf::read(path),
            Self::Docx => docx::read(path),
            Self::Txt => txt::read(path),
            Self::Rtf => rtf::read(path),
            Self::Odt => odt::read(path),
        }
    }

    fn write(self, doc: &Document, path: &Path, pdf_font_size: u8) -> Result<(), ConverterError> {
        match self {
            Self::Pdf => pdf::write(doc, path, pdf_font_size),
            Self::Docx => docx::write(doc, path),
            Self::Txt => txt::write(doc, path),
            Self::Rtf => rtf::write(doc, path),
            Self::Odt => odt::write(doc, path),
        }
    }
}

use DocumentFormat::{Docx, Odt, Pdf, Rtf, Txt};

/// Supported (input, target) pairs.
pub const CELLS: &[(DocumentFormat, DocumentFormat)] = &[
    (Pdf, Pdf),
    (Pdf, Docx),
    (Pdf, Txt),
    (Pdf, Rtf),
    (Pdf, Odt),
    (Docx, Pdf),
    (Docx, Docx),
    (Docx, Txt),
    (Docx, Rtf),
    (Docx, Odt),
    (Txt, Pdf),
    (Txt, Docx),
    (Txt, Txt),
    (Txt, Rtf),
    (Txt, Odt),
    (Rtf, Pdf),
    (Rtf, Docx),
    (Rtf, Txt),
    (Rtf, Rtf),
    (Rtf, Odt),
    (Odt, Pdf),
    (Odt, Docx),
    (Odt, Txt),
    (Odt, Rtf),
    (Odt, Odt),
];

/// Looks up the cell for an (input extension, target) pair.
pub fn cell(from: &str, to: &str) -> Option<(DocumentFormat, DocumentFormat)> {
    let from = DocumentFormat::from_extension(from)?;
    let to = DocumentFormat::from_extension(to)?;
    CELLS.iter().copied().find(|&cell| cell == (from, to))
}

fn convert_cell(
    from: DocumentFormat,
    to: DocumentFormat,
    input_path: &Path,
    output_path: &Path,
    pdf_font_size: u8,
) -> Result<(), ConverterError> {
    if from == to {
        if let (Ok(a), Ok(b)) = (input_path.canonicalize(), output_path.canonicalize()) {
            if a == b {
                return Err(ConverterError::OutputIsInput {
                    path: input_path.to_path_buf(),
                });
            }
        }
        std::fs::copy(input_path, output_path)?;
        return Ok(());
    }

    let doc = from.read(input_path)?;
    debug!(paragraphs = doc.paragraphs.len(), "Read document");
    to.write(&doc, output_path, pdf_font_size)
}

/// Converts documents in-process through the shared paragraph/run model.
pub struct DocumentConverter {
    config: Arc<ConverterConfig>,
}

impl DocumentConverter {
    /// Creates a new document converter with the given configuration.
    pub fn new(config: Arc<ConverterConfig>) -> Self {
        Self { config }
    }

    /// Creates a converter with default configuration.
    pub fn with_defaults() -> Self {
        Self::new(Arc::new(ConverterConfig::default()))
    }
}

#[async_trait]
impl CategoryConverter for DocumentConverter {
    fn name(&self) -> &str {
        "documents"
    }

    fn category(&self) -> FormatCategory {
        FormatCategory::Documents
    }

    async fn convert(&self, request: ConversionRequest) -> Result<(), ConverterError> {
        let from = request.input_extension();
        let (input_format, target_format) = cell(&from, &request.target_format)
            .ok_or_else(|| ConverterError::unsupported_conversion(&from, &request.target_format))?;
        debug!(
            from = input_format.as_str(),
            to = target_format.as_str(),
            "Selected document cell"
        );

        let font_size = self.config.pdf_font_size;
        let ConversionRequest {
            input_path,
            output_path,
            ..
        } = request;
        let output = output_path.clone();

        tokio::task::spawn_blocking(move || {
            convert_cell(input_format, target_format, &input_path, &output_path, font_size)
        })
        .await??;

        info!(output = %output.display(), "Document conversion finished");
        Ok(())
    }
}
