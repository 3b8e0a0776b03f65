//! Ebook strategy delegating to Calibre's `ebook-convert`.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info};

use super::config::ConverterConfig;
use super::error::ConverterError;
use super::process::ToolCommand;
use super::traits::CategoryConverter;
use super::types::ConversionRequest;
use crate::format::FormatCategory;

/// Converts ebooks with `ebook-convert <input> <output>`.
///
/// The output format is implied by the output file's extension.
pub struct EbookConverter {
    config: Arc<ConverterConfig>,
}

impl EbookConverter {
    /// Creates a new ebook converter with the given configuration.
    pub fn new(config: Arc<ConverterConfig>) -> Self {
        Self { config }
    }
}

#[async_trait]
impl CategoryConverter for EbookConverter {
    fn name(&self) -> &str {
        "ebook-convert"
    }

    fn category(&self) -> FormatCategory {
        FormatCategory::Ebooks
    }

    async fn convert(&self, request: ConversionRequest) -> Result<(), ConverterError> {
        let result = ToolCommand::new("ebook-convert", &self.config.ebook_convert_path)
            .arg(&request.input_path)
            .arg(&request.output_path)
            .run()
            .await;

        match result {
            Ok(_) => {
                info!(output = %request.output_path.display(), "Ebook conversion finished");
                Ok(())
            }
            Err(ConverterError::ExternalToolFailed { code, .. }) => {
                debug!(?code, "ebook-convert exited unsuccessfully");
                Err(ConverterError::ConversionFailed {
                    input: request.input_path,
                    output: request.output_path,
                })
            }
            Err(e) => Err(e),
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::os::unix::fs::PermissionsExt;
    use std::path::{Path, PathBuf};

    fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    #[tokio::test]
    async fn test_tool_failure_names_both_paths() {
        let dir = tempfile::TempDir::new().unwrap();
        let tool = write_script(dir.path(), "ebook-convert", "echo 'bad input' >&2; exit 1");
        let converter =
            EbookConverter::new(Arc::new(ConverterConfig::default().with_ebook_convert(tool)));

        let err = converter
            .convert(ConversionRequest::new("/books/in.epub", "/books/out.mobi", "mobi"))
            .await
            .unwrap_err();

        let msg = err.to_string();
        assert!(matches!(err, ConverterError::ConversionFailed { .. }));
        assert!(msg.contains("/books/in.epub"));
        assert!(msg.contains("/books/out.mobi"));
    }

    #[tokio::test]
    async fn test_tool_receives_input_and_output() {
        let dir = tempfile::TempDir::new().unwrap();
        let tool = write_script(dir.path(), "ebook-convert", "cp \"$1\" \"$2\"");
        let input = dir.path().join("book.epub");
        let output = dir.path().join("book.azw3");
        std::fs::write(&input, b"epub bytes").unwrap();

        let converter =
            EbookConverter::new(Arc::new(ConverterConfig::default().with_ebook_convert(tool)));
        converter
            .convert(ConversionRequest::new(&input, &output, "azw3"))
            .await
            .unwrap();

        assert_eq!(std::fs::read(&output).unwrap(), b"epub bytes");
    }

    #[tokio::test]
    async fn test_missing_tool() {
        let converter = EbookConverter::new(Arc::new(
            ConverterConfig::default().with_ebook_convert(PathBuf::from("/nonexistent/ebook-convert")),
        ));
        let err = converter
            .convert(ConversionRequest::new("/in.epub", "/out.mobi", "mobi"))
            .await
            .unwrap_err();
        assert!(matches!(err, ConverterError::MissingDependency { .. }));
    }
}
