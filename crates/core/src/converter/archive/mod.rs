//! Archive repackaging: extract the input into a private directory, repack
//! it in the target format, then remove the directory.
//!
//! zip and the tar family are handled in-process; rar and 7z go through the
//! `unrar`/`rar` and `7z` command line tools.

mod format;
mod workflow;

pub use format::{ArchiveFormat, TarCompression};
pub use workflow::{extract, repack, ArchiveState, ArchiveWorkOrder};

use async_trait::async_trait;
use std::sync::Arc;
use tracing::info;

use super::config::ConverterConfig;
use super::error::ConverterError;
use super::traits::CategoryConverter;
use super::types::ConversionRequest;
use crate::format::FormatCategory;

/// Converts between archive formats.
pub struct ArchiveConverter {
    config: Arc<ConverterConfig>,
}

impl ArchiveConverter {
    /// Creates a new archive converter with the given configuration.
    pub fn new(config: Arc<ConverterConfig>) -> Self {
        Self { config }
    }

    /// Creates a converter with default configuration.
    pub fn with_defaults() -> Self {
        Self::new(Arc::new(ConverterConfig::default()))
    }
}

#[async_trait]
impl CategoryConverter for ArchiveConverter {
    fn name(&self) -> &str {
        "archive"
    }

    fn category(&self) -> FormatCategory {
        FormatCategory::Archives
    }

    async fn convert(&self, request: ConversionRequest) -> Result<(), ConverterError> {
        // Both formats are resolved before anything touches the disk.
        let target_format = ArchiveFormat::parse(&request.target_format).ok_or_else(|| {
            ConverterError::UnsupportedFormat {
                format: request.target_format.clone(),
            }
        })?;
        let input_format = ArchiveFormat::from_path(&request.input_path).ok_or_else(|| {
            ConverterError::UnsupportedFormat {
                format: request.input_extension(),
            }
        })?;

        let mut order = ArchiveWorkOrder::prepare(
            request.input_path,
            request.output_path,
            input_format,
            target_format,
            self.config.temp_dir.as_deref(),
        )?;

        let result = order.execute(&self.config).await;
        let output = order.output_path.clone();
        order.cleanup();
        result?;

        info!(
            from = %input_format,
            to = %target_format,
            output = %output.display(),
            "Archive conversion finished"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::converter::error::ArchiveStage;
    use std::path::Path;
    use tempfile::TempDir;

    /// Names of leftover extraction directories under `dir`.
    fn leftovers(dir: &Path) -> Vec<String> {
        std::fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .filter(|name| name.starts_with(".files-converter-"))
            .collect()
    }

    fn write_zip(path: &Path, files: &[(&str, &str)]) {
        use std::io::Write;
        let mut zip = zip::ZipWriter::new(std::fs::File::create(path).unwrap());
        for (name, body) in files {
            zip.start_file(*name, zip::write::SimpleFileOptions::default())
                .unwrap();
            zip.write_all(body.as_bytes()).unwrap();
        }
        zip.finish().unwrap();
    }

    #[tokio::test]
    async fn test_zip_to_tar_gz_keeps_every_file() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("bundle.zip");
        write_zip(&input, &[("one.txt", "1"), ("two.txt", "2"), ("sub/three.txt", "3")]);
        let output = dir.path().join("bundle.tar.gz");

        ArchiveConverter::with_defaults()
            .convert(ConversionRequest::new(&input, &output, "tar.gz"))
            .await
            .unwrap();

        let file = std::fs::File::open(&output).unwrap();
        let mut archive = tar::Archive::new(flate2::read::GzDecoder::new(file));
        let files = archive
            .entries()
            .unwrap()
            .filter(|e| e.as_ref().unwrap().header().entry_type().is_file())
            .count();
        assert_eq!(files, 3);
        assert!(leftovers(dir.path()).is_empty());
    }

    #[tokio::test]
    async fn test_alias_target_and_configured_temp_dir() {
        let dir = TempDir::new().unwrap();
        let scratch = TempDir::new().unwrap();
        let input = dir.path().join("bundle.zip");
        write_zip(&input, &[("a.txt", "a")]);
        let output = dir.path().join("bundle.tbz2");

        let config = ConverterConfig::default().with_temp_dir(scratch.path().to_path_buf());
        ArchiveConverter::new(Arc::new(config))
            .convert(ConversionRequest::new(&input, &output, "bztar"))
            .await
            .unwrap();

        let mut magic = [0u8; 3];
        std::io::Read::read_exact(&mut std::fs::File::open(&output).unwrap(), &mut magic).unwrap();
        assert_eq!(&magic, b"BZh");
        assert!(leftovers(scratch.path()).is_empty());
    }

    #[tokio::test]
    async fn test_corrupt_input_fails_extracting_and_cleans_up() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("broken.tar.gz");
        std::fs::write(&input, [0x1f, 0x8b, 0x08, 0x00, 0xde, 0xad]).unwrap();
        let output = dir.path().join("broken.zip");

        let err = ArchiveConverter::with_defaults()
            .convert(ConversionRequest::new(&input, &output, "zip"))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            ConverterError::Archive {
                stage: ArchiveStage::Extracting,
                ..
            }
        ));
        assert!(!output.exists());
        assert!(leftovers(dir.path()).is_empty());
    }

    #[tokio::test]
    async fn test_unknown_target_fails_before_creating_directory() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("bundle.zip");
        write_zip(&input, &[("a.txt", "a")]);

        let err = ArchiveConverter::with_defaults()
            .convert(ConversionRequest::new(&input, dir.path().join("bundle.cab"), "cab"))
            .await
            .unwrap_err();

        match err {
            ConverterError::UnsupportedFormat { format } => assert_eq!(format, "cab"),
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(leftovers(dir.path()).is_empty());
    }

    #[tokio::test]
    async fn test_unknown_input_fails_before_creating_directory() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("bundle.cab");
        std::fs::write(&input, b"MSCF").unwrap();

        let err = ArchiveConverter::with_defaults()
            .convert(ConversionRequest::new(&input, dir.path().join("bundle.zip"), "zip"))
            .await
            .unwrap_err();

        assert!(matches!(err, ConverterError::UnsupportedFormat { .. }));
        assert!(leftovers(dir.path()).is_empty());
    }
}
