//! Error types for the converter module.

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Stage of the archive workflow at which a failure happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveStage {
    /// Creating the private extraction directory.
    Preparing,
    /// Unpacking the input archive.
    Extracting,
    /// Writing the output archive.
    Repacking,
}

impl fmt::Display for ArchiveStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Preparing => "preparing",
            Self::Extracting => "extracting",
            Self::Repacking => "repacking",
        })
    }
}

/// Coarse classification of a [`ConverterError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The input extension maps to no known category.
    UnsupportedCategory,
    /// The category is known but the requested pair is not.
    UnsupportedConversion,
    /// A required external tool is not installed.
    MissingDependency,
    /// An external tool exited unsuccessfully.
    ExternalToolFailure,
    /// Input content could not be parsed.
    DecodeFailure,
    /// Output could not be encoded in the target format.
    EncodeFailure,
    /// Filesystem read/write error.
    IoFailure,
    /// A multi-step workflow failed at runtime.
    Runtime,
}

/// Errors that can occur during conversion.
#[derive(Debug, Error)]
pub enum ConverterError {
    /// Input file extension is not registered in any category.
    #[error("Unsupported file type: {path}")]
    UnsupportedCategory { path: PathBuf },

    /// Input/target pair is not implemented for this category.
    #[error("Unsupported conversion: .{from} to {to}")]
    UnsupportedConversion { from: String, to: String },

    /// Archive format outside the supported vocabulary.
    #[error("Unsupported archive format: {format}")]
    UnsupportedFormat { format: String },

    /// External tool is not installed.
    #[error("{tool} is required for this conversion but was not found at: {path}")]
    MissingDependency { tool: String, path: PathBuf },

    /// External tool exited with a non-zero status.
    #[error("{tool} failed with exit code {code:?}")]
    ExternalToolFailed {
        tool: String,
        code: Option<i32>,
        stderr: Option<String>,
    },

    /// Delegated conversion failed; the tool's own diagnostics are not kept.
    #[error("Failed to convert {input} to {output}")]
    ConversionFailed { input: PathBuf, output: PathBuf },

    /// Input content could not be decoded.
    #[error("Failed to decode {path}: {reason}")]
    Decode { path: PathBuf, reason: String },

    /// Output could not be encoded.
    #[error("Failed to encode {format}: {reason}")]
    Encode { format: String, reason: String },

    /// Archive workflow step failed.
    #[error("Archive conversion failed while {stage}: {source}")]
    Archive {
        stage: ArchiveStage,
        #[source]
        source: Box<ConverterError>,
    },

    /// The output path resolves to the input file.
    #[error("Output would overwrite the input file: {path}")]
    OutputIsInput { path: PathBuf },

    /// A blocking worker task panicked or was cancelled.
    #[error("Conversion task failed: {reason}")]
    TaskFailed { reason: String },

    /// I/O error during conversion.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ConverterError {
    /// Creates an unsupported conversion error. A leading dot on `from` is dropped.
    pub fn unsupported_conversion(from: impl Into<String>, to: impl Into<String>) -> Self {
        let from = from.into();
        Self::UnsupportedConversion {
            from: from.trim_start_matches('.').to_string(),
            to: to.into(),
        }
    }

    /// Creates a decode error.
    pub fn decode(path: impl Into<PathBuf>, reason: impl fmt::Display) -> Self {
        Self::Decode {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    /// Creates an encode error.
    pub fn encode(format: impl Into<String>, reason: impl fmt::Display) -> Self {
        Self::Encode {
            format: format.into(),
            reason: reason.to_string(),
        }
    }

    /// Creates a missing dependency error.
    pub fn missing_dependency(tool: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self::MissingDependency {
            tool: tool.into(),
            path: path.into(),
        }
    }

    /// Wraps an error as an archive workflow failure.
    pub fn archive(stage: ArchiveStage, source: ConverterError) -> Self {
        Self::Archive {
            stage,
            source: Box::new(source),
        }
    }

    /// Returns the taxonomy kind of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::UnsupportedCategory { .. } => ErrorKind::UnsupportedCategory,
            Self::UnsupportedConversion { .. } | Self::UnsupportedFormat { .. } => {
                ErrorKind::UnsupportedConversion
            }
            Self::MissingDependency { .. } => ErrorKind::MissingDependency,
            Self::ExternalToolFailed { .. } | Self::ConversionFailed { .. } => {
                ErrorKind::ExternalToolFailure
            }
            Self::Decode { .. } => ErrorKind::DecodeFailure,
            Self::Encode { .. } => ErrorKind::EncodeFailure,
            Self::Io(_) | Self::OutputIsInput { .. } => ErrorKind::IoFailure,
            Self::Archive { .. } | Self::TaskFailed { .. } => ErrorKind::Runtime,
        }
    }

    /// Exit code of the failed external tool, if any.
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            Self::ExternalToolFailed { code, .. } => *code,
            Self::Archive { source, .. } => source.exit_code(),
            _ => None,
        }
    }
}

impl From<tokio::task::JoinError> for ConverterError {
    fn from(e: tokio::task::JoinError) -> Self {
        Self::TaskFailed {
            reason: e.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unsupported_conversion_message_names_both_sides() {
        let err = ConverterError::unsupported_conversion(".docx", "unknown");
        let msg = err.to_string();
        assert!(msg.contains(".docx"));
        assert!(msg.contains("unknown"));
        assert_eq!(err.kind(), ErrorKind::UnsupportedConversion);
    }

    #[test]
    fn test_archive_error_wraps_source() {
        let inner = ConverterError::ExternalToolFailed {
            tool: "7z".to_string(),
            code: Some(2),
            stderr: None,
        };
        let err = ConverterError::archive(ArchiveStage::Extracting, inner);
        assert_eq!(err.kind(), ErrorKind::Runtime);
        assert_eq!(err.exit_code(), Some(2));
        assert!(err.to_string().contains("extracting"));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_output_is_input_names_path() {
        let err = ConverterError::OutputIsInput {
            path: PathBuf::from("/docs/notes.txt"),
        };
        assert_eq!(err.kind(), ErrorKind::IoFailure);
        assert!(err.to_string().contains("/docs/notes.txt"));
    }

    #[test]
    fn test_io_error_kind() {
        let err: ConverterError = std::io::Error::from(std::io::ErrorKind::NotFound).into();
        assert_eq!(err.kind(), ErrorKind::IoFailure);
    }
}
