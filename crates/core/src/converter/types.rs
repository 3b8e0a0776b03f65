//! Types for the converter module.

use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};

use super::error::ConverterError;
use crate::format::FormatCategory;

/// Receives progress fractions in `[0, 1]` during a streaming conversion.
pub type ProgressCallback = Box<dyn FnMut(f64) + Send>;

/// A single conversion to perform.
pub struct ConversionRequest {
    /// Source file path.
    pub input_path: PathBuf,
    /// Destination file path.
    pub output_path: PathBuf,
    /// Target format, as an extension (`png`, `tar.gz`, ...).
    pub target_format: String,
    /// Optional progress receiver. Only streaming strategies invoke it.
    pub progress: Option<ProgressCallback>,
}

impl ConversionRequest {
    /// Creates a request without a progress callback.
    pub fn new(
        input_path: impl Into<PathBuf>,
        output_path: impl Into<PathBuf>,
        target_format: impl Into<String>,
    ) -> Self {
        Self {
            input_path: input_path.into(),
            output_path: output_path.into(),
            target_format: target_format.into().trim().to_ascii_lowercase(),
            progress: None,
        }
    }

    /// Attaches a progress callback.
    pub fn with_progress(mut self, progress: impl FnMut(f64) + Send + 'static) -> Self {
        self.progress = Some(Box::new(progress));
        self
    }

    /// Lower-cased trailing extension of the input (without the dot).
    pub fn input_extension(&self) -> String {
        crate::format::current_format(&self.input_path)
    }
}

impl fmt::Debug for ConversionRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConversionRequest")
            .field("input_path", &self.input_path)
            .field("output_path", &self.output_path)
            .field("target_format", &self.target_format)
            .field("progress", &self.progress.is_some())
            .finish()
    }
}

/// Result of a successful conversion.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConversionResult {
    /// Source file path.
    pub input_path: PathBuf,
    /// Path of the written output.
    pub output_path: PathBuf,
    /// Category the input was dispatched to.
    pub category: FormatCategory,
    /// Target format that was requested.
    pub target_format: String,
    /// Size of the output in bytes.
    pub output_size_bytes: u64,
    /// Wall-clock time spent converting, in milliseconds.
    pub duration_ms: u64,
}

/// One file of a batch.
#[derive(Debug)]
pub struct BatchItem {
    /// Source file path.
    pub input_path: PathBuf,
    /// Derived output path.
    pub output_path: PathBuf,
    /// Outcome of the conversion.
    pub outcome: Result<ConversionResult, ConverterError>,
}

impl BatchItem {
    /// Whether this file converted successfully.
    pub fn is_success(&self) -> bool {
        self.outcome.is_ok()
    }
}

/// Outcomes of a batch, in input order.
#[derive(Debug, Default)]
pub struct BatchReport {
    pub items: Vec<BatchItem>,
}

impl BatchReport {
    /// Number of files that converted successfully.
    pub fn succeeded(&self) -> usize {
        self.items.iter().filter(|i| i.is_success()).count()
    }

    /// Files that failed, with their errors.
    pub fn failures(&self) -> Vec<(&Path, &ConverterError)> {
        self.items
            .iter()
            .filter_map(|i| match &i.outcome {
                Err(e) => Some((i.input_path.as_path(), e)),
                Ok(_) => None,
            })
            .collect()
    }

    /// Whether every file converted.
    pub fn is_complete_success(&self) -> bool {
        self.items.iter().all(BatchItem::is_success)
    }
}

/// Progress events streamed during a batch.
#[derive(Debug, Clone, PartialEq)]
pub enum BatchProgress {
    /// Conversion of a file is starting.
    FileStarted {
        index: usize,
        total: usize,
        input_path: PathBuf,
    },
    /// Fractional progress of the current file (streaming strategies only).
    FileProgress { index: usize, fraction: f64 },
    /// Conversion of a file finished.
    FileFinished { index: usize, success: bool },
}
