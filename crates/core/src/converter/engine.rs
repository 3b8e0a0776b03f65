//! Dispatch of conversion requests to category strategies, and batches.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::archive::ArchiveConverter;
use super::audio::AudioConverter;
use super::config::ConverterConfig;
use super::document::DocumentConverter;
use super::ebook::EbookConverter;
use super::error::ConverterError;
use super::photo::PhotoConverter;
use super::traits::CategoryConverter;
use super::types::{
    BatchItem, BatchProgress, BatchReport, ConversionRequest, ConversionResult, ProgressCallback,
};
use super::vector::VectorConverter;
use super::video::VideoConverter;
use crate::format::{self, FormatCategory};

/// Routes each request to the strategy registered for the input's category.
pub struct ConversionEngine {
    config: Arc<ConverterConfig>,
    strategies: HashMap<FormatCategory, Arc<dyn CategoryConverter>>,
}

impl ConversionEngine {
    /// Creates an engine with the built-in strategy for every category.
    pub fn new(config: ConverterConfig) -> Self {
        let mut engine = Self::empty(config);
        let config = engine.config.clone();

        engine.register(Arc::new(PhotoConverter::new(config.clone())));
        engine.register(Arc::new(VideoConverter::new(config.clone())));
        engine.register(Arc::new(VectorConverter::new(config.clone())));
        engine.register(Arc::new(AudioConverter::new(config.clone())));
        engine.register(Arc::new(DocumentConverter::new(config.clone())));
        engine.register(Arc::new(ArchiveConverter::new(config.clone())));
        engine.register(Arc::new(EbookConverter::new(config)));
        engine
    }

    /// Creates an engine with default configuration.
    pub fn with_defaults() -> Self {
        Self::new(ConverterConfig::default())
    }

    /// Creates an engine with no strategies registered.
    pub fn empty(config: ConverterConfig) -> Self {
        Self {
            config: Arc::new(config),
            strategies: HashMap::new(),
        }
    }

    /// Registers a strategy for its category, returning the one it replaces.
    pub fn register(
        &mut self,
        strategy: Arc<dyn CategoryConverter>,
    ) -> Option<Arc<dyn CategoryConverter>> {
        debug!(category = %strategy.category(), strategy = strategy.name(), "Registering strategy");
        self.strategies.insert(strategy.category(), strategy)
    }

    /// The strategy registered for a category.
    pub fn strategy(&self, category: FormatCategory) -> Option<&Arc<dyn CategoryConverter>> {
        self.strategies.get(&category)
    }

    pub fn config(&self) -> &ConverterConfig {
        &self.config
    }

    /// Converts `input` to `output` in the `target` format.
    ///
    /// `progress` receives fractions in `[0, 1]`; only streaming strategies
    /// (video) report progress.
    pub async fn convert(
        &self,
        input: impl Into<PathBuf>,
        output: impl Into<PathBuf>,
        target: &str,
        progress: Option<ProgressCallback>,
    ) -> Result<ConversionResult, ConverterError> {
        let mut request = ConversionRequest::new(input, output, target);
        request.progress = progress;
        self.convert_request(request).await
    }

    /// Converts a prepared request.
    ///
    /// An output path that resolves to the input file is rejected before
    /// dispatch. On failure an output file that did not exist before the
    /// call is removed.
    pub async fn convert_request(
        &self,
        request: ConversionRequest,
    ) -> Result<ConversionResult, ConverterError> {
        let category = format::classify(&request.input_path).ok_or_else(|| {
            ConverterError::UnsupportedCategory {
                path: request.input_path.clone(),
            }
        })?;
        let strategy = self.strategies.get(&category).cloned().ok_or_else(|| {
            ConverterError::UnsupportedCategory {
                path: request.input_path.clone(),
            }
        })?;

        let input_path = request.input_path.clone();
        let output_path = request.output_path.clone();
        let target_format = request.target_format.clone();
        let output_existed = tokio::fs::try_exists(&output_path).await.unwrap_or(false);

        if output_existed && is_same_file(&input_path, &output_path).await {
            return Err(ConverterError::OutputIsInput { path: input_path });
        }

        info!(
            input = %input_path.display(),
            output = %output_path.display(),
            %category,
            target = %target_format,
            strategy = strategy.name(),
            "Starting conversion"
        );
        let start = Instant::now();

        if let Err(e) = strategy.convert(request).await {
            warn!(input = %input_path.display(), error = %e, "Conversion failed");
            if !output_existed {
                remove_partial_output(&output_path).await;
            }
            return Err(e);
        }

        let output_meta = match tokio::fs::metadata(&output_path).await {
            Ok(meta) => meta,
            Err(_) => {
                return Err(ConverterError::ConversionFailed {
                    input: input_path,
                    output: output_path,
                })
            }
        };

        let result = ConversionResult {
            input_path,
            output_path,
            category,
            target_format,
            output_size_bytes: output_meta.len(),
            duration_ms: start.elapsed().as_millis() as u64,
        };
        info!(
            output = %result.output_path.display(),
            size = result.output_size_bytes,
            duration_ms = result.duration_ms,
            "Conversion finished"
        );
        Ok(result)
    }

    /// Converts every input into `output_dir` as `{stem}.{target}`.
    ///
    /// Files are converted one after another; a failure is recorded and the
    /// next file still runs.
    pub async fn batch_convert<P: AsRef<Path>>(
        &self,
        inputs: &[P],
        output_dir: &Path,
        target: &str,
    ) -> BatchReport {
        self.run_batch(inputs, output_dir, target, None).await
    }

    /// Like [`batch_convert`](Self::batch_convert), streaming
    /// [`BatchProgress`] events. Send failures are ignored.
    pub async fn batch_convert_with_progress<P: AsRef<Path>>(
        &self,
        inputs: &[P],
        output_dir: &Path,
        target: &str,
        events: mpsc::UnboundedSender<BatchProgress>,
    ) -> BatchReport {
        self.run_batch(inputs, output_dir, target, Some(events)).await
    }

    async fn run_batch<P: AsRef<Path>>(
        &self,
        inputs: &[P],
        output_dir: &Path,
        target: &str,
        events: Option<mpsc::UnboundedSender<BatchProgress>>,
    ) -> BatchReport {
        let total = inputs.len();
        let dir_error = tokio::fs::create_dir_all(output_dir).await.err();
        let mut report = BatchReport::default();

        for (index, input) in inputs.iter().enumerate() {
            let input_path = input.as_ref().to_path_buf();
            let output_path = batch_output_path(&input_path, output_dir, target);

            if let Some(tx) = &events {
                let _ = tx.send(BatchProgress::FileStarted {
                    index,
                    total,
                    input_path: input_path.clone(),
                });
            }

            let outcome = match &dir_error {
                Some(e) => Err(ConverterError::Io(std::io::Error::new(
                    e.kind(),
                    format!("cannot create {}: {}", output_dir.display(), e),
                ))),
                None => {
                    let mut request =
                        ConversionRequest::new(&input_path, &output_path, target);
                    if let Some(tx) = events.clone() {
                        request = request.with_progress(move |fraction| {
                            let _ = tx.send(BatchProgress::FileProgress { index, fraction });
                        });
                    }
                    self.convert_request(request).await
                }
            };

            if let Some(tx) = &events {
                let _ = tx.send(BatchProgress::FileFinished {
                    index,
                    success: outcome.is_ok(),
                });
            }

            report.items.push(BatchItem {
                input_path,
                output_path,
                outcome,
            });
        }

        info!(
            total,
            succeeded = report.succeeded(),
            output_dir = %output_dir.display(),
            "Batch finished"
        );
        report
    }
}

/// Output path of a batch item: the input's base name without its matched
/// (possibly compound) extension, with `target` appended.
pub fn batch_output_path(input: &Path, output_dir: &Path, target: &str) -> PathBuf {
    let name = input
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    let stem = format::matched_extension(input)
        .and_then(|ext| {
            let cut = name.len().checked_sub(ext.len() + 1)?;
            (name.is_char_boundary(cut) && cut > 0).then(|| name[..cut].to_string())
        })
        .or_else(|| {
            input
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
        })
        .unwrap_or(name);

    output_dir.join(format!("{}.{}", stem, target.trim_start_matches('.')))
}

/// Whether both paths resolve to the same existing file.
async fn is_same_file(a: &Path, b: &Path) -> bool {
    match (
        tokio::fs::canonicalize(a).await,
        tokio::fs::canonicalize(b).await,
    ) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

async fn remove_partial_output(path: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => debug!(path = %path.display(), "Removed partial output"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!(path = %path.display(), error = %e, "Failed to remove partial output"),
    }
}
