//! Mock conversion strategy for testing.

use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::converter::{CategoryConverter, ConversionRequest, ConverterError};
use crate::format::FormatCategory;

/// A recorded conversion request for test assertions.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedConversion {
    pub input_path: PathBuf,
    pub output_path: PathBuf,
    pub target_format: String,
    /// Whether the conversion succeeded.
    pub success: bool,
}

/// Mock implementation of [`CategoryConverter`].
///
/// Copies the input to the output, so a missing input fails with an I/O
/// error the way a real strategy would. Provides controllable behavior:
/// - Track requests for assertions
/// - Inject a failure for the next request, optionally after a partial write
/// - Emit progress fractions through the request callback
///
/// # Example
///
/// ```rust,ignore
/// use files_converter_core::testing::MockStrategy;
///
/// let strategy = Arc::new(MockStrategy::new(FormatCategory::Documents));
/// engine.register(strategy.clone());
///
/// engine.convert("in.txt", "out.pdf", "pdf", None).await?;
/// assert_eq!(strategy.conversion_count().await, 1);
/// ```
#[derive(Debug)]
pub struct MockStrategy {
    category: FormatCategory,
    conversions: Arc<RwLock<Vec<RecordedConversion>>>,
    next_error: Arc<RwLock<Option<ConverterError>>>,
    progress_steps: Arc<RwLock<Vec<f64>>>,
    leave_partial_output: Arc<RwLock<bool>>,
}

impl MockStrategy {
    /// Create a mock strategy for a category.
    pub fn new(category: FormatCategory) -> Self {
        Self {
            category,
            conversions: Arc::new(RwLock::new(Vec::new())),
            next_error: Arc::new(RwLock::new(None)),
            progress_steps: Arc::new(RwLock::new(Vec::new())),
            leave_partial_output: Arc::new(RwLock::new(false)),
        }
    }

    /// Get all recorded conversions.
    pub async fn recorded_conversions(&self) -> Vec<RecordedConversion> {
        self.conversions.read().await.clone()
    }

    /// Get the number of conversions performed.
    pub async fn conversion_count(&self) -> usize {
        self.conversions.read().await.len()
    }

    /// Configure the next conversion to fail with the given error.
    pub async fn set_next_error(&self, error: ConverterError) {
        *self.next_error.write().await = Some(error);
    }

    /// Fractions passed to the progress callback on every conversion.
    pub async fn set_progress_steps(&self, steps: Vec<f64>) {
        *self.progress_steps.write().await = steps;
    }

    /// When set, an injected failure first writes a partial output file.
    pub async fn set_leave_partial_output(&self, leave: bool) {
        *self.leave_partial_output.write().await = leave;
    }

    async fn record(&self, conversion: RecordedConversion) {
        self.conversions.write().await.push(conversion);
    }
}

impl RecordedConversion {
    fn from_request(request: &ConversionRequest, success: bool) -> Self {
        Self {
            input_path: request.input_path.clone(),
            output_path: request.output_path.clone(),
            target_format: request.target_format.clone(),
            success,
        }
    }
}

#[async_trait]
impl CategoryConverter for MockStrategy {
    fn name(&self) -> &str {
        "mock"
    }

    fn category(&self) -> FormatCategory {
        self.category
    }

    async fn convert(&self, mut request: ConversionRequest) -> Result<(), ConverterError> {
        let next_error = self.next_error.write().await.take();
        if let Some(err) = next_error {
            if *self.leave_partial_output.read().await {
                tokio::fs::write(&request.output_path, b"partial").await?;
            }
            let failed = RecordedConversion::from_request(&request, false);
            self.record(failed).await;
            return Err(err);
        }

        if let Err(e) = tokio::fs::copy(&request.input_path, &request.output_path).await {
            let failed = RecordedConversion::from_request(&request, false);
            self.record(failed).await;
            return Err(e.into());
        }

        let steps = self.progress_steps.read().await.clone();
        if let Some(callback) = request.progress.as_mut() {
            for fraction in steps {
                callback(fraction);
            }
        }

        let succeeded = RecordedConversion::from_request(&request, true);
        self.record(succeeded).await;
        Ok(())
    }
}
