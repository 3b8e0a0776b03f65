//! Trait definitions for the converter module.

use async_trait::async_trait;

use super::error::ConverterError;
use super::types::ConversionRequest;
use crate::format::FormatCategory;

/// A category-specific conversion strategy.
///
/// The engine keeps one strategy per [`FormatCategory`] and hands every
/// request for that category to it.
#[async_trait]
pub trait CategoryConverter: Send + Sync {
    /// Returns the name of this strategy implementation.
    fn name(&self) -> &str;

    /// Returns the category this strategy handles.
    fn category(&self) -> FormatCategory;

    /// Converts `request.input_path` into `request.output_path` in
    /// `request.target_format`.
    ///
    /// On success the output path holds the converted content. The request
    /// is consumed; its progress callback, if any, is dropped on return.
    async fn convert(&self, request: ConversionRequest) -> Result<(), ConverterError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    struct EchoConverter;

    #[async_trait]
    impl CategoryConverter for EchoConverter {
        fn name(&self) -> &str {
            "echo"
        }

        fn category(&self) -> FormatCategory {
            FormatCategory::Documents
        }

        async fn convert(&self, mut request: ConversionRequest) -> Result<(), ConverterError> {
            if let Some(progress) = request.progress.as_mut() {
                progress(1.0);
            }
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_strategy_invokes_progress() {
        let (tx, rx) = std::sync::mpsc::channel();
        let request = ConversionRequest::new("a.txt", "b.rtf", "rtf").with_progress(move |f| {
            let _ = tx.send(f);
        });

        EchoConverter.convert(request).await.unwrap();
        assert_eq!(rx.try_recv().unwrap(), 1.0);
    }

    #[test]
    fn test_strategy_is_object_safe() {
        let strategy: Box<dyn CategoryConverter> = Box::new(EchoConverter);
        assert_eq!(strategy.name(), "echo");
        assert_eq!(strategy.category(), FormatCategory::Documents);
    }
}
