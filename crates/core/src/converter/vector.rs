//! Inkscape-based vector graphics strategy.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::info;

use super::config::ConverterConfig;
use super::error::ConverterError;
use super::process::ToolCommand;
use super::traits::CategoryConverter;
use super::types::ConversionRequest;
use crate::format::FormatCategory;

/// Converts vector graphics through Inkscape's command line export.
pub struct VectorConverter {
    config: Arc<ConverterConfig>,
}

impl VectorConverter {
    /// Creates a new vector converter with the given configuration.
    pub fn new(config: Arc<ConverterConfig>) -> Self {
        Self { config }
    }

    /// Fails with `MissingDependency` unless Inkscape can be located.
    fn ensure_available(&self) -> Result<(), ConverterError> {
        which::which(&self.config.inkscape_path)
            .map(|_| ())
            .map_err(|_| ConverterError::missing_dependency("inkscape", &self.config.inkscape_path))
    }
}

#[async_trait]
impl CategoryConverter for VectorConverter {
    fn name(&self) -> &str {
        "inkscape"
    }

    fn category(&self) -> FormatCategory {
        FormatCategory::Vectors
    }

    async fn convert(&self, request: ConversionRequest) -> Result<(), ConverterError> {
        self.ensure_available()?;

        let mut export = std::ffi::OsString::from("--export-filename=");
        export.push(&request.output_path);

        ToolCommand::new("inkscape", &self.config.inkscape_path)
            .arg(&request.input_path)
            .arg(export)
            .run()
            .await?;

        info!(output = %request.output_path.display(), "Vector export finished");
        Ok(())
    }
}
