//! FFmpeg-based audio strategy.

use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

use super::config::ConverterConfig;
use super::error::ConverterError;
use super::process::ToolCommand;
use super::traits::CategoryConverter;
use super::types::ConversionRequest;
use crate::format::FormatCategory;

/// Transcodes audio files with ffmpeg.
pub struct AudioConverter {
    config: Arc<ConverterConfig>,
}

impl AudioConverter {
    /// Creates a new audio converter with the given configuration.
    pub fn new(config: Arc<ConverterConfig>) -> Self {
        Self { config }
    }

    /// Creates a converter with default configuration.
    pub fn with_defaults() -> Self {
        Self::new(Arc::new(ConverterConfig::default()))
    }

    /// Output container for a target extension. Raw AAC is written as an
    /// ADTS stream and `.m4a` uses the iPod MP4 muxer.
    fn container(target_format: &str) -> &str {
        match target_format {
            "aac" => "adts",
            "m4a" => "ipod",
            other => other,
        }
    }

    /// Builds ffmpeg arguments for audio conversion.
    fn build_audio_args(&self, input_path: &Path, output_path: &Path, target_format: &str) -> Vec<String> {
        let mut args = vec![
            "-y".to_string(), // Overwrite output
            "-i".to_string(),
            input_path.to_string_lossy().to_string(),
            "-vn".to_string(),
        ];

        args.extend([
            "-f".to_string(),
            Self::container(target_format).to_string(),
            "-loglevel".to_string(),
            self.config.ffmpeg_log_level.clone(),
        ]);

        args.extend(self.config.extra_ffmpeg_args.iter().cloned());

        args.push(output_path.to_string_lossy().to_string());

        args
    }
}

#[async_trait]
impl CategoryConverter for AudioConverter {
    fn name(&self) -> &str {
        "ffmpeg-audio"
    }

    fn category(&self) -> FormatCategory {
        FormatCategory::Audio
    }

    async fn convert(&self, request: ConversionRequest) -> Result<(), ConverterError> {
        let args = self.build_audio_args(
            &request.input_path,
            &request.output_path,
            &request.target_format,
        );

        ToolCommand::new("ffmpeg", &self.config.ffmpeg_path)
            .args(args)
            .run()
            .await?;

        info!(output = %request.output_path.display(), "Audio transcode finished");
        Ok(())
    }
}
