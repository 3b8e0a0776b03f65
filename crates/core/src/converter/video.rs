//! FFmpeg-based video strategy with live progress.

use async_trait::async_trait;
use serde::Deserialize;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::config::ConverterConfig;
use super::error::ConverterError;
use super::process::ToolCommand;
use super::progress::ProgressAccumulator;
use super::traits::CategoryConverter;
use super::types::ConversionRequest;
use crate::format::FormatCategory;

/// Duration assumed when neither container nor streams report one.
const FALLBACK_DURATION_SECS: f64 = 1.0;

/// Converts video containers with ffmpeg, reporting progress from its
/// `time=` markers.
pub struct VideoConverter {
    config: Arc<ConverterConfig>,
}

impl VideoConverter {
    /// Creates a new video converter with the given configuration.
    pub fn new(config: Arc<ConverterConfig>) -> Self {
        Self { config }
    }

    /// Creates a converter with default configuration.
    pub fn with_defaults() -> Self {
        Self::new(Arc::new(ConverterConfig::default()))
    }

    /// Maps a target extension to the ffmpeg muxer name.
    fn muxer(target_format: &str) -> &str {
        match target_format {
            "mkv" => "matroska",
            other => other,
        }
    }

    /// Codec pairs pinned for containers whose ffmpeg defaults are unreliable.
    fn pinned_codecs(target_format: &str) -> &'static [&'static str] {
        match target_format {
            "avi" => &["-c:v", "mpeg4", "-q:v", "5", "-c:a", "libmp3lame"],
            _ => &[],
        }
    }

    /// Builds ffmpeg arguments for a video conversion.
    fn build_video_args(&self, input_path: &Path, output_path: &Path, target_format: &str) -> Vec<String> {
        let mut args = vec![
            "-y".to_string(),
            "-i".to_string(),
            input_path.to_string_lossy().to_string(),
        ];

        args.extend(Self::pinned_codecs(target_format).iter().map(|s| s.to_string()));

        args.extend(["-f".to_string(), Self::muxer(target_format).to_string()]);

        // Log level and progress
        args.extend([
            "-loglevel".to_string(),
            self.config.ffmpeg_log_level.clone(),
            "-progress".to_string(),
            "pipe:2".to_string(),
            "-nostats".to_string(),
        ]);

        args.extend(self.config.extra_ffmpeg_args.iter().cloned());

        args.push(output_path.to_string_lossy().to_string());

        args
    }

    /// Extracts the duration from ffprobe JSON output.
    ///
    /// Container metadata wins; otherwise the first stream that reports a
    /// positive duration is used.
    fn parse_probe_duration(output: &str) -> Result<Option<f64>, ConverterError> {
        #[derive(Deserialize)]
        struct ProbeOutput {
            #[serde(default)]
            format: Option<ProbeFormat>,
            #[serde(default)]
            streams: Vec<ProbeStream>,
        }

        #[derive(Deserialize)]
        struct ProbeFormat {
            duration: Option<String>,
        }

        #[derive(Deserialize)]
        struct ProbeStream {
            duration: Option<String>,
        }

        let probe: ProbeOutput = serde_json::from_str(output)
            .map_err(|e| ConverterError::decode("ffprobe output", e))?;

        let parse = |d: &Option<String>| {
            d.as_deref()
                .and_then(|s| s.parse::<f64>().ok())
                .filter(|secs| *secs > 0.0)
        };

        let duration = probe
            .format
            .as_ref()
            .and_then(|f| parse(&f.duration))
            .or_else(|| probe.streams.iter().find_map(|s| parse(&s.duration)));

        Ok(duration)
    }

    /// Runs ffprobe on the input.
    async fn probe(&self, path: &Path) -> Result<Option<f64>, ConverterError> {
        let mut stdout = String::new();
        ToolCommand::new("ffprobe", &self.config.ffprobe_path)
            .args([
                "-v",
                "quiet",
                "-print_format",
                "json",
                "-show_format",
                "-show_streams",
            ])
            .arg(path)
            .run_streaming(|line| {
                stdout.push_str(line);
                stdout.push('\n');
            })
            .await?;

        Self::parse_probe_duration(&stdout)
    }

    /// Determines the input duration, degrading to a fallback instead of failing.
    async fn probe_duration(&self, path: &Path) -> f64 {
        match self.probe(path).await {
            Ok(Some(duration)) => duration,
            Ok(None) => {
                warn!(
                    path = %path.display(),
                    "Could not determine duration; progress reporting will be inaccurate"
                );
                FALLBACK_DURATION_SECS
            }
            Err(e) => {
                warn!(
                    path = %path.display(),
                    error = %e,
                    "Duration probe failed; progress reporting will be inaccurate"
                );
                FALLBACK_DURATION_SECS
            }
        }
    }
}

#[async_trait]
impl CategoryConverter for VideoConverter {
    fn name(&self) -> &str {
        "ffmpeg-video"
    }

    fn category(&self) -> FormatCategory {
        FormatCategory::Videos
    }

    async fn convert(&self, request: ConversionRequest) -> Result<(), ConverterError> {
        let duration = self.probe_duration(&request.input_path).await;
        debug!(duration_secs = duration, "Probed input duration");

        let args = self.build_video_args(
            &request.input_path,
            &request.output_path,
            &request.target_format,
        );

        let mut progress = ProgressAccumulator::new(duration, request.progress);
        ToolCommand::new("ffmpeg", &self.config.ffmpeg_path)
            .args(args)
            .run_streaming(|line| {
                progress.observe(line);
            })
            .await?;

        info!(
            input = %request.input_path.display(),
            output = %request.output_path.display(),
            progress = progress.last(),
            "Video transcode finished"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_video_args_mp4() {
        let converter = VideoConverter::with_defaults();
        let args = converter.build_video_args(Path::new("/in.mkv"), Path::new("/out.mp4"), "mp4");

        assert_eq!(&args[..3], &["-y", "-i", "/in.mkv"]);
        assert!(args.windows(2).any(|w| w == ["-f", "mp4"]));
        assert!(args.windows(2).any(|w| w == ["-progress", "pipe:2"]));
        assert!(!args.contains(&"-c:v".to_string()));
        assert_eq!(args.last().map(String::as_str), Some("/out.mp4"));
    }

    #[test]
    fn test_build_video_args_pins_avi_codecs() {
        let converter = VideoConverter::with_defaults();
        let args = converter.build_video_args(Path::new("/in.mp4"), Path::new("/out.avi"), "avi");

        assert!(args.windows(2).any(|w| w == ["-c:v", "mpeg4"]));
        assert!(args.windows(2).any(|w| w == ["-c:a", "libmp3lame"]));
        assert!(args.windows(2).any(|w| w == ["-f", "avi"]));
    }

    #[test]
    fn test_build_video_args_maps_mkv_muxer() {
        let converter = VideoConverter::with_defaults();
        let args = converter.build_video_args(Path::new("/in.mp4"), Path::new("/out.mkv"), "mkv");
        assert!(args.windows(2).any(|w| w == ["-f", "matroska"]));
    }

    #[test]
    fn test_build_video_args_includes_extra_args() {
        let config = ConverterConfig {
            extra_ffmpeg_args: vec!["-threads".to_string(), "2".to_string()],
            ..Default::default()
        };
        let converter = VideoConverter::new(Arc::new(config));
        let args = converter.build_video_args(Path::new("/in.mp4"), Path::new("/out.webm"), "webm");
        let threads = args.iter().position(|a| a == "-threads").unwrap();
        assert_eq!(args[threads + 1], "2");
        assert_eq!(threads + 2, args.len() - 1);
    }

    #[test]
    fn test_parse_probe_duration_from_format() {
        let json = r#"{
            "format": {"filename": "test.mkv", "format_name": "matroska,webm", "duration": "7200.0"},
            "streams": [{"codec_type": "video", "duration": "10.0"}]
        }"#;
        assert_eq!(VideoConverter::parse_probe_duration(json).unwrap(), Some(7200.0));
    }

    #[test]
    fn test_parse_probe_duration_falls_back_to_streams() {
        let json = r#"{
            "format": {"filename": "test.webm"},
            "streams": [
                {"codec_type": "video"},
                {"codec_type": "audio", "duration": "12.5"}
            ]
        }"#;
        assert_eq!(VideoConverter::parse_probe_duration(json).unwrap(), Some(12.5));
    }

    #[test]
    fn test_parse_probe_duration_unknown() {
        let json = r#"{"format": {"duration": "N/A"}, "streams": []}"#;
        assert_eq!(VideoConverter::parse_probe_duration(json).unwrap(), None);
    }

    #[test]
    fn test_parse_probe_duration_invalid_json() {
        assert!(VideoConverter::parse_probe_duration("not json").is_err());
    }

    #[tokio::test]
    async fn test_probe_duration_falls_back_when_ffprobe_missing() {
        let config = ConverterConfig::with_paths(
            "/nonexistent/ffmpeg".into(),
            "/nonexistent/ffprobe".into(),
        );
        let converter = VideoConverter::new(Arc::new(config));
        let duration = converter.probe_duration(Path::new("/in.mp4")).await;
        assert_eq!(duration, FALLBACK_DURATION_SECS);
    }
}
