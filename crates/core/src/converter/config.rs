//! Configuration for the converter module.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Configuration for the conversion engine and its external tools.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConverterConfig {
    /// Path to ffmpeg binary.
    #[serde(default = "default_ffmpeg_path")]
    pub ffmpeg_path: PathBuf,

    /// Path to ffprobe binary.
    #[serde(default = "default_ffprobe_path")]
    pub ffprobe_path: PathBuf,

    /// Path to the Inkscape binary used for vector graphics.
    #[serde(default = "default_inkscape_path")]
    pub inkscape_path: PathBuf,

    /// Path to Calibre's ebook-convert.
    #[serde(default = "default_ebook_convert_path")]
    pub ebook_convert_path: PathBuf,

    /// Path to unrar (rar extraction).
    #[serde(default = "default_unrar_path")]
    pub unrar_path: PathBuf,

    /// Path to rar (rar creation).
    #[serde(default = "default_rar_path")]
    pub rar_path: PathBuf,

    /// Path to 7z.
    #[serde(default = "default_seven_zip_path")]
    pub seven_zip_path: PathBuf,

    /// Parent directory for private archive extraction directories.
    /// Defaults to the directory of the output file.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temp_dir: Option<PathBuf>,

    /// FFmpeg log level (quiet, panic, fatal, error, warning, info, verbose, debug, trace).
    #[serde(default = "default_log_level")]
    pub ffmpeg_log_level: String,

    /// Additional ffmpeg arguments inserted before the output path.
    #[serde(default)]
    pub extra_ffmpeg_args: Vec<String>,

    /// JPEG encoder quality (1-100).
    #[serde(default = "default_jpeg_quality")]
    pub jpeg_quality: u8,

    /// Font size in points for generated PDFs.
    #[serde(default = "default_pdf_font_size")]
    pub pdf_font_size: u8,
}

fn default_ffmpeg_path() -> PathBuf {
    PathBuf::from("ffmpeg")
}

fn default_ffprobe_path() -> PathBuf {
    PathBuf::from("ffprobe")
}

fn default_inkscape_path() -> PathBuf {
    PathBuf::from("inkscape")
}

fn default_ebook_convert_path() -> PathBuf {
    PathBuf::from("ebook-convert")
}

fn default_unrar_path() -> PathBuf {
    PathBuf::from("unrar")
}

fn default_rar_path() -> PathBuf {
    PathBuf::from("rar")
}

fn default_seven_zip_path() -> PathBuf {
    PathBuf::from("7z")
}

fn default_log_level() -> String {
    "warning".to_string()
}

fn default_jpeg_quality() -> u8 {
    90
}

fn default_pdf_font_size() -> u8 {
    11
}

impl Default for ConverterConfig {
    fn default() -> Self {
        Self {
            ffmpeg_path: default_ffmpeg_path(),
            ffprobe_path: default_ffprobe_path(),
            inkscape_path: default_inkscape_path(),
            ebook_convert_path: default_ebook_convert_path(),
            unrar_path: default_unrar_path(),
            rar_path: default_rar_path(),
            seven_zip_path: default_seven_zip_path(),
            temp_dir: None,
            ffmpeg_log_level: default_log_level(),
            extra_ffmpeg_args: Vec::new(),
            jpeg_quality: default_jpeg_quality(),
            pdf_font_size: default_pdf_font_size(),
        }
    }
}

impl ConverterConfig {
    /// Creates a new config with custom ffmpeg/ffprobe paths.
    pub fn with_paths(ffmpeg_path: PathBuf, ffprobe_path: PathBuf) -> Self {
        Self {
            ffmpeg_path,
            ffprobe_path,
            ..Default::default()
        }
    }

    /// Sets the parent directory for archive extraction.
    pub fn with_temp_dir(mut self, temp_dir: PathBuf) -> Self {
        self.temp_dir = Some(temp_dir);
        self
    }

    /// Sets the Inkscape path.
    pub fn with_inkscape(mut self, path: PathBuf) -> Self {
        self.inkscape_path = path;
        self
    }

    /// Sets the ebook-convert path.
    pub fn with_ebook_convert(mut self, path: PathBuf) -> Self {
        self.ebook_convert_path = path;
        self
    }

    /// Sets the JPEG quality.
    pub fn with_jpeg_quality(mut self, quality: u8) -> Self {
        self.jpeg_quality = quality;
        self
    }

    /// Lists `(config key, path)` for every external tool.
    pub fn tool_paths(&self) -> [(&'static str, &PathBuf); 7] {
        [
            ("ffmpeg_path", &self.ffmpeg_path),
            ("ffprobe_path", &self.ffprobe_path),
            ("inkscape_path", &self.inkscape_path),
            ("ebook_convert_path", &self.ebook_convert_path),
            ("unrar_path", &self.unrar_path),
            ("rar_path", &self.rar_path),
            ("seven_zip_path", &self.seven_zip_path),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ConverterConfig::default();
        assert_eq!(config.ffmpeg_path, PathBuf::from("ffmpeg"));
        assert_eq!(config.ffprobe_path, PathBuf::from("ffprobe"));
        assert_eq!(config.seven_zip_path, PathBuf::from("7z"));
        assert_eq!(config.jpeg_quality, 90);
        assert!(config.temp_dir.is_none());
    }

    #[test]
    fn test_config_builder() {
        let config = ConverterConfig::with_paths(
            PathBuf::from("/usr/local/bin/ffmpeg"),
            PathBuf::from("/usr/local/bin/ffprobe"),
        )
        .with_temp_dir(PathBuf::from("/tmp/test"))
        .with_inkscape(PathBuf::from("/opt/inkscape"))
        .with_jpeg_quality(75);

        assert_eq!(config.ffmpeg_path, PathBuf::from("/usr/local/bin/ffmpeg"));
        assert_eq!(config.temp_dir, Some(PathBuf::from("/tmp/test")));
        assert_eq!(config.inkscape_path, PathBuf::from("/opt/inkscape"));
        assert_eq!(config.jpeg_quality, 75);
    }

    #[test]
    fn test_tool_paths_are_keyed_by_config_field() {
        let config = ConverterConfig::default();
        let json = serde_json::to_value(&config).unwrap();
        for (key, path) in config.tool_paths() {
            assert_eq!(json[key], serde_json::json!(path), "{key}");
        }
    }

    #[test]
    fn test_config_serialization() {
        let config = ConverterConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        let parsed: ConverterConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.ffmpeg_log_level, config.ffmpeg_log_level);
        assert_eq!(parsed.pdf_font_size, config.pdf_font_size);
    }

    #[test]
    fn test_config_partial_deserialization() {
        let parsed: ConverterConfig = serde_json::from_str(r#"{"jpeg_quality": 60}"#).unwrap();
        assert_eq!(parsed.jpeg_quality, 60);
        assert_eq!(parsed.ebook_convert_path, PathBuf::from("ebook-convert"));
    }
}
