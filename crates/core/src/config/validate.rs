use super::{types::Config, ConfigError};

const FFMPEG_LOG_LEVELS: &[&str] = &[
    "quiet", "panic", "fatal", "error", "warning", "info", "verbose", "debug", "trace",
];

/// Validate configuration
/// Currently validates:
/// - converter.jpeg_quality is within 1..=100
/// - converter.pdf_font_size is within 4..=72
/// - external tool paths are not empty
/// - converter.ffmpeg_log_level is a level ffmpeg accepts
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    let converter = &config.converter;

    if !(1..=100).contains(&converter.jpeg_quality) {
        return Err(ConfigError::ValidationError(format!(
            "converter.jpeg_quality must be between 1 and 100, got {}",
            converter.jpeg_quality
        )));
    }

    if !(4..=72).contains(&converter.pdf_font_size) {
        return Err(ConfigError::ValidationError(format!(
            "converter.pdf_font_size must be between 4 and 72, got {}",
            converter.pdf_font_size
        )));
    }

    for (name, path) in converter.tool_paths() {
        if path.as_os_str().is_empty() {
            return Err(ConfigError::ValidationError(format!(
                "converter.{} cannot be empty",
                name
            )));
        }
    }

    if !FFMPEG_LOG_LEVELS.contains(&converter.ffmpeg_log_level.as_str()) {
        return Err(ConfigError::ValidationError(format!(
            "converter.ffmpeg_log_level must be one of {}, got '{}'",
            FFMPEG_LOG_LEVELS.join(", "),
            converter.ffmpeg_log_level
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_validate_default_config() {
        assert!(validate_config(&Config::default()).is_ok());
    }

    #[test]
    fn test_validate_jpeg_quality_zero_fails() {
        let mut config = Config::default();
        config.converter.jpeg_quality = 0;
        let result = validate_config(&config);
        assert!(result.is_err());
        let err = result.unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(_)));
    }

    #[test]
    fn test_validate_font_size_bounds() {
        let mut config = Config::default();
        config.converter.pdf_font_size = 3;
        assert!(validate_config(&config).is_err());
        config.converter.pdf_font_size = 72;
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_validate_empty_tool_path_names_field() {
        let mut config = Config::default();
        config.converter.unrar_path = PathBuf::new();
        let err = validate_config(&config).unwrap_err();
        assert!(err.to_string().contains("converter.unrar_path"));

        let mut config = Config::default();
        config.converter.seven_zip_path = PathBuf::new();
        let err = validate_config(&config).unwrap_err();
        assert!(err.to_string().contains("converter.seven_zip_path"));
    }

    #[test]
    fn test_validate_unknown_ffmpeg_log_level() {
        let mut config = Config::default();
        config.converter.ffmpeg_log_level = "loud".to_string();
        assert!(validate_config(&config).is_err());
    }
}
