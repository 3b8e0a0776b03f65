use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use std::path::Path;

use super::{types::Config, ConfigError};

/// Prefix of environment variable overrides, e.g.
/// `FILES_CONVERTER_CONVERTER__FFMPEG_PATH=/opt/ffmpeg/bin/ffmpeg`.
const ENV_PREFIX: &str = "FILES_CONVERTER_";

fn env_overrides() -> Env {
    Env::prefixed(ENV_PREFIX).split("__")
}

/// Load configuration from file with environment variable overrides
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::FileNotFound(path.display().to_string()));
    }

    let config: Config = Figment::from(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(env_overrides())
        .extract()
        .map_err(|e| ConfigError::ParseError(e.to_string()))?;

    Ok(config)
}

/// Load configuration from defaults and environment variables only
pub fn load_config_from_env() -> Result<Config, ConfigError> {
    Figment::from(Serialized::defaults(Config::default()))
        .merge(env_overrides())
        .extract()
        .map_err(|e| ConfigError::ParseError(e.to_string()))
}

/// Load configuration from TOML string (useful for testing)
pub fn load_config_from_str(toml_str: &str) -> Result<Config, ConfigError> {
    toml::from_str(toml_str).map_err(|e| ConfigError::ParseError(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LogFormat;
    use std::io::Write;
    use std::path::PathBuf;
    use tempfile::NamedTempFile;

    #[test]
    fn test_load_config_from_str_valid() {
        let toml = r#"
[converter]
ffmpeg_path = "/usr/local/bin/ffmpeg"
jpeg_quality = 75

[logging]
format = "json"
"#;
        let config = load_config_from_str(toml).unwrap();
        assert_eq!(config.converter.ffmpeg_path, PathBuf::from("/usr/local/bin/ffmpeg"));
        assert_eq!(config.converter.jpeg_quality, 75);
        assert_eq!(config.converter.pdf_font_size, 11);
        assert_eq!(config.logging.format, LogFormat::Json);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_load_config_from_str_empty_uses_defaults() {
        let config = load_config_from_str("").unwrap();
        assert_eq!(config.converter.ffprobe_path, PathBuf::from("ffprobe"));
        assert_eq!(config.converter.ffmpeg_log_level, "warning");
        assert!(config.converter.temp_dir.is_none());
        assert_eq!(config.logging.format, LogFormat::Pretty);
    }

    #[test]
    fn test_load_config_from_str_wrong_type() {
        let toml = r#"
[converter]
jpeg_quality = "high"
"#;
        let result = load_config_from_str(toml);
        assert!(result.is_err());
        let err = result.unwrap_err();
        assert!(matches!(err, ConfigError::ParseError(_)));
    }

    #[test]
    fn test_load_config_file_not_found() {
        let result = load_config(Path::new("/nonexistent/config.toml"));
        assert!(result.is_err());
        let err = result.unwrap_err();
        assert!(matches!(err, ConfigError::FileNotFound(_)));
    }

    #[test]
    fn test_load_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(
            temp_file,
            r#"
[converter]
seven_zip_path = "/opt/7zip/7zz"
temp_dir = "/var/tmp/converter"
extra_ffmpeg_args = ["-threads", "2"]
"#
        )
        .unwrap();

        let config = load_config(temp_file.path()).unwrap();
        assert_eq!(config.converter.seven_zip_path, PathBuf::from("/opt/7zip/7zz"));
        assert_eq!(
            config.converter.temp_dir,
            Some(PathBuf::from("/var/tmp/converter"))
        );
        assert_eq!(config.converter.extra_ffmpeg_args, vec!["-threads", "2"]);
        assert_eq!(config.converter.inkscape_path, PathBuf::from("inkscape"));
    }

    #[test]
    fn test_env_overrides_file() {
        figment::Jail::expect_with(|jail| {
            jail.create_file(
                "converter.toml",
                r#"
[converter]
jpeg_quality = 60
"#,
            )?;
            jail.set_env("FILES_CONVERTER_CONVERTER__JPEG_QUALITY", "95");
            jail.set_env("FILES_CONVERTER_LOGGING__LEVEL", "debug");

            let config = load_config(Path::new("converter.toml")).map_err(|e| e.to_string())?;
            assert_eq!(config.converter.jpeg_quality, 95);
            assert_eq!(config.logging.level, "debug");

            let from_env = load_config_from_env().map_err(|e| e.to_string())?;
            assert_eq!(from_env.converter.jpeg_quality, 95);
            Ok(())
        });
    }
}
