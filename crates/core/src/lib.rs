pub mod config;
pub mod converter;
pub mod format;
pub mod testing;

pub use config::{
    load_config, load_config_from_env, load_config_from_str, validate_config, Config,
    ConfigError, LogFormat, LoggingConfig,
};
pub use converter::{
    BatchProgress, BatchReport, CategoryConverter, ConversionEngine, ConversionRequest,
    ConversionResult, ConverterConfig, ConverterError, ErrorKind, ProgressCallback,
};
pub use format::{classify, target_formats, FormatCategory};
