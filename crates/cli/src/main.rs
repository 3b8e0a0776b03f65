//! files-converter - convert files between formats from the command line.

mod commands;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::error;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use files_converter_core::{
    load_config, load_config_from_env, validate_config, LogFormat, LoggingConfig,
};

use commands::{CmdConvert, CmdFormats};

/// Command-line arguments.
#[derive(Parser, Debug)]
#[command(name = "files-converter")]
#[command(version)]
#[command(about = "Convert photos, videos, vectors, audio, documents, archives and ebooks")]
struct Cli {
    /// Configuration file (TOML). Defaults plus FILES_CONVERTER_* variables when omitted.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Convert one or more files to a target format
    Convert(CmdConvert),
    /// Show the category and candidate target formats of files
    Formats(CmdFormats),
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Fatal error: {:#}", e);
        eprintln!("error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => load_config(path)
            .with_context(|| format!("Failed to load config from {:?}", path))?,
        None => load_config_from_env().context("Failed to load config from environment")?,
    };
    validate_config(&config).context("Configuration validation failed")?;

    init_logging(&config.logging);

    match cli.command {
        Command::Convert(cmd) => cmd.run(&config).await,
        Command::Formats(cmd) => cmd.run(),
    }
}

/// Installs the global subscriber. `RUST_LOG` wins over the configured level.
fn init_logging(logging: &LoggingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));
    let registry = tracing_subscriber::registry().with(filter);

    match logging.format {
        LogFormat::Pretty => registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init(),
        LogFormat::Json => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .init(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_convert_with_global_config() {
        let cli = Cli::try_parse_from([
            "files-converter",
            "convert",
            "a.png",
            "b.png",
            "--to",
            "jpg",
            "--config",
            "conv.toml",
        ])
        .unwrap();

        assert_eq!(cli.config, Some(PathBuf::from("conv.toml")));
        match cli.command {
            Command::Convert(cmd) => {
                assert_eq!(cmd.inputs.len(), 2);
                assert_eq!(cmd.to, "jpg");
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_output_and_output_dir_conflict() {
        let result = Cli::try_parse_from([
            "files-converter",
            "convert",
            "a.png",
            "--to",
            "jpg",
            "--output",
            "b.jpg",
            "--output-dir",
            "out",
        ]);
        assert!(result.is_err());
    }
}
