//! Convert command.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::Args;
use indicatif::{ProgressBar, ProgressStyle};
use tokio::sync::mpsc;
use tracing::info;

use files_converter_core::{BatchProgress, BatchReport, Config, ConversionEngine};

/// Units of the progress bar per file.
const STEPS_PER_FILE: u64 = 100;

/// Convert one or more files to a target format.
#[derive(Args, Debug)]
pub struct CmdConvert {
    /// Files to convert
    #[arg(required = true)]
    pub inputs: Vec<PathBuf>,

    /// Target format (e.g. jpg, mp4, tar.gz)
    #[arg(short, long)]
    pub to: String,

    /// Directory receiving `{stem}.{format}` outputs
    #[arg(short = 'd', long, default_value = ".", conflicts_with = "output")]
    pub output_dir: PathBuf,

    /// Exact output path (single input only)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Disable the progress bar
    #[arg(long)]
    pub no_progress: bool,
}

impl CmdConvert {
    /// Execute the convert command.
    pub async fn run(&self, config: &Config) -> Result<()> {
        let engine = ConversionEngine::new(config.converter.clone());

        match &self.output {
            Some(output) => {
                let [input] = self.inputs.as_slice() else {
                    bail!("--output accepts exactly one input, got {}", self.inputs.len());
                };
                self.convert_one(&engine, input, output).await
            }
            None => {
                let report = self.convert_batch(&engine).await;
                print_report(&report);
                let failed = report.items.len() - report.succeeded();
                if failed > 0 {
                    bail!("{} of {} conversions failed", failed, report.items.len());
                }
                Ok(())
            }
        }
    }

    async fn convert_one(
        &self,
        engine: &ConversionEngine,
        input: &Path,
        output: &Path,
    ) -> Result<()> {
        let bar = self.progress_bar(1)?;
        bar.set_message(display_name(input));

        let callback_bar = bar.clone();
        let result = engine
            .convert(
                input,
                output,
                &self.to,
                Some(Box::new(move |fraction: f64| {
                    callback_bar.set_position(scaled(fraction));
                })),
            )
            .await;
        bar.finish_and_clear();

        let result = result
            .with_context(|| format!("Failed to convert {}", input.display()))?;
        println!(
            "{} -> {} ({} bytes, {} ms)",
            result.input_path.display(),
            result.output_path.display(),
            result.output_size_bytes,
            result.duration_ms
        );
        Ok(())
    }

    async fn convert_batch(&self, engine: &ConversionEngine) -> BatchReport {
        let bar = match self.progress_bar(self.inputs.len() as u64) {
            Ok(bar) => bar,
            Err(_) => ProgressBar::hidden(),
        };

        let (tx, mut rx) = mpsc::unbounded_channel();
        let events_bar = bar.clone();
        let display = tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                match event {
                    BatchProgress::FileStarted {
                        index, input_path, ..
                    } => {
                        events_bar.set_position(index as u64 * STEPS_PER_FILE);
                        events_bar.set_message(display_name(&input_path));
                    }
                    BatchProgress::FileProgress { index, fraction } => {
                        events_bar.set_position(index as u64 * STEPS_PER_FILE + scaled(fraction));
                    }
                    BatchProgress::FileFinished { index, .. } => {
                        events_bar.set_position((index as u64 + 1) * STEPS_PER_FILE);
                    }
                }
            }
        });

        let report = engine
            .batch_convert_with_progress(&self.inputs, &self.output_dir, &self.to, tx)
            .await;
        let _ = display.await;
        bar.finish_and_clear();

        info!(
            total = report.items.len(),
            succeeded = report.succeeded(),
            "Batch conversion done"
        );
        report
    }

    fn progress_bar(&self, files: u64) -> Result<ProgressBar> {
        if self.no_progress {
            return Ok(ProgressBar::hidden());
        }
        let bar = ProgressBar::new(files * STEPS_PER_FILE);
        bar.set_style(
            ProgressStyle::with_template(
                "{spinner:.green} [{elapsed_precise}] [{wide_bar:.cyan/blue}] {percent}% | {msg}",
            )
            .context("Invalid progress bar template")?
            .progress_chars("#>-"),
        );
        Ok(bar)
    }
}

fn scaled(fraction: f64) -> u64 {
    (fraction.clamp(0.0, 1.0) * STEPS_PER_FILE as f64).round() as u64
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn print_report(report: &BatchReport) {
    for item in &report.items {
        match &item.outcome {
            Ok(result) => println!(
                "ok     {} -> {} ({} bytes)",
                item.input_path.display(),
                result.output_path.display(),
                result.output_size_bytes
            ),
            Err(e) => eprintln!("failed {}: {}", item.input_path.display(), e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn command(inputs: Vec<PathBuf>, to: &str, output_dir: PathBuf) -> CmdConvert {
        CmdConvert {
            inputs,
            to: to.to_string(),
            output_dir,
            output: None,
            no_progress: true,
        }
    }

    #[test]
    fn test_scaled_clamps_fraction() {
        assert_eq!(scaled(-0.5), 0);
        assert_eq!(scaled(0.254), 25);
        assert_eq!(scaled(3.0), STEPS_PER_FILE);
    }

    #[tokio::test]
    async fn test_batch_reports_failure_count() {
        let dir = TempDir::new().unwrap();
        let good = dir.path().join("good.txt");
        std::fs::write(&good, "hello world").unwrap();
        let missing = dir.path().join("missing.txt");
        let out = dir.path().join("out");

        let err = command(vec![good, missing], "rtf", out.clone())
            .run(&Config::default())
            .await
            .unwrap_err();

        assert!(err.to_string().contains("1 of 2 conversions failed"));
        assert!(out.join("good.rtf").exists());
    }

    #[tokio::test]
    async fn test_output_requires_single_input() {
        let mut cmd = command(
            vec![PathBuf::from("a.txt"), PathBuf::from("b.txt")],
            "pdf",
            PathBuf::from("."),
        );
        cmd.output = Some(PathBuf::from("c.pdf"));

        let err = cmd.run(&Config::default()).await.unwrap_err();
        assert!(err.to_string().contains("exactly one input"));
    }

    #[tokio::test]
    async fn test_single_output_path() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("notes.txt");
        std::fs::write(&input, "line").unwrap();
        let output = dir.path().join("renamed.odt");

        let mut cmd = command(vec![input], "odt", dir.path().to_path_buf());
        cmd.output = Some(output.clone());
        cmd.run(&Config::default()).await.unwrap();

        assert!(output.exists());
    }
}
