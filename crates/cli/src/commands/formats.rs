//! Formats command.

use std::path::{Path, PathBuf};

use anyhow::{bail, Result};
use clap::Args;

use files_converter_core::{
    format::{classify, current_format, target_formats},
    FormatCategory,
};

/// Show the category and candidate target formats of files.
#[derive(Args, Debug)]
pub struct CmdFormats {
    /// Files to inspect
    #[arg(required = true)]
    pub paths: Vec<PathBuf>,
}

/// What the classifier knows about one file.
#[derive(Debug, Clone, PartialEq)]
pub struct FormatSummary {
    pub category: FormatCategory,
    pub current: String,
    pub targets: Vec<&'static str>,
}

/// Classifies `path`; targets exclude the file's current format.
pub fn describe(path: &Path) -> Option<FormatSummary> {
    let category = classify(path)?;
    let current = current_format(path);
    let targets = target_formats(category)
        .iter()
        .copied()
        .filter(|t| *t != current)
        .collect();
    Some(FormatSummary {
        category,
        current,
        targets,
    })
}

impl CmdFormats {
    /// Execute the formats command.
    pub fn run(&self) -> Result<()> {
        let mut unsupported = 0;
        for path in &self.paths {
            match describe(path) {
                Some(summary) => println!(
                    "{}: {} (.{}) -> {}",
                    path.display(),
                    summary.category,
                    summary.current,
                    summary.targets.join(", ")
                ),
                None => {
                    unsupported += 1;
                    eprintln!("{}: unsupported file type", path.display());
                }
            }
        }
        if unsupported > 0 {
            bail!("{} of {} files are unsupported", unsupported, self.paths.len());
        }
        Ok(())
    }
}
