//! Testing utilities and mock implementations.
//!
//! [`MockStrategy`] stands in for a real conversion strategy so the engine
//! and batch orchestration can be exercised without external tools.
//!
//! # Example
//!
//! ```rust,ignore
//! use files_converter_core::testing::MockStrategy;
//!
//! let mut engine = ConversionEngine::empty(ConverterConfig::default());
//! engine.register(Arc::new(MockStrategy::new(FormatCategory::Photos)));
//! ```

mod mock_strategy;

pub use mock_strategy::{MockStrategy, RecordedConversion};

/// Test fixtures and helper functions.
pub mod fixtures {
    use std::io::Write;
    use std::path::{Path, PathBuf};

    /// Write a zip archive holding `files` as `(name, contents)` pairs.
    pub fn write_zip(path: &Path, files: &[(&str, &str)]) -> std::io::Result<()> {
        let mut zip = zip::ZipWriter::new(std::fs::File::create(path)?);
        for (name, contents) in files {
            zip.start_file(*name, zip::write::SimpleFileOptions::default())
                .map_err(std::io::Error::other)?;
            zip.write_all(contents.as_bytes())?;
        }
        zip.finish().map_err(std::io::Error::other)?;
        Ok(())
    }

    /// Write an executable shell script standing in for an external tool.
    #[cfg(unix)]
    pub fn fake_tool(dir: &Path, name: &str, body: &str) -> std::io::Result<PathBuf> {
        use std::os::unix::fs::PermissionsExt;

        let path = dir.join(name);
        std::fs::write(&path, format!("#!/bin/sh\n{}\n", body))?;
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755))?;
        Ok(path)
    }
}
