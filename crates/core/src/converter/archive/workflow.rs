//! Extract → repack → cleanup.

use std::ffi::OsString;
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::{debug, warn};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use super::format::{ArchiveFormat, TarCompression};
use crate::converter::config::ConverterConfig;
use crate::converter::error::{ArchiveStage, ConverterError};
use crate::converter::process::ToolCommand;

/// Prefix of private extraction directories.
const WORK_DIR_PREFIX: &str = ".files-converter-";

/// Lifecycle of a work order. `Cleaned` is always reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveState {
    Idle,
    Extracting,
    Repacking,
    Cleaned,
}

/// One archive conversion and the private directory it extracts into.
///
/// The directory is removed by [`ArchiveWorkOrder::cleanup`], or when the
/// order is dropped if the conversion future is abandoned.
#[derive(Debug)]
pub struct ArchiveWorkOrder {
    pub input_path: PathBuf,
    pub output_path: PathBuf,
    pub input_format: ArchiveFormat,
    pub target_format: ArchiveFormat,
    state: ArchiveState,
    work_dir: TempDir,
}

impl ArchiveWorkOrder {
    /// Creates the private extraction directory under `temp_root`, or next
    /// to the output file when no root is configured.
    pub fn prepare(
        input_path: PathBuf,
        output_path: PathBuf,
        input_format: ArchiveFormat,
        target_format: ArchiveFormat,
        temp_root: Option<&Path>,
    ) -> Result<Self, ConverterError> {
        let parent = match temp_root {
            Some(root) => root.to_path_buf(),
            None => output_path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .map(Path::to_path_buf)
                .unwrap_or_else(|| PathBuf::from(".")),
        };

        let work_dir = tempfile::Builder::new()
            .prefix(WORK_DIR_PREFIX)
            .tempdir_in(&parent)
            .map_err(|e| ConverterError::archive(ArchiveStage::Preparing, e.into()))?;
        debug!(dir = %work_dir.path().display(), "Created extraction directory");

        Ok(Self {
            input_path,
            output_path,
            input_format,
            target_format,
            state: ArchiveState::Idle,
            work_dir,
        })
    }

    /// The private extraction directory.
    pub fn extraction_dir(&self) -> &Path {
        self.work_dir.path()
    }

    pub fn state(&self) -> ArchiveState {
        self.state
    }

    fn advance(&mut self, state: ArchiveState) {
        debug!(from = ?self.state, to = ?state, input = %self.input_path.display(), "Archive workflow");
        self.state = state;
    }

    /// Runs extraction then repacking.
    pub async fn execute(&mut self, config: &ConverterConfig) -> Result<(), ConverterError> {
        self.advance(ArchiveState::Extracting);
        extract(
            self.input_format,
            &self.input_path,
            self.work_dir.path(),
            config,
        )
        .await
        .map_err(|e| ConverterError::archive(ArchiveStage::Extracting, e))?;
        debug!(
            entries = count_entries(self.work_dir.path()).unwrap_or(0),
            "Extracted archive"
        );

        self.advance(ArchiveState::Repacking);
        repack(
            self.target_format,
            self.work_dir.path(),
            &self.output_path,
            config,
        )
        .await
        .map_err(|e| ConverterError::archive(ArchiveStage::Repacking, e))
    }

    /// Removes the extraction directory. Failures are logged, not returned.
    pub fn cleanup(mut self) -> ArchiveState {
        self.advance(ArchiveState::Cleaned);
        let dir = self.work_dir.path().to_path_buf();
        if let Err(e) = self.work_dir.close() {
            warn!(dir = %dir.display(), error = %e, "Failed to remove extraction directory");
        }
        ArchiveState::Cleaned
    }
}

async fn run_blocking<F>(work: F) -> Result<(), ConverterError>
where
    F: FnOnce() -> Result<(), ConverterError> + Send + 'static,
{
    tokio::task::spawn_blocking(work).await?
}

/// Unpacks `input` into `dir`.
pub async fn extract(
    format: ArchiveFormat,
    input: &Path,
    dir: &Path,
    config: &ConverterConfig,
) -> Result<(), ConverterError> {
    let (input, dir) = (input.to_path_buf(), dir.to_path_buf());
    match format {
        ArchiveFormat::Zip => run_blocking(move || extract_zip(&input, &dir)).await,
        ArchiveFormat::Tar | ArchiveFormat::TarGz | ArchiveFormat::TarBz2 | ArchiveFormat::TarXz => {
            run_blocking(move || extract_tar(&input, &dir)).await
        }
        ArchiveFormat::Rar => {
            let mut target = dir.into_os_string();
            target.push(std::path::MAIN_SEPARATOR_STR);
            ToolCommand::new("unrar", &config.unrar_path)
                .args(["x", "-o+"])
                .arg(input)
                .arg(target)
                .run()
                .await
                .map(|_| ())
        }
        ArchiveFormat::SevenZip => {
            let mut out_flag = OsString::from("-o");
            out_flag.push(&dir);
            ToolCommand::new("7z", &config.seven_zip_path)
                .args(["x", "-y"])
                .arg(out_flag)
                .arg(input)
                .run()
                .await
                .map(|_| ())
        }
    }
}

/// Packs the contents of `dir` into `output`.
pub async fn repack(
    format: ArchiveFormat,
    dir: &Path,
    output: &Path,
    config: &ConverterConfig,
) -> Result<(), ConverterError> {
    let tar = |compression: TarCompression| {
        let (dir, output) = (dir.to_path_buf(), output.to_path_buf());
        run_blocking(move || pack_tar(&dir, &output, compression))
    };

    match format {
        ArchiveFormat::Tar => tar(TarCompression::None).await,
        ArchiveFormat::TarGz => tar(TarCompression::Gzip).await,
        ArchiveFormat::TarBz2 => tar(TarCompression::Bzip2).await,
        ArchiveFormat::TarXz => tar(TarCompression::Xz).await,
        ArchiveFormat::Zip => {
            let (dir, output) = (dir.to_path_buf(), output.to_path_buf());
            run_blocking(move || pack_zip(&dir, &output)).await
        }
        ArchiveFormat::Rar => {
            let (output, members) = prepare_tool_output(dir, output)?;
            ToolCommand::new("rar", &config.rar_path)
                .args(["a", "-r", "-ep1"])
                .arg(output)
                .args(members)
                .current_dir(dir)
                .run()
                .await
                .map(|_| ())
        }
        ArchiveFormat::SevenZip => {
            let (output, members) = prepare_tool_output(dir, output)?;
            ToolCommand::new("7z", &config.seven_zip_path)
                .arg("a")
                .arg(output)
                .args(members)
                .current_dir(dir)
                .run()
                .await
                .map(|_| ())
        }
    }
}

/// Resolves the output against the caller's working directory (the tool runs
/// inside `dir`), removes a stale output so the tool does not append to it,
/// and lists the top-level entries to add.
fn prepare_tool_output(dir: &Path, output: &Path) -> Result<(PathBuf, Vec<OsString>), ConverterError> {
    let output = std::path::absolute(output)?;
    match std::fs::remove_file(&output) {
        Ok(()) => {}
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => return Err(e.into()),
    }

    let mut members: Vec<OsString> = std::fs::read_dir(dir)?
        .map(|entry| entry.map(|e| e.file_name()))
        .collect::<io::Result<_>>()?;
    members.sort();
    Ok((output, members))
}

fn extract_zip(input: &Path, dir: &Path) -> Result<(), ConverterError> {
    let file = File::open(input)?;
    let mut archive = ZipArchive::new(BufReader::new(file))
        .map_err(|e| ConverterError::decode(input, e))?;
    archive
        .extract(dir)
        .map_err(|e| ConverterError::decode(input, e))
}

fn extract_tar(input: &Path, dir: &Path) -> Result<(), ConverterError> {
    let mut file = File::open(input)?;
    let mut magic = [0u8; 6];
    let read = read_prefix(&mut file, &mut magic)?;
    file.seek(SeekFrom::Start(0))?;

    let compression = TarCompression::sniff(&magic[..read]);
    debug!(?compression, "Detected tar compression");

    let reader: Box<dyn Read> = match compression {
        TarCompression::Gzip => Box::new(flate2::read::GzDecoder::new(BufReader::new(file))),
        TarCompression::Bzip2 => Box::new(bzip2::read::BzDecoder::new(BufReader::new(file))),
        TarCompression::Xz => Box::new(xz2::read::XzDecoder::new(BufReader::new(file))),
        TarCompression::None => Box::new(BufReader::new(file)),
    };

    tar::Archive::new(reader)
        .unpack(dir)
        .map_err(|e| ConverterError::decode(input, e))
}

/// Reads up to `buf.len()` bytes, stopping early at end of file.
fn read_prefix(file: &mut File, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match file.read(&mut buf[filled..])? {
            0 => break,
            n => filled += n,
        }
    }
    Ok(filled)
}

/// Files and directories below `dir`, depth-first with sorted siblings.
fn walk(dir: &Path) -> io::Result<Vec<PathBuf>> {
    let mut entries: Vec<PathBuf> = std::fs::read_dir(dir)?
        .map(|e| e.map(|e| e.path()))
        .collect::<io::Result<_>>()?;
    entries.sort();

    let mut out = Vec::new();
    for path in entries {
        let is_dir = std::fs::symlink_metadata(&path)?.is_dir();
        out.push(path.clone());
        if is_dir {
            out.extend(walk(&path)?);
        }
    }
    Ok(out)
}

fn count_entries(dir: &Path) -> io::Result<usize> {
    Ok(walk(dir)?.len())
}

/// Entry name relative to the archive root, always `/`-separated.
fn entry_name(root: &Path, path: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

fn pack_zip(dir: &Path, output: &Path) -> Result<(), ConverterError> {
    let encode = |e: zip::result::ZipError| ConverterError::encode("zip", e);
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    let mut zip = ZipWriter::new(BufWriter::new(File::create(output)?));
    let mut files = 0usize;
    for path in walk(dir)? {
        let name = entry_name(dir, &path);
        if path.is_dir() {
            zip.add_directory(format!("{name}/"), options).map_err(encode)?;
        } else {
            zip.start_file(name, options).map_err(encode)?;
            io::copy(&mut File::open(&path)?, &mut zip)?;
            files += 1;
        }
    }
    zip.finish().map_err(encode)?.flush()?;
    debug!(files, output = %output.display(), "Wrote zip archive");
    Ok(())
}

fn pack_tar(dir: &Path, output: &Path, compression: TarCompression) -> Result<(), ConverterError> {
    let file = BufWriter::new(File::create(output)?);

    match compression {
        TarCompression::None => {
            let mut builder = tar::Builder::new(file);
            builder.append_dir_all("", dir)?;
            builder.into_inner()?.flush()?;
        }
        TarCompression::Gzip => {
            let encoder = flate2::write::GzEncoder::new(file, flate2::Compression::default());
            let mut builder = tar::Builder::new(encoder);
            builder.append_dir_all("", dir)?;
            builder.into_inner()?.finish()?.flush()?;
        }
        TarCompression::Bzip2 => {
            let encoder = bzip2::write::BzEncoder::new(file, bzip2::Compression::default());
            let mut builder = tar::Builder::new(encoder);
            builder.append_dir_all("", dir)?;
            builder.into_inner()?.finish()?.flush()?;
        }
        TarCompression::Xz => {
            let encoder = xz2::write::XzEncoder::new(file, 6);
            let mut builder = tar::Builder::new(encoder);
            builder.append_dir_all("", dir)?;
            builder.into_inner()?.finish()?.flush()?;
        }
    }

    debug!(?compression, output = %output.display(), "Wrote tar archive");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn populate(dir: &Path) {
        std::fs::create_dir_all(dir.join("nested/deeper")).unwrap();
        std::fs::write(dir.join("a.txt"), "alpha").unwrap();
        std::fs::write(dir.join("nested/b.txt"), "beta").unwrap();
        std::fs::write(dir.join("nested/deeper/c.txt"), "gamma").unwrap();
    }

    fn assert_populated(dir: &Path) {
        assert_eq!(std::fs::read_to_string(dir.join("a.txt")).unwrap(), "alpha");
        assert_eq!(std::fs::read_to_string(dir.join("nested/b.txt")).unwrap(), "beta");
        assert_eq!(
            std::fs::read_to_string(dir.join("nested/deeper/c.txt")).unwrap(),
            "gamma"
        );
    }

    #[test]
    fn test_entry_name_uses_forward_slashes() {
        let root = Path::new("/work");
        assert_eq!(entry_name(root, Path::new("/work/a/b.txt")), "a/b.txt");
    }

    #[test]
    fn test_walk_lists_dirs_before_children() {
        let dir = TempDir::new().unwrap();
        populate(dir.path());
        let names: Vec<String> = walk(dir.path())
            .unwrap()
            .iter()
            .map(|p| entry_name(dir.path(), p))
            .collect();
        assert_eq!(
            names,
            vec!["a.txt", "nested", "nested/b.txt", "nested/deeper", "nested/deeper/c.txt"]
        );
    }

    #[test]
    fn test_tar_family_round_trips() {
        for compression in [
            TarCompression::None,
            TarCompression::Gzip,
            TarCompression::Bzip2,
            TarCompression::Xz,
        ] {
            let src = TempDir::new().unwrap();
            populate(src.path());
            let scratch = TempDir::new().unwrap();
            let archive = scratch.path().join("out.archive");

            pack_tar(src.path(), &archive, compression).unwrap();

            let mut magic = [0u8; 6];
            let n = read_prefix(&mut File::open(&archive).unwrap(), &mut magic).unwrap();
            assert_eq!(TarCompression::sniff(&magic[..n]), compression);

            let dest = TempDir::new().unwrap();
            extract_tar(&archive, dest.path()).unwrap();
            assert_populated(dest.path());
        }
    }

    #[test]
    fn test_zip_round_trip() {
        let src = TempDir::new().unwrap();
        populate(src.path());
        let scratch = TempDir::new().unwrap();
        let archive = scratch.path().join("out.zip");

        pack_zip(src.path(), &archive).unwrap();
        let dest = TempDir::new().unwrap();
        extract_zip(&archive, dest.path()).unwrap();
        assert_populated(dest.path());
    }

    #[test]
    fn test_corrupt_zip_is_decode_error() {
        let scratch = TempDir::new().unwrap();
        let archive = scratch.path().join("broken.zip");
        std::fs::write(&archive, b"PK but not really").unwrap();
        let err = extract_zip(&archive, scratch.path()).unwrap_err();
        assert!(matches!(err, ConverterError::Decode { .. }));
    }

    #[test]
    fn test_prepare_uses_output_directory_by_default() {
        let scratch = TempDir::new().unwrap();
        let order = ArchiveWorkOrder::prepare(
            scratch.path().join("in.zip"),
            scratch.path().join("out.tar"),
            ArchiveFormat::Zip,
            ArchiveFormat::Tar,
            None,
        )
        .unwrap();

        let dir = order.extraction_dir().to_path_buf();
        assert_eq!(dir.parent(), Some(scratch.path()));
        assert_eq!(order.state(), ArchiveState::Idle);
        assert!(dir.is_dir());

        assert_eq!(order.cleanup(), ArchiveState::Cleaned);
        assert!(!dir.exists());
    }

    #[test]
    fn test_prepare_in_missing_root_fails_while_preparing() {
        let err = ArchiveWorkOrder::prepare(
            PathBuf::from("in.zip"),
            PathBuf::from("out.zip"),
            ArchiveFormat::Zip,
            ArchiveFormat::Zip,
            Some(Path::new("/nonexistent/scratch/root")),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            ConverterError::Archive {
                stage: ArchiveStage::Preparing,
                ..
            }
        ));
    }
}
