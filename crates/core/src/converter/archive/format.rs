//! Archive format vocabulary.

use std::fmt;
use std::path::Path;

use crate::format::candidate_extensions;

/// Compression layer of a tar archive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TarCompression {
    None,
    Gzip,
    Bzip2,
    Xz,
}

impl TarCompression {
    /// Detects the compression from the first bytes of a file.
    pub fn sniff(magic: &[u8]) -> Self {
        if magic.starts_with(&[0x1f, 0x8b]) {
            Self::Gzip
        } else if magic.starts_with(b"BZh") {
            Self::Bzip2
        } else if magic.starts_with(&[0xfd, b'7', b'z', b'X', b'Z', 0x00]) {
            Self::Xz
        } else {
            Self::None
        }
    }
}

/// Archive formats the workflow can read and write.
///
/// Short aliases are normalised to the compound extension: `tgz`, `gz` and
/// `gztar` all mean `tar.gz`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArchiveFormat {
    Zip,
    Tar,
    TarGz,
    TarBz2,
    TarXz,
    Rar,
    SevenZip,
}

impl ArchiveFormat {
    /// Parses a format name or alias. Case-insensitive, a leading dot is ignored.
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().trim_start_matches('.').to_ascii_lowercase().as_str() {
            "zip" => Some(Self::Zip),
            "tar" => Some(Self::Tar),
            "tar.gz" | "tgz" | "gz" | "gztar" => Some(Self::TarGz),
            "tar.bz2" | "tbz2" | "bz2" | "bztar" => Some(Self::TarBz2),
            "tar.xz" | "txz" | "xz" | "xztar" => Some(Self::TarXz),
            "rar" => Some(Self::Rar),
            "7z" => Some(Self::SevenZip),
            _ => None,
        }
    }

    /// Detects the format from a file name, longest compound suffix first.
    pub fn from_path(path: &Path) -> Option<Self> {
        candidate_extensions(path)
            .iter()
            .find_map(|ext| Self::parse(ext))
    }

    /// Canonical extension.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Zip => "zip",
            Self::Tar => "tar",
            Self::TarGz => "tar.gz",
            Self::TarBz2 => "tar.bz2",
            Self::TarXz => "tar.xz",
            Self::Rar => "rar",
            Self::SevenZip => "7z",
        }
    }
}

impl fmt::Display for ArchiveFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}
