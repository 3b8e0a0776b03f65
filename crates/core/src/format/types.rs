//! Types for the format module.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Top-level conversion domain of a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FormatCategory {
    /// Raster images
    Photos,
    /// Video containers
    Videos,
    /// Vector graphics
    Vectors,
    /// Audio files
    Audio,
    /// Office and plain-text documents
    Documents,
    /// Archives and compressed tarballs
    Archives,
    /// Ebooks
    Ebooks,
}

impl FormatCategory {
    /// All categories, in registry iteration order.
    pub const ALL: [FormatCategory; 7] = [
        Self::Photos,
        Self::Videos,
        Self::Vectors,
        Self::Audio,
        Self::Documents,
        Self::Archives,
        Self::Ebooks,
    ];

    /// Returns the canonical lower-case name of this category.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Photos => "photos",
            Self::Videos => "videos",
            Self::Vectors => "vectors",
            Self::Audio => "audio",
            Self::Documents => "documents",
            Self::Archives => "archives",
            Self::Ebooks => "ebooks",
        }
    }
}

impl fmt::Display for FormatCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown category name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown format category: {0}")]
pub struct ParseCategoryError(pub String);

impl FromStr for FormatCategory {
    type Err = ParseCategoryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|c| c.as_str() == lower)
            .ok_or(ParseCategoryError(s.to_string()))
    }
}
