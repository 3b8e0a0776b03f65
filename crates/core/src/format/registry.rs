//! The process-wide format registry and the classifier queries built on it.

use once_cell::sync::Lazy;
use std::path::Path;

use super::types::FormatCategory;

/// Ordered mapping from category to recognised extensions.
///
/// Iteration order is the order of [`FormatCategory::ALL`]. When an extension
/// is registered for more than one category (`txt`, `rtf` and `pdf` are both
/// documents and ebooks) classification picks the first category in that
/// order, so those files classify as documents.
#[derive(Debug, Clone)]
pub struct FormatRegistry {
    entries: Vec<(FormatCategory, Vec<&'static str>)>,
}

/// The shared, read-only registry.
pub static REGISTRY: Lazy<FormatRegistry> = Lazy::new(FormatRegistry::builtin);

impl FormatRegistry {
    /// Builds the built-in registry. Extensions are listed preferred-first.
    pub fn builtin() -> Self {
        let entries = FormatCategory::ALL
            .into_iter()
            .map(|category| {
                let extensions = match category {
                    FormatCategory::Photos => {
                        vec!["jpg", "jpeg", "png", "gif", "bmp", "tiff", "webp"]
                    }
                    FormatCategory::Videos => vec!["mp4", "avi", "mov", "mkv", "webm"],
                    FormatCategory::Vectors => vec!["svg", "eps", "ai"],
                    FormatCategory::Audio => {
                        vec!["mp3", "wav", "ogg", "flac", "aac", "m4a", "opus"]
                    }
                    FormatCategory::Documents => vec!["pdf", "docx", "txt", "rtf", "odt"],
                    FormatCategory::Archives => vec![
                        "zip", "tar", "tar.gz", "tar.bz2", "tar.xz", "rar", "7z", "gz", "tgz",
                    ],
                    FormatCategory::Ebooks => {
                        vec!["epub", "mobi", "azw3", "fb2", "lit", "txt", "rtf", "pdf"]
                    }
                };
                (category, extensions)
            })
            .collect();

        Self { entries }
    }

    /// Returns the registered extensions for a category.
    pub fn extensions(&self, category: FormatCategory) -> &[&'static str] {
        self.entries
            .iter()
            .find(|(c, _)| *c == category)
            .map(|(_, exts)| exts.as_slice())
            .unwrap_or(&[])
    }

    /// Returns the first category that registers `extension`.
    pub fn category_of(&self, extension: &str) -> Option<FormatCategory> {
        self.entries
            .iter()
            .find(|(_, exts)| exts.contains(&extension))
            .map(|(c, _)| *c)
    }

    /// Classifies a path, returning the category and the extension that matched.
    ///
    /// Compound suffixes are tried longest-first, so `a.tar.gz` matches
    /// `tar.gz` before `gz`.
    pub fn classify_with_extension(&self, path: &Path) -> Option<(FormatCategory, String)> {
        candidate_extensions(path)
            .into_iter()
            .find_map(|ext| self.category_of(&ext).map(|c| (c, ext)))
    }

    /// Iterates over `(category, extensions)` pairs in registry order.
    pub fn iter(&self) -> impl Iterator<Item = (FormatCategory, &[&'static str])> {
        self.entries.iter().map(|(c, exts)| (*c, exts.as_slice()))
    }
}

/// Suffix candidates of a file name, longest compound first.
pub(crate) fn candidate_extensions(path: &Path) -> Vec<String> {
    let Some(name) = path.file_name() else {
        return Vec::new();
    };
    let name = name.to_string_lossy().to_lowercase();
    let parts: Vec<&str> = name.trim_start_matches('.').split('.').collect();

    (1..parts.len())
        .map(|i| parts[i..].join("."))
        .filter(|ext| !ext.is_empty() && !ext.starts_with('.'))
        .collect()
}

/// Returns the category of a file, or `None` if its extension is not registered.
pub fn classify(path: impl AsRef<Path>) -> Option<FormatCategory> {
    REGISTRY
        .classify_with_extension(path.as_ref())
        .map(|(category, _)| category)
}

/// Returns the (possibly compound) extension that classified the file.
pub fn matched_extension(path: impl AsRef<Path>) -> Option<String> {
    REGISTRY
        .classify_with_extension(path.as_ref())
        .map(|(_, ext)| ext)
}

/// Returns whether the file belongs to any known category.
pub fn is_supported(path: impl AsRef<Path>) -> bool {
    classify(path).is_some()
}

/// Returns the candidate target formats of a category.
pub fn target_formats(category: FormatCategory) -> &'static [&'static str] {
    REGISTRY.extensions(category)
}

/// Like [`target_formats`], keyed by category name. Unknown names yield an
/// empty slice.
pub fn target_formats_for_name(name: &str) -> &'static [&'static str] {
    name.parse::<FormatCategory>()
        .map(target_formats)
        .unwrap_or(&[])
}

/// Returns the trailing extension of a file, lower-cased (empty if none).
pub fn current_format(path: impl AsRef<Path>) -> String {
    path.as_ref()
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default()
}
