//! Format classification.
//!
//! Maps file names to one of the seven conversion categories and exposes the
//! candidate target formats for each category.
//!
//! # Example
//!
//! ```ignore
//! use files_converter_core::format::{classify, target_formats, FormatCategory};
//!
//! assert_eq!(classify("holiday.tar.gz"), Some(FormatCategory::Archives));
//! assert!(target_formats(FormatCategory::Photos).contains(&"png"));
//! ```

mod registry;
mod types;

pub use registry::{
    classify, current_format, is_supported, matched_extension, target_formats,
    target_formats_for_name, FormatRegistry, REGISTRY,
};
pub use types::{FormatCategory, ParseCategoryError};

pub(crate) use registry::candidate_extensions;
