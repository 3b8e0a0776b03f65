//! Converter module for turning files of one format into another.
//!
//! Every [`FormatCategory`](crate::format::FormatCategory) has one strategy
//! implementing [`CategoryConverter`]. The [`ConversionEngine`] classifies
//! the input, dispatches to the matching strategy and drives batches.
//!
//! # Strategies
//!
//! - Photos: in-process raster conversion with the `image` crate
//! - Videos: `ffmpeg` with progress parsed from its `-progress` stream
//! - Vectors: Inkscape command line export
//! - Audio: `ffmpeg` with a codec chosen per target
//! - Documents: in-process readers and writers for pdf, docx, odt, rtf and txt
//! - Archives: extract into a private directory, then repack
//! - Ebooks: Calibre's `ebook-convert`
//!
//! # Example
//!
//! ```ignore
//! use files_converter_core::converter::{ConversionEngine, ConverterConfig};
//!
//! let engine = ConversionEngine::new(ConverterConfig::default());
//!
//! let result = engine
//!     .convert("holiday.png", "holiday.jpg", "jpg", Some(Box::new(|f| println!("{:.0}%", f * 100.0))))
//!     .await?;
//! println!("Converted in {} ms", result.duration_ms);
//!
//! let report = engine.batch_convert(&["a.flac", "b.flac"], Path::new("out"), "mp3").await;
//! println!("{} succeeded, {} failed", report.succeeded(), report.failed());
//! ```

mod archive;
mod audio;
mod config;
mod document;
mod ebook;
mod engine;
mod error;
mod photo;
mod process;
mod progress;
mod traits;
mod types;
mod vector;
mod video;

pub use archive::{
    extract, repack, ArchiveConverter, ArchiveFormat, ArchiveState, ArchiveWorkOrder,
    TarCompression,
};
pub use audio::AudioConverter;
pub use config::ConverterConfig;
pub use document::{Document, DocumentConverter, DocumentFormat, Paragraph, Run};
pub use ebook::EbookConverter;
pub use engine::{batch_output_path, ConversionEngine};
pub use error::{ArchiveStage, ConverterError, ErrorKind};
pub use photo::PhotoConverter;
pub use process::{ToolCommand, ToolOutput};
pub use progress::{ProgressAccumulator, ProgressTracker};
pub use traits::CategoryConverter;
pub use types::{
    BatchItem, BatchProgress, BatchReport, ConversionRequest, ConversionResult, ProgressCallback,
};
pub use vector::VectorConverter;
pub use video::VideoConverter;
