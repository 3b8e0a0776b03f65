//! CLI subcommand implementations.

pub mod convert;
pub mod formats;

pub use convert::CmdConvert;
pub use formats::CmdFormats;
