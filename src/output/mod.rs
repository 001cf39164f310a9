//! Output streams of an export run.
//!
//! [`FilePaths`] decides where each category is written, [`ExportFiles`] owns
//! the open streams, and [`PluginWriter`] is the handle exporters write through.

pub mod files;
pub mod paths;
pub mod writer;

pub use files::ExportFiles;
pub use paths::{FilePaths, VRSCENE_EXT};
pub use writer::PluginWriter;
