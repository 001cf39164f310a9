//! Error types for the vrscene exporter.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using ExportError.
pub type Result<T> = std::result::Result<T, ExportError>;

/// Main error type for scene export and render operations.
#[derive(Error, Debug)]
pub enum ExportError {
    /// I/O error during file operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to parse JSON data (scene or config).
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// Failed to write a scene bundle archive.
    #[error("ZIP error: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// An output stream could not be opened or created.
    #[error("Error initing file {path:?}: {source}")]
    FileInit {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A write was routed to a category that has no stream.
    #[error("No output stream for category: {0}")]
    UnknownCategory(String),

    /// A shader node graph references itself.
    #[error("Cyclic reference detected at: {0}")]
    CyclicReference(String),

    /// A linked node does not exist in the scene.
    #[error("Unresolved reference from {from} to {to}")]
    UnresolvedReference { from: String, to: String },

    /// The render server or renderer executable could not be located.
    #[error("Can't find executable: {0:?}")]
    ServerNotFound(PathBuf),

    /// The renderer backend reported a failure.
    #[error("Renderer error: {0}")]
    Renderer(String),

    /// The export was cancelled by the caller.
    #[error("Export is interrupted!")]
    Interrupted,

    /// Generic export failure.
    #[error("Export error: {0}")]
    Export(String),
}
