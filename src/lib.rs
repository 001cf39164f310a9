//! # vrscene exporter
//!
//! A Rust library for exporting 3D scenes to V-Ray `.vrscene` files.
//!
//! ## Overview
//!
//! The exporter walks a scene (objects, shader node trees, world, render
//! channels and settings), resolves the plugins each entity references, and
//! writes every plugin exactly once into one file or into one file per
//! plugin category that the main file `#include`s. Animation is exported frame
//! by frame, as a full range with interpolated values, or as a camera loop.
//!
//! ## Quick Start
//!
//! ```ignore
//! use vrscene_exporter::{export_to_files, load_scene, CancelToken, ExporterConfig};
//!
//! // Load a scene description
//! let mut scene = load_scene("path/to/scene.json")?;
//!
//! // Write one file per category into ./out
//! let config = ExporterConfig::default()
//!     .with_output_dir("out")
//!     .with_separate_files(true);
//!
//! let report = export_to_files(&mut scene, &config, CancelToken::new())?;
//! println!("{} plugins written", report.plugins_written);
//! ```
//!
//! ## Library Integration
//!
//! To export from an existing scene graph, implement the `SceneSource` trait
//! and pass it to `export_to_files`, or to `export_and_run` together with a
//! `RunCoordinator` to render the result:
//!
//! ```ignore
//! use vrscene_exporter::{export_and_run, RunCoordinator, StandaloneBackend};
//!
//! let mut run = RunCoordinator::new(Box::new(StandaloneBackend::from_config(&config)));
//! if let Err(reason) = export_and_run(&mut my_scene, &config, &mut run, cancel) {
//!     eprintln!("{}", reason);
//! }
//! ```

pub mod animation;
pub mod bus;
pub mod config;
pub mod error;
pub mod export;
pub mod nodes;
pub mod output;
pub mod pipeline;
pub mod run;
pub mod scene;
pub mod types;

// Re-export main types for convenience
pub use bus::{CancelToken, ExportBus, ExportIssue, ExportReport, ExporterScope};
pub use config::{AnimationMode, Backend, ExporterConfig};
pub use error::{ExportError, Result};
pub use output::{ExportFiles, FilePaths, PluginWriter};
pub use pipeline::{export_and_run, export_to_files, render_scene};
pub use run::{RendererBackend, RunCoordinator, ServerRegistry, StandaloneBackend};
pub use scene::{Scene, SceneSource};
pub use types::{AttrValue, FileCategory, FrameRange, PluginDesc, PluginKind};

/// Load a scene from a JSON file.
pub fn load_scene<P: AsRef<std::path::Path>>(path: P) -> Result<Scene> {
    Scene::load_from_path(path)
}

/// Load an exporter configuration from a JSON file.
pub fn load_config<P: AsRef<std::path::Path>>(path: P) -> Result<ExporterConfig> {
    ExporterConfig::from_json_file(path)
}
