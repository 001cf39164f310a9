//! Exporter configuration.
//!
//! The configuration is owned by the caller; the pipeline only reads it.

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// How animation is exported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AnimationMode {
    /// Export and render one frame at a time.
    #[serde(rename = "FRAMEBYFRAME")]
    FrameByFrame,
    /// Export the whole frame range, then render once.
    #[serde(rename = "FULL")]
    Full,
    /// One pseudo-frame per enabled loop camera.
    #[serde(rename = "CAMERA_LOOP")]
    CameraLoop,
    /// Current frame only.
    #[default]
    #[serde(rename = "NONE")]
    None,
}

/// Renderer backend selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Backend {
    #[default]
    #[serde(rename = "APPSDK")]
    AppSdk,
    #[serde(rename = "ZMQ")]
    Zmq,
}

/// Where the ZMQ render server runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BackendWorker {
    #[default]
    #[serde(rename = "LOCAL")]
    Local,
    #[serde(rename = "REMOTE")]
    Remote,
}

/// Distributed rendering settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DistributedConfig {
    pub enabled: bool,
    /// Local directory shared with the render nodes.
    pub shared_dir: Option<PathBuf>,
    /// The same directory as seen by the render nodes.
    pub network_dir: Option<PathBuf>,
}

/// An additional user `.vrscene` file included into the main file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IncludeFile {
    pub name: String,
    pub path: PathBuf,
    #[serde(default = "default_true", rename = "use")]
    pub enabled: bool,
}

/// Exporter configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExporterConfig {
    /// Write one file per plugin category instead of a single file.
    pub separate_files: bool,
    /// Truncate the geometry file on every export.
    pub overwrite_geometry: bool,
    pub animation_mode: AnimationMode,
    /// Frames exported per single-frame export (multi-frame motion blur).
    pub frames_to_export: u32,
    /// Append the draft-quality template.
    pub draft: bool,
    pub output_dir: PathBuf,
    /// Base file name; the scene name is used when unset.
    pub scene_name: Option<String>,
    pub distributed: DistributedConfig,
    pub backend: Backend,
    pub backend_worker: BackendWorker,
    pub zmq_port: u16,
    pub zmq_server_path: Option<PathBuf>,
    /// Standalone renderer executable.
    pub vray_path: Option<PathBuf>,
    pub includes: Vec<IncludeFile>,
    /// Start the renderer after a successful export.
    pub auto_run: bool,
}

impl Default for ExporterConfig {
    fn default() -> Self {
        Self {
            separate_files: false,
            overwrite_geometry: true,
            animation_mode: AnimationMode::None,
            frames_to_export: 1,
            draft: false,
            output_dir: std::env::temp_dir().join("vrscene"),
            scene_name: None,
            distributed: DistributedConfig::default(),
            backend: Backend::AppSdk,
            backend_worker: BackendWorker::Local,
            zmq_port: 5555,
            zmq_server_path: None,
            vray_path: None,
            includes: Vec::new(),
            auto_run: true,
        }
    }
}

impl ExporterConfig {
    /// Load a configuration from a JSON file. Missing fields take defaults.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }

    pub fn with_separate_files(mut self, separate: bool) -> Self {
        self.separate_files = separate;
        self
    }

    pub fn with_animation_mode(mut self, mode: AnimationMode) -> Self {
        self.animation_mode = mode;
        self
    }

    pub fn with_overwrite_geometry(mut self, overwrite: bool) -> Self {
        self.overwrite_geometry = overwrite;
        self
    }

    pub fn with_draft(mut self, draft: bool) -> Self {
        self.draft = draft;
        self
    }

    pub fn with_auto_run(mut self, auto_run: bool) -> Self {
        self.auto_run = auto_run;
        self
    }
}

fn default_true() -> bool {
    true
}
