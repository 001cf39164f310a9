//! The per-export context threaded through every pipeline stage.

use crate::config::ExporterConfig;
use crate::error::{ExportError, Result};
use crate::output::{FilePaths, PluginWriter};
use crate::scene::SceneSource;
use crate::types::{FrameRange, PluginDesc};
use std::collections::{BTreeSet, HashSet};
use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

pub const DEFAULT_BRDF: &str = "BRDFNOBRDFISSET";
pub const DEFAULT_MATERIAL: &str = "MANOMATERIALISSET";
pub const DEFAULT_TEXTURE: &str = "TENOTEXTUREIESSET";
pub const DEFAULT_UVWGEN: &str = "DEFAULTUVWC";
pub const DEFAULT_BLEND: &str = "TEDefaultBlend";

/// Cooperative cancellation flag shared with the caller.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Names referenced when a slot cannot be resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DefaultNames {
    pub brdf: String,
    pub material: String,
    pub texture: String,
    pub uvwgen: String,
    pub blend: String,
}

impl Default for DefaultNames {
    fn default() -> Self {
        Self {
            brdf: DEFAULT_BRDF.to_string(),
            material: DEFAULT_MATERIAL.to_string(),
            texture: DEFAULT_TEXTURE.to_string(),
            uvwgen: DEFAULT_UVWGEN.to_string(),
            blend: DEFAULT_BLEND.to_string(),
        }
    }
}

impl DefaultNames {
    /// Fallback for a socket, chosen by its parameter name.
    pub fn for_socket(&self, param: &str) -> &str {
        let param = param.to_ascii_lowercase();
        if param.contains("uvwgen") {
            &self.uvwgen
        } else if param.contains("brdf") {
            &self.brdf
        } else if param.contains("material") || param.starts_with("mtl") {
            &self.material
        } else if param.contains("blend") {
            &self.blend
        } else {
            &self.texture
        }
    }
}

/// Dedup caches of one export run.
#[derive(Debug, Default)]
pub struct ExportCache {
    /// Plugins written in the current frame pass.
    pub plugins: HashSet<String>,
    /// Mesh identities written during the whole run.
    pub meshes: HashSet<String>,
}

impl ExportCache {
    /// Start a new frame pass. Mesh identities survive.
    pub fn begin_frame(&mut self) {
        self.plugins.clear();
    }

    pub fn clear(&mut self) {
        self.plugins.clear();
        self.meshes.clear();
    }
}

/// Scene entities excluded from the current pass.
#[derive(Debug, Default)]
pub struct SkipSets {
    pub objects: BTreeSet<String>,
    /// Environment volume plugins attached to the environment.
    pub environment_volume: BTreeSet<String>,
    /// Objects used as volume gizmos.
    pub gizmos: BTreeSet<String>,
}

impl SkipSets {
    pub fn skips(&self, object: &str) -> bool {
        self.objects.contains(object) || self.gizmos.contains(object)
    }

    pub fn clear(&mut self) {
        self.objects.clear();
        self.environment_volume.clear();
        self.gizmos.clear();
    }
}

/// Stack of nodes currently being visited, used to give issues a location.
#[derive(Debug, Default)]
pub struct NodeContext {
    stack: Vec<String>,
}

impl NodeContext {
    pub fn push(&mut self, node: impl Into<String>) {
        self.stack.push(node.into());
    }

    pub fn pop(&mut self) -> Option<String> {
        self.stack.pop()
    }

    pub fn current(&self) -> Option<&str> {
        self.stack.last().map(String::as_str)
    }

    pub fn path(&self) -> String {
        self.stack.join(" > ")
    }

    pub fn clear(&mut self) {
        self.stack.clear();
    }
}

/// A localized export failure that was replaced by a fallback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportIssue {
    /// Entity (or node path) that failed.
    pub entity: String,
    pub message: String,
    /// Plugin name referenced instead.
    pub fallback: String,
}

/// Mutable context of one export run.
pub struct ExportBus<'a> {
    pub output: PluginWriter,
    pub scene: &'a mut dyn SceneSource,
    pub config: &'a ExporterConfig,
    /// Camera object exported in the current pass.
    pub camera: Option<String>,
    pub preview: bool,
    pub cache: ExportCache,
    pub skip: SkipSets,
    pub context: NodeContext,
    pub defaults: DefaultNames,
    pub issues: Vec<ExportIssue>,
    pub cancel: CancelToken,
    /// Frames passed through the frame orchestrator.
    pub frames: Vec<i32>,
    exporter_active: bool,
}

impl<'a> ExportBus<'a> {
    pub fn new(
        scene: &'a mut dyn SceneSource,
        config: &'a ExporterConfig,
        cancel: CancelToken,
    ) -> Self {
        let camera = scene.active_camera();
        Self {
            output: PluginWriter::new(),
            scene,
            config,
            camera,
            preview: false,
            cache: ExportCache::default(),
            skip: SkipSets::default(),
            context: NodeContext::default(),
            defaults: DefaultNames::default(),
            issues: Vec::new(),
            cancel,
            frames: Vec::new(),
            exporter_active: false,
        }
    }

    pub fn with_preview(mut self, preview: bool) -> Self {
        self.preview = preview;
        self
    }

    pub fn exporter_active(&self) -> bool {
        self.exporter_active
    }

    /// Write a plugin once per frame pass and return its name.
    pub fn write_plugin(&mut self, desc: &PluginDesc) -> Result<String> {
        if !self.cache.plugins.contains(&desc.name) {
            self.output.write_plugin(desc)?;
            self.cache.plugins.insert(desc.name.clone());
        }
        Ok(desc.name.clone())
    }

    /// Record a per-entity error and return the fallback name.
    ///
    /// An issue already recorded for the same location is not repeated.
    pub fn report_issue(&mut self, entity: &str, error: &ExportError, fallback: &str) -> String {
        let location = match self.context.path() {
            path if path.is_empty() => entity.to_string(),
            path => format!("{} > {}", path, entity),
        };
        let message = error.to_string();
        let known = self
            .issues
            .iter()
            .any(|i| i.entity == location && i.message == message && i.fallback == fallback);
        if !known {
            log::warn!("{}: {} (using {})", location, message, fallback);
            self.issues.push(ExportIssue {
                entity: location,
                message,
                fallback: fallback.to_string(),
            });
        }
        fallback.to_string()
    }

    /// Convert the finished run into a report.
    pub fn into_report(mut self) -> ExportReport {
        let paths = self.output.files().map(|f| f.paths().clone());
        let frame_range = self.output.frame_range();
        let plugins_written = self.output.plugins_written();
        drop(self.output.take_files());
        ExportReport {
            paths,
            frames: self.frames,
            frame_range,
            plugins_written,
            issues: self.issues,
        }
    }
}

/// Summary of a finished export.
#[derive(Debug, Clone)]
pub struct ExportReport {
    /// Resolved file paths, `None` if the files were never set up.
    pub paths: Option<FilePaths>,
    pub frames: Vec<i32>,
    /// Range the renderer should render, for animated exports.
    pub frame_range: Option<FrameRange>,
    pub plugins_written: usize,
    pub issues: Vec<ExportIssue>,
}

/// Prepare per-run exporter state.
///
/// Resets caches and skip sets, restores the default names, and seeds the
/// mesh cache with meshes already declared in a reused geometry file.
pub fn init_exporter(bus: &mut ExportBus<'_>) {
    bus.cache.clear();
    bus.skip.clear();
    bus.context.clear();
    bus.defaults = DefaultNames::default();
    if let Some(files) = bus.output.files() {
        bus.cache.meshes.extend(files.reused_geometry().iter().cloned());
    }
    bus.exporter_active = true;
    log::debug!(
        "Exporter initialized ({} meshes from reused geometry)",
        bus.cache.meshes.len()
    );
}

/// Release per-run exporter state.
pub fn shutdown_exporter(bus: &mut ExportBus<'_>) {
    if !bus.exporter_active {
        return;
    }
    bus.context.clear();
    bus.exporter_active = false;
    log::debug!("Exporter shut down");
}

/// Pairs [`init_exporter`] with [`shutdown_exporter`], which runs on drop.
pub struct ExporterScope<'b, 'a> {
    bus: &'b mut ExportBus<'a>,
}

impl<'b, 'a> ExporterScope<'b, 'a> {
    pub fn new(bus: &'b mut ExportBus<'a>) -> Self {
        init_exporter(bus);
        Self { bus }
    }
}

impl<'a> Deref for ExporterScope<'_, 'a> {
    type Target = ExportBus<'a>;

    fn deref(&self) -> &Self::Target {
        self.bus
    }
}

impl<'a> DerefMut for ExporterScope<'_, 'a> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.bus
    }
}

impl Drop for ExporterScope<'_, '_> {
    fn drop(&mut self) {
        shutdown_exporter(self.bus);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::Scene;
    use crate::types::PluginKind;

    #[test]
    fn test_default_for_socket() {
        let d = DefaultNames::default();
        assert_eq!(d.for_socket("uvwgen"), DEFAULT_UVWGEN);
        assert_eq!(d.for_socket("brdf"), DEFAULT_BRDF);
        assert_eq!(d.for_socket("base_material"), DEFAULT_MATERIAL);
        assert_eq!(d.for_socket("mtls_list"), DEFAULT_MATERIAL);
        assert_eq!(d.for_socket("blend_amount"), DEFAULT_BLEND);
        assert_eq!(d.for_socket("color_tex"), DEFAULT_TEXTURE);
    }

    #[test]
    fn test_cancel_token_is_shared() {
        let token = CancelToken::new();
        let clone = token.clone();
        assert!(!clone.is_cancelled());
        token.cancel();
        assert!(clone.is_cancelled());
    }

    #[test]
    fn test_scope_pairs_init_and_shutdown() {
        let mut scene = Scene::new("s");
        let config = ExporterConfig::default();
        let mut bus = ExportBus::new(&mut scene, &config, CancelToken::new());
        bus.cache.meshes.insert("stale".to_string());
        {
            let scope = ExporterScope::new(&mut bus);
            assert!(scope.exporter_active());
            assert!(scope.cache.meshes.is_empty());
        }
        assert!(!bus.exporter_active());
    }

    #[test]
    fn test_report_issue_uses_node_context() {
        let mut scene = Scene::new("s");
        let config = ExporterConfig::default();
        let mut bus = ExportBus::new(&mut scene, &config, CancelToken::new());
        bus.context.push("MAred");
        let err = ExportError::CyclicReference("a -> a".to_string());
        let name = bus.report_issue("TEa", &err, DEFAULT_TEXTURE);
        assert_eq!(name, DEFAULT_TEXTURE);
        assert_eq!(bus.issues[0].entity, "MAred > TEa");
        assert!(bus.issues[0].message.contains("a -> a"));

        bus.report_issue("TEa", &err, DEFAULT_TEXTURE);
        assert_eq!(bus.issues.len(), 1);
        bus.context.pop();
        bus.report_issue("TEa", &err, DEFAULT_TEXTURE);
        assert_eq!(bus.issues.len(), 2);
    }

    #[test]
    fn test_write_plugin_dedups_per_frame_pass() {
        let dir = tempfile::tempdir().unwrap();
        let mut scene = Scene::new("s");
        let config = ExporterConfig::default();
        let mut bus = ExportBus::new(&mut scene, &config, CancelToken::new());
        let mut files = crate::output::ExportFiles::new(FilePaths::new(dir.path(), "s"));
        files.init().unwrap();
        bus.output.set_file_manager(files);

        let desc = PluginDesc::new("TexChecker", "TEc", PluginKind::Texture);
        assert_eq!(bus.write_plugin(&desc).unwrap(), "TEc");
        assert_eq!(bus.write_plugin(&desc).unwrap(), "TEc");
        assert_eq!(bus.output.plugins_written(), 1);

        bus.cache.begin_frame();
        bus.write_plugin(&desc).unwrap();
        assert_eq!(bus.output.plugins_written(), 2);
    }
}
