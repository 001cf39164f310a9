//! In-memory scene, loadable from JSON.

use super::{
    ObjectData, RenderChannel, RenderSettings, SceneObject, SceneSource, ShaderNode, World,
};
use crate::error::Result;
use crate::types::FrameRange;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// A self-contained scene description.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Scene {
    pub name: String,
    pub frame_current: i32,
    pub frame_start: i32,
    pub frame_end: i32,
    pub frame_step: i32,
    /// Active camera object name.
    pub camera: Option<String>,
    pub objects: Vec<SceneObject>,
    pub nodes: Vec<ShaderNode>,
    pub world: Option<World>,
    pub channels: Vec<RenderChannel>,
    pub settings: RenderSettings,
}

impl Default for Scene {
    fn default() -> Self {
        Self {
            name: "scene".to_string(),
            frame_current: 1,
            frame_start: 1,
            frame_end: 1,
            frame_step: 1,
            camera: None,
            objects: Vec::new(),
            nodes: Vec::new(),
            world: None,
            channels: Vec::new(),
            settings: RenderSettings::default(),
        }
    }
}

impl Scene {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Load a scene from a JSON file.
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn with_frame_range(mut self, start: i32, end: i32, step: i32) -> Self {
        self.frame_start = start;
        self.frame_end = end;
        self.frame_step = step;
        self
    }

    pub fn with_frame(mut self, frame: i32) -> Self {
        self.frame_current = frame;
        self
    }

    pub fn with_camera(mut self, camera: impl Into<String>) -> Self {
        self.camera = Some(camera.into());
        self
    }

    pub fn add_object(&mut self, object: SceneObject) -> &mut Self {
        self.objects.push(object);
        self
    }

    pub fn add_node(&mut self, node: ShaderNode) -> &mut Self {
        self.nodes.push(node);
        self
    }

    pub fn mesh_count(&self) -> usize {
        self.count(|d| matches!(d, ObjectData::Mesh(_)))
    }

    pub fn light_count(&self) -> usize {
        self.count(|d| matches!(d, ObjectData::Light(_)))
    }

    pub fn camera_count(&self) -> usize {
        self.count(|d| matches!(d, ObjectData::Camera(_)))
    }

    fn count(&self, pred: impl Fn(&ObjectData) -> bool) -> usize {
        self.objects.iter().filter(|o| pred(&o.data)).count()
    }
}

impl SceneSource for Scene {
    fn name(&self) -> String {
        self.name.clone()
    }

    fn frame_current(&self) -> i32 {
        self.frame_current
    }

    fn set_frame(&mut self, frame: i32) {
        self.frame_current = frame;
    }

    fn frame_range(&self) -> FrameRange {
        FrameRange::new(self.frame_start, self.frame_end, self.frame_step)
    }

    fn objects(&self) -> Vec<SceneObject> {
        self.objects
            .iter()
            .map(|ob| {
                let mut evaluated = ob.clone();
                evaluated.transform = ob.transform_at(self.frame_current);
                evaluated
            })
            .collect()
    }

    fn shader_node(&self, name: &str) -> Option<ShaderNode> {
        self.nodes.iter().find(|n| n.name == name).cloned()
    }

    fn active_camera(&self) -> Option<String> {
        self.camera.clone()
    }

    fn world(&self) -> Option<World> {
        self.world.clone()
    }

    fn render_channels(&self) -> Vec<RenderChannel> {
        self.channels.clone()
    }

    fn render_settings(&self) -> RenderSettings {
        self.settings.clone()
    }
}
