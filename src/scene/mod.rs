//! Scene data model read by the exporters.
//!
//! The pipeline reads a live, externally owned scene through [`SceneSource`].
//! Every query returns a snapshot evaluated at the scene's current frame.

mod loader;

pub use loader::Scene;

use crate::types::{FrameRange, PluginKind};
use glam::Mat4;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Trait for scene graphs the exporter can read.
pub trait SceneSource {
    /// Scene name, used for default output file names.
    fn name(&self) -> String;

    fn frame_current(&self) -> i32;

    /// Move the scene to a frame. Later queries evaluate at that frame.
    fn set_frame(&mut self, frame: i32);

    fn frame_range(&self) -> FrameRange;

    /// All objects, evaluated at the current frame.
    fn objects(&self) -> Vec<SceneObject>;

    /// Look up a shader node by name.
    fn shader_node(&self, name: &str) -> Option<ShaderNode>;

    /// Name of the active camera object.
    fn active_camera(&self) -> Option<String>;

    fn world(&self) -> Option<World>;

    fn render_channels(&self) -> Vec<RenderChannel>;

    fn render_settings(&self) -> RenderSettings;
}

/// An object placed in the scene.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneObject {
    pub name: String,
    /// Library file the object is linked from.
    #[serde(default)]
    pub library: Option<String>,
    #[serde(default = "default_true")]
    pub visible: bool,
    #[serde(default = "identity")]
    pub transform: Mat4,
    /// Transform keys; when present they override `transform`.
    #[serde(default)]
    pub keyframes: Vec<TransformKey>,
    pub data: ObjectData,
}

impl SceneObject {
    pub fn new(name: impl Into<String>, data: ObjectData) -> Self {
        Self {
            name: name.into(),
            library: None,
            visible: true,
            transform: Mat4::IDENTITY,
            keyframes: Vec::new(),
            data,
        }
    }

    pub fn with_transform(mut self, transform: Mat4) -> Self {
        self.transform = transform;
        self
    }

    pub fn with_key(mut self, frame: i32, matrix: Mat4) -> Self {
        self.keyframes.push(TransformKey { frame, matrix });
        self
    }

    pub fn with_library(mut self, library: impl Into<String>) -> Self {
        self.library = Some(library.into());
        self
    }

    pub fn hidden(mut self) -> Self {
        self.visible = false;
        self
    }

    /// Transform at a frame: linear in translation and scale, spherical in rotation,
    /// held constant outside the keyed range.
    pub fn transform_at(&self, frame: i32) -> Mat4 {
        let mut keys: Vec<&TransformKey> = self.keyframes.iter().collect();
        if keys.is_empty() {
            return self.transform;
        }
        keys.sort_by_key(|k| k.frame);

        let first = keys[0];
        let last = keys[keys.len() - 1];
        if frame <= first.frame {
            return first.matrix;
        }
        if frame >= last.frame {
            return last.matrix;
        }

        for pair in keys.windows(2) {
            let (a, b) = (pair[0], pair[1]);
            if frame >= a.frame && frame <= b.frame {
                if a.frame == b.frame {
                    return a.matrix;
                }
                let t = (frame - a.frame) as f32 / (b.frame - a.frame) as f32;
                let (sa, ra, ta) = a.matrix.to_scale_rotation_translation();
                let (sb, rb, tb) = b.matrix.to_scale_rotation_translation();
                return Mat4::from_scale_rotation_translation(
                    sa.lerp(sb, t),
                    ra.slerp(rb, t),
                    ta.lerp(tb, t),
                );
            }
        }
        last.matrix
    }
}

/// A keyed object transform.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TransformKey {
    pub frame: i32,
    pub matrix: Mat4,
}

/// Object payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ObjectData {
    Mesh(MeshData),
    Light(LightData),
    Camera(CameraData),
    Empty,
}

/// Triangle mesh data, shared by name between objects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeshData {
    pub name: String,
    #[serde(default)]
    pub library: Option<String>,
    pub vertices: Vec<[f32; 3]>,
    pub faces: Vec<[u32; 3]>,
    #[serde(default)]
    pub normals: Vec<[f32; 3]>,
    /// Material (shader node) name.
    #[serde(default)]
    pub material: Option<String>,
    /// Geometry changes over time and is exported every frame.
    #[serde(default)]
    pub deforming: bool,
}

impl MeshData {
    pub fn new(name: impl Into<String>, vertices: Vec<[f32; 3]>, faces: Vec<[u32; 3]>) -> Self {
        Self {
            name: name.into(),
            library: None,
            vertices,
            faces,
            normals: Vec::new(),
            material: None,
            deforming: false,
        }
    }

    pub fn with_material(mut self, material: impl Into<String>) -> Self {
        self.material = Some(material.into());
        self
    }

    pub fn deforming(mut self) -> Self {
        self.deforming = true;
        self
    }
}

/// Light source types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LightKind {
    Omni,
    Spot,
    Rectangle,
    Sphere,
    Direct,
    Sun,
    Dome,
}

impl LightKind {
    /// Renderer plugin type for this light.
    pub fn plugin_id(&self) -> &'static str {
        match self {
            LightKind::Omni => "LightOmni",
            LightKind::Spot => "LightSpot",
            LightKind::Rectangle => "LightRectangle",
            LightKind::Sphere => "LightSphere",
            LightKind::Direct => "LightDirect",
            LightKind::Sun => "SunLight",
            LightKind::Dome => "LightDome",
        }
    }
}

/// Light data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LightData {
    pub kind: LightKind,
    #[serde(default = "white")]
    pub color: [f32; 3],
    #[serde(default = "one")]
    pub intensity: f32,
    /// Area light size (x, y), or sphere radius in `x`.
    #[serde(default = "unit_size")]
    pub size: [f32; 2],
    /// Spot cone angle in radians.
    #[serde(default = "default_spot_size")]
    pub spot_size: f32,
    #[serde(default)]
    pub spot_blend: f32,
    /// Rectangle light acts as a light portal.
    #[serde(default)]
    pub portal: bool,
    /// Extra plugin parameters, may link to texture nodes.
    #[serde(default)]
    pub params: BTreeMap<String, Param>,
}

impl LightData {
    pub fn new(kind: LightKind) -> Self {
        Self {
            kind,
            color: white(),
            intensity: 1.0,
            size: unit_size(),
            spot_size: default_spot_size(),
            spot_blend: 0.0,
            portal: false,
            params: BTreeMap::new(),
        }
    }
}

/// Camera data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CameraData {
    /// Horizontal field of view in radians.
    #[serde(default = "default_fov")]
    pub fov: f32,
    #[serde(default)]
    pub clip: bool,
    #[serde(default = "default_clip_start")]
    pub clip_start: f32,
    #[serde(default = "default_clip_end")]
    pub clip_end: f32,
    #[serde(default)]
    pub ortho: bool,
    #[serde(default = "one")]
    pub ortho_width: f32,
    /// Camera takes part in camera-loop export.
    #[serde(default)]
    pub use_camera_loop: bool,
}

impl Default for CameraData {
    fn default() -> Self {
        Self {
            fov: default_fov(),
            clip: false,
            clip_start: default_clip_start(),
            clip_end: default_clip_end(),
            ortho: false,
            ortho_width: 1.0,
            use_camera_loop: false,
        }
    }
}

/// A node of a shader graph (material, BRDF, texture, UVW generator, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShaderNode {
    pub name: String,
    #[serde(default)]
    pub library: Option<String>,
    /// Renderer plugin type, e.g. `TexBitmap`.
    pub plugin: String,
    pub kind: PluginKind,
    #[serde(default)]
    pub params: BTreeMap<String, Param>,
}

impl ShaderNode {
    pub fn new(name: impl Into<String>, plugin: impl Into<String>, kind: PluginKind) -> Self {
        Self {
            name: name.into(),
            library: None,
            plugin: plugin.into(),
            kind,
            params: BTreeMap::new(),
        }
    }

    pub fn with_param(mut self, key: impl Into<String>, value: Param) -> Self {
        self.params.insert(key.into(), value);
        self
    }

    /// Link a parameter to another node's default output.
    pub fn with_link(self, key: impl Into<String>, target: impl Into<String>) -> Self {
        self.with_param(key, Param::Link(NodeLink::new(target)))
    }
}

/// A node parameter: an unconnected value or a link to another node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Param {
    Bool(bool),
    Int(i64),
    Float(f64),
    Color([f32; 3]),
    Link(NodeLink),
    Text(String),
}

/// A connection to another node's output socket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeLink {
    pub link: String,
    #[serde(default)]
    pub output: Option<String>,
}

impl NodeLink {
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            link: target.into(),
            output: None,
        }
    }
}

/// Environment settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct World {
    #[serde(default)]
    pub bg_color: [f32; 3],
    /// Texture nodes overriding the environment per ray type.
    #[serde(default)]
    pub bg_texture: Option<String>,
    #[serde(default)]
    pub gi_texture: Option<String>,
    #[serde(default)]
    pub reflect_texture: Option<String>,
    #[serde(default)]
    pub refract_texture: Option<String>,
    #[serde(default)]
    pub volumes: Vec<EnvironmentVolume>,
}

impl Default for World {
    fn default() -> Self {
        Self {
            bg_color: [0.0, 0.0, 0.0],
            bg_texture: None,
            gi_texture: None,
            reflect_texture: None,
            refract_texture: None,
            volumes: Vec::new(),
        }
    }
}

/// An environment volume effect (fog, aerial perspective, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnvironmentVolume {
    pub name: String,
    /// Renderer plugin type, e.g. `EnvironmentFog`.
    pub plugin: String,
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub params: BTreeMap<String, Param>,
    /// Mesh objects bounding the volume; they are not rendered themselves.
    #[serde(default)]
    pub gizmos: Vec<String>,
}

/// A render element / channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderChannel {
    pub name: String,
    /// Renderer plugin type, e.g. `RenderChannelColor`.
    pub plugin: String,
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub params: BTreeMap<String, Param>,
}

/// Output image and unit settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderSettings {
    pub width: u32,
    pub height: u32,
    /// Host image format name, e.g. `PNG`, `OPEN_EXR`.
    pub image_format: String,
    pub output_path: Option<String>,
    /// Scene units in meters.
    pub meters_scale: f32,
    /// Additional settings plugins written verbatim.
    pub extra: Vec<ShaderNode>,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            width: 1920,
            height: 1080,
            image_format: "PNG".to_string(),
            output_path: None,
            meters_scale: 1.0,
            extra: Vec::new(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn identity() -> Mat4 {
    Mat4::IDENTITY
}

fn white() -> [f32; 3] {
    [1.0, 1.0, 1.0]
}

fn one() -> f32 {
    1.0
}

fn unit_size() -> [f32; 2] {
    [1.0, 1.0]
}

fn default_spot_size() -> f32 {
    std::f32::consts::FRAC_PI_4
}

fn default_fov() -> f32 {
    0.857_556
}

fn default_clip_start() -> f32 {
    0.1
}

fn default_clip_end() -> f32 {
    100.0
}
