//! Entity exporters.
//!
//! Each exporter reads one kind of scene entity through the bus and writes
//! its plugin descriptions through the bus output.

pub mod camera;
pub mod channels;
pub mod objects;
pub mod settings;
pub mod world;

pub use camera::{export_camera, loop_cameras};
pub use channels::export_render_channels;
pub use objects::{export_geometry, export_light, export_mesh_object, export_objects};
pub use settings::{export_settings, image_format_ext};
pub use world::export_world;

use crate::bus::ExportBus;
use crate::error::Result;

/// Export the scene at the current frame.
///
/// The world goes first so volume gizmos are in the skip set before objects.
pub fn export_scene(bus: &mut ExportBus<'_>) -> Result<()> {
    export_world(bus)?;
    export_camera(bus)?;
    export_objects(bus)
}
