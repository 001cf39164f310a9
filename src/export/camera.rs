//! Active camera: `RenderView` and `SettingsCamera`.

use crate::bus::ExportBus;
use crate::error::Result;
use crate::scene::{CameraData, ObjectData, SceneObject};
use crate::types::{PluginDesc, PluginKind};

pub const RENDER_VIEW: &str = "renderView";
pub const SETTINGS_CAMERA: &str = "settingsCamera";

const CAMERA_TYPE_DEFAULT: i64 = 0;
const CAMERA_TYPE_ORTHO: i64 = 7;

/// Export the camera named by `bus.camera`.
///
/// Returns the exported camera object name, `None` when the bus names no
/// camera or the scene has no camera object of that name.
pub fn export_camera(bus: &mut ExportBus<'_>) -> Result<Option<String>> {
    let Some(name) = bus.camera.clone() else {
        return Ok(None);
    };
    let objects = bus.scene.objects();
    let Some((object, camera)) = find_camera(&objects, &name) else {
        log::warn!("Camera {:?} not found", name);
        return Ok(None);
    };

    let mut view = PluginDesc::new("RenderView", RENDER_VIEW, PluginKind::Camera)
        .with("transform", object.transform)
        .with("fov", camera.fov)
        .with("clipping", camera.clip)
        .with("clipping_near", camera.clip_start)
        .with("clipping_far", camera.clip_end)
        .with("orthographic", camera.ortho);
    if camera.ortho {
        view.set("orthographicWidth", camera.ortho_width);
    }
    bus.write_plugin(&view)?;

    let settings = PluginDesc::new("SettingsCamera", SETTINGS_CAMERA, PluginKind::Camera)
        .with(
            "type",
            if camera.ortho {
                CAMERA_TYPE_ORTHO
            } else {
                CAMERA_TYPE_DEFAULT
            },
        )
        .with("fov", camera.fov);
    bus.write_plugin(&settings)?;

    Ok(Some(object.name.clone()))
}

fn find_camera<'o>(objects: &'o [SceneObject], name: &str) -> Option<(&'o SceneObject, &'o CameraData)> {
    objects.iter().find_map(|ob| match &ob.data {
        ObjectData::Camera(camera) if ob.name == name => Some((ob, camera)),
        _ => None,
    })
}

/// Names of cameras taking part in camera-loop export, in scene order.
pub fn loop_cameras(objects: &[SceneObject]) -> Vec<String> {
    objects
        .iter()
        .filter(|ob| matches!(&ob.data, ObjectData::Camera(c) if c.use_camera_loop))
        .map(|ob| ob.name.clone())
        .collect()
}
