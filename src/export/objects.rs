//! Scene objects: geometry, object nodes and lights.

use crate::bus::ExportBus;
use crate::error::Result;
use crate::nodes::{export_material, export_params};
use crate::scene::{LightData, LightKind, MeshData, ObjectData, SceneObject};
use crate::types::{plugin_name, AttrValue, PluginDesc, PluginKind, PluginRef};

/// Export every visible mesh and light that is not skipped in this pass.
pub fn export_objects(bus: &mut ExportBus<'_>) -> Result<()> {
    let objects = bus.scene.objects();
    let mut exported = 0usize;

    for object in &objects {
        if !object.visible || bus.skip.skips(&object.name) {
            continue;
        }
        match &object.data {
            ObjectData::Mesh(mesh) => {
                export_mesh_object(bus, object, mesh, true)?;
            }
            ObjectData::Light(light) => {
                export_light(bus, object, light)?;
            }
            ObjectData::Camera(_) | ObjectData::Empty => continue,
        }
        exported += 1;
    }

    log::debug!(
        "Frame {}: {} of {} objects exported",
        bus.output.frame_current(),
        exported,
        objects.len()
    );
    Ok(())
}

/// Export a mesh object: geometry, material tree and the `Node` placing them.
pub fn export_mesh_object(
    bus: &mut ExportBus<'_>,
    object: &SceneObject,
    mesh: &MeshData,
    visible: bool,
) -> Result<String> {
    let geometry = export_geometry(bus, mesh)?;
    let material = export_material(bus, mesh.material.as_deref())?;

    let desc = PluginDesc::new(
        "Node",
        plugin_name(PluginKind::Object.name_prefix(), &object.name, object.library.as_deref()),
        PluginKind::Object,
    )
    .with("geometry", PluginRef::new(geometry))
    .with("material", PluginRef::new(material))
    .with("transform", object.transform)
    .with("visible", visible);

    bus.write_plugin(&desc)
}

/// Export mesh geometry once per run, or once per frame for deforming meshes.
pub fn export_geometry(bus: &mut ExportBus<'_>, mesh: &MeshData) -> Result<String> {
    let name = plugin_name(
        PluginKind::Geometry.name_prefix(),
        &mesh.name,
        mesh.library.as_deref(),
    );
    let identity = if mesh.deforming {
        format!("{}@{}", name, bus.output.frame_current())
    } else {
        name.clone()
    };
    if bus.cache.meshes.contains(&identity) {
        return Ok(name);
    }

    let faces: Vec<i64> = mesh
        .faces
        .iter()
        .flat_map(|f| f.iter().map(|&i| i as i64))
        .collect();

    let mut desc = PluginDesc::new("GeomStaticMesh", name, PluginKind::Geometry)
        .with("vertices", AttrValue::VectorList(mesh.vertices.clone()))
        .with("faces", AttrValue::IntList(faces.clone()));
    if !mesh.normals.is_empty() {
        desc.set("normals", AttrValue::VectorList(mesh.normals.clone()));
        desc.set("faceNormals", AttrValue::IntList(faces));
    }

    let name = bus.write_plugin(&desc)?;
    bus.cache.meshes.insert(identity);
    Ok(name)
}

/// Export a light with the plugin type of its kind.
pub fn export_light(
    bus: &mut ExportBus<'_>,
    object: &SceneObject,
    light: &LightData,
) -> Result<String> {
    let mut desc = PluginDesc::new(
        light.kind.plugin_id(),
        plugin_name(PluginKind::Light.name_prefix(), &object.name, object.library.as_deref()),
        PluginKind::Light,
    )
    .with("enabled", true)
    .with("transform", object.transform)
    .with("intensity", light.intensity);

    // Sun color comes from the sky model.
    match light.kind {
        LightKind::Sun => {}
        _ => desc.set("color", AttrValue::Color(light.color)),
    }

    match light.kind {
        LightKind::Rectangle => {
            desc.set("u_size", light.size[0] * 0.5);
            desc.set("v_size", light.size[1] * 0.5);
            desc.set("lightPortal", if light.portal { 1i64 } else { 0i64 });
        }
        LightKind::Sphere => desc.set("radius", light.size[0]),
        LightKind::Spot => {
            desc.set("coneAngle", light.spot_size);
            desc.set("penumbraAngle", -light.spot_size * light.spot_blend);
        }
        LightKind::Omni | LightKind::Direct | LightKind::Sun | LightKind::Dome => {}
    }

    export_params(bus, &light.params, &mut desc)?;
    bus.write_plugin(&desc)
}
