//! Environment settings and volume effects.

use super::objects::export_mesh_object;
use crate::bus::ExportBus;
use crate::error::Result;
use crate::nodes::{export_node_tree, export_params};
use crate::scene::{EnvironmentVolume, ObjectData, SceneObject, World};
use crate::types::{plugin_name, AttrValue, PluginDesc, PluginKind, PluginRef};

pub const SETTINGS_ENVIRONMENT: &str = "settingsEnvironment";

/// Export the world: volumes (with their gizmos) first, then the environment.
///
/// Gizmo objects are added to the gizmo skip set so the object pass does not
/// export them again as renderable nodes.
pub fn export_world(bus: &mut ExportBus<'_>) -> Result<()> {
    let Some(world) = bus.scene.world() else {
        return Ok(());
    };
    let objects = bus.scene.objects();

    let mut volumes = Vec::new();
    for volume in world.volumes.iter().filter(|v| v.enabled) {
        volumes.push(export_volume(bus, volume, &objects)?);
    }

    export_environment(bus, &world, volumes)?;
    Ok(())
}

fn export_volume(
    bus: &mut ExportBus<'_>,
    volume: &EnvironmentVolume,
    objects: &[SceneObject],
) -> Result<PluginRef> {
    let name = plugin_name(PluginKind::Effect.name_prefix(), &volume.name, None);
    let mut desc = PluginDesc::new(volume.plugin.clone(), name.clone(), PluginKind::Effect);

    let mut gizmos = Vec::new();
    for gizmo in &volume.gizmos {
        bus.skip.gizmos.insert(gizmo.clone());
        let found = objects.iter().find_map(|ob| match &ob.data {
            ObjectData::Mesh(mesh) if &ob.name == gizmo => Some((ob, mesh)),
            _ => None,
        });
        match found {
            Some((object, mesh)) => {
                gizmos.push(PluginRef::new(export_mesh_object(bus, object, mesh, false)?));
            }
            None => log::warn!("Volume {:?}: gizmo {:?} is not a mesh object", volume.name, gizmo),
        }
    }
    if !gizmos.is_empty() {
        desc.set("gizmos", AttrValue::RefList(gizmos));
    }

    export_params(bus, &volume.params, &mut desc)?;
    bus.write_plugin(&desc)?;
    bus.skip.environment_volume.insert(name.clone());
    Ok(PluginRef::new(name))
}

fn export_environment(bus: &mut ExportBus<'_>, world: &World, volumes: Vec<PluginRef>) -> Result<()> {
    let mut desc = PluginDesc::new("SettingsEnvironment", SETTINGS_ENVIRONMENT, PluginKind::World)
        .with("bg_color", AttrValue::Color(world.bg_color));

    let slots = [
        ("bg_tex", &world.bg_texture),
        ("gi_tex", &world.gi_texture),
        ("reflect_tex", &world.reflect_texture),
        ("refract_tex", &world.refract_texture),
    ];
    for (slot, texture) in slots {
        let Some(texture) = texture else {
            continue;
        };
        let fallback = bus.defaults.texture.clone();
        bus.context.push(SETTINGS_ENVIRONMENT);
        let exported = export_node_tree(bus, texture, &fallback);
        bus.context.pop();
        desc.set(slot, PluginRef::new(exported?));
        desc.set(&format!("{}_on", slot), true);
    }

    if !volumes.is_empty() {
        desc.set("environment_volume", AttrValue::RefList(volumes));
    }
    bus.write_plugin(&desc)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::CancelToken;
    use crate::config::ExporterConfig;
    use crate::output::{ExportFiles, FilePaths};
    use crate::scene::{MeshData, Param, Scene, ShaderNode};
    use crate::types::FileCategory;
    use std::collections::BTreeMap;

    #[test]
    fn test_world_with_fog_and_gizmo() {
        let dir = tempfile::tempdir().unwrap();
        let mut scene = Scene::new("s");
        scene
            .add_object(SceneObject::new(
                "FogBox",
                ObjectData::Mesh(MeshData::new("Box", vec![[0.0; 3]; 3], vec![[0, 1, 2]])),
            ))
            .add_node(ShaderNode::new("Sky", "TexSky", PluginKind::Texture));
        let mut params = BTreeMap::new();
        params.insert("density".to_string(), Param::Float(0.25));
        scene.world = Some(World {
            bg_color: [0.1, 0.2, 0.3],
            bg_texture: Some("Sky".to_string()),
            volumes: vec![
                EnvironmentVolume {
                    name: "Fog".to_string(),
                    plugin: "EnvironmentFog".to_string(),
                    enabled: true,
                    params,
                    gizmos: vec!["FogBox".to_string()],
                },
                EnvironmentVolume {
                    name: "Off".to_string(),
                    plugin: "EnvironmentFog".to_string(),
                    enabled: false,
                    params: BTreeMap::new(),
                    gizmos: Vec::new(),
                },
            ],
            ..World::default()
        });

        let config = ExporterConfig::default();
        let mut bus = ExportBus::new(&mut scene, &config, CancelToken::new());
        let mut paths = FilePaths::new(dir.path(), "w");
        paths.set_separate_files(true);
        let mut files = ExportFiles::new(paths);
        files.init().unwrap();
        bus.output.set_file_manager(files);

        export_world(&mut bus).unwrap();
        assert!(bus.skip.gizmos.contains("FogBox"));
        assert!(bus.skip.environment_volume.contains("EFFog"));
        bus.output.done().unwrap();

        let files = bus.output.files().unwrap();
        let world = std::fs::read_to_string(files.file_for(FileCategory::World)).unwrap();
        let nodes = std::fs::read_to_string(files.file_for(FileCategory::Object)).unwrap();
        let textures = std::fs::read_to_string(files.file_for(FileCategory::Texture)).unwrap();

        assert!(world.contains("EnvironmentFog EFFog {"));
        assert!(world.contains("\tgizmos=List(OBFogBox);"));
        assert!(world.contains("\tdensity=0.250000;"));
        assert!(!world.contains("EFOff"));
        assert!(world.contains("\tbg_tex=TESky;\n\tbg_tex_on=1;"));
        assert!(world.contains("\tenvironment_volume=List(EFFog);"));
        assert!(nodes.contains("Node OBFogBox {"));
        assert!(nodes.contains("\tvisible=0;"));
        assert!(textures.contains("TexSky TESky {"));
    }

    #[test]
    fn test_no_world_writes_nothing() {
        let mut scene = Scene::new("s");
        let config = ExporterConfig::default();
        let mut bus = ExportBus::new(&mut scene, &config, CancelToken::new());
        export_world(&mut bus).unwrap();
        assert_eq!(bus.output.plugins_written(), 0);
    }
}
