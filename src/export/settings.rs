//! Output, units and extra settings plugins.

use crate::bus::ExportBus;
use crate::error::Result;
use crate::nodes::export_params;
use crate::types::{clean_string, AttrValue, FrameRange, PluginDesc, PluginKind};
use std::path::{Path, PathBuf};

pub const SETTINGS_OUTPUT: &str = "settingsOutput";
pub const SETTINGS_UNITS_INFO: &str = "settingsUnitsInfo";

/// Image file extension for a host image format name.
pub fn image_format_ext(format: &str) -> &'static str {
    match format {
        "JPEG" | "JPEG2000" => "jpg",
        "OPEN_EXR" | "IRIS" | "CINEON" => "exr",
        "MULTILAYER" => "vrimg",
        "TARGA" | "TARGA_RAW" => "tga",
        _ => "png",
    }
}

/// Export the settings plugins.
///
/// Expects animation tagging to be switched off; settings describe the whole
/// render, not one frame.
pub fn export_settings(bus: &mut ExportBus<'_>) -> Result<()> {
    let settings = bus.scene.render_settings();
    let range = bus
        .output
        .frame_range()
        .unwrap_or_else(|| FrameRange::single(bus.scene.frame_current()));

    let (img_dir, img_file) = output_image(bus, settings.output_path.as_deref(), &settings.image_format);
    let animated = range.len() > 1;

    let output = PluginDesc::new("SettingsOutput", SETTINGS_OUTPUT, PluginKind::Settings)
        .with("img_width", settings.width as i64)
        .with("img_height", settings.height as i64)
        .with("img_dir", AttrValue::Quoted(img_dir))
        .with("img_file", AttrValue::Quoted(img_file))
        .with("img_file_needFrameNumber", animated)
        .with("anim_start", range.start)
        .with("anim_end", range.end)
        .with("frame_start", range.start)
        .with("frames", AttrValue::IntList(range.frames().map(i64::from).collect()));
    bus.write_plugin(&output)?;

    let units = PluginDesc::new("SettingsUnitsInfo", SETTINGS_UNITS_INFO, PluginKind::Settings)
        .with("meters_scale", settings.meters_scale)
        .with("photometric_scale", 0.002f32);
    bus.write_plugin(&units)?;

    for extra in &settings.extra {
        let mut desc = PluginDesc::new(extra.plugin.clone(), clean_string(&extra.name), PluginKind::Settings);
        export_params(bus, &extra.params, &mut desc)?;
        bus.write_plugin(&desc)?;
    }
    Ok(())
}

/// Image directory (with trailing separator) and file name, as render nodes see them.
fn output_image(bus: &ExportBus<'_>, output_path: Option<&str>, format: &str) -> (String, String) {
    let ext = image_format_ext(format);
    let (dir, stem): (PathBuf, String) = match output_path {
        Some(path) => {
            let path = Path::new(path);
            let stem = path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| bus.scene.name());
            (path.parent().map(Path::to_path_buf).unwrap_or_default(), stem)
        }
        None => match bus.output.files() {
            Some(files) => (
                files.paths().output_dir().to_path_buf(),
                files.paths().base_name().to_string(),
            ),
            None => (PathBuf::new(), clean_string(&bus.scene.name())),
        },
    };

    let dir = match bus.output.files() {
        Some(files) => files.paths().render_path(&dir),
        None => dir,
    };
    let mut dir = dir.to_string_lossy().into_owned();
    if !dir.is_empty() && !dir.ends_with('/') {
        dir.push('/');
    }
    (dir, format!("{}.{}", stem, ext))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::CancelToken;
    use crate::config::ExporterConfig;
    use crate::output::{ExportFiles, FilePaths};
    use crate::scene::{Param, Scene, ShaderNode};
    use crate::types::FileCategory;

    #[test]
    fn test_image_format_ext() {
        assert_eq!(image_format_ext("JPEG"), "jpg");
        assert_eq!(image_format_ext("OPEN_EXR"), "exr");
        assert_eq!(image_format_ext("MULTILAYER"), "vrimg");
        assert_eq!(image_format_ext("TARGA"), "tga");
        assert_eq!(image_format_ext("TARGA_RAW"), "tga");
        assert_eq!(image_format_ext("JPEG2000"), "jpg");
        assert_eq!(image_format_ext("IRIS"), "exr");
        assert_eq!(image_format_ext("CINEON"), "exr");
        assert_eq!(image_format_ext("PNG"), "png");
        assert_eq!(image_format_ext("TIFF"), "png");
    }

    #[test]
    fn test_settings_output() {
        let dir = tempfile::tempdir().unwrap();
        let mut scene = Scene::new("shot").with_frame(3);
        scene.settings.image_format = "OPEN_EXR".to_string();
        scene.settings.output_path = Some("/renders/beauty.exr".to_string());
        scene.settings.extra.push(
            ShaderNode::new("settingsGI", "SettingsGI", PluginKind::Settings)
                .with_param("on", Param::Bool(true)),
        );

        let config = ExporterConfig::default();
        let mut bus = ExportBus::new(&mut scene, &config, CancelToken::new());
        let mut files = ExportFiles::new(FilePaths::new(dir.path(), "shot"));
        files.init().unwrap();
        bus.output.set_file_manager(files);

        export_settings(&mut bus).unwrap();
        bus.output.done().unwrap();
        let main = std::fs::read_to_string(
            bus.output.files().unwrap().file_for(FileCategory::Main),
        )
        .unwrap();

        assert!(main.contains("\timg_width=1920;"));
        assert!(main.contains("\timg_dir=\"/renders/\";"));
        assert!(main.contains("\timg_file=\"beauty.exr\";"));
        assert!(main.contains("\timg_file_needFrameNumber=0;"));
        assert!(main.contains("\tanim_start=3;"));
        assert!(main.contains("SettingsUnitsInfo settingsUnitsInfo {"));
        assert!(main.contains("SettingsGI settingsGI {\n\ton=1;\n}"));
    }

    #[test]
    fn test_settings_frame_range_from_writer() {
        let dir = tempfile::tempdir().unwrap();
        let mut scene = Scene::new("shot");
        let config = ExporterConfig::default();
        let mut bus = ExportBus::new(&mut scene, &config, CancelToken::new());
        let mut files = ExportFiles::new(FilePaths::new(dir.path(), "shot"));
        files.init().unwrap();
        bus.output.set_file_manager(files);
        bus.output.set_frame_range(Some(FrameRange::new(1, 5, 2)));

        export_settings(&mut bus).unwrap();
        bus.output.done().unwrap();
        let main = std::fs::read_to_string(
            bus.output.files().unwrap().file_for(FileCategory::Main),
        )
        .unwrap();
        assert!(main.contains("\timg_file=\"shot.png\";"));
        assert!(main.contains("\timg_file_needFrameNumber=1;"));
        assert!(main.contains("\tframes=ListInt(1, 3, 5);"));
    }
}
