//! Top-level export drivers.
//!
//! [`export_and_run`] is the outermost boundary: it sets up a fresh bus and
//! file set, runs the export, hands the result to the renderer and turns any
//! error into a plain message. [`render_scene`] adds the frame-by-frame outer
//! loop on top.

use crate::animation::export_frames;
use crate::bus::{CancelToken, ExportBus, ExportReport, ExporterScope};
use crate::config::{AnimationMode, ExporterConfig};
use crate::error::{ExportError, Result};
use crate::export::{export_render_channels, export_settings};
use crate::output::{ExportFiles, FilePaths};
use crate::run::RunCoordinator;
use crate::scene::SceneSource;
use crate::types::FileCategory;
use std::fmt::Write;
use std::time::{Duration, Instant};

/// Fallback plugins referenced by unset slots.
pub const DEFAULTS_TEMPLATE: &str = include_str!("../templates/defaults.vrscene");

/// Draft quality overrides.
pub const DRAFT_TEMPLATE: &str = include_str!("../templates/draft.vrscene");

/// Export the scene through an initialized bus.
///
/// Writes the header and templates, the render channels, the frames, the
/// user includes and finally the settings, which are never interpolated.
/// Returns the result of the frame stage.
pub fn export(bus: &mut ExportBus<'_>) -> Result<()> {
    let started = Instant::now();

    let header = main_header(bus);
    bus.output.write(FileCategory::Main, &header)?;
    bus.output.write(FileCategory::Main, "\n")?;
    bus.output.write(FileCategory::Main, DEFAULTS_TEMPLATE)?;
    if bus.config.draft {
        bus.output.write(FileCategory::Main, "\n")?;
        bus.output.write(FileCategory::Main, DRAFT_TEMPLATE)?;
    }

    export_render_channels(bus)?;

    let frames = export_frames(bus);

    write_user_includes(bus)?;

    bus.output.set_animation(false);
    export_settings(bus)?;

    if !bus.preview {
        log::info!("Export done [{}]", format_elapsed(started.elapsed()));
    }
    frames
}

/// Set up the file set, export, and finalize the files.
///
/// A file that cannot be opened aborts before anything is written. The
/// exporter shutdown and the file finalization run whatever the export
/// result.
pub fn export_ex(bus: &mut ExportBus<'_>) -> Result<()> {
    let paths = FilePaths::from_config(bus.config, &bus.scene.name());
    paths.log_info();

    let mut files = ExportFiles::new(paths);
    files.set_overwrite_geometry(bus.config.overwrite_geometry);
    if let Err(err) = files.init() {
        log::error!("{}", err);
        return Err(err);
    }

    bus.output.set_file_manager(files);
    bus.output.set_preview(bus.preview);

    let exported = {
        let mut scope = ExporterScope::new(bus);
        export(&mut scope)
    };
    let done = bus.output.done();
    exported.and(done)
}

/// Export the scene into files without starting a renderer.
pub fn export_to_files(
    scene: &mut dyn SceneSource,
    config: &ExporterConfig,
    cancel: CancelToken,
) -> Result<ExportReport> {
    if cancel.is_cancelled() {
        return Err(ExportError::Interrupted);
    }
    let mut bus = ExportBus::new(scene, config, cancel);
    export_ex(&mut bus)?;
    Ok(bus.into_report())
}

/// Export the scene and hand it to the renderer.
///
/// Every failure is returned as a plain message; the renderer is only
/// started after a complete export.
pub fn export_and_run(
    scene: &mut dyn SceneSource,
    config: &ExporterConfig,
    run: &mut RunCoordinator,
    cancel: CancelToken,
) -> std::result::Result<ExportReport, String> {
    let report = export_to_files(scene, config, cancel).map_err(|err| {
        log::error!("Export failed: {}", err);
        err.to_string()
    })?;

    for issue in &report.issues {
        log::debug!("{}: {} -> {}", issue.entity, issue.message, issue.fallback);
    }

    run.run(config, &report).map_err(|err| {
        log::error!("Render failed: {}", err);
        err.to_string()
    })?;
    Ok(report)
}

/// Render the scene with the configured animation mode.
///
/// Frame-by-frame mode exports and renders each frame of the scene range in
/// turn and restores the current frame afterwards. Every other mode is a
/// single [`export_and_run`].
pub fn render_scene(
    scene: &mut dyn SceneSource,
    config: &ExporterConfig,
    run: &mut RunCoordinator,
    cancel: CancelToken,
) -> std::result::Result<Vec<ExportReport>, String> {
    if config.animation_mode != AnimationMode::FrameByFrame {
        return export_and_run(scene, config, run, cancel).map(|report| vec![report]);
    }

    let selected = scene.frame_current();
    let mut reports = Vec::new();
    let mut result = Ok(());
    for frame in scene.frame_range().frames() {
        scene.set_frame(frame);
        match export_and_run(scene, config, run, cancel.clone()) {
            Ok(report) => reports.push(report),
            Err(err) => {
                result = Err(err);
                break;
            }
        }
    }
    scene.set_frame(selected);

    result.map(|_| reports)
}

fn main_header(bus: &ExportBus<'_>) -> String {
    let mut header = String::new();
    writeln!(
        header,
        "// V-Ray scene exported by {} {}",
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION")
    )
    .unwrap();
    writeln!(header, "// Scene: {}", bus.scene.name()).unwrap();
    writeln!(
        header,
        "// Date: {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    )
    .unwrap();
    header
}

fn write_user_includes(bus: &mut ExportBus<'_>) -> Result<()> {
    let includes: Vec<_> = bus.config.includes.iter().filter(|i| i.enabled).collect();
    if includes.is_empty() {
        return Ok(());
    }

    let mut text = String::from("\n// Include additional *.vrscene files");
    for include in includes {
        write!(text, "\n#include \"{}\" // {}", include.path.display(), include.name).unwrap();
    }
    text.push('\n');
    bus.output.write(FileCategory::Main, &text)
}

fn format_elapsed(elapsed: Duration) -> String {
    let secs = elapsed.as_secs();
    format!("{:02}:{:02}:{:02}", secs / 3600, secs / 60 % 60, secs % 60)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::IncludeFile;
    use crate::run::{RendererBackend, RendererHandle, RendererInit};
    use crate::scene::Scene;
    use std::path::PathBuf;

    struct NullBackend;

    impl RendererBackend for NullBackend {
        fn init(&mut self, _init: &RendererInit) -> Result<RendererHandle> {
            Ok(RendererHandle::new(1))
        }
        fn update(&mut self, _handle: &RendererHandle) -> Result<()> {
            Ok(())
        }
        fn render(&mut self, _handle: &RendererHandle) -> Result<()> {
            Ok(())
        }
        fn view_update(&mut self, _handle: &RendererHandle) -> Result<()> {
            Ok(())
        }
        fn view_draw(&mut self, _handle: &RendererHandle) -> Result<()> {
            Ok(())
        }
        fn free(&mut self, _handle: RendererHandle) {}
    }

    #[test]
    fn test_format_elapsed() {
        assert_eq!(format_elapsed(Duration::from_secs(3725)), "01:02:05");
        assert_eq!(format_elapsed(Duration::from_millis(500)), "00:00:00");
    }

    #[test]
    fn test_templates_define_default_names() {
        for name in [
            crate::bus::DEFAULT_BRDF,
            crate::bus::DEFAULT_MATERIAL,
            crate::bus::DEFAULT_TEXTURE,
            crate::bus::DEFAULT_UVWGEN,
            crate::bus::DEFAULT_BLEND,
        ] {
            assert!(
                DEFAULTS_TEMPLATE.contains(&format!(" {} {{", name)),
                "{} missing from defaults",
                name
            );
        }
    }

    #[test]
    fn test_export_writes_header_templates_and_includes() {
        let dir = tempfile::tempdir().unwrap();
        let mut scene = Scene::new("Shot");
        let mut config = ExporterConfig::default()
            .with_output_dir(dir.path())
            .with_draft(true);
        config.includes = vec![
            IncludeFile {
                name: "lights".to_string(),
                path: PathBuf::from("/assets/rig.vrscene"),
                enabled: true,
            },
            IncludeFile {
                name: "off".to_string(),
                path: PathBuf::from("/assets/off.vrscene"),
                enabled: false,
            },
        ];

        let report = export_to_files(&mut scene, &config, CancelToken::new()).unwrap();
        let main = std::fs::read_to_string(report.paths.unwrap().main_file()).unwrap();

        assert!(main.starts_with("// V-Ray scene exported by vrscene-exporter"));
        assert!(main.contains("// Scene: Shot"));
        let defaults = main.find("MtlSingleBRDF MANOMATERIALISSET").unwrap();
        let draft = main.find("SettingsImageSampler settingsImageSampler").unwrap();
        let include = main.find("#include \"/assets/rig.vrscene\" // lights").unwrap();
        let settings = main.find("SettingsOutput settingsOutput").unwrap();
        assert!(defaults < draft && draft < include && include < settings);
        assert!(!main.contains("off.vrscene"));
    }

    #[test]
    fn test_cancelled_before_start() {
        let mut scene = Scene::new("s");
        let config = ExporterConfig::default();
        let cancel = CancelToken::new();
        cancel.cancel();
        let mut run = RunCoordinator::new(Box::new(NullBackend));
        let err = export_and_run(&mut scene, &config, &mut run, cancel).unwrap_err();
        assert_eq!(err, "Export is interrupted!");
        assert!(!run.has_session());
    }

    #[test]
    fn test_unwritable_output_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("file");
        std::fs::write(&blocker, "x").unwrap();

        let mut scene = Scene::new("s");
        let config = ExporterConfig::default().with_output_dir(blocker.join("sub"));
        let mut run = RunCoordinator::new(Box::new(NullBackend));
        let err = export_and_run(&mut scene, &config, &mut run, CancelToken::new()).unwrap_err();
        assert!(err.starts_with("Error initing file"));
        assert!(!run.has_session());
    }

    #[test]
    fn test_frame_by_frame_renders_each_frame() {
        let dir = tempfile::tempdir().unwrap();
        let mut scene = Scene::new("s").with_frame_range(1, 3, 1).with_frame(2);
        let config = ExporterConfig::default()
            .with_output_dir(dir.path())
            .with_animation_mode(AnimationMode::FrameByFrame);
        let mut run = RunCoordinator::new(Box::new(NullBackend));

        let reports = render_scene(&mut scene, &config, &mut run, CancelToken::new()).unwrap();
        let frames: Vec<Vec<i32>> = reports.iter().map(|r| r.frames.clone()).collect();
        assert_eq!(frames, vec![vec![1], vec![2], vec![3]]);
        assert_eq!(scene.frame_current, 2);
        assert!(run.has_session());
    }
}
