//! Handing a finished export to the renderer.
//!
//! [`RunCoordinator`] owns the renderer session and the render server
//! processes started for it. The renderer itself sits behind the
//! [`RendererBackend`] trait; [`StandaloneBackend`] drives the command line
//! renderer.

pub mod server;

pub use server::ServerRegistry;

use crate::bus::ExportReport;
use crate::config::{Backend, BackendWorker, ExporterConfig};
use crate::error::{ExportError, Result};
use crate::output::FilePaths;
use crate::types::{FileCategory, FrameRange};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::process::Command;

/// Environment variable naming the directory of the standalone renderer.
pub const VRAY_PATH_ENV: &str = "VRAY_PATH";

/// File name of the standalone renderer executable.
#[cfg(windows)]
pub const VRAY_BINARY: &str = "vray.exe";
#[cfg(not(windows))]
pub const VRAY_BINARY: &str = "vray";

/// Opaque handle to a renderer instance.
///
/// Not `Clone`: a handle is released exactly once, by passing it back to
/// [`RendererBackend::free`].
#[derive(Debug, PartialEq, Eq)]
pub struct RendererHandle(u64);

impl RendererHandle {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn id(&self) -> u64 {
        self.0
    }
}

/// Everything a renderer needs to load a finished export.
#[derive(Debug, Clone, PartialEq)]
pub struct RendererInit {
    pub main_file: PathBuf,
    /// File per category; all equal to `main_file` in unified mode.
    /// Paths are the ones the render nodes see under distributed rendering.
    pub files: BTreeMap<FileCategory, PathBuf>,
    /// Frames to render, `None` for the current frame only.
    pub frame_range: Option<FrameRange>,
}

impl RendererInit {
    pub fn new(paths: &FilePaths, frame_range: Option<FrameRange>) -> Self {
        Self {
            main_file: paths.render_path(&paths.main_file()),
            files: FileCategory::ALL
                .iter()
                .map(|c| (*c, paths.render_path(&paths.file_for(*c))))
                .collect(),
            frame_range,
        }
    }

    pub fn file_for(&self, category: FileCategory) -> &Path {
        self.files
            .get(&category)
            .map(PathBuf::as_path)
            .unwrap_or(&self.main_file)
    }
}

/// The call surface of a renderer.
pub trait RendererBackend {
    /// Create a renderer instance for an exported file set.
    fn init(&mut self, init: &RendererInit) -> Result<RendererHandle>;

    /// Reload the exported scene.
    fn update(&mut self, handle: &RendererHandle) -> Result<()>;

    /// Render the frames of the export.
    fn render(&mut self, handle: &RendererHandle) -> Result<()>;

    /// Update an interactive viewport render.
    fn view_update(&mut self, handle: &RendererHandle) -> Result<()>;

    /// Draw the current viewport render result.
    fn view_draw(&mut self, handle: &RendererHandle) -> Result<()>;

    /// Release a renderer instance.
    fn free(&mut self, handle: RendererHandle);
}

/// Renders with the command line renderer, one process per render call.
#[derive(Debug)]
pub struct StandaloneBackend {
    executable: PathBuf,
    extra_args: Vec<String>,
    next_id: u64,
    jobs: HashMap<u64, RendererInit>,
}

impl StandaloneBackend {
    pub fn new(executable: impl Into<PathBuf>) -> Self {
        Self {
            executable: executable.into(),
            extra_args: Vec::new(),
            next_id: 1,
            jobs: HashMap::new(),
        }
    }

    /// Backend using the executable resolved from `config`.
    pub fn from_config(config: &ExporterConfig) -> Self {
        Self::new(resolve_vray_path(config))
    }

    pub fn with_arg(mut self, arg: impl Into<String>) -> Self {
        self.extra_args.push(arg.into());
        self
    }

    pub fn executable(&self) -> &Path {
        &self.executable
    }

    /// Command line for a render of `init`.
    pub fn command_args(&self, init: &RendererInit) -> Vec<String> {
        let mut args = vec![
            format!("-sceneFile={}", init.main_file.display()),
            "-autoclose=1".to_string(),
            "-display=0".to_string(),
        ];
        if let Some(range) = init.frame_range {
            args.push(format!("-frames={}", frames_arg(&range)));
        }
        args.extend(self.extra_args.iter().cloned());
        args
    }

    fn job(&self, handle: &RendererHandle) -> Result<&RendererInit> {
        self.jobs
            .get(&handle.id())
            .ok_or_else(|| ExportError::Renderer(format!("Unknown renderer handle {}", handle.id())))
    }
}

impl RendererBackend for StandaloneBackend {
    fn init(&mut self, init: &RendererInit) -> Result<RendererHandle> {
        let id = self.next_id;
        self.next_id += 1;
        self.jobs.insert(id, init.clone());
        Ok(RendererHandle::new(id))
    }

    fn update(&mut self, handle: &RendererHandle) -> Result<()> {
        // Every render reads the scene files again.
        self.job(handle).map(|_| ())
    }

    fn render(&mut self, handle: &RendererHandle) -> Result<()> {
        let args = self.command_args(self.job(handle)?);
        log::info!("Starting {:?} {}", self.executable, args.join(" "));

        let status = Command::new(&self.executable)
            .args(&args)
            .status()
            .map_err(|err| match err.kind() {
                std::io::ErrorKind::NotFound => ExportError::ServerNotFound(self.executable.clone()),
                _ => ExportError::Io(err),
            })?;
        if !status.success() {
            return Err(ExportError::Renderer(format!("Renderer exited with {}", status)));
        }
        Ok(())
    }

    fn view_update(&mut self, _handle: &RendererHandle) -> Result<()> {
        Err(ExportError::Renderer(
            "Viewport rendering is not supported by the standalone renderer".to_string(),
        ))
    }

    fn view_draw(&mut self, handle: &RendererHandle) -> Result<()> {
        self.view_update(handle)
    }

    fn free(&mut self, handle: RendererHandle) {
        self.jobs.remove(&handle.id());
    }
}

/// Renderer executable: from the configuration, the renderer binary inside
/// the `VRAY_PATH` directory, or `vray` looked up on `PATH`.
pub fn resolve_vray_path(config: &ExporterConfig) -> PathBuf {
    if let Some(path) = &config.vray_path {
        return path.clone();
    }
    match std::env::var(VRAY_PATH_ENV) {
        Ok(dir) if !dir.is_empty() => binary_in(&dir),
        _ => PathBuf::from(VRAY_BINARY),
    }
}

/// The renderer binary inside an installation directory as written in the
/// environment: quoted on Windows, with a leading `:` elsewhere.
fn binary_in(dir: &str) -> PathBuf {
    let dir = if cfg!(windows) {
        dir.trim_matches('"')
    } else {
        dir.strip_prefix(':').unwrap_or(dir)
    };
    Path::new(dir).join(VRAY_BINARY)
}

fn frames_arg(range: &FrameRange) -> String {
    if range.step <= 1 {
        format!("{}-{}", range.start, range.end)
    } else {
        range
            .frames()
            .map(|f| f.to_string())
            .collect::<Vec<_>>()
            .join(",")
    }
}

/// Drives the renderer after an export and owns the resources it starts.
///
/// Dropping the coordinator frees the renderer instance and stops every
/// render server it started.
pub struct RunCoordinator {
    backend: Box<dyn RendererBackend>,
    session: Option<RendererHandle>,
    servers: ServerRegistry,
}

impl RunCoordinator {
    pub fn new(backend: Box<dyn RendererBackend>) -> Self {
        Self {
            backend,
            session: None,
            servers: ServerRegistry::new(),
        }
    }

    pub fn has_session(&self) -> bool {
        self.session.is_some()
    }

    pub fn servers(&mut self) -> &mut ServerRegistry {
        &mut self.servers
    }

    /// Render a finished export.
    ///
    /// Starts the local render server first when the ZMQ backend is selected.
    /// A previous renderer instance is freed before a new one is created.
    pub fn run(&mut self, config: &ExporterConfig, report: &ExportReport) -> Result<()> {
        if !config.auto_run {
            log::info!("Auto run is disabled, not starting the renderer");
            return Ok(());
        }
        let paths = report
            .paths
            .as_ref()
            .ok_or_else(|| ExportError::Export("Nothing was exported".to_string()))?;

        if config.backend == Backend::Zmq && config.backend_worker == BackendWorker::Local {
            let server = config
                .zmq_server_path
                .clone()
                .ok_or_else(|| ExportError::ServerNotFound(PathBuf::new()))?;
            self.servers.ensure_running(config.zmq_port, &server)?;
        }

        self.free();
        let init = RendererInit::new(paths, report.frame_range);
        let handle = self.backend.init(&init)?;
        let rendered = self.backend.render(&handle);
        self.session = Some(handle);
        rendered
    }

    /// Reload the scene into the current renderer instance.
    pub fn update(&mut self) -> Result<()> {
        let handle = self.session.as_ref().ok_or_else(no_session)?;
        self.backend.update(handle)
    }

    pub fn view_update(&mut self) -> Result<()> {
        let handle = self.session.as_ref().ok_or_else(no_session)?;
        self.backend.view_update(handle)
    }

    pub fn view_draw(&mut self) -> Result<()> {
        let handle = self.session.as_ref().ok_or_else(no_session)?;
        self.backend.view_draw(handle)
    }

    /// Release the renderer instance, if any.
    pub fn free(&mut self) {
        if let Some(handle) = self.session.take() {
            log::debug!("Freeing renderer {}", handle.id());
            self.backend.free(handle);
        }
    }

    /// Release the renderer instance and stop every render server.
    pub fn shutdown(&mut self) {
        self.free();
        self.servers.shutdown();
    }
}

fn no_session() -> ExportError {
    ExportError::Renderer("No renderer instance".to_string())
}

impl Drop for RunCoordinator {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[derive(Default)]
    struct Recorder {
        calls: Rc<RefCell<Vec<String>>>,
        next: u64,
    }

    impl RendererBackend for Recorder {
        fn init(&mut self, init: &RendererInit) -> Result<RendererHandle> {
            self.next += 1;
            self.calls.borrow_mut().push(format!(
                "init {}",
                init.main_file.file_name().unwrap().to_string_lossy()
            ));
            Ok(RendererHandle::new(self.next))
        }

        fn update(&mut self, handle: &RendererHandle) -> Result<()> {
            self.calls.borrow_mut().push(format!("update {}", handle.id()));
            Ok(())
        }

        fn render(&mut self, handle: &RendererHandle) -> Result<()> {
            self.calls.borrow_mut().push(format!("render {}", handle.id()));
            Ok(())
        }

        fn view_update(&mut self, handle: &RendererHandle) -> Result<()> {
            self.calls.borrow_mut().push(format!("view_update {}", handle.id()));
            Ok(())
        }

        fn view_draw(&mut self, handle: &RendererHandle) -> Result<()> {
            self.calls.borrow_mut().push(format!("view_draw {}", handle.id()));
            Ok(())
        }

        fn free(&mut self, handle: RendererHandle) {
            self.calls.borrow_mut().push(format!("free {}", handle.id()));
        }
    }

    fn report() -> ExportReport {
        ExportReport {
            paths: Some(FilePaths::new("/out", "shot")),
            frames: vec![1],
            frame_range: None,
            plugins_written: 0,
            issues: Vec::new(),
        }
    }

    #[test]
    fn test_session_lifecycle() {
        let calls = Rc::new(RefCell::new(Vec::new()));
        let backend = Recorder {
            calls: calls.clone(),
            next: 0,
        };
        let config = ExporterConfig::default();
        {
            let mut run = RunCoordinator::new(Box::new(backend));
            assert!(run.update().is_err());
            run.run(&config, &report()).unwrap();
            run.view_update().unwrap();
            run.view_draw().unwrap();
            run.run(&config, &report()).unwrap();
            assert!(run.has_session());
        }
        assert_eq!(
            *calls.borrow(),
            vec![
                "init shot.vrscene",
                "render 1",
                "view_update 1",
                "view_draw 1",
                "free 1",
                "init shot.vrscene",
                "render 2",
                "free 2",
            ]
        );
    }

    #[test]
    fn test_auto_run_disabled() {
        let calls = Rc::new(RefCell::new(Vec::new()));
        let backend = Recorder {
            calls: calls.clone(),
            next: 0,
        };
        let config = ExporterConfig::default().with_auto_run(false);
        let mut run = RunCoordinator::new(Box::new(backend));
        run.run(&config, &report()).unwrap();
        assert!(!run.has_session());
        assert!(calls.borrow().is_empty());
    }

    #[test]
    fn test_zmq_without_server_is_fatal() {
        let mut config = ExporterConfig::default();
        config.backend = Backend::Zmq;
        let mut run = RunCoordinator::new(Box::new(Recorder::default()));
        assert!(matches!(
            run.run(&config, &report()),
            Err(ExportError::ServerNotFound(_))
        ));

        config.zmq_server_path = Some(PathBuf::from("/nonexistent/VRayZmqServer"));
        assert!(matches!(
            run.run(&config, &report()),
            Err(ExportError::ServerNotFound(_))
        ));
        assert!(!run.has_session());
    }

    #[test]
    fn test_standalone_command_line() {
        let backend = StandaloneBackend::new("/opt/vray/bin/vray").with_arg("-verboseLevel=3");
        let mut init = RendererInit::new(&FilePaths::new("/out", "shot"), None);
        assert_eq!(
            backend.command_args(&init),
            vec![
                "-sceneFile=/out/shot.vrscene",
                "-autoclose=1",
                "-display=0",
                "-verboseLevel=3"
            ]
        );

        init.frame_range = Some(FrameRange::new(1, 10, 1));
        assert!(backend.command_args(&init).contains(&"-frames=1-10".to_string()));
        init.frame_range = Some(FrameRange::new(1, 5, 2));
        assert!(backend.command_args(&init).contains(&"-frames=1,3,5".to_string()));
    }

    #[test]
    fn test_standalone_handles() {
        let mut backend = StandaloneBackend::new("vray");
        let init = RendererInit::new(&FilePaths::new("/out", "shot"), None);
        let handle = backend.init(&init).unwrap();
        assert!(backend.update(&handle).is_ok());
        assert!(backend.view_draw(&handle).is_err());
        let id = handle.id();
        backend.free(handle);
        assert!(backend.update(&RendererHandle::new(id)).is_err());
    }

    #[test]
    fn test_vray_path_from_config() {
        let mut config = ExporterConfig::default();
        config.vray_path = Some(PathBuf::from("/custom/vray"));
        assert_eq!(resolve_vray_path(&config), PathBuf::from("/custom/vray"));
    }

    #[test]
    fn test_vray_env_names_a_directory() {
        assert_eq!(
            binary_in("/opt/vray/bin"),
            Path::new("/opt/vray/bin").join(VRAY_BINARY)
        );
        #[cfg(not(windows))]
        assert_eq!(binary_in(":/opt/vray/bin"), PathBuf::from("/opt/vray/bin/vray"));
        #[cfg(windows)]
        assert_eq!(
            binary_in("\"C:\\V-Ray\\bin\""),
            PathBuf::from("C:\\V-Ray\\bin\\vray.exe")
        );
    }

    #[test]
    fn test_renderer_init_uses_render_node_paths() {
        let config = ExporterConfig {
            output_dir: PathBuf::from("/local/out"),
            distributed: crate::config::DistributedConfig {
                enabled: true,
                shared_dir: Some(PathBuf::from("/mnt/share")),
                network_dir: Some(PathBuf::from("/net/share")),
            },
            ..ExporterConfig::default()
        };
        let paths = FilePaths::from_config(&config, "shot");
        let init = RendererInit::new(&paths, None);
        assert_eq!(init.main_file, PathBuf::from("/net/share/shot/shot.vrscene"));
        assert_eq!(
            init.file_for(FileCategory::Geometry),
            Path::new("/net/share/shot/shot.vrscene")
        );

        let backend = StandaloneBackend::new("vray");
        assert_eq!(
            backend.command_args(&init)[0],
            "-sceneFile=/net/share/shot/shot.vrscene"
        );
    }

    #[test]
    fn test_renderer_init_files() {
        let mut paths = FilePaths::new("/out", "shot");
        paths.set_separate_files(true);
        let init = RendererInit::new(&paths, None);
        assert_eq!(
            init.file_for(FileCategory::Geometry),
            Path::new("/out/shot_geometry.vrscene")
        );
        assert_eq!(init.file_for(FileCategory::Main), init.main_file.as_path());
    }
}
