//! vrscene exporter CLI
//!
//! Export JSON scene descriptions to V-Ray scene files and render them.

use clap::{Args, Parser, Subcommand, ValueEnum};
use vrscene_exporter::config::BackendWorker;
use vrscene_exporter::{
    export_to_files, load_config, load_scene, render_scene, AnimationMode, Backend, CancelToken,
    ExporterConfig, FileCategory, RunCoordinator, SceneSource, StandaloneBackend,
};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "vrscene-exporter")]
#[command(author, version, about = "Export scenes to V-Ray .vrscene files", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Export a scene to .vrscene files
    Export {
        #[command(flatten)]
        export: ExportArgs,
    },

    /// Export a scene and render it
    Render {
        #[command(flatten)]
        export: ExportArgs,

        /// Renderer backend
        #[arg(long, value_enum, default_value = "appsdk")]
        backend: BackendArg,

        /// Render server port (zmq backend)
        #[arg(long)]
        port: Option<u16>,

        /// Render server executable (zmq backend)
        #[arg(long)]
        server: Option<PathBuf>,

        /// V-Ray standalone executable
        #[arg(long)]
        vray: Option<PathBuf>,
    },

    /// Export a scene and bundle the files into a ZIP archive
    Pack {
        #[command(flatten)]
        export: ExportArgs,

        /// Archive path
        #[arg(short, long)]
        archive: PathBuf,
    },

    /// Show information about a scene
    Info {
        /// Input JSON scene file
        #[arg(short, long)]
        scene: PathBuf,
    },
}

#[derive(Args)]
struct ExportArgs {
    /// Input JSON scene file
    #[arg(short, long)]
    scene: PathBuf,

    /// Output directory
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Exporter configuration (JSON)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Write one file per plugin category
    #[arg(long)]
    separate_files: bool,

    /// Animation mode
    #[arg(long, value_enum)]
    animation: Option<AnimationArg>,

    /// Frames per single-frame export
    #[arg(long)]
    frames_to_export: Option<u32>,

    /// Append the draft quality template
    #[arg(long)]
    draft: bool,

    /// Keep an existing geometry file and append to it
    #[arg(long)]
    no_overwrite_geometry: bool,
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
enum AnimationArg {
    /// Current frame only
    None,
    /// Export and render frame by frame
    FrameByFrame,
    /// Export the whole range, then render
    Full,
    /// One frame per loop camera
    CameraLoop,
}

impl From<AnimationArg> for AnimationMode {
    fn from(arg: AnimationArg) -> Self {
        match arg {
            AnimationArg::None => AnimationMode::None,
            AnimationArg::FrameByFrame => AnimationMode::FrameByFrame,
            AnimationArg::Full => AnimationMode::Full,
            AnimationArg::CameraLoop => AnimationMode::CameraLoop,
        }
    }
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
enum BackendArg {
    /// In-process renderer
    Appsdk,
    /// Render server over ZMQ
    Zmq,
}

impl ExportArgs {
    /// Configuration file values, overridden by flags.
    fn to_config(&self) -> Result<ExporterConfig, Box<dyn std::error::Error>> {
        let mut config = match &self.config {
            Some(path) => load_config(path)?,
            None => ExporterConfig::default(),
        };
        if let Some(dir) = &self.output_dir {
            config.output_dir = dir.clone();
        }
        if self.separate_files {
            config.separate_files = true;
        }
        if let Some(animation) = self.animation {
            config.animation_mode = animation.into();
        }
        if let Some(frames) = self.frames_to_export {
            config.frames_to_export = frames;
        }
        if self.draft {
            config.draft = true;
        }
        if self.no_overwrite_geometry {
            config.overwrite_geometry = false;
        }
        Ok(config)
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Export { export } => {
            export_scene(&export)?;
        }
        Commands::Render {
            export,
            backend,
            port,
            server,
            vray,
        } => {
            let mut config = export.to_config()?;
            config.backend = match backend {
                BackendArg::Appsdk => Backend::AppSdk,
                BackendArg::Zmq => Backend::Zmq,
            };
            config.backend_worker = BackendWorker::Local;
            if let Some(port) = port {
                config.zmq_port = port;
            }
            if server.is_some() {
                config.zmq_server_path = server;
            }
            if vray.is_some() {
                config.vray_path = vray;
            }
            render(&export.scene, &config)?;
        }
        Commands::Pack { export, archive } => {
            pack_scene(&export, &archive)?;
        }
        Commands::Info { scene } => {
            show_scene_info(&scene)?;
        }
    }

    Ok(())
}

fn export_scene(args: &ExportArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = args.to_config()?;
    println!("Loading scene from {:?}...", args.scene);
    let mut scene = load_scene(&args.scene)?;

    let report = export_to_files(&mut scene, &config, CancelToken::new())?;

    println!(
        "  Exported {} frame(s), {} plugins",
        report.frames.len(),
        report.plugins_written
    );
    if let Some(paths) = &report.paths {
        println!("Main file: {:?}", paths.main_file());
        if paths.separate_files() {
            for category in FileCategory::INCLUDE_ORDER {
                println!("  {:<8} {:?}", category.as_str(), paths.file_for(category));
            }
        }
    }
    for issue in &report.issues {
        println!("  warning: {}: {} (using {})", issue.entity, issue.message, issue.fallback);
    }

    Ok(())
}

fn render(scene_path: &PathBuf, config: &ExporterConfig) -> Result<(), Box<dyn std::error::Error>> {
    println!("Loading scene from {:?}...", scene_path);
    let mut scene = load_scene(scene_path)?;

    let backend = StandaloneBackend::from_config(config);
    println!("Renderer: {:?}", backend.executable());
    let mut run = RunCoordinator::new(Box::new(backend));

    let reports = render_scene(&mut scene, config, &mut run, CancelToken::new())?;
    println!("Rendered {} export(s)", reports.len());

    Ok(())
}

fn pack_scene(args: &ExportArgs, archive: &PathBuf) -> Result<(), Box<dyn std::error::Error>> {
    let config = args.to_config()?;
    let mut scene = load_scene(&args.scene)?;

    let report = export_to_files(&mut scene, &config, CancelToken::new())?;
    let paths = report.paths.ok_or("Nothing was exported")?;

    let files = vrscene_exporter::ExportFiles::new(paths);
    files.pack_archive(archive)?;
    println!("Packed {} file(s) into {:?}", files.file_list().len(), archive);

    Ok(())
}

fn show_scene_info(scene_path: &PathBuf) -> Result<(), Box<dyn std::error::Error>> {
    println!("Loading scene from {:?}...", scene_path);
    let scene = load_scene(scene_path)?;
    let range = scene.frame_range();

    println!("\nScene Info:");
    println!("  Name: {}", scene.name);
    println!("  Frames: {}..{} step {}", range.start, range.end, range.step);
    println!("  Meshes: {}", scene.mesh_count());
    println!("  Lights: {}", scene.light_count());
    println!("  Cameras: {}", scene.camera_count());
    println!("  Shader nodes: {}", scene.nodes.len());
    println!("  Render channels: {}", scene.channels.len());
    if let Some(camera) = scene.active_camera() {
        println!("  Active camera: {}", camera);
    }

    Ok(())
}
