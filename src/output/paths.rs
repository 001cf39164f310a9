//! Output file path policy.

use crate::config::ExporterConfig;
use crate::types::{clean_string, FileCategory};
use std::path::{Path, PathBuf};

/// File extension of every exported scene file.
pub const VRSCENE_EXT: &str = "vrscene";

/// Resolves one output path per file category.
#[derive(Debug, Clone, PartialEq)]
pub struct FilePaths {
    output_dir: PathBuf,
    base_name: String,
    separate_files: bool,
    /// Directory prefix seen by distributed render nodes.
    network_dir: Option<PathBuf>,
}

impl FilePaths {
    pub fn new(output_dir: impl Into<PathBuf>, base_name: &str) -> Self {
        Self {
            output_dir: output_dir.into(),
            base_name: clean_string(base_name),
            separate_files: false,
            network_dir: None,
        }
    }

    pub fn set_separate_files(&mut self, separate: bool) {
        self.separate_files = separate;
    }

    /// Resolve paths from the exporter configuration.
    ///
    /// The user's split-file choice is kept unless distributed rendering with
    /// a shared directory is enabled: then the scene is written as one file
    /// under `<shared_dir>/<base_name>/`.
    pub fn from_config(config: &ExporterConfig, scene_name: &str) -> Self {
        let base = config.scene_name.as_deref().unwrap_or(scene_name);
        let mut paths = Self::new(&config.output_dir, base);
        paths.set_separate_files(config.separate_files);

        let dr = &config.distributed;
        if dr.enabled {
            if let Some(shared) = &dr.shared_dir {
                paths.output_dir = shared.join(&paths.base_name);
                paths.separate_files = false;
                paths.network_dir = dr
                    .network_dir
                    .as_ref()
                    .map(|network| network.join(&paths.base_name));
            }
        }
        paths
    }

    pub fn separate_files(&self) -> bool {
        self.separate_files
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn base_name(&self) -> &str {
        &self.base_name
    }

    pub fn main_file(&self) -> PathBuf {
        self.output_dir
            .join(format!("{}.{}", self.base_name, VRSCENE_EXT))
    }

    /// Target file of a category. Every category maps to MAIN in unified mode.
    pub fn file_for(&self, category: FileCategory) -> PathBuf {
        match category.file_suffix() {
            Some(suffix) if self.separate_files => self.output_dir.join(format!(
                "{}_{}.{}",
                self.base_name, suffix, VRSCENE_EXT
            )),
            _ => self.main_file(),
        }
    }

    /// The path render nodes use for a local output path.
    pub fn render_path(&self, local: &Path) -> PathBuf {
        match (&self.network_dir, local.strip_prefix(&self.output_dir)) {
            (Some(network), Ok(relative)) => network.join(relative),
            _ => local.to_path_buf(),
        }
    }

    pub fn log_info(&self) {
        log::debug!("Output directory: {:?}", self.output_dir);
        log::debug!("Separate files: {}", self.separate_files);
        for category in FileCategory::ALL {
            log::debug!("  {:<8} -> {:?}", category.as_str(), self.file_for(category));
        }
        if let Some(network) = &self.network_dir {
            log::debug!("Render nodes read from: {:?}", network);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DistributedConfig;

    #[test]
    fn test_unified_paths_alias_main() {
        let paths = FilePaths::new("/out", "my scene");
        assert_eq!(paths.main_file(), PathBuf::from("/out/my_scene.vrscene"));
        for category in FileCategory::ALL {
            assert_eq!(paths.file_for(category), paths.main_file());
        }
    }

    #[test]
    fn test_split_paths_are_distinct() {
        let mut paths = FilePaths::new("/out", "shot");
        paths.set_separate_files(true);
        assert_eq!(
            paths.file_for(FileCategory::Geometry),
            PathBuf::from("/out/shot_geometry.vrscene")
        );
        assert_eq!(paths.file_for(FileCategory::Main), paths.main_file());

        let mut all: Vec<PathBuf> = FileCategory::ALL.iter().map(|c| paths.file_for(*c)).collect();
        all.sort();
        all.dedup();
        assert_eq!(all.len(), FileCategory::ALL.len());
    }

    #[test]
    fn test_distributed_remaps_and_forces_single_file() {
        let config = ExporterConfig {
            separate_files: true,
            output_dir: PathBuf::from("/local/out"),
            distributed: DistributedConfig {
                enabled: true,
                shared_dir: Some(PathBuf::from("/mnt/share")),
                network_dir: Some(PathBuf::from("//server/share")),
            },
            ..ExporterConfig::default()
        };
        let paths = FilePaths::from_config(&config, "shot");
        assert!(!paths.separate_files());
        assert_eq!(paths.main_file(), PathBuf::from("/mnt/share/shot/shot.vrscene"));
        assert_eq!(
            paths.render_path(&paths.main_file()),
            PathBuf::from("//server/share/shot/shot.vrscene")
        );
        assert_eq!(
            paths.render_path(Path::new("/elsewhere/x.png")),
            PathBuf::from("/elsewhere/x.png")
        );
    }

    #[test]
    fn test_config_scene_name_overrides() {
        let config = ExporterConfig {
            scene_name: Some("override".to_string()),
            output_dir: PathBuf::from("/o"),
            ..ExporterConfig::default()
        };
        let paths = FilePaths::from_config(&config, "scene");
        assert_eq!(paths.main_file(), PathBuf::from("/o/override.vrscene"));
    }
}
