//! Multi-stream output file manager.

use super::paths::FilePaths;
use crate::error::{ExportError, Result};
use crate::types::FileCategory;
use std::collections::HashSet;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Read, Write};
use std::path::{Path, PathBuf};

/// One distinct output file.
#[derive(Debug)]
struct Stream {
    path: PathBuf,
    writer: Option<BufWriter<File>>,
    /// Opened for append because it already held exported geometry.
    reused: bool,
}

/// Owns the output streams of one export and routes writes by category.
#[derive(Debug)]
pub struct ExportFiles {
    paths: FilePaths,
    overwrite_geometry: bool,
    streams: Vec<Stream>,
    /// Stream index per category, indexed by `FileCategory::index`.
    routes: [usize; 8],
    initialized: bool,
    includes_written: bool,
    reused_geometry: HashSet<String>,
}

impl ExportFiles {
    pub fn new(paths: FilePaths) -> Self {
        Self {
            paths,
            overwrite_geometry: true,
            streams: Vec::new(),
            routes: [0; 8],
            initialized: false,
            includes_written: false,
            reused_geometry: HashSet::new(),
        }
    }

    pub fn set_overwrite_geometry(&mut self, overwrite: bool) {
        self.overwrite_geometry = overwrite;
    }

    pub fn paths(&self) -> &FilePaths {
        &self.paths
    }

    /// Open or create every distinct target file.
    ///
    /// Files are truncated, except a separate geometry file that already holds
    /// exported plugins while geometry overwriting is disabled: that one is
    /// opened for append and its plugin names are remembered. On failure every
    /// stream opened so far is released and nothing has been written.
    pub fn init(&mut self) -> Result<()> {
        self.close_files()?;
        self.initialized = false;
        self.streams.clear();
        self.reused_geometry.clear();
        self.includes_written = false;

        let dir = self.paths.output_dir().to_path_buf();
        std::fs::create_dir_all(&dir).map_err(|source| ExportError::FileInit {
            path: dir.clone(),
            source,
        })?;

        for category in FileCategory::ALL {
            let path = self.paths.file_for(category);
            if let Some(index) = self.streams.iter().position(|s| s.path == path) {
                self.routes[category.index()] = index;
                continue;
            }

            let reuse = category == FileCategory::Geometry
                && self.paths.separate_files()
                && !self.overwrite_geometry
                && has_content(&path);

            let opened = if reuse {
                scan_plugin_names(&path).and_then(|names| {
                    self.reused_geometry = names;
                    OpenOptions::new().append(true).open(&path)
                })
            } else {
                File::create(&path)
            };

            let file = match opened {
                Ok(file) => file,
                Err(source) => {
                    self.streams.clear();
                    return Err(ExportError::FileInit { path, source });
                }
            };

            if reuse {
                log::info!(
                    "Reusing geometry file {:?} ({} plugins)",
                    path,
                    self.reused_geometry.len()
                );
            }

            self.routes[category.index()] = self.streams.len();
            self.streams.push(Stream {
                path,
                writer: Some(BufWriter::new(file)),
                reused: reuse,
            });
        }

        self.initialized = true;
        Ok(())
    }

    pub fn is_open(&self) -> bool {
        self.initialized && self.streams.iter().any(|s| s.writer.is_some())
    }

    /// Path written for a category.
    pub fn file_for(&self, category: FileCategory) -> PathBuf {
        self.paths.file_for(category)
    }

    /// Whether the geometry stream was reused instead of truncated.
    pub fn geometry_reused(&self) -> bool {
        self.streams
            .get(self.routes[FileCategory::Geometry.index()])
            .map_or(false, |s| s.reused)
    }

    /// Plugin names already present in a reused geometry file.
    pub fn reused_geometry(&self) -> &HashSet<String> {
        &self.reused_geometry
    }

    /// Append text to a category's stream.
    pub fn write(&mut self, category: FileCategory, text: &str) -> Result<()> {
        if !self.initialized {
            return Err(ExportError::UnknownCategory(category.as_str().to_string()));
        }
        let stream = self
            .streams
            .get_mut(self.routes[category.index()])
            .ok_or_else(|| ExportError::UnknownCategory(category.as_str().to_string()))?;
        let writer = stream
            .writer
            .as_mut()
            .ok_or_else(|| ExportError::Export(format!("{:?} is closed", stream.path)))?;
        writer.write_all(text.as_bytes())?;
        Ok(())
    }

    /// Write `#include` directives for every other category file into MAIN.
    /// Does nothing in unified mode; runs at most once per init.
    pub fn write_includes(&mut self) -> Result<()> {
        if !self.initialized || self.includes_written || !self.paths.separate_files() {
            return Ok(());
        }
        let mut text = String::from("\n// Scene files\n");
        for category in FileCategory::INCLUDE_ORDER {
            let path = self.paths.file_for(category);
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            text.push_str(&format!("#include \"{}\"\n", name));
        }
        self.write(FileCategory::Main, &text)?;
        self.includes_written = true;
        Ok(())
    }

    /// Flush and release every stream. Safe to call repeatedly.
    pub fn close_files(&mut self) -> Result<()> {
        let mut first_error = None;
        for stream in &mut self.streams {
            if let Some(mut writer) = stream.writer.take() {
                if let Err(e) = writer.flush() {
                    log::error!("Failed to flush {:?}: {}", stream.path, e);
                    first_error.get_or_insert(e);
                }
            }
        }
        match first_error {
            Some(e) => Err(e.into()),
            None => Ok(()),
        }
    }

    /// Distinct files of the set, MAIN first.
    pub fn file_list(&self) -> Vec<PathBuf> {
        let mut files: Vec<PathBuf> = Vec::new();
        for category in FileCategory::ALL {
            let path = self.paths.file_for(category);
            if !files.contains(&path) {
                files.push(path);
            }
        }
        files
    }

    /// Bundle the closed file set into a ZIP archive for transfer to render nodes.
    pub fn pack_archive(&self, archive: &Path) -> Result<()> {
        if self.streams.iter().any(|s| s.writer.is_some()) {
            return Err(ExportError::Export(
                "Cannot pack files that are still open".to_string(),
            ));
        }

        let file = File::create(archive)?;
        let mut zip = zip::ZipWriter::new(file);
        let options = zip::write::SimpleFileOptions::default()
            .compression_method(zip::CompressionMethod::Stored);

        for path in self.file_list() {
            if !path.exists() {
                continue;
            }
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            zip.start_file(name, options)?;
            let data = std::fs::read(&path)?;
            zip.write_all(&data)?;
        }
        zip.finish()?;
        Ok(())
    }
}

impl Drop for ExportFiles {
    fn drop(&mut self) {
        let _ = self.close_files();
    }
}

fn has_content(path: &Path) -> bool {
    std::fs::metadata(path).map_or(false, |m| m.is_file() && m.len() > 0)
}

/// Collect names of plugin blocks (`<Type> <name> {`) in an existing file.
fn scan_plugin_names(path: &Path) -> std::io::Result<HashSet<String>> {
    let mut content = String::new();
    File::open(path)?.read_to_string(&mut content)?;
    Ok(content
        .lines()
        .filter(|line| {
            !line.starts_with(|c: char| c.is_whitespace() || c == '/' || c == '#')
                && line.trim_end().ends_with('{')
        })
        .filter_map(|line| line.split_whitespace().nth(1))
        .map(str::to_string)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn split_paths(dir: &Path) -> FilePaths {
        let mut paths = FilePaths::new(dir, "scene");
        paths.set_separate_files(true);
        paths
    }

    #[test]
    fn test_unified_writes_in_call_order() {
        let dir = tempfile::tempdir().unwrap();
        let mut files = ExportFiles::new(FilePaths::new(dir.path(), "scene"));
        files.init().unwrap();
        files.write(FileCategory::Texture, "tex\n").unwrap();
        files.write(FileCategory::Material, "mtl\n").unwrap();
        files.write(FileCategory::Main, "main\n").unwrap();
        files.write_includes().unwrap();
        files.close_files().unwrap();

        assert_eq!(files.file_list().len(), 1);
        let content = std::fs::read_to_string(files.file_for(FileCategory::Main)).unwrap();
        assert_eq!(content, "tex\nmtl\nmain\n");
    }

    #[test]
    fn test_split_routes_by_category() {
        let dir = tempfile::tempdir().unwrap();
        let mut files = ExportFiles::new(split_paths(dir.path()));
        files.init().unwrap();
        files.write(FileCategory::Light, "light\n").unwrap();
        files.write(FileCategory::Geometry, "geom\n").unwrap();
        files.close_files().unwrap();

        let light = std::fs::read_to_string(files.file_for(FileCategory::Light)).unwrap();
        let geom = std::fs::read_to_string(files.file_for(FileCategory::Geometry)).unwrap();
        assert_eq!(light, "light\n");
        assert_eq!(geom, "geom\n");
        assert_eq!(files.file_list().len(), 8);
    }

    #[test]
    fn test_includes_listed_once_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let mut files = ExportFiles::new(split_paths(dir.path()));
        files.init().unwrap();
        files.write_includes().unwrap();
        files.write_includes().unwrap();
        files.close_files().unwrap();

        let main = std::fs::read_to_string(files.file_for(FileCategory::Main)).unwrap();
        let includes: Vec<&str> = main.lines().filter(|l| l.starts_with("#include")).collect();
        assert_eq!(
            includes,
            vec![
                "#include \"scene_nodes.vrscene\"",
                "#include \"scene_environment.vrscene\"",
                "#include \"scene_geometry.vrscene\"",
                "#include \"scene_lights.vrscene\"",
                "#include \"scene_materials.vrscene\"",
                "#include \"scene_textures.vrscene\"",
                "#include \"scene_camera.vrscene\"",
            ]
        );
    }

    #[test]
    fn test_geometry_reused_when_not_overwriting() {
        let dir = tempfile::tempdir().unwrap();
        let paths = split_paths(dir.path());
        std::fs::write(
            paths.file_for(FileCategory::Geometry),
            "\nGeomStaticMesh MEold {\n\tfaces=ListInt(0, 1, 2);\n}\n",
        )
        .unwrap();
        std::fs::write(paths.file_for(FileCategory::Light), "stale").unwrap();

        let mut files = ExportFiles::new(paths);
        files.set_overwrite_geometry(false);
        files.init().unwrap();
        assert!(files.geometry_reused());
        assert!(files.reused_geometry().contains("MEold"));
        files.write(FileCategory::Geometry, "new\n").unwrap();
        files.close_files().unwrap();

        let geom = std::fs::read_to_string(files.file_for(FileCategory::Geometry)).unwrap();
        assert!(geom.starts_with("\nGeomStaticMesh MEold {"));
        assert!(geom.ends_with("new\n"));
        let light = std::fs::read_to_string(files.file_for(FileCategory::Light)).unwrap();
        assert!(light.is_empty());
    }

    #[test]
    fn test_geometry_truncated_when_overwriting() {
        let dir = tempfile::tempdir().unwrap();
        let paths = split_paths(dir.path());
        std::fs::write(paths.file_for(FileCategory::Geometry), "old").unwrap();

        let mut files = ExportFiles::new(paths);
        files.init().unwrap();
        assert!(!files.geometry_reused());
        files.close_files().unwrap();
        let geom = std::fs::read_to_string(files.file_for(FileCategory::Geometry)).unwrap();
        assert!(geom.is_empty());
    }

    #[test]
    fn test_init_failure_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("not_a_dir");
        std::fs::write(&blocker, "file").unwrap();

        let mut files = ExportFiles::new(FilePaths::new(blocker.join("sub"), "scene"));
        let err = files.init().unwrap_err();
        assert!(matches!(err, ExportError::FileInit { .. }));
        assert!(!files.is_open());
        assert!(files.write(FileCategory::Main, "x").is_err());
    }

    #[test]
    fn test_write_after_close_fails() {
        let dir = tempfile::tempdir().unwrap();
        let mut files = ExportFiles::new(FilePaths::new(dir.path(), "scene"));
        files.init().unwrap();
        files.close_files().unwrap();
        files.close_files().unwrap();
        assert!(files.write(FileCategory::Main, "x").is_err());
    }

    #[test]
    fn test_pack_archive() {
        let dir = tempfile::tempdir().unwrap();
        let mut files = ExportFiles::new(split_paths(dir.path()));
        files.init().unwrap();
        files.write(FileCategory::Main, "main").unwrap();

        let archive = dir.path().join("bundle.zip");
        assert!(files.pack_archive(&archive).is_err());

        files.close_files().unwrap();
        files.pack_archive(&archive).unwrap();

        let reader = std::fs::File::open(&archive).unwrap();
        let mut zip = zip::ZipArchive::new(reader).unwrap();
        assert_eq!(zip.len(), 8);
        let mut main = String::new();
        zip.by_name("scene.vrscene")
            .unwrap()
            .read_to_string(&mut main)
            .unwrap();
        assert_eq!(main, "main");
    }
}
