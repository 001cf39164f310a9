//! Plugin writer: the single output handle of an export run.

use super::files::ExportFiles;
use crate::error::{ExportError, Result};
use crate::types::{FileCategory, FrameRange, PluginDesc};

/// Formats plugin descriptions and routes them to the file manager.
///
/// In animation mode every animatable value is tagged with the current frame.
#[derive(Debug, Default)]
pub struct PluginWriter {
    files: Option<ExportFiles>,
    animation: bool,
    frame_current: i32,
    frame_range: Option<FrameRange>,
    preview: bool,
    plugins_written: usize,
}

impl PluginWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_file_manager(&mut self, files: ExportFiles) {
        self.files = Some(files);
    }

    pub fn files(&self) -> Option<&ExportFiles> {
        self.files.as_ref()
    }

    pub fn files_mut(&mut self) -> Option<&mut ExportFiles> {
        self.files.as_mut()
    }

    pub fn take_files(&mut self) -> Option<ExportFiles> {
        self.files.take()
    }

    pub fn set_animation(&mut self, animation: bool) {
        self.animation = animation;
    }

    pub fn is_animation(&self) -> bool {
        self.animation
    }

    pub fn set_frame(&mut self, frame: i32) {
        self.frame_current = frame;
    }

    pub fn frame_current(&self) -> i32 {
        self.frame_current
    }

    /// Frame range handed to the renderer for animated exports.
    pub fn set_frame_range(&mut self, range: Option<FrameRange>) {
        self.frame_range = range;
    }

    pub fn frame_range(&self) -> Option<FrameRange> {
        self.frame_range
    }

    pub fn set_preview(&mut self, preview: bool) {
        self.preview = preview;
    }

    pub fn is_preview(&self) -> bool {
        self.preview
    }

    pub fn plugins_written(&self) -> usize {
        self.plugins_written
    }

    /// Write raw text to a category's stream.
    pub fn write(&mut self, category: FileCategory, text: &str) -> Result<()> {
        self.files
            .as_mut()
            .ok_or_else(|| ExportError::Export("No output files set".to_string()))?
            .write(category, text)
    }

    /// Serialize a plugin description into the stream of its kind.
    pub fn write_plugin(&mut self, desc: &PluginDesc) -> Result<()> {
        let frame = self.animation.then_some(self.frame_current);
        let text = desc.to_text(frame);
        self.write(desc.kind.file_category(), &text)?;
        self.plugins_written += 1;
        Ok(())
    }

    /// Finalize the file set: includes into MAIN, then close every stream.
    /// The streams are closed even if writing the includes fails.
    pub fn done(&mut self) -> Result<()> {
        let Some(files) = self.files.as_mut() else {
            return Ok(());
        };
        let includes = files.write_includes();
        let closed = files.close_files();
        includes.and(closed)
    }
}
