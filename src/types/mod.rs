//! Shared types used throughout the library.

mod category;
mod value;

pub use category::{FileCategory, PluginKind};
pub use value::{AttrValue, PluginRef};

use serde::{Deserialize, Serialize};
use std::fmt::Write;
use std::path::Path;

/// An inclusive frame range with a step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameRange {
    pub start: i32,
    pub end: i32,
    pub step: i32,
}

impl FrameRange {
    pub fn new(start: i32, end: i32, step: i32) -> Self {
        Self { start, end, step }
    }

    /// A single frame.
    pub fn single(frame: i32) -> Self {
        Self::new(frame, frame, 1)
    }

    /// Iterate `start, start + step, ...` up to and including `end`.
    /// Non-positive steps are treated as 1.
    pub fn frames(&self) -> impl Iterator<Item = i32> {
        let step = self.step.max(1) as usize;
        (self.start..=self.end).step_by(step)
    }

    /// Number of frames the range visits.
    pub fn len(&self) -> usize {
        self.frames().count()
    }

    pub fn is_empty(&self) -> bool {
        self.end < self.start
    }
}

impl Default for FrameRange {
    fn default() -> Self {
        Self::new(1, 250, 1)
    }
}

/// Restrict a name to `[A-Za-z0-9_]`.
///
/// `+` and `-` become `p` and `m` so signed suffixes stay distinct.
pub fn clean_string(s: &str) -> String {
    s.chars()
        .map(|c| match c {
            '+' => 'p',
            '-' => 'm',
            c if c.is_ascii_alphanumeric() => c,
            _ => '_',
        })
        .collect()
}

/// Derive a stable plugin name from a scene data name.
///
/// Data linked from a library file gets the library file name appended, so
/// equally named data from different files do not collide.
pub fn plugin_name(prefix: Option<&str>, name: &str, library: Option<&str>) -> String {
    let mut full = String::with_capacity(name.len() + 8);
    if let Some(prefix) = prefix {
        full.push_str(prefix);
    }
    full.push_str(name);
    if let Some(library) = library {
        let file = Path::new(library)
            .file_name()
            .map(|f| f.to_string_lossy().into_owned())
            .unwrap_or_else(|| library.to_string());
        full.push('_');
        full.push_str(&file);
    }
    clean_string(&full)
}

/// A renderer-native entity: a named, typed record of attributes.
#[derive(Debug, Clone, PartialEq)]
pub struct PluginDesc {
    /// Renderer plugin type, e.g. `BRDFDiffuse`.
    pub id: String,
    /// Unique plugin instance name.
    pub name: String,
    pub kind: PluginKind,
    /// Attributes in insertion order.
    pub attrs: Vec<(String, AttrValue)>,
}

impl PluginDesc {
    pub fn new(id: impl Into<String>, name: impl Into<String>, kind: PluginKind) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            kind,
            attrs: Vec::new(),
        }
    }

    /// Builder form of [`set`](PluginDesc::set).
    pub fn with(mut self, key: &str, value: impl Into<AttrValue>) -> Self {
        self.set(key, value);
        self
    }

    /// Set an attribute, replacing an existing value in place.
    pub fn set(&mut self, key: &str, value: impl Into<AttrValue>) {
        let value = value.into();
        match self.attrs.iter_mut().find(|(k, _)| k == key) {
            Some(slot) => slot.1 = value,
            None => self.attrs.push((key.to_string(), value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&AttrValue> {
        self.attrs.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    /// Names of every plugin referenced by this description.
    pub fn references(&self) -> Vec<&str> {
        self.attrs.iter().flat_map(|(_, v)| v.references()).collect()
    }

    /// Serialize the plugin block. With a frame, values are interpolation-tagged.
    pub fn write_to(&self, out: &mut String, frame: Option<i32>) {
        writeln!(out).unwrap();
        writeln!(out, "{} {} {{", self.id, self.name).unwrap();
        for (key, value) in &self.attrs {
            write!(out, "\t{}=", key).unwrap();
            value.write_at_frame(out, frame);
            out.push_str(";\n");
        }
        writeln!(out, "}}").unwrap();
    }

    pub fn to_text(&self, frame: Option<i32>) -> String {
        let mut out = String::new();
        self.write_to(&mut out, frame);
        out
    }
}
