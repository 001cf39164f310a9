//! Typed plugin attribute values and their textual form.

use glam::Mat4;
use std::fmt::Write;

/// A reference to another plugin, optionally to one of its output sockets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluginRef {
    pub plugin: String,
    pub output: Option<String>,
}

impl PluginRef {
    pub fn new(plugin: impl Into<String>) -> Self {
        Self {
            plugin: plugin.into(),
            output: None,
        }
    }

    pub fn with_output(mut self, output: impl Into<String>) -> Self {
        self.output = Some(output.into());
        self
    }
}

/// A single attribute value of a plugin description.
#[derive(Debug, Clone, PartialEq)]
pub enum AttrValue {
    Bool(bool),
    Int(i64),
    Float(f32),
    Color([f32; 3]),
    Vector([f32; 3]),
    Transform(Mat4),
    /// Passed through verbatim, except the literals `True`/`False`.
    String(String),
    /// Written in double quotes (file paths, channel names).
    Quoted(String),
    Ref(PluginRef),
    IntList(Vec<i64>),
    FloatList(Vec<f32>),
    VectorList(Vec<[f32; 3]>),
    RefList(Vec<PluginRef>),
}

impl AttrValue {
    /// Whether the value is wrapped in an interpolation tag in animated streams.
    pub fn is_animatable(&self) -> bool {
        !matches!(self, AttrValue::String(_) | AttrValue::Quoted(_))
    }

    /// Names of all plugins this value references.
    pub fn references(&self) -> Vec<&str> {
        match self {
            AttrValue::Ref(r) => vec![r.plugin.as_str()],
            AttrValue::RefList(refs) => refs.iter().map(|r| r.plugin.as_str()).collect(),
            _ => Vec::new(),
        }
    }

    /// Append the textual form of this value.
    pub fn write_to(&self, out: &mut String) {
        match self {
            AttrValue::Bool(b) => out.push(if *b { '1' } else { '0' }),
            AttrValue::Int(i) => write!(out, "{}", i).unwrap(),
            AttrValue::Float(f) => write_float(out, *f),
            AttrValue::Color(c) => write_triple(out, "Color", c),
            AttrValue::Vector(v) => write_triple(out, "Vector", v),
            AttrValue::Transform(m) => write_transform(out, m),
            AttrValue::String(s) => match s.as_str() {
                "True" => out.push('1'),
                "False" => out.push('0'),
                _ => out.push_str(s),
            },
            AttrValue::Quoted(s) => {
                out.push('"');
                for c in s.chars() {
                    match c {
                        '"' => out.push_str("\\\""),
                        '\\' => out.push_str("\\\\"),
                        _ => out.push(c),
                    }
                }
                out.push('"');
            }
            AttrValue::Ref(r) => write_ref(out, r),
            AttrValue::IntList(items) => {
                out.push_str("ListInt(");
                write_list(out, items, |i, s| write!(s, "{}", i).unwrap());
                out.push(')');
            }
            AttrValue::FloatList(items) => {
                out.push_str("ListFloat(");
                write_list(out, items, |f, s| write_float(s, *f));
                out.push(')');
            }
            AttrValue::VectorList(items) => {
                out.push_str("ListVector(");
                write_list(out, items, |v, s| write_triple(s, "Vector", v));
                out.push(')');
            }
            AttrValue::RefList(items) => {
                out.push_str("List(");
                write_list(out, items, |r, s| write_ref(s, r));
                out.push(')');
            }
        }
    }

    /// Append the value, wrapped in `interpolate((frame, value))` when a frame is given.
    pub fn write_at_frame(&self, out: &mut String, frame: Option<i32>) {
        match frame {
            Some(frame) if self.is_animatable() => {
                write!(out, "interpolate(({}, ", frame).unwrap();
                self.write_to(out);
                out.push_str("))");
            }
            _ => self.write_to(out),
        }
    }

    /// The textual form as an owned string.
    pub fn to_text(&self) -> String {
        let mut s = String::new();
        self.write_to(&mut s);
        s
    }
}

fn write_float(out: &mut String, f: f32) {
    write!(out, "{:.6}", f).unwrap();
}

fn write_triple(out: &mut String, ctor: &str, v: &[f32; 3]) {
    write!(out, "{}({:.6}, {:.6}, {:.6})", ctor, v[0], v[1], v[2]).unwrap();
}

fn write_ref(out: &mut String, r: &PluginRef) {
    out.push_str(&r.plugin);
    if let Some(output) = &r.output {
        out.push_str("::");
        out.push_str(output);
    }
}

/// Matrix-plus-offset form: three basis vectors, then the translation.
fn write_transform(out: &mut String, m: &Mat4) {
    let x = m.x_axis;
    let y = m.y_axis;
    let z = m.z_axis;
    let w = m.w_axis;
    write!(
        out,
        "Transform(Matrix(Vector({:.6}, {:.6}, {:.6}), Vector({:.6}, {:.6}, {:.6}), Vector({:.6}, {:.6}, {:.6})), Vector({:.6}, {:.6}, {:.6}))",
        x.x, x.y, x.z, y.x, y.y, y.z, z.x, z.y, z.z, w.x, w.y, w.z
    )
    .unwrap();
}

fn write_list<T, F>(out: &mut String, items: &[T], mut fmt: F)
where
    F: FnMut(&T, &mut String),
{
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        fmt(item, out);
    }
}

impl From<bool> for AttrValue {
    fn from(v: bool) -> Self {
        AttrValue::Bool(v)
    }
}

impl From<i64> for AttrValue {
    fn from(v: i64) -> Self {
        AttrValue::Int(v)
    }
}

impl From<i32> for AttrValue {
    fn from(v: i32) -> Self {
        AttrValue::Int(v as i64)
    }
}

impl From<f32> for AttrValue {
    fn from(v: f32) -> Self {
        AttrValue::Float(v)
    }
}

impl From<Mat4> for AttrValue {
    fn from(v: Mat4) -> Self {
        AttrValue::Transform(v)
    }
}

impl From<PluginRef> for AttrValue {
    fn from(v: PluginRef) -> Self {
        AttrValue::Ref(v)
    }
}
