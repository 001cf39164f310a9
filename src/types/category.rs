//! Plugin kinds and the output file categories they are routed to.

use serde::{Deserialize, Serialize};

/// The renderer-native classification of a plugin description.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PluginKind {
    Brdf,
    Material,
    Texture,
    Light,
    Geometry,
    UvwGen,
    Effect,
    RenderChannel,
    Camera,
    Object,
    World,
    Settings,
}

impl PluginKind {
    /// All plugin kinds.
    pub const ALL: [PluginKind; 12] = [
        PluginKind::Brdf,
        PluginKind::Material,
        PluginKind::Texture,
        PluginKind::Light,
        PluginKind::Geometry,
        PluginKind::UvwGen,
        PluginKind::Effect,
        PluginKind::RenderChannel,
        PluginKind::Camera,
        PluginKind::Object,
        PluginKind::World,
        PluginKind::Settings,
    ];

    /// The output stream a plugin of this kind is written to.
    pub fn file_category(&self) -> FileCategory {
        match self {
            PluginKind::Brdf | PluginKind::Material => FileCategory::Material,
            PluginKind::Texture | PluginKind::UvwGen => FileCategory::Texture,
            PluginKind::Light => FileCategory::Light,
            PluginKind::Geometry => FileCategory::Geometry,
            PluginKind::Effect | PluginKind::World => FileCategory::World,
            PluginKind::Camera => FileCategory::Camera,
            PluginKind::Object => FileCategory::Object,
            PluginKind::RenderChannel | PluginKind::Settings => FileCategory::Main,
        }
    }

    /// Prefix used when deriving plugin names from scene data names.
    pub fn name_prefix(&self) -> Option<&'static str> {
        match self {
            PluginKind::Brdf => Some("BRDF"),
            PluginKind::Material => Some("MA"),
            PluginKind::Texture => Some("TE"),
            PluginKind::Light => Some("LA"),
            PluginKind::Geometry => Some("ME"),
            PluginKind::UvwGen => Some("UV"),
            PluginKind::Effect => Some("EF"),
            PluginKind::RenderChannel => Some("RC"),
            PluginKind::Camera => Some("CA"),
            PluginKind::Object => Some("OB"),
            PluginKind::World => Some("WO"),
            PluginKind::Settings => None,
        }
    }
}

/// A named output stream of the exported file set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum FileCategory {
    Main,
    Object,
    World,
    Geometry,
    Light,
    Material,
    Texture,
    Camera,
}

impl FileCategory {
    /// All categories, MAIN first.
    pub const ALL: [FileCategory; 8] = [
        FileCategory::Main,
        FileCategory::Object,
        FileCategory::World,
        FileCategory::Geometry,
        FileCategory::Light,
        FileCategory::Material,
        FileCategory::Texture,
        FileCategory::Camera,
    ];

    /// Order in which MAIN includes the other category files.
    pub const INCLUDE_ORDER: [FileCategory; 7] = [
        FileCategory::Object,
        FileCategory::World,
        FileCategory::Geometry,
        FileCategory::Light,
        FileCategory::Material,
        FileCategory::Texture,
        FileCategory::Camera,
    ];

    /// Suffix appended to the scene base name in split-file mode.
    pub fn file_suffix(&self) -> Option<&'static str> {
        match self {
            FileCategory::Main => None,
            FileCategory::Object => Some("nodes"),
            FileCategory::World => Some("environment"),
            FileCategory::Geometry => Some("geometry"),
            FileCategory::Light => Some("lights"),
            FileCategory::Material => Some("materials"),
            FileCategory::Texture => Some("textures"),
            FileCategory::Camera => Some("camera"),
        }
    }

    /// Upper-case tag, as used in log messages.
    pub fn as_str(&self) -> &'static str {
        match self {
            FileCategory::Main => "MAIN",
            FileCategory::Object => "OBJECT",
            FileCategory::World => "WORLD",
            FileCategory::Geometry => "GEOMETRY",
            FileCategory::Light => "LIGHT",
            FileCategory::Material => "MATERIAL",
            FileCategory::Texture => "TEXTURE",
            FileCategory::Camera => "CAMERA",
        }
    }

    pub(crate) fn index(&self) -> usize {
        *self as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_kind_routes_to_a_category() {
        for kind in PluginKind::ALL {
            let category = kind.file_category();
            assert!(FileCategory::ALL.contains(&category));
        }
        assert_eq!(PluginKind::UvwGen.file_category(), FileCategory::Texture);
        assert_eq!(PluginKind::Brdf.file_category(), FileCategory::Material);
        assert_eq!(PluginKind::Settings.file_category(), FileCategory::Main);
    }

    #[test]
    fn test_include_order_excludes_main() {
        assert!(!FileCategory::INCLUDE_ORDER.contains(&FileCategory::Main));
        for category in FileCategory::INCLUDE_ORDER {
            assert!(category.file_suffix().is_some());
        }
    }

    #[test]
    fn test_kind_serde_names() {
        let kind: PluginKind = serde_json::from_str("\"UVWGEN\"").unwrap();
        assert_eq!(kind, PluginKind::UvwGen);
        let kind: PluginKind = serde_json::from_str("\"RENDERCHANNEL\"").unwrap();
        assert_eq!(kind, PluginKind::RenderChannel);
    }
}
