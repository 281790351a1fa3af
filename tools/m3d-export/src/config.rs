//! Export configuration (m3d.toml)
//!
//! Every key is optional; a missing file section falls back to its defaults.
//!
//! ```toml
//! [vertex]
//! attributes = ["POSITION", "NORMAL", "TEXTURE"]   # or "POSITION+NORMAL+TEXTURE"
//! flip_v = false
//!
//! [animation]
//! frame_rate = 30.0
//!
//! [validation]
//! strict = true
//!
//! [output]
//! path = "scene.m3d"
//! ```

use anyhow::{Context, Result};
use m3d_common::{parse_attribute_list, VertexAttribute};
use serde::{Deserialize, Deserializer, Serialize};
use std::path::{Path, PathBuf};

/// Default sample rate when importing timed animation (frames per second)
pub const DEFAULT_FRAME_RATE: f32 = 30.0;

/// Root configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExportConfig {
    #[serde(default)]
    pub vertex: VertexConfig,
    #[serde(default)]
    pub animation: AnimationConfig,
    #[serde(default)]
    pub validation: ValidationConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VertexConfig {
    /// Attribute set override; takes precedence over the scene's active group
    #[serde(default, deserialize_with = "deserialize_attributes")]
    pub attributes: Option<Vec<VertexAttribute>>,
    /// Store `1 - v` instead of `v`
    #[serde(default)]
    pub flip_v: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnimationConfig {
    #[serde(default = "default_frame_rate")]
    pub frame_rate: f32,
}

impl Default for AnimationConfig {
    fn default() -> Self {
        Self {
            frame_rate: DEFAULT_FRAME_RATE,
        }
    }
}

fn default_frame_rate() -> f32 {
    DEFAULT_FRAME_RATE
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationConfig {
    /// Fail on unresolved references instead of writing 0xFFFF
    #[serde(default = "default_strict")]
    pub strict: bool,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self { strict: true }
    }
}

fn default_strict() -> bool {
    true
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OutputConfig {
    #[serde(default)]
    pub path: Option<PathBuf>,
}

/// Attribute lists are accepted as a TOML array or a single `A+B+C` string
fn deserialize_attributes<'de, D>(deserializer: D) -> Result<Option<Vec<VertexAttribute>>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum AttributeList {
        List(Vec<VertexAttribute>),
        Packed(String),
    }

    match Option::<AttributeList>::deserialize(deserializer)? {
        None => Ok(None),
        Some(AttributeList::List(list)) => Ok(Some(list)),
        Some(AttributeList::Packed(s)) => parse_attribute_list(&s)
            .map(Some)
            .ok_or_else(|| serde::de::Error::custom(format!("unknown vertex attribute in {:?}", s))),
    }
}

impl ExportConfig {
    /// Load and parse a configuration file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config: {:?}", path))?;
        Self::from_toml_str(&content).with_context(|| format!("Failed to parse config: {:?}", path))
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Load `path` if given, otherwise use defaults
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_defaults() {
        let config = ExportConfig::from_toml_str("").unwrap();
        assert_eq!(config, ExportConfig::default());
        assert!(config.validation.strict);
        assert_eq!(config.animation.frame_rate, 30.0);
        assert!(config.vertex.attributes.is_none());
        assert!(!config.vertex.flip_v);
    }

    #[test]
    fn test_attribute_array() {
        let config = ExportConfig::from_toml_str(
            r#"
            [vertex]
            attributes = ["POSITION", "NORMAL", "GROUPS"]
            flip_v = true
            "#,
        )
        .unwrap();
        assert_eq!(
            config.vertex.attributes,
            Some(vec![
                VertexAttribute::Position,
                VertexAttribute::Normal,
                VertexAttribute::SkinGroups
            ])
        );
        assert!(config.vertex.flip_v);
    }

    #[test]
    fn test_attribute_string() {
        let config = ExportConfig::from_toml_str(
            r#"
            [vertex]
            attributes = "POSITION+TEXTURE_COORD"
            "#,
        )
        .unwrap();
        assert_eq!(
            config.vertex.attributes,
            Some(vec![VertexAttribute::Position, VertexAttribute::TextureCoord])
        );
    }

    #[test]
    fn test_unknown_attribute_rejected() {
        assert!(ExportConfig::from_toml_str("[vertex]\nattributes = \"POSITION+WOBBLE\"").is_err());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("m3d.toml");
        std::fs::write(
            &path,
            "[validation]\nstrict = false\n\n[output]\npath = \"out.m3d\"\n",
        )
        .unwrap();

        let config = ExportConfig::load(&path).unwrap();
        assert!(!config.validation.strict);
        assert_eq!(config.output.path, Some(PathBuf::from("out.m3d")));
        assert!(ExportConfig::load(&dir.path().join("missing.toml")).is_err());
    }
}
