//! Scene snapshot
//!
//! An immutable, fully owned copy of everything the exporter reads from the
//! authoring tool. Snapshots are stored as JSON so they can be produced by a
//! host-side script (or by [`crate::gltf_import`]) and exported later.
//!
//! Cross references between entities are by name and are resolved through
//! [`crate::registry::Registry`]; bone parents are indices into the owning
//! armature's bone list.

use anyhow::{Context, Result};
use m3d_common::VertexAttribute;
use serde::{Deserialize, Serialize};
use std::path::Path;

fn default_true() -> bool {
    true
}

// ============================================================================
// Root
// ============================================================================

/// Complete scene snapshot
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Scene {
    pub meshes: Vec<Mesh>,
    pub armatures: Vec<Armature>,
    pub actions: Vec<Action>,
    pub materials: Vec<Material>,
    pub textures: Vec<Texture>,
    pub images: Vec<Image>,
    pub scenes: Vec<SceneNode>,
    /// Named vertex attribute sets defined in the authoring tool
    pub attribute_groups: Vec<AttributeGroup>,
    /// Name of the attribute group used when the configuration has none
    pub active_attribute_group: Option<String>,
}

impl Scene {
    /// Load a JSON snapshot from disk
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read scene: {:?}", path))?;
        let scene: Scene = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse scene: {:?}", path))?;
        Ok(scene)
    }

    /// Write the snapshot as pretty-printed JSON
    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self).context("Failed to serialize scene")?;
        std::fs::write(path, json).with_context(|| format!("Failed to write scene: {:?}", path))
    }
}

/// Named, ordered vertex attribute set
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributeGroup {
    pub name: String,
    pub attributes: Vec<VertexAttribute>,
}

// ============================================================================
// Geometry
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mesh {
    pub name: String,
    #[serde(default = "default_true")]
    pub export: bool,
    pub vertices: Vec<Vertex>,
    pub faces: Vec<Face>,
    /// Per-face-corner UV layers, corners in face order
    #[serde(default)]
    pub uv_layers: Vec<UvLayer>,
    /// Per-face-corner color layers, corners in face order
    #[serde(default)]
    pub color_layers: Vec<ColorLayer>,
    /// Material slot names
    #[serde(default)]
    pub materials: Vec<String>,
}

impl Mesh {
    /// Total number of face corners (expected length of every corner layer)
    pub fn corner_count(&self) -> usize {
        self.faces.iter().map(|f| f.vertices.len()).sum()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Vertex {
    pub co: [f32; 3],
    #[serde(default)]
    pub normal: [f32; 3],
    /// Skin groups this vertex belongs to
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub groups: Vec<VertexGroup>,
}

/// `(group index, weight)` membership of a vertex
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VertexGroup {
    pub group: u16,
    pub weight: f32,
}

/// Polygon as a list of vertex indices (3 or 4)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Face {
    pub vertices: Vec<u32>,
}

impl From<Vec<u32>> for Face {
    fn from(vertices: Vec<u32>) -> Self {
        Self { vertices }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UvLayer {
    pub name: String,
    pub uv: Vec<[f32; 2]>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColorLayer {
    pub name: String,
    /// RGBA
    pub color: Vec<[f32; 4]>,
}

// ============================================================================
// Skeletons
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Armature {
    pub name: String,
    #[serde(default = "default_true")]
    pub export: bool,
    pub bones: Vec<Bone>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bone {
    pub name: String,
    /// Index into the owning armature's bone list
    #[serde(default)]
    pub parent: Option<usize>,
    /// Armature-space head position
    pub head: [f32; 3],
    /// Armature-space orientation, column-major
    #[serde(default = "identity_matrix")]
    pub matrix: [[f32; 3]; 3],
}

fn identity_matrix() -> [[f32; 3]; 3] {
    [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]]
}

// ============================================================================
// Animation
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Action {
    pub name: String,
    #[serde(default = "default_true")]
    pub export: bool,
    /// `[start, end]` frame range; the end frame becomes the stream frame count
    #[serde(default)]
    pub frame_range: Option<[f32; 2]>,
    pub fcurves: Vec<FCurve>,
}

/// One animated scalar channel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FCurve {
    /// e.g. `pose.bones["Spine"].rotation_quaternion`
    pub data_path: String,
    /// Component index (w, x, y, z order for quaternions)
    #[serde(default)]
    pub array_index: usize,
    pub keyframes: Vec<Keyframe>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Keyframe {
    /// `[frame, value]`
    pub co: [f32; 2],
    /// Interpolation towards the next key
    #[serde(default)]
    pub interpolation: Interpolation,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub handle_left: Option<[f32; 2]>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub handle_right: Option<[f32; 2]>,
}

impl Keyframe {
    pub fn new(frame: f32, value: f32, interpolation: Interpolation) -> Self {
        Self {
            co: [frame, value],
            interpolation,
            handle_left: None,
            handle_right: None,
        }
    }

    pub fn frame(&self) -> f32 {
        self.co[0]
    }

    pub fn value(&self) -> f32 {
        self.co[1]
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Interpolation {
    Constant,
    #[default]
    Linear,
    Bezier,
}

// ============================================================================
// Materials
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Material {
    pub name: String,
    #[serde(default = "default_true")]
    pub export: bool,
    /// Texture slot names, in slot order
    #[serde(default)]
    pub textures: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Texture {
    pub name: String,
    #[serde(default)]
    pub kind: TextureKind,
    #[serde(default)]
    pub image: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TextureKind {
    #[default]
    Image,
    /// Procedural or otherwise non-image texture
    Other,
}

/// Only the name is written; it is the runtime's lookup key for the file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Image {
    pub name: String,
}

// ============================================================================
// Scenes
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneNode {
    pub name: String,
    #[serde(default = "default_true")]
    pub export: bool,
    #[serde(default)]
    pub objects: Vec<Object>,
}

impl SceneNode {
    /// Objects that end up in the file, in declaration order
    pub fn exported_objects(&self) -> impl Iterator<Item = &Object> {
        self.objects.iter().filter(|o| o.export)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Object {
    pub name: String,
    #[serde(default = "default_true")]
    pub export: bool,
    #[serde(default)]
    pub location: [f32; 3],
    /// Quaternion, authoring order (w, x, y, z)
    #[serde(default = "identity_rotation")]
    pub rotation: [f32; 4],
    #[serde(default = "unit_scale")]
    pub scale: [f32; 3],
    #[serde(flatten)]
    pub data: ObjectData,
}

fn identity_rotation() -> [f32; 4] {
    [1.0, 0.0, 0.0, 0.0]
}

fn unit_scale() -> [f32; 3] {
    [1.0, 1.0, 1.0]
}

impl Object {
    /// Rotation in storage order (x, y, z, w)
    pub fn rotation_xyzw(&self) -> [f32; 4] {
        let [w, x, y, z] = self.rotation;
        [x, y, z, w]
    }
}

/// Kind-specific object data
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "UPPERCASE")]
pub enum ObjectData {
    Mesh {
        mesh: String,
        #[serde(default)]
        material: Option<String>,
    },
    Lamp {
        /// Cone angle in radians
        #[serde(default = "default_spot_size")]
        spot_size: f32,
        #[serde(default = "default_spot_blend")]
        spot_blend: f32,
        #[serde(default = "default_clip_start")]
        clip_start: f32,
        #[serde(default = "default_lamp_clip_end")]
        clip_end: f32,
        #[serde(default = "default_color")]
        color: [f32; 3],
    },
    Camera {
        /// Focal length in mm
        #[serde(default = "default_lens")]
        lens: f32,
        #[serde(default = "default_sensor_width")]
        sensor_width: f32,
        #[serde(default = "default_sensor_height")]
        sensor_height: f32,
        #[serde(default = "default_clip_start")]
        clip_start: f32,
        #[serde(default = "default_camera_clip_end")]
        clip_end: f32,
    },
}

fn default_spot_size() -> f32 {
    std::f32::consts::FRAC_PI_4
}

fn default_spot_blend() -> f32 {
    0.15
}

fn default_clip_start() -> f32 {
    0.1
}

fn default_lamp_clip_end() -> f32 {
    40.0
}

fn default_camera_clip_end() -> f32 {
    100.0
}

fn default_color() -> [f32; 3] {
    [1.0, 1.0, 1.0]
}

fn default_lens() -> f32 {
    50.0
}

fn default_sensor_width() -> f32 {
    36.0
}

fn default_sensor_height() -> f32 {
    24.0
}
