//! Shared types for Mini3D `.m3d` scene assets
//!
//! This crate is shared between:
//! - `m3d-export` (asset pipeline)
//! - runtime loaders and tests that need to read assets back
//!
//! # Modules
//!
//! - [`packing`] - Vertex attribute layout and skin-weight selection
//! - [`formats`] - Binary records, name-index tables and the whole-file reader

pub mod formats;
pub mod packing;

// Re-export commonly used packing items
pub use packing::{
    DEFAULT_ATTRIBUTES, SKIN_GROUP_COUNT, VertexAttribute, pack_skin_groups,
    parse_attribute_list, vertex_stride,
};

// Re-export commonly used format items
pub use formats::{
    AnimationStream,
    AnimationStreamHeader,
    ArmatureRecord,
    BinaryReader,
    // Primitives
    BinaryWriter,
    BoneRecord,
    CameraRecord,
    DecodeError,
    ImageRecord,
    KeyframeRecord,
    LampRecord,
    // Constants
    M3D_EXT,
    // Whole-file reader
    M3dAsset,
    MATERIAL_SEPARATOR,
    MaterialRecord,
    MeshHeader,
    // Records
    MeshRecord,
    NameIndexMap,
    ObjectRecord,
    Placement,
    SENTINEL,
    SceneRecord,
    Section,
};
