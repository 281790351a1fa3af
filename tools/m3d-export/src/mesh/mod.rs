//! Geometry encoder
//!
//! Turns snapshot meshes into packed vertex records and triangle lists.

mod attributes;
mod encode;
mod tangents;

pub use attributes::{check_attribute_set, resolve_attribute_set};
pub use encode::{check_corner_layers, encode_mesh, triangulate, MeshOptions, MAX_INDEX_VALUE};
pub use tangents::{compute_tangent_frames, TangentFrame};
