//! Mini3D `.m3d` binary asset format
//!
//! All integers are little-endian u16, all reals little-endian f32, strings are
//! u16-length-prefixed UTF-8. There are no magic bytes and no version field;
//! section order is fixed (see [`asset`]).
//!
//! Fixed-size headers expose `to_bytes` / `from_bytes`; variable records
//! expose `write_to` / `read_from` over [`BinaryWriter`] / [`BinaryReader`].

pub mod animation;
pub mod asset;
pub mod material;
pub mod mesh;
pub mod name_index;
pub mod primitives;
pub mod scene;
pub mod skeleton;

pub use animation::*;
pub use asset::*;
pub use material::*;
pub use mesh::*;
pub use name_index::*;
pub use primitives::*;
pub use scene::*;
pub use skeleton::*;

/// File extension for Mini3D scene assets
pub const M3D_EXT: &str = "m3d";

/// Length-prefixed literal written between the actions and materials sections
pub const MATERIAL_SEPARATOR: &str = "MAT";
