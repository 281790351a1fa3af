//! m3d-export library
//!
//! Encodes scene snapshots (meshes, armatures, actions, materials, images and
//! scenes) into the `.m3d` binary format. The binary uses the same functions;
//! other tools can call [`export_scene`] directly with any `Write` sink.

pub mod animation;
pub mod config;
pub mod error;
pub mod export;
pub mod gltf_import;
pub mod mesh;
pub mod registry;
pub mod scene;
pub mod skeleton;
pub mod validate;

// Re-export the format crate's vertex layout helpers
pub use m3d_common::{parse_attribute_list, vertex_stride, VertexAttribute, DEFAULT_ATTRIBUTES};

// Re-export the decoded form for readers of exported files
pub use m3d_common::{M3dAsset, M3D_EXT};

pub use config::ExportConfig;
pub use error::ExportError;
pub use export::{build_asset, export_scene, export_to_file, export_to_memory, ExportSummary};
pub use gltf_import::{import_gltf, ImportOptions};
pub use scene::Scene;
pub use validate::{find_problems, validate_scene};
