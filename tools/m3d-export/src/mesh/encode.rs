//! Mesh → vertex records + triangle list

use m3d_common::{pack_skin_groups, vertex_stride, MeshRecord, VertexAttribute};

use super::tangents::{compute_tangent_frames, TangentFrame};
use crate::error::{check_count, ExportError};
use crate::scene::Mesh;

/// Largest vertex or index count representable in a mesh record
pub const MAX_INDEX_VALUE: usize = u16::MAX as usize;

const OPAQUE_WHITE: [f32; 4] = [1.0, 1.0, 1.0, 1.0];

/// Per-mesh encoder options
#[derive(Debug, Clone, Copy, Default)]
pub struct MeshOptions {
    /// Store `1 - v` instead of `v`
    pub flip_v: bool,
}

/// Split every face into triangles
///
/// Triangles are kept as-is; a quad `(v0, v1, v2, v3)` becomes `(v0, v1, v2)`
/// followed by `(v0, v2, v3)`. Any other corner count, or a vertex index out of
/// range, is an [`ExportError::InvalidFace`].
pub fn triangulate(mesh: &Mesh) -> Result<Vec<[u32; 3]>, ExportError> {
    let vertex_count = mesh.vertices.len();
    let mut triangles = Vec::with_capacity(mesh.faces.len() * 2);

    for (face_index, face) in mesh.faces.iter().enumerate() {
        let invalid = || ExportError::InvalidFace {
            mesh: mesh.name.clone(),
            face: face_index,
            corners: face.vertices.len(),
        };
        if face.vertices.iter().any(|&v| v as usize >= vertex_count) {
            return Err(invalid());
        }
        match face.vertices[..] {
            [a, b, c] => triangles.push([a, b, c]),
            [a, b, c, d] => {
                triangles.push([a, b, c]);
                triangles.push([a, c, d]);
            }
            _ => return Err(invalid()),
        }
    }

    Ok(triangles)
}

/// Copy per-face-corner values onto vertices; later corners overwrite earlier ones
fn scatter_corners<T: Copy>(mesh: &Mesh, corners: &[T], default: T) -> Vec<T> {
    let mut per_vertex = vec![default; mesh.vertices.len()];
    let mut corner = 0;
    for face in &mesh.faces {
        for &v in &face.vertices {
            if let (Some(slot), Some(value)) = (per_vertex.get_mut(v as usize), corners.get(corner)) {
                *slot = *value;
            }
            corner += 1;
        }
    }
    per_vertex
}

/// Check that the first UV/color layers cover every face corner
pub fn check_corner_layers(mesh: &Mesh, attributes: &[VertexAttribute]) -> Result<(), ExportError> {
    let corners = mesh.corner_count();
    let mismatch = |kind: &str, name: &str, len: usize| ExportError::AttributeSetMismatch {
        mesh: mesh.name.clone(),
        reason: format!(
            "{} layer '{}' has {} corners, faces have {}",
            kind, name, len, corners
        ),
    };

    if attributes.contains(&VertexAttribute::TextureCoord) {
        if let Some(layer) = mesh.uv_layers.first() {
            if layer.uv.len() != corners {
                return Err(mismatch("UV", &layer.name, layer.uv.len()));
            }
        }
    }
    if attributes.contains(&VertexAttribute::Color) {
        if let Some(layer) = mesh.color_layers.first() {
            if layer.color.len() != corners {
                return Err(mismatch("color", &layer.name, layer.color.len()));
            }
        }
    }
    Ok(())
}

/// Encode one mesh with a fixed attribute set
pub fn encode_mesh(
    mesh: &Mesh,
    attributes: &[VertexAttribute],
    options: MeshOptions,
) -> Result<MeshRecord, ExportError> {
    check_count(
        || format!("mesh '{}' vertices", mesh.name),
        mesh.vertices.len(),
        MAX_INDEX_VALUE,
    )?;
    check_corner_layers(mesh, attributes)?;

    let triangles = triangulate(mesh)?;
    check_count(
        || format!("mesh '{}' indices", mesh.name),
        triangles.len() * 3,
        MAX_INDEX_VALUE,
    )?;

    let wants = |a: VertexAttribute| attributes.contains(&a);
    let needs_uv = wants(VertexAttribute::TextureCoord)
        || wants(VertexAttribute::Tangent)
        || wants(VertexAttribute::Bitangent);

    let uvs: Vec<[f32; 2]> = if needs_uv {
        let corners = mesh.uv_layers.first().map(|l| &l.uv[..]).unwrap_or(&[]);
        scatter_corners(mesh, corners, [0.0, 0.0])
    } else {
        Vec::new()
    };

    let colors: Vec<[f32; 4]> = if wants(VertexAttribute::Color) {
        let corners = mesh.color_layers.first().map(|l| &l.color[..]).unwrap_or(&[]);
        scatter_corners(mesh, corners, OPAQUE_WHITE)
    } else {
        Vec::new()
    };

    let frames: Vec<TangentFrame> =
        if wants(VertexAttribute::Tangent) || wants(VertexAttribute::Bitangent) {
            let positions: Vec<[f32; 3]> = mesh.vertices.iter().map(|v| v.co).collect();
            let normals: Vec<[f32; 3]> = mesh.vertices.iter().map(|v| v.normal).collect();
            compute_tangent_frames(&positions, &normals, &uvs, &triangles)
        } else {
            Vec::new()
        };

    let stride = vertex_stride(attributes);
    let mut vertex_data = Vec::with_capacity(stride * mesh.vertices.len());
    let mut push = |values: &[f32]| {
        for v in values {
            vertex_data.extend_from_slice(&v.to_le_bytes());
        }
    };

    for (i, vertex) in mesh.vertices.iter().enumerate() {
        for attribute in attributes {
            match attribute {
                VertexAttribute::Position => push(&vertex.co),
                VertexAttribute::Normal => push(&vertex.normal),
                VertexAttribute::Tangent => push(&frames[i].tangent),
                VertexAttribute::Bitangent => push(&frames[i].bitangent),
                VertexAttribute::TextureCoord => {
                    let [u, v] = uvs[i];
                    let v = if options.flip_v { 1.0 - v } else { v };
                    push(&[u, v]);
                }
                VertexAttribute::SkinGroups => {
                    let groups: Vec<(u16, f32)> =
                        vertex.groups.iter().map(|g| (g.group, g.weight)).collect();
                    let (indices, weights) = pack_skin_groups(&groups);
                    push(&indices);
                    push(&weights);
                }
                VertexAttribute::Color => push(&colors[i]),
            }
        }
    }

    let indices = triangles
        .iter()
        .flat_map(|t| t.iter().map(|&i| i as u16))
        .collect();

    tracing::debug!(
        "Encoded mesh '{}': {} vertices, {} triangles, stride={}",
        mesh.name,
        mesh.vertices.len(),
        triangles.len(),
        stride
    );

    Ok(MeshRecord {
        stride: stride as u16,
        vertex_data,
        indices,
    })
}
