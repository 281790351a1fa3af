//! Per-vertex tangent frames from UV derivatives
//!
//! Tangents are accumulated per triangle from the UV gradient (Lengyel),
//! Gram-Schmidt orthogonalized against the vertex normal, and the bitangent is
//! rebuilt as `cross(normal, tangent) * handedness`.

use glam::{Vec2, Vec3};

/// Tangent and bitangent of one vertex
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TangentFrame {
    pub tangent: [f32; 3],
    pub bitangent: [f32; 3],
}

/// Compute a tangent frame for every vertex
///
/// `triangles` index into `positions`, `normals` and `uvs`, which must have the
/// same length.
pub fn compute_tangent_frames(
    positions: &[[f32; 3]],
    normals: &[[f32; 3]],
    uvs: &[[f32; 2]],
    triangles: &[[u32; 3]],
) -> Vec<TangentFrame> {
    let count = positions.len();
    let mut tan = vec![Vec3::ZERO; count];
    let mut bitan = vec![Vec3::ZERO; count];

    for tri in triangles {
        let [i0, i1, i2] = tri.map(|i| i as usize);
        let p0 = Vec3::from(positions[i0]);
        let e1 = Vec3::from(positions[i1]) - p0;
        let e2 = Vec3::from(positions[i2]) - p0;

        let uv0 = Vec2::from(uvs[i0]);
        let d1 = Vec2::from(uvs[i1]) - uv0;
        let d2 = Vec2::from(uvs[i2]) - uv0;

        let det = d1.x * d2.y - d2.x * d1.y;
        if det.abs() < 1e-12 {
            continue;
        }
        let r = 1.0 / det;
        let sdir = (e1 * d2.y - e2 * d1.y) * r;
        let tdir = (e2 * d1.x - e1 * d2.x) * r;

        for i in [i0, i1, i2] {
            tan[i] += sdir;
            bitan[i] += tdir;
        }
    }

    (0..count)
        .map(|i| {
            let n = Vec3::from(normals[i]).try_normalize().unwrap_or(Vec3::Z);

            // Gram-Schmidt
            let t = (tan[i] - n * n.dot(tan[i]))
                .try_normalize()
                .unwrap_or_else(|| n.any_orthonormal_vector());

            let handedness = if n.cross(t).dot(bitan[i]) < 0.0 {
                -1.0
            } else {
                1.0
            };
            let b = n.cross(t) * handedness;

            TangentFrame {
                tangent: t.to_array(),
                bitangent: b.to_array(),
            }
        })
        .collect()
}
