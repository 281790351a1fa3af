//! Vertex layout utilities
//!
//! Vertex records in `.m3d` meshes are tightly packed little-endian f32 values.
//! Which attributes a record carries, and in which order, is decided per mesh
//! by a [`VertexAttribute`] list. Used by both `m3d-export` (encoder) and the
//! reference decoder in [`crate::formats`].

use serde::{Deserialize, Serialize};

// ============================================================================
// Vertex Attributes
// ============================================================================

/// One per-vertex attribute kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VertexAttribute {
    /// Position: Float32x3
    Position,
    /// Normal: Float32x3
    Normal,
    /// Tangent: Float32x3
    Tangent,
    /// Bitangent: Float32x3
    Bitangent,
    /// First UV layer: Float32x2
    #[serde(rename = "TEXTURE", alias = "TEXTURE_COORD")]
    TextureCoord,
    /// Four bone indices followed by four weights: Float32x4 + Float32x4
    #[serde(rename = "GROUPS", alias = "SKIN_GROUPS")]
    SkinGroups,
    /// RGBA color: Float32x4
    Color,
}

impl VertexAttribute {
    /// Every attribute kind, in declaration order
    pub const ALL: [VertexAttribute; 7] = [
        VertexAttribute::Position,
        VertexAttribute::Normal,
        VertexAttribute::Tangent,
        VertexAttribute::Bitangent,
        VertexAttribute::TextureCoord,
        VertexAttribute::SkinGroups,
        VertexAttribute::Color,
    ];

    /// Size of this attribute inside a vertex record, in bytes
    #[inline]
    pub const fn byte_size(self) -> usize {
        match self {
            VertexAttribute::Position => 12,
            VertexAttribute::Normal => 12,
            VertexAttribute::Tangent => 12,
            VertexAttribute::Bitangent => 12,
            VertexAttribute::TextureCoord => 8,
            VertexAttribute::SkinGroups => 32,
            VertexAttribute::Color => 16,
        }
    }

    /// Number of f32 values this attribute occupies
    #[inline]
    pub const fn float_count(self) -> usize {
        self.byte_size() / 4
    }

    /// Name used in configuration files and logs
    pub const fn name(self) -> &'static str {
        match self {
            VertexAttribute::Position => "POSITION",
            VertexAttribute::Normal => "NORMAL",
            VertexAttribute::Tangent => "TANGENT",
            VertexAttribute::Bitangent => "BITANGENT",
            VertexAttribute::TextureCoord => "TEXTURE",
            VertexAttribute::SkinGroups => "GROUPS",
            VertexAttribute::Color => "COLOR",
        }
    }

    /// Parse a configuration name (case-insensitive)
    pub fn from_name(name: &str) -> Option<Self> {
        let upper = name.trim().to_uppercase();
        match upper.as_str() {
            "TEXTURE_COORD" => return Some(VertexAttribute::TextureCoord),
            "SKIN_GROUPS" => return Some(VertexAttribute::SkinGroups),
            _ => {}
        }
        Self::ALL.into_iter().find(|a| a.name() == upper)
    }
}

/// Attribute set used when neither the configuration nor the scene defines one
pub const DEFAULT_ATTRIBUTES: [VertexAttribute; 3] = [
    VertexAttribute::Position,
    VertexAttribute::Normal,
    VertexAttribute::TextureCoord,
];

/// Calculate vertex stride in bytes for an attribute list
#[inline]
pub fn vertex_stride(attributes: &[VertexAttribute]) -> usize {
    attributes.iter().map(|a| a.byte_size()).sum()
}

/// Parse a format string such as `"POSITION_NORMAL_TEXTURE"` or
/// `"position,normal,groups"` into an ordered attribute list.
///
/// Returns `None` if any token is unknown.
pub fn parse_attribute_list(s: &str) -> Option<Vec<VertexAttribute>> {
    let parts: Vec<String> = s
        .split(|c: char| matches!(c, ',' | '|' | '+' | '_') || c.is_whitespace())
        .filter(|t| !t.is_empty())
        .map(|t| t.to_uppercase())
        .collect();

    let mut out = Vec::with_capacity(parts.len());
    let mut i = 0;
    while i < parts.len() {
        // Two-word names first ("TEXTURE_COORD", "SKIN_GROUPS")
        if let Some(next) = parts.get(i + 1) {
            if let Some(attr) = VertexAttribute::from_name(&format!("{}_{}", parts[i], next)) {
                out.push(attr);
                i += 2;
                continue;
            }
        }
        out.push(VertexAttribute::from_name(&parts[i])?);
        i += 1;
    }

    Some(out)
}

// ============================================================================
// Skin Groups
// ============================================================================

/// Number of skin influences stored per vertex
pub const SKIN_GROUP_COUNT: usize = 4;

/// Select the four strongest skin influences of a vertex
///
/// Pads with `(0, 0.0)` up to four entries, sorts by weight descending (stable,
/// so equal weights keep their input order) and keeps the first four.
/// Returns `(bone indices, weights)` ready to be written as 8 floats.
pub fn pack_skin_groups(groups: &[(u16, f32)]) -> ([f32; 4], [f32; 4]) {
    let mut sorted: Vec<(u16, f32)> = groups.to_vec();
    while sorted.len() < SKIN_GROUP_COUNT {
        sorted.push((0, 0.0));
    }
    sorted.sort_by(|a, b| b.1.total_cmp(&a.1));

    let mut indices = [0.0f32; 4];
    let mut weights = [0.0f32; 4];
    for (i, (index, weight)) in sorted.iter().take(SKIN_GROUP_COUNT).enumerate() {
        indices[i] = *index as f32;
        weights[i] = *weight;
    }
    (indices, weights)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attribute_sizes() {
        assert_eq!(VertexAttribute::Position.byte_size(), 12);
        assert_eq!(VertexAttribute::Normal.byte_size(), 12);
        assert_eq!(VertexAttribute::Tangent.byte_size(), 12);
        assert_eq!(VertexAttribute::Bitangent.byte_size(), 12);
        assert_eq!(VertexAttribute::TextureCoord.byte_size(), 8);
        assert_eq!(VertexAttribute::SkinGroups.byte_size(), 32);
        assert_eq!(VertexAttribute::Color.byte_size(), 16);
    }

    #[test]
    fn test_default_stride() {
        assert_eq!(vertex_stride(&DEFAULT_ATTRIBUTES), 32);
        assert_eq!(vertex_stride(&VertexAttribute::ALL), 104);
        assert_eq!(vertex_stride(&[]), 0);
    }

    #[test]
    fn test_from_name() {
        assert_eq!(
            VertexAttribute::from_name("texture"),
            Some(VertexAttribute::TextureCoord)
        );
        assert_eq!(
            VertexAttribute::from_name("GROUPS"),
            Some(VertexAttribute::SkinGroups)
        );
        assert_eq!(
            VertexAttribute::from_name("skin_groups"),
            Some(VertexAttribute::SkinGroups)
        );
        assert_eq!(VertexAttribute::from_name("UV2"), None);
    }

    #[test]
    fn test_parse_attribute_list() {
        assert_eq!(
            parse_attribute_list("POSITION_NORMAL_TEXTURE"),
            Some(DEFAULT_ATTRIBUTES.to_vec())
        );
        assert_eq!(
            parse_attribute_list("position, texture_coord, skin_groups"),
            Some(vec![
                VertexAttribute::Position,
                VertexAttribute::TextureCoord,
                VertexAttribute::SkinGroups
            ])
        );
        assert_eq!(parse_attribute_list("POSITION_BOGUS"), None);
    }

    #[test]
    fn test_pack_skin_groups_pads_and_sorts() {
        let (indices, weights) = pack_skin_groups(&[(3, 0.25), (7, 0.75)]);
        assert_eq!(indices, [7.0, 3.0, 0.0, 0.0]);
        assert_eq!(weights, [0.75, 0.25, 0.0, 0.0]);
    }

    #[test]
    fn test_pack_skin_groups_keeps_strongest_four() {
        let groups = [(1, 0.1), (2, 0.3), (3, 0.05), (4, 0.35), (5, 0.2)];
        let (indices, weights) = pack_skin_groups(&groups);
        assert_eq!(indices, [4.0, 2.0, 5.0, 1.0]);
        assert_eq!(weights, [0.35, 0.3, 0.2, 0.1]);
    }

    #[test]
    fn test_pack_skin_groups_empty() {
        let (indices, weights) = pack_skin_groups(&[]);
        assert_eq!(indices, [0.0; 4]);
        assert_eq!(weights, [0.0; 4]);
    }
}
