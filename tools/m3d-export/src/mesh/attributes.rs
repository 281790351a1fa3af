//! Effective vertex attribute set

use m3d_common::{VertexAttribute, DEFAULT_ATTRIBUTES};

use crate::config::ExportConfig;
use crate::error::ExportError;
use crate::registry::Registry;
use crate::scene::{Mesh, Scene};

/// Pick the attribute set for one mesh
///
/// Precedence: configuration override, then the scene's active attribute
/// group, then [`DEFAULT_ATTRIBUTES`]. The active group only applies to meshes
/// with at least one material slot.
pub fn resolve_attribute_set(
    mesh: &Mesh,
    scene: &Scene,
    registry: &Registry<'_>,
    config: &ExportConfig,
) -> Result<Vec<VertexAttribute>, ExportError> {
    if let Some(attributes) = &config.vertex.attributes {
        tracing::debug!("Using configured attribute set for '{}'", mesh.name);
        return Ok(attributes.clone());
    }

    let Some(name) = scene.active_attribute_group.as_deref() else {
        return Ok(DEFAULT_ATTRIBUTES.to_vec());
    };
    if mesh.materials.is_empty() {
        tracing::debug!("Mesh '{}' has no materials, using default set", mesh.name);
        return Ok(DEFAULT_ATTRIBUTES.to_vec());
    }

    match registry.attribute_group(name) {
        Some(group) => {
            tracing::debug!("Using attribute group '{}' for '{}'", name, mesh.name);
            Ok(group.attributes.clone())
        }
        None if registry.is_strict() => Err(ExportError::unresolved(
            "attribute group",
            name,
            format!("mesh '{}'", mesh.name),
        )),
        None => {
            tracing::warn!(
                "Active attribute group '{}' not found, using default set for '{}'",
                name,
                mesh.name
            );
            Ok(DEFAULT_ATTRIBUTES.to_vec())
        }
    }
}

/// Reject empty sets, duplicates and sets without a position
pub fn check_attribute_set(mesh: &str, attributes: &[VertexAttribute]) -> Result<(), ExportError> {
    let mismatch = |reason: String| ExportError::AttributeSetMismatch {
        mesh: mesh.to_string(),
        reason,
    };

    if attributes.is_empty() {
        return Err(mismatch("attribute set is empty".into()));
    }
    for (i, attribute) in attributes.iter().enumerate() {
        if attributes[..i].contains(attribute) {
            return Err(mismatch(format!("duplicate attribute {}", attribute.name())));
        }
    }
    if !attributes.contains(&VertexAttribute::Position) {
        return Err(mismatch("POSITION is required".into()));
    }
    Ok(())
}
