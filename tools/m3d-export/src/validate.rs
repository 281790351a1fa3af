//! Validation pass
//!
//! Runs every check the encoders would hit, before the output sink is opened,
//! so known-bad input never produces a partial file. Reference checks only
//! apply in strict mode; in lenient mode those references are written as
//! 0xFFFF during encoding.

use crate::animation::encode_action;
use crate::config::ExportConfig;
use crate::error::{check_count, check_name, ExportError};
use crate::mesh::{check_attribute_set, check_corner_layers, resolve_attribute_set, triangulate, MAX_INDEX_VALUE};
use crate::registry::Registry;
use crate::scene::{ObjectData, Scene};
use crate::skeleton::{flatten_bones, MAX_BONES};

/// Collect every problem in the scene
pub fn find_problems(scene: &Scene, config: &ExportConfig) -> Vec<ExportError> {
    let registry = match Registry::build(scene, config.validation.strict) {
        Ok(registry) => registry,
        Err(err) => return vec![err],
    };
    let mut problems = Vec::new();

    check_names(&registry, &mut problems);

    // Geometry
    for mesh in &registry.meshes {
        let result = resolve_attribute_set(mesh, scene, &registry, config).and_then(|attributes| {
            check_attribute_set(&mesh.name, &attributes)
                .and_then(|_| {
                    check_count(
                        || format!("mesh '{}' vertices", mesh.name),
                        mesh.vertices.len(),
                        MAX_INDEX_VALUE,
                    )
                })
                .and_then(|_| check_corner_layers(mesh, &attributes))
                .and_then(|_| triangulate(mesh))
                .and_then(|triangles| {
                    check_count(
                        || format!("mesh '{}' indices", mesh.name),
                        triangles.len() * 3,
                        MAX_INDEX_VALUE,
                    )
                })
        });
        if let Err(err) = result {
            problems.push(err);
        }
    }

    // Skeletons
    for armature in &registry.armatures {
        let result = check_count(
            || format!("armature '{}' bones", armature.name),
            armature.bones.len(),
            MAX_BONES,
        )
        .and_then(|_| flatten_bones(armature));
        if let Err(err) = result {
            problems.push(err);
        }
    }

    // Animation
    for action in &registry.actions {
        if let Err(err) = encode_action(action) {
            problems.push(err);
        }
    }

    if registry.is_strict() {
        check_references(&registry, &mut problems);
    }

    problems
}

/// Every name that gets a u16 length prefix in the file
fn check_names(registry: &Registry<'_>, problems: &mut Vec<ExportError>) {
    let mut check = |kind: &'static str, name: &str| {
        if let Err(err) = check_name(kind, name) {
            problems.push(err);
        }
    };

    for mesh in &registry.meshes {
        check("mesh", &mesh.name);
    }
    for armature in &registry.armatures {
        check("armature", &armature.name);
        for bone in &armature.bones {
            check("bone", &bone.name);
        }
    }
    for action in &registry.actions {
        check("action", &action.name);
    }
    for material in &registry.materials {
        check("material", &material.name);
    }
    for image in &registry.images {
        check("image", &image.name);
    }
    for scene in &registry.scenes {
        check("scene", &scene.name);
        for object in scene.exported_objects() {
            check("object", &object.name);
        }
    }
}

/// Object and material references
fn check_references(registry: &Registry<'_>, problems: &mut Vec<ExportError>) {
    for material in &registry.materials {
        let referrer = format!("material '{}'", material.name);
        for texture in &material.textures {
            if let Err(err) = registry.resolve_texture_image(texture, &referrer) {
                problems.push(err);
            }
        }
    }

    for scene in &registry.scenes {
        for object in scene.exported_objects() {
            if let ObjectData::Mesh { mesh, material } = &object.data {
                let referrer = format!("object '{}' in scene '{}'", object.name, scene.name);
                if let Err(err) = registry.resolve_mesh(mesh, &referrer) {
                    problems.push(err);
                }
                if let Err(err) = registry.resolve_material(material.as_deref(), &referrer) {
                    problems.push(err);
                }
            }
        }
    }
}

/// Fail with the first problem found
pub fn validate_scene(scene: &Scene, config: &ExportConfig) -> Result<(), ExportError> {
    let problems = find_problems(scene, config);
    for extra in problems.iter().skip(1) {
        tracing::debug!("Additional problem: {}", extra);
    }
    match problems.into_iter().next() {
        Some(err) => Err(err),
        None => Ok(()),
    }
}
