//! glTF 2.0 scene import
//!
//! Builds a [`Scene`] snapshot from a `.gltf` or `.glb` file so it can go
//! through the regular export path.
//!
//! - every triangle primitive becomes a mesh (`<mesh>` or `<mesh>.<n>` when a
//!   mesh has several primitives)
//! - every skin becomes an armature, bones in joint order
//! - rotation channels on joints become four `rotation_quaternion` curves
//! - base color textures become material texture slots
//! - scene nodes with meshes or perspective cameras become objects

use std::path::Path;

use anyhow::{Context, Result};
use glam::{Mat4, Quat};
use gltf::animation::util::ReadOutputs;
use gltf::animation::{Interpolation as GltfInterpolation, Property};
use gltf::camera::Projection;
use gltf::mesh::Mode;
use hashbrown::HashSet;

use crate::animation::{bone_data_path, ROTATION_QUATERNION};
use crate::config::DEFAULT_FRAME_RATE;
use crate::scene::{
    Action, Armature, Bone, ColorLayer, Face, FCurve, Image, Interpolation, Keyframe, Material,
    Mesh, Object, ObjectData, Scene, SceneNode, Texture, TextureKind, UvLayer, Vertex, VertexGroup,
};

/// Default sensor width for imported cameras, in mm
const SENSOR_WIDTH: f32 = 36.0;

/// Settings for glTF import
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImportOptions {
    /// Frames per second used to convert key times
    pub frame_rate: f32,
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self {
            frame_rate: DEFAULT_FRAME_RATE,
        }
    }
}

/// Import a glTF or GLB file as a scene snapshot
pub fn import_gltf(input: &Path, options: &ImportOptions) -> Result<Scene> {
    let (document, buffers, _images) =
        gltf::import(input).with_context(|| format!("Failed to load glTF: {:?}", input))?;

    let mut importer = Importer::new(&document, &buffers);
    let scene = importer.run(options)?;

    tracing::info!(
        "Imported {:?}: {} meshes, {} armatures, {} actions, {} materials, {} scenes",
        input,
        scene.meshes.len(),
        scene.armatures.len(),
        scene.actions.len(),
        scene.materials.len(),
        scene.scenes.len()
    );
    Ok(scene)
}

/// Name of a node, falling back to its index
fn node_name(node: &gltf::Node) -> String {
    node.name()
        .map(String::from)
        .unwrap_or_else(|| format!("Node{}", node.index()))
}

fn named(name: Option<&str>, prefix: &str, index: usize) -> String {
    name.map(String::from)
        .unwrap_or_else(|| format!("{}{}", prefix, index))
}

/// glTF (x, y, z, w) to authoring order (w, x, y, z)
fn to_wxyz(q: Quat) -> [f32; 4] {
    [q.w, q.x, q.y, q.z]
}

struct Importer<'a> {
    document: &'a gltf::Document,
    buffers: &'a [gltf::buffer::Data],
    /// Parent node per node index
    parents: Vec<Option<usize>>,
    /// Local transform per node index
    locals: Vec<Mat4>,
    /// Exported mesh names and material per glTF mesh
    mesh_parts: Vec<Vec<(String, Option<String>)>>,
    material_names: Vec<String>,
}

impl<'a> Importer<'a> {
    fn new(document: &'a gltf::Document, buffers: &'a [gltf::buffer::Data]) -> Self {
        let count = document.nodes().count();
        let mut parents = vec![None; count];
        for node in document.nodes() {
            for child in node.children() {
                parents[child.index()] = Some(node.index());
            }
        }
        let locals = document
            .nodes()
            .map(|n| Mat4::from_cols_array_2d(&n.transform().matrix()))
            .collect();
        let material_names = document
            .materials()
            .enumerate()
            .map(|(i, m)| named(m.name(), "Material", i))
            .collect();

        Self {
            document,
            buffers,
            parents,
            locals,
            mesh_parts: Vec::new(),
            material_names,
        }
    }

    fn run(&mut self, options: &ImportOptions) -> Result<Scene> {
        let meshes = self.import_meshes()?;
        let armatures = self.import_armatures();
        let actions = self.import_actions(options)?;
        let (materials, textures, images) = self.import_materials();
        let scenes = self.import_scenes();

        Ok(Scene {
            meshes,
            armatures,
            actions,
            materials,
            textures,
            images,
            scenes,
            ..Default::default()
        })
    }

    /// World transform of a node
    fn world_matrix(&self, index: usize) -> Mat4 {
        let mut matrix = self.locals[index];
        let mut current = self.parents[index];
        let mut depth = 0;
        while let Some(parent) = current {
            if depth > self.locals.len() {
                break;
            }
            matrix = self.locals[parent] * matrix;
            current = self.parents[parent];
            depth += 1;
        }
        matrix
    }

    // ========================================================================
    // Geometry
    // ========================================================================

    fn import_meshes(&mut self) -> Result<Vec<Mesh>> {
        let mut meshes = Vec::new();

        for gltf_mesh in self.document.meshes() {
            let base = named(gltf_mesh.name(), "Mesh", gltf_mesh.index());
            let primitive_count = gltf_mesh.primitives().count();
            let mut parts = Vec::new();

            for primitive in gltf_mesh.primitives() {
                let name = if primitive_count == 1 {
                    base.clone()
                } else {
                    format!("{}.{}", base, primitive.index())
                };
                if primitive.mode() != Mode::Triangles {
                    tracing::warn!(
                        "Skipping primitive '{}': mode {:?} is not triangles",
                        name,
                        primitive.mode()
                    );
                    continue;
                }

                let material = primitive
                    .material()
                    .index()
                    .map(|i| self.material_names[i].clone());
                let mesh = self
                    .import_primitive(&name, &primitive, material.clone())
                    .with_context(|| format!("Failed to import mesh '{}'", name))?;
                tracing::debug!(
                    "Mesh '{}': {} vertices, {} faces",
                    name,
                    mesh.vertices.len(),
                    mesh.faces.len()
                );
                meshes.push(mesh);
                parts.push((name, material));
            }
            self.mesh_parts.push(parts);
        }

        Ok(meshes)
    }

    fn import_primitive(
        &self,
        name: &str,
        primitive: &gltf::Primitive,
        material: Option<String>,
    ) -> Result<Mesh> {
        let buffers = self.buffers;
        let reader = primitive.reader(|buffer| Some(&buffers[buffer.index()]));

        let positions: Vec<[f32; 3]> = reader
            .read_positions()
            .context("No positions in primitive")?
            .collect();
        let normals: Vec<[f32; 3]> = reader
            .read_normals()
            .map(|iter| iter.collect())
            .unwrap_or_default();
        let uvs: Option<Vec<[f32; 2]>> = reader
            .read_tex_coords(0)
            .map(|iter| iter.into_f32().collect());
        let colors: Option<Vec<[f32; 4]>> = reader
            .read_colors(0)
            .map(|iter| iter.into_rgba_f32().collect());
        let joints: Vec<[u16; 4]> = reader
            .read_joints(0)
            .map(|iter| iter.into_u16().collect())
            .unwrap_or_default();
        let weights: Vec<[f32; 4]> = reader
            .read_weights(0)
            .map(|iter| iter.into_f32().collect())
            .unwrap_or_default();

        let vertices = positions
            .iter()
            .enumerate()
            .map(|(i, &co)| {
                let groups = match (joints.get(i), weights.get(i)) {
                    (Some(j), Some(w)) => j
                        .iter()
                        .zip(w)
                        .filter(|(_, &weight)| weight > 0.0)
                        .map(|(&group, &weight)| VertexGroup { group, weight })
                        .collect(),
                    _ => Vec::new(),
                };
                Vertex {
                    co,
                    normal: normals.get(i).copied().unwrap_or_default(),
                    groups,
                }
            })
            .collect();

        let indices: Vec<u32> = match reader.read_indices() {
            Some(iter) => iter.into_u32().collect(),
            None => (0..positions.len() as u32).collect(),
        };
        if indices.len() % 3 != 0 {
            anyhow::bail!("Index count {} is not a multiple of 3", indices.len());
        }
        let faces: Vec<Face> = indices
            .chunks_exact(3)
            .map(|tri| Face::from(tri.to_vec()))
            .collect();

        // glTF vertices are already split per corner; fan them out to the faces
        let uv_layers = uvs
            .map(|uv| UvLayer {
                name: "TEXCOORD_0".into(),
                uv: indices
                    .iter()
                    .map(|&v| uv.get(v as usize).copied().unwrap_or_default())
                    .collect(),
            })
            .into_iter()
            .collect();
        let color_layers = colors
            .map(|color| ColorLayer {
                name: "COLOR_0".into(),
                color: indices
                    .iter()
                    .map(|&v| color.get(v as usize).copied().unwrap_or([1.0; 4]))
                    .collect(),
            })
            .into_iter()
            .collect();

        Ok(Mesh {
            name: name.to_string(),
            export: true,
            vertices,
            faces,
            uv_layers,
            color_layers,
            materials: material.into_iter().collect(),
        })
    }

    // ========================================================================
    // Skeletons
    // ========================================================================

    fn import_armatures(&self) -> Vec<Armature> {
        self.document
            .skins()
            .map(|skin| {
                let joints: Vec<usize> = skin.joints().map(|j| j.index()).collect();
                let bones = skin
                    .joints()
                    .map(|joint| {
                        let (_, rotation, translation) =
                            self.world_matrix(joint.index()).to_scale_rotation_translation();
                        Bone {
                            name: node_name(&joint),
                            parent: self.joint_parent(joint.index(), &joints),
                            head: translation.to_array(),
                            matrix: glam::Mat3::from_quat(rotation).to_cols_array_2d(),
                        }
                    })
                    .collect();
                Armature {
                    name: named(skin.name(), "Armature", skin.index()),
                    export: true,
                    bones,
                }
            })
            .collect()
    }

    /// Bone index of the nearest ancestor that is also a joint
    fn joint_parent(&self, node: usize, joints: &[usize]) -> Option<usize> {
        let mut current = self.parents[node];
        let mut depth = 0;
        while let Some(parent) = current {
            if let Some(bone) = joints.iter().position(|&j| j == parent) {
                return Some(bone);
            }
            if depth > self.parents.len() {
                break;
            }
            current = self.parents[parent];
            depth += 1;
        }
        None
    }

    // ========================================================================
    // Animation
    // ========================================================================

    fn import_actions(&self, options: &ImportOptions) -> Result<Vec<Action>> {
        let joints: HashSet<usize> = self
            .document
            .skins()
            .flat_map(|s| s.joints().map(|j| j.index()).collect::<Vec<_>>())
            .collect();

        let mut actions = Vec::new();
        for animation in self.document.animations() {
            let name = named(animation.name(), "Action", animation.index());
            let mut fcurves = Vec::new();
            let mut range: Option<[f32; 2]> = None;

            for channel in animation.channels() {
                let target = channel.target();
                if target.property() != Property::Rotation {
                    continue;
                }
                let node = target.node();
                if !joints.contains(&node.index()) {
                    tracing::debug!(
                        "Action '{}': skipping rotation of non-joint node '{}'",
                        name,
                        node_name(&node)
                    );
                    continue;
                }

                let buffers = self.buffers;
                let reader = channel.reader(|buffer| Some(&buffers[buffer.index()]));
                let times: Vec<f32> = reader
                    .read_inputs()
                    .with_context(|| format!("Action '{}': channel has no key times", name))?
                    .collect();
                let Some(ReadOutputs::Rotations(rotations)) = reader.read_outputs() else {
                    anyhow::bail!("Action '{}': rotation channel has no rotation output", name);
                };
                let rotations: Vec<[f32; 4]> = rotations.into_f32().collect();

                let sampler = channel.sampler();
                let interpolation = match sampler.interpolation() {
                    GltfInterpolation::Step => Interpolation::Constant,
                    GltfInterpolation::Linear | GltfInterpolation::CubicSpline => {
                        Interpolation::Linear
                    }
                };
                // Cubic spline output is (in-tangent, value, out-tangent) per key
                let stride = match sampler.interpolation() {
                    GltfInterpolation::CubicSpline => 3,
                    _ => 1,
                };
                let offset = stride / 2;

                let keys: Vec<(f32, [f32; 4])> = times
                    .iter()
                    .enumerate()
                    .filter_map(|(k, &t)| {
                        let q = rotations.get(k * stride + offset)?;
                        Some((t * options.frame_rate, to_wxyz(Quat::from_array(*q))))
                    })
                    .collect();

                for &(frame, _) in &keys {
                    range = Some(match range {
                        Some([start, end]) => [start.min(frame), end.max(frame)],
                        None => [frame, frame],
                    });
                }

                let data_path = bone_data_path(&node_name(&node), ROTATION_QUATERNION);
                for component in 0..4 {
                    fcurves.push(FCurve {
                        data_path: data_path.clone(),
                        array_index: component,
                        keyframes: keys
                            .iter()
                            .map(|(frame, wxyz)| Keyframe::new(*frame, wxyz[component], interpolation))
                            .collect(),
                    });
                }
            }

            if fcurves.is_empty() {
                tracing::warn!("Skipping animation '{}': no joint rotation channels", name);
                continue;
            }
            actions.push(Action {
                name,
                export: true,
                frame_range: range,
                fcurves,
            });
        }

        Ok(actions)
    }

    // ========================================================================
    // Materials
    // ========================================================================

    fn import_materials(&self) -> (Vec<Material>, Vec<Texture>, Vec<Image>) {
        let images: Vec<Image> = self
            .document
            .images()
            .map(|image| {
                // Unnamed external images fall back to the file name of their URI
                let fallback = match image.source() {
                    gltf::image::Source::Uri { uri, .. } if !uri.starts_with("data:") => Path::new(uri)
                        .file_name()
                        .map(|f| f.to_string_lossy().into_owned()),
                    _ => None,
                };
                Image {
                    name: image
                        .name()
                        .map(String::from)
                        .or(fallback)
                        .unwrap_or_else(|| format!("Image{}", image.index())),
                }
            })
            .collect();

        let textures: Vec<Texture> = self
            .document
            .textures()
            .map(|texture| Texture {
                name: named(texture.name(), "Texture", texture.index()),
                kind: TextureKind::Image,
                image: Some(images[texture.source().index()].name.clone()),
            })
            .collect();

        let materials = self
            .document
            .materials()
            .filter_map(|material| {
                let index = material.index()?;
                let slots = material
                    .pbr_metallic_roughness()
                    .base_color_texture()
                    .map(|info| textures[info.texture().index()].name.clone());
                Some(Material {
                    name: self.material_names[index].clone(),
                    export: true,
                    textures: slots.into_iter().collect(),
                })
            })
            .collect();

        (materials, textures, images)
    }

    // ========================================================================
    // Scenes
    // ========================================================================

    fn import_scenes(&self) -> Vec<SceneNode> {
        self.document
            .scenes()
            .map(|scene| {
                let mut objects = Vec::new();
                for root in scene.nodes() {
                    self.collect_objects(&root, &mut objects, 0);
                }
                SceneNode {
                    name: named(scene.name(), "Scene", scene.index()),
                    export: true,
                    objects,
                }
            })
            .collect()
    }

    fn collect_objects(&self, node: &gltf::Node, objects: &mut Vec<Object>, depth: usize) {
        if depth > self.locals.len() {
            return;
        }

        let (scale, rotation, location) = self.world_matrix(node.index()).to_scale_rotation_translation();
        let object = |name: String, data: ObjectData| Object {
            name,
            export: true,
            location: location.to_array(),
            rotation: to_wxyz(rotation),
            scale: scale.to_array(),
            data,
        };

        if let Some(mesh) = node.mesh() {
            let parts = &self.mesh_parts[mesh.index()];
            for (mesh_name, material) in parts {
                let name = if parts.len() == 1 {
                    node_name(node)
                } else {
                    format!("{}.{}", node_name(node), mesh_name)
                };
                objects.push(object(
                    name,
                    ObjectData::Mesh {
                        mesh: mesh_name.clone(),
                        material: material.clone(),
                    },
                ));
            }
        }

        if let Some(camera) = node.camera() {
            if let Projection::Perspective(perspective) = camera.projection() {
                let aspect = perspective.aspect_ratio().unwrap_or(1.5);
                // horizontal field of view from the vertical one
                let half_width = (perspective.yfov() * 0.5).tan() * aspect;
                objects.push(object(
                    node_name(node),
                    ObjectData::Camera {
                        lens: SENSOR_WIDTH / (2.0 * half_width),
                        sensor_width: SENSOR_WIDTH,
                        sensor_height: SENSOR_WIDTH / aspect,
                        clip_start: perspective.znear(),
                        clip_end: perspective.zfar().unwrap_or(1000.0),
                    },
                ));
            } else {
                tracing::debug!("Skipping orthographic camera on '{}'", node_name(node));
            }
        }

        for child in node.children() {
            self.collect_objects(&child, objects, depth + 1);
        }
    }
}
