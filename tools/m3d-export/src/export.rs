//! Asset assembler
//!
//! Routes every exported entity through its encoder and writes the sections
//! in file order: meshes, armatures, actions, `"MAT"`, materials, images,
//! scenes. Each section is a name-index table followed by the records in
//! storage order.
//!
//! The scene is validated before anything is encoded; all records are built
//! in memory and only then streamed into the sink, so input errors never
//! leave a partial file behind.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use m3d_common::formats::{
    BinaryWriter, CameraRecord, ImageRecord, LampRecord, M3dAsset, MaterialRecord, NameIndexMap,
    ObjectRecord, Placement, SceneRecord, Section,
};

use crate::animation::encode_action;
use crate::config::ExportConfig;
use crate::error::ExportError;
use crate::mesh::{check_attribute_set, encode_mesh, resolve_attribute_set, MeshOptions};
use crate::registry::Registry;
use crate::scene::{Material, Object, ObjectData, Scene, SceneNode};
use crate::skeleton::encode_armature;
use crate::validate::validate_scene;

/// Counts reported after a successful export
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExportSummary {
    pub meshes: usize,
    pub armatures: usize,
    pub actions: usize,
    pub materials: usize,
    pub images: usize,
    pub scenes: usize,
    pub bytes_written: u64,
}

/// Validate and encode a scene into decoded-form records
pub fn build_asset(scene: &Scene, config: &ExportConfig) -> Result<M3dAsset, ExportError> {
    validate_scene(scene, config)?;

    let registry = Registry::build(scene, config.validation.strict)?;
    let options = MeshOptions {
        flip_v: config.vertex.flip_v,
    };

    let mut meshes = Vec::with_capacity(registry.meshes.len());
    for mesh in &registry.meshes {
        let attributes = resolve_attribute_set(mesh, scene, &registry, config)?;
        check_attribute_set(&mesh.name, &attributes)?;
        meshes.push(encode_mesh(mesh, &attributes, options)?);
    }

    let armatures = registry
        .armatures
        .iter()
        .map(|a| encode_armature(a))
        .collect::<Result<Vec<_>, _>>()?;

    let actions = registry
        .actions
        .iter()
        .map(|a| encode_action(a))
        .collect::<Result<Vec<_>, _>>()?;

    let materials = registry
        .materials
        .iter()
        .map(|m| encode_material(&registry, m))
        .collect::<Result<Vec<_>, _>>()?;

    let images = registry
        .images
        .iter()
        .map(|i| ImageRecord {
            name: i.name.clone(),
        })
        .collect();

    let scenes = registry
        .scenes
        .iter()
        .map(|s| encode_scene(&registry, s))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(M3dAsset {
        meshes: Section {
            names: registry.mesh_names(),
            records: meshes,
        },
        armatures: Section {
            names: registry.armature_names(),
            records: armatures,
        },
        actions: Section {
            names: registry.action_names(),
            records: actions,
        },
        materials: Section {
            names: registry.material_names(),
            records: materials,
        },
        images: Section {
            names: registry.image_names(),
            records: images,
        },
        scenes: Section {
            names: registry.scene_names(),
            records: scenes,
        },
    })
}

/// Encode a material as one image index per texture slot
pub fn encode_material(registry: &Registry<'_>, material: &Material) -> Result<MaterialRecord, ExportError> {
    let referrer = format!("material '{}'", material.name);
    let image_indices = material
        .textures
        .iter()
        .map(|t| registry.resolve_texture_image(t, &referrer))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(MaterialRecord { image_indices })
}

fn placement(object: &Object) -> Placement {
    Placement {
        location: object.location,
        rotation: object.rotation_xyzw(),
    }
}

/// Split a scene's objects into mesh instances, lamps and cameras
pub fn encode_scene(registry: &Registry<'_>, scene: &SceneNode) -> Result<SceneRecord, ExportError> {
    let mut object_names = Vec::new();
    let mut objects = Vec::new();
    let mut lamp_names = Vec::new();
    let mut lamps = Vec::new();
    let mut camera_names = Vec::new();
    let mut cameras = Vec::new();

    for object in scene.exported_objects() {
        match &object.data {
            ObjectData::Mesh { mesh, material } => {
                let referrer = format!("object '{}' in scene '{}'", object.name, scene.name);
                objects.push(ObjectRecord {
                    placement: placement(object),
                    scale: object.scale,
                    mesh: registry.resolve_mesh(mesh, &referrer)?,
                    material: registry.resolve_material(material.as_deref(), &referrer)?,
                });
                object_names.push(object.name.as_str());
            }
            ObjectData::Lamp {
                spot_size,
                spot_blend,
                clip_start,
                clip_end,
                color,
            } => {
                let (inner_cone, outer_cone) = LampRecord::cone_from_spot(*spot_size, *spot_blend);
                lamps.push(LampRecord {
                    placement: placement(object),
                    inner_cone,
                    outer_cone,
                    clip_start: *clip_start,
                    clip_end: *clip_end,
                    color: *color,
                });
                lamp_names.push(object.name.as_str());
            }
            ObjectData::Camera {
                lens,
                sensor_width,
                sensor_height,
                clip_start,
                clip_end,
            } => {
                cameras.push(CameraRecord {
                    placement: placement(object),
                    fov: CameraRecord::fov_from_lens(*lens, *sensor_width),
                    clip_start: *clip_start,
                    clip_end: *clip_end,
                    aspect: sensor_width / sensor_height,
                });
                camera_names.push(object.name.as_str());
            }
        }
    }

    tracing::debug!(
        "Encoded scene '{}': {} objects, {} lamps, {} cameras",
        scene.name,
        objects.len(),
        lamps.len(),
        cameras.len()
    );

    Ok(SceneRecord {
        object_names: NameIndexMap::from_ordered_names(object_names),
        objects,
        lamp_names: NameIndexMap::from_ordered_names(lamp_names),
        lamps,
        camera_names: NameIndexMap::from_ordered_names(camera_names),
        cameras,
    })
}

/// Export a scene into any sink
pub fn export_scene<W: Write>(
    scene: &Scene,
    config: &ExportConfig,
    sink: W,
) -> Result<ExportSummary, ExportError> {
    let asset = build_asset(scene, config)?;
    let mut writer = BinaryWriter::new(sink);
    write_asset(&asset, &mut writer)
}

fn write_asset<W: Write>(asset: &M3dAsset, writer: &mut BinaryWriter<W>) -> Result<ExportSummary, ExportError> {
    asset.write_to(writer)?;
    writer.flush()?;

    let summary = ExportSummary {
        meshes: asset.meshes.len(),
        armatures: asset.armatures.len(),
        actions: asset.actions.len(),
        materials: asset.materials.len(),
        images: asset.images.len(),
        scenes: asset.scenes.len(),
        bytes_written: writer.bytes_written(),
    };
    tracing::info!(
        "Wrote {} meshes, {} armatures, {} actions, {} materials, {} images, {} scenes ({} bytes)",
        summary.meshes,
        summary.armatures,
        summary.actions,
        summary.materials,
        summary.images,
        summary.scenes,
        summary.bytes_written
    );
    Ok(summary)
}

/// Export a scene into a byte vector
pub fn export_to_memory(scene: &Scene, config: &ExportConfig) -> Result<Vec<u8>, ExportError> {
    let mut bytes = Vec::new();
    export_scene(scene, config, &mut bytes)?;
    Ok(bytes)
}

/// Export a scene to a file
///
/// The file is only created once the scene has been validated and encoded.
pub fn export_to_file(
    scene: &Scene,
    config: &ExportConfig,
    output: &Path,
) -> Result<ExportSummary, ExportError> {
    let asset = build_asset(scene, config)?;
    let file = File::create(output)?;
    let mut writer = BinaryWriter::new(BufWriter::new(file));
    write_asset(&asset, &mut writer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::{Image, Texture, TextureKind};
    use m3d_common::SENTINEL;

    #[test]
    fn test_empty_scene_bytes() {
        let bytes = export_to_memory(&Scene::default(), &ExportConfig::default()).unwrap();
        assert_eq!(
            bytes,
            vec![0, 0, 0, 0, 0, 0, 3, 0, b'M', b'A', b'T', 0, 0, 0, 0, 0, 0]
        );
    }

    #[test]
    fn test_material_slots() {
        let scene = Scene {
            materials: vec![Material {
                name: "Wall".into(),
                export: true,
                textures: vec!["Procedural".into(), "Diffuse".into()],
            }],
            textures: vec![
                Texture {
                    name: "Diffuse".into(),
                    kind: TextureKind::Image,
                    image: Some("wall.png".into()),
                },
                Texture {
                    name: "Procedural".into(),
                    kind: TextureKind::Other,
                    image: None,
                },
            ],
            images: vec![Image {
                name: "wall.png".into(),
            }],
            ..Default::default()
        };
        let asset = build_asset(&scene, &ExportConfig::default()).unwrap();
        assert_eq!(asset.materials.records[0].image_indices, vec![SENTINEL, 0]);
        assert_eq!(asset.images.records[0].name, "wall.png");
    }

    #[test]
    fn test_scene_objects_split_by_kind() {
        let json = r#"{
            "meshes": [{"name": "Tri", "vertices": [{"co": [0,0,0]}, {"co": [1,0,0]}, {"co": [0,1,0]}], "faces": [[0,1,2]]}],
            "scenes": [{"name": "Main", "objects": [
                {"name": "Sun", "type": "LAMP", "spot_size": 1.0, "spot_blend": 0.5},
                {"name": "B", "type": "MESH", "mesh": "Tri", "location": [1, 2, 3]},
                {"name": "A", "type": "MESH", "mesh": "Tri"},
                {"name": "Cam", "type": "CAMERA", "lens": 18.0, "sensor_width": 36.0, "sensor_height": 24.0}
            ]}]
        }"#;
        let scene: Scene = serde_json::from_str(json).unwrap();
        let asset = build_asset(&scene, &ExportConfig::default()).unwrap();
        let record = &asset.scenes.records[0];

        assert_eq!(record.objects.len(), 2);
        assert_eq!(record.object_names.lookup("B"), Some(0));
        assert_eq!(record.object_names.lookup("A"), Some(1));
        assert_eq!(record.objects[0].placement.location, [1.0, 2.0, 3.0]);
        assert_eq!(record.objects[0].material, SENTINEL);

        assert_eq!(record.lamps.len(), 1);
        assert!((record.lamps[0].inner_cone - 0.5).abs() < 1e-6);

        assert_eq!(record.cameras.len(), 1);
        assert!((record.cameras[0].aspect - 1.5).abs() < 1e-6);
        assert!((record.cameras[0].fov - std::f32::consts::FRAC_PI_2).abs() < 1e-5);
    }

    #[test]
    fn test_lenient_missing_mesh_writes_sentinel() {
        let json = r#"{"scenes": [{"name": "Main", "objects": [{"name": "Ghost", "type": "MESH", "mesh": "Nope"}]}]}"#;
        let scene: Scene = serde_json::from_str(json).unwrap();

        let strict = ExportConfig::default();
        assert!(matches!(
            export_to_memory(&scene, &strict),
            Err(ExportError::UnresolvedReference { .. })
        ));

        let mut lenient = ExportConfig::default();
        lenient.validation.strict = false;
        let asset = build_asset(&scene, &lenient).unwrap();
        assert_eq!(asset.scenes.records[0].objects[0].mesh, SENTINEL);
    }

    #[test]
    fn test_export_to_file_not_created_on_invalid_input() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.m3d");
        let json = r#"{"scenes": [{"name": "Main", "objects": [{"name": "Ghost", "type": "MESH", "mesh": "Nope"}]}]}"#;
        let scene: Scene = serde_json::from_str(json).unwrap();

        assert!(export_to_file(&scene, &ExportConfig::default(), &path).is_err());
        assert!(!path.exists());
    }

    #[test]
    fn test_unexported_objects_left_out() {
        let json = r#"{
            "meshes": [{"name": "Tri", "vertices": [{"co": [0,0,0]}, {"co": [1,0,0]}, {"co": [0,1,0]}], "faces": [[0,1,2]]}],
            "scenes": [{"name": "Main", "objects": [
                {"name": "Shown", "type": "MESH", "mesh": "Tri"},
                {"name": "Hidden", "type": "MESH", "mesh": "Gone", "export": false},
                {"name": "Helper", "type": "LAMP", "export": false}
            ]}]
        }"#;
        let scene: Scene = serde_json::from_str(json).unwrap();
        let asset = build_asset(&scene, &ExportConfig::default()).unwrap();
        let record = &asset.scenes.records[0];

        assert_eq!(record.objects.len(), 1);
        assert_eq!(record.object_names.lookup("Shown"), Some(0));
        assert_eq!(record.object_names.lookup("Hidden"), None);
        assert!(record.lamps.is_empty());
    }

    #[test]
    fn test_long_name_leaves_no_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("long.m3d");
        let scene = Scene {
            images: vec![Image {
                name: "i".repeat(u16::MAX as usize + 1),
            }],
            ..Default::default()
        };

        assert!(matches!(
            export_to_file(&scene, &ExportConfig::default(), &path),
            Err(ExportError::NameTooLong { kind: "image", .. })
        ));
        assert!(!path.exists());
    }

    #[test]
    fn test_export_summary() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.m3d");
        let summary = export_to_file(&Scene::default(), &ExportConfig::default(), &path).unwrap();
        assert_eq!(summary.bytes_written, 17);
        assert_eq!(std::fs::metadata(&path).unwrap().len(), 17);
    }
}
