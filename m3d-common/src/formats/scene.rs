//! Scene records: placed objects, lamps and cameras
//!
//! # Layout
//! ```text
//! Scene:
//!   NameIndexMap (objects) + Object records
//!   NameIndexMap (lamps)   + Lamp records
//!   NameIndexMap (cameras) + Camera records
//!
//! Object (44 bytes): location f32×3, rotation f32×4 (x,y,z,w), scale f32×3,
//!                    mesh u16, material u16
//! Lamp   (56 bytes): location f32×3, rotation f32×4,
//!                    inner_cone, outer_cone, clip_start, clip_end f32,
//!                    color f32×3
//! Camera (44 bytes): location f32×3, rotation f32×4,
//!                    fov, clip_start, clip_end, aspect f32
//! ```

use std::io::{self, Write};

use super::name_index::NameIndexMap;
use super::primitives::{BinaryReader, BinaryWriter, DecodeError};

/// Location and rotation shared by every placed record
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    pub location: [f32; 3],
    /// Storage order (x, y, z, w)
    pub rotation: [f32; 4],
}

impl Default for Placement {
    fn default() -> Self {
        Self {
            location: [0.0; 3],
            rotation: [0.0, 0.0, 0.0, 1.0],
        }
    }
}

impl Placement {
    pub const SIZE: usize = 28;

    fn write_to<W: Write>(&self, w: &mut BinaryWriter<W>) -> io::Result<()> {
        w.write_f32s(&self.location)?;
        w.write_f32s(&self.rotation)
    }

    fn read_from(r: &mut BinaryReader<'_>) -> Result<Self, DecodeError> {
        Ok(Self {
            location: r.read_f32_array()?,
            rotation: r.read_f32_array()?,
        })
    }
}

/// Mesh instance placed in a scene
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ObjectRecord {
    pub placement: Placement,
    pub scale: [f32; 3],
    pub mesh: u16,
    /// Material index, 0xFFFF when the object has none
    pub material: u16,
}

impl ObjectRecord {
    pub const SIZE: usize = Placement::SIZE + 12 + 4;

    pub fn write_to<W: Write>(&self, w: &mut BinaryWriter<W>) -> io::Result<()> {
        self.placement.write_to(w)?;
        w.write_f32s(&self.scale)?;
        w.write_u16(self.mesh)?;
        w.write_u16(self.material)
    }

    pub fn read_from(r: &mut BinaryReader<'_>) -> Result<Self, DecodeError> {
        Ok(Self {
            placement: Placement::read_from(r)?,
            scale: r.read_f32_array()?,
            mesh: r.read_u16()?,
            material: r.read_u16()?,
        })
    }
}

/// Spot lamp
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LampRecord {
    pub placement: Placement,
    /// Cone angle where falloff starts
    pub inner_cone: f32,
    pub outer_cone: f32,
    pub clip_start: f32,
    pub clip_end: f32,
    pub color: [f32; 3],
}

impl LampRecord {
    pub const SIZE: usize = Placement::SIZE + 16 + 12;

    /// Derive the cone pair from a spot size and blend factor
    pub fn cone_from_spot(spot_size: f32, spot_blend: f32) -> (f32, f32) {
        (spot_size - spot_size * spot_blend, spot_size)
    }

    pub fn write_to<W: Write>(&self, w: &mut BinaryWriter<W>) -> io::Result<()> {
        self.placement.write_to(w)?;
        w.write_f32s(&[self.inner_cone, self.outer_cone, self.clip_start, self.clip_end])?;
        w.write_f32s(&self.color)
    }

    pub fn read_from(r: &mut BinaryReader<'_>) -> Result<Self, DecodeError> {
        let placement = Placement::read_from(r)?;
        let [inner_cone, outer_cone, clip_start, clip_end] = r.read_f32_array()?;
        Ok(Self {
            placement,
            inner_cone,
            outer_cone,
            clip_start,
            clip_end,
            color: r.read_f32_array()?,
        })
    }
}

/// Perspective camera
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraRecord {
    pub placement: Placement,
    /// Horizontal field of view in radians
    pub fov: f32,
    pub clip_start: f32,
    pub clip_end: f32,
    pub aspect: f32,
}

impl CameraRecord {
    pub const SIZE: usize = Placement::SIZE + 16;

    /// Horizontal field of view from focal length and sensor width (both mm)
    pub fn fov_from_lens(lens: f32, sensor_width: f32) -> f32 {
        2.0 * (sensor_width / (2.0 * lens)).atan()
    }

    pub fn write_to<W: Write>(&self, w: &mut BinaryWriter<W>) -> io::Result<()> {
        self.placement.write_to(w)?;
        w.write_f32s(&[self.fov, self.clip_start, self.clip_end, self.aspect])
    }

    pub fn read_from(r: &mut BinaryReader<'_>) -> Result<Self, DecodeError> {
        let placement = Placement::read_from(r)?;
        let [fov, clip_start, clip_end, aspect] = r.read_f32_array()?;
        Ok(Self {
            placement,
            fov,
            clip_start,
            clip_end,
            aspect,
        })
    }
}

/// One scene: three named record groups
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SceneRecord {
    pub object_names: NameIndexMap,
    pub objects: Vec<ObjectRecord>,
    pub lamp_names: NameIndexMap,
    pub lamps: Vec<LampRecord>,
    pub camera_names: NameIndexMap,
    pub cameras: Vec<CameraRecord>,
}

impl SceneRecord {
    pub fn write_to<W: Write>(&self, w: &mut BinaryWriter<W>) -> io::Result<()> {
        self.object_names.write_to(w)?;
        for object in &self.objects {
            object.write_to(w)?;
        }
        self.lamp_names.write_to(w)?;
        for lamp in &self.lamps {
            lamp.write_to(w)?;
        }
        self.camera_names.write_to(w)?;
        for camera in &self.cameras {
            camera.write_to(w)?;
        }
        Ok(())
    }

    pub fn read_from(r: &mut BinaryReader<'_>) -> Result<Self, DecodeError> {
        let object_names = NameIndexMap::read_checked(r)?;
        let objects = (0..object_names.len())
            .map(|_| ObjectRecord::read_from(r))
            .collect::<Result<Vec<_>, _>>()?;
        let lamp_names = NameIndexMap::read_checked(r)?;
        let lamps = (0..lamp_names.len())
            .map(|_| LampRecord::read_from(r))
            .collect::<Result<Vec<_>, _>>()?;
        let camera_names = NameIndexMap::read_checked(r)?;
        let cameras = (0..camera_names.len())
            .map(|_| CameraRecord::read_from(r))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            object_names,
            objects,
            lamp_names,
            lamps,
            camera_names,
            cameras,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formats::SENTINEL;

    fn encode(f: impl FnOnce(&mut BinaryWriter<Vec<u8>>) -> io::Result<()>) -> Vec<u8> {
        let mut w = BinaryWriter::new(Vec::new());
        f(&mut w).unwrap();
        w.into_inner()
    }

    #[test]
    fn test_record_sizes() {
        let object = ObjectRecord {
            placement: Placement::default(),
            scale: [1.0; 3],
            mesh: 0,
            material: SENTINEL,
        };
        let bytes = encode(|w| object.write_to(w));
        assert_eq!(bytes.len(), ObjectRecord::SIZE);
        assert_eq!(ObjectRecord::SIZE, 44);
        assert_eq!(&bytes[42..44], &[0xFF, 0xFF]);

        let lamp = LampRecord {
            placement: Placement::default(),
            inner_cone: 0.5,
            outer_cone: 1.0,
            clip_start: 0.1,
            clip_end: 100.0,
            color: [1.0, 1.0, 1.0],
        };
        assert_eq!(encode(|w| lamp.write_to(w)).len(), LampRecord::SIZE);

        let camera = CameraRecord {
            placement: Placement::default(),
            fov: 0.8,
            clip_start: 0.1,
            clip_end: 100.0,
            aspect: 1.5,
        };
        assert_eq!(encode(|w| camera.write_to(w)).len(), CameraRecord::SIZE);
    }

    #[test]
    fn test_cone_from_spot() {
        let (inner, outer) = LampRecord::cone_from_spot(1.0, 0.25);
        assert!((inner - 0.75).abs() < 1e-6);
        assert!((outer - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_fov_from_lens() {
        // 36mm sensor at 18mm focal length gives 90 degrees
        let fov = CameraRecord::fov_from_lens(18.0, 36.0);
        assert!((fov - std::f32::consts::FRAC_PI_2).abs() < 1e-5);
    }

    #[test]
    fn test_empty_scene_is_three_zero_maps() {
        let bytes = encode(|w| SceneRecord::default().write_to(w));
        assert_eq!(bytes, vec![0; 6]);
    }

    #[test]
    fn test_scene_decode() {
        let scene = SceneRecord {
            object_names: NameIndexMap::from_ordered_names(["Cube", "Floor"]),
            objects: vec![
                ObjectRecord {
                    placement: Placement::default(),
                    scale: [1.0; 3],
                    mesh: 0,
                    material: 0,
                },
                ObjectRecord {
                    placement: Placement {
                        location: [0.0, 0.0, -1.0],
                        rotation: [0.0, 0.0, 0.0, 1.0],
                    },
                    scale: [10.0, 10.0, 1.0],
                    mesh: 1,
                    material: SENTINEL,
                },
            ],
            camera_names: NameIndexMap::from_ordered_names(["Camera"]),
            cameras: vec![CameraRecord {
                placement: Placement::default(),
                fov: 0.9,
                clip_start: 0.1,
                clip_end: 50.0,
                aspect: 16.0 / 9.0,
            }],
            ..Default::default()
        };

        let bytes = encode(|w| scene.write_to(w));
        let mut r = BinaryReader::new(&bytes);
        let decoded = SceneRecord::read_from(&mut r).unwrap();
        assert!(r.is_empty());
        assert_eq!(decoded, scene);
    }
}
