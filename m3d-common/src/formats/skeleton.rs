//! Armature record (armatures section)
//!
//! Bones are stored flattened, parents before children, so a parent index
//! always refers to an already-read bone. The runtime rebuilds each bone's
//! orientation from its head offset plus a single roll angle.
//!
//! # Layout
//! ```text
//! bone_count u16
//! bone_count × {
//!     name        (u16 length + UTF-8)
//!     parent      u16 (0xFFFF = root)
//!     offset      f32 × 3 (head − parent head, or absolute head for roots)
//!     roll        f32 (radians)
//! }
//! ```

use std::io::{self, Write};

use super::primitives::{BinaryReader, BinaryWriter, DecodeError, SENTINEL};

/// One encoded bone
#[derive(Debug, Clone, PartialEq)]
pub struct BoneRecord {
    pub name: String,
    /// Parent bone index, [`SENTINEL`] for roots
    pub parent: u16,
    pub offset: [f32; 3],
    pub roll: f32,
}

impl BoneRecord {
    pub fn is_root(&self) -> bool {
        self.parent == SENTINEL
    }

    pub fn write_to<W: Write>(&self, w: &mut BinaryWriter<W>) -> io::Result<()> {
        w.write_string(&self.name)?;
        w.write_u16(self.parent)?;
        w.write_f32s(&self.offset)?;
        w.write_f32(self.roll)
    }

    pub fn read_from(r: &mut BinaryReader<'_>) -> Result<Self, DecodeError> {
        Ok(Self {
            name: r.read_string()?,
            parent: r.read_u16()?,
            offset: r.read_f32_array()?,
            roll: r.read_f32()?,
        })
    }
}

/// A complete encoded armature
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ArmatureRecord {
    pub bones: Vec<BoneRecord>,
}

impl ArmatureRecord {
    pub fn write_to<W: Write>(&self, w: &mut BinaryWriter<W>) -> io::Result<()> {
        let count = u16::try_from(self.bones.len()).map_err(|_| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("armature has {} bones, maximum is 65534", self.bones.len()),
            )
        })?;
        w.write_u16(count)?;
        for bone in &self.bones {
            bone.write_to(w)?;
        }
        Ok(())
    }

    pub fn read_from(r: &mut BinaryReader<'_>) -> Result<Self, DecodeError> {
        let count = r.read_u16()? as usize;
        let mut bones = Vec::with_capacity(count);
        for _ in 0..count {
            bones.push(BoneRecord::read_from(r)?);
        }
        Ok(Self { bones })
    }

    /// True if every parent index refers to an earlier bone
    pub fn parents_precede_children(&self) -> bool {
        self.bones
            .iter()
            .enumerate()
            .all(|(i, b)| b.is_root() || (b.parent as usize) < i)
    }
}
