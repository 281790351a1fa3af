//! Material and image records
//!
//! # Layout
//! ```text
//! Material:
//!   texture_count u16
//!   texture_count × image_index u16 (0xFFFF = no image)
//!
//! Image:
//!   name (u16 length + UTF-8)
//! ```

use std::io::{self, Write};

use super::primitives::{BinaryReader, BinaryWriter, DecodeError};

/// Material: one image index per texture slot
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MaterialRecord {
    pub image_indices: Vec<u16>,
}

impl MaterialRecord {
    pub fn write_to<W: Write>(&self, w: &mut BinaryWriter<W>) -> io::Result<()> {
        let count = u16::try_from(self.image_indices.len()).map_err(|_| {
            io::Error::new(io::ErrorKind::InvalidInput, "too many texture slots")
        })?;
        w.write_u16(count)?;
        for index in &self.image_indices {
            w.write_u16(*index)?;
        }
        Ok(())
    }

    pub fn read_from(r: &mut BinaryReader<'_>) -> Result<Self, DecodeError> {
        let count = r.read_u16()? as usize;
        let mut image_indices = Vec::with_capacity(count);
        for _ in 0..count {
            image_indices.push(r.read_u16()?);
        }
        Ok(Self { image_indices })
    }
}

/// Image: referenced by name, loaded by the runtime
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImageRecord {
    pub name: String,
}

impl ImageRecord {
    pub fn write_to<W: Write>(&self, w: &mut BinaryWriter<W>) -> io::Result<()> {
        w.write_string(&self.name)
    }

    pub fn read_from(r: &mut BinaryReader<'_>) -> Result<Self, DecodeError> {
        Ok(Self {
            name: r.read_string()?,
        })
    }
}
