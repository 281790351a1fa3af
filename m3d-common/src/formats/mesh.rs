//! Mesh record (meshes section)
//!
//! Vertices are tightly packed f32 records whose layout is given by the
//! mesh's attribute list (see [`crate::packing`]). Indices form a triangle
//! list; quads are split by the encoder before they get here.
//!
//! # Layout
//! ```text
//! 0x00: stride u16
//! 0x02: vertex_count u16
//! 0x04: vertex_data (vertex_count × stride)
//! var:  index_count u16
//! var:  index_data (index_count × u16)
//! ```

use std::io::{self, Write};

use super::primitives::{BinaryReader, BinaryWriter, DecodeError};

/// Mesh header (4 bytes)
///
/// # Example
///
/// ```
/// use m3d_common::formats::MeshHeader;
///
/// let header = MeshHeader::new(32, 3);
/// let bytes = header.to_bytes();
/// assert_eq!(bytes, [32, 0, 3, 0]);
/// assert_eq!(MeshHeader::from_bytes(&bytes), Some(header));
/// assert_eq!(header.vertex_data_size(), 96);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(C)]
pub struct MeshHeader {
    /// Bytes per vertex record
    pub stride: u16,
    pub vertex_count: u16,
}

impl MeshHeader {
    pub const SIZE: usize = 4;

    pub fn new(stride: u16, vertex_count: u16) -> Self {
        Self {
            stride,
            vertex_count,
        }
    }

    /// Write header to bytes
    pub fn to_bytes(&self) -> [u8; Self::SIZE] {
        let mut bytes = [0u8; Self::SIZE];
        bytes[0..2].copy_from_slice(&self.stride.to_le_bytes());
        bytes[2..4].copy_from_slice(&self.vertex_count.to_le_bytes());
        bytes
    }

    /// Read header from bytes
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        if bytes.len() < Self::SIZE {
            return None;
        }
        Some(Self {
            stride: u16::from_le_bytes([bytes[0], bytes[1]]),
            vertex_count: u16::from_le_bytes([bytes[2], bytes[3]]),
        })
    }

    /// Size of the vertex data following the header
    pub fn vertex_data_size(&self) -> usize {
        self.stride as usize * self.vertex_count as usize
    }
}

/// A complete encoded mesh
#[derive(Debug, Clone, PartialEq)]
pub struct MeshRecord {
    pub stride: u16,
    /// Packed vertex records (`vertex_count × stride` bytes)
    pub vertex_data: Vec<u8>,
    /// Triangle list
    pub indices: Vec<u16>,
}

impl MeshRecord {
    pub fn vertex_count(&self) -> usize {
        if self.stride == 0 {
            0
        } else {
            self.vertex_data.len() / self.stride as usize
        }
    }

    /// Raw bytes of vertex `i`
    pub fn vertex(&self, i: usize) -> Option<&[u8]> {
        let stride = self.stride as usize;
        self.vertex_data.get(i * stride..(i + 1) * stride)
    }

    /// Vertex `i` decoded as f32 values
    pub fn vertex_floats(&self, i: usize) -> Option<Vec<f32>> {
        self.vertex(i).map(|bytes| {
            bytes
                .chunks_exact(4)
                .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
                .collect()
        })
    }

    /// Triangles as index triples
    pub fn triangles(&self) -> impl Iterator<Item = [u16; 3]> + '_ {
        self.indices.chunks_exact(3).map(|t| [t[0], t[1], t[2]])
    }

    pub fn write_to<W: Write>(&self, w: &mut BinaryWriter<W>) -> io::Result<()> {
        let vertex_count = u16::try_from(self.vertex_count()).map_err(|_| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("mesh has {} vertices, maximum is 65535", self.vertex_count()),
            )
        })?;
        let index_count = u16::try_from(self.indices.len()).map_err(|_| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("mesh has {} indices, maximum is 65535", self.indices.len()),
            )
        })?;

        let header = MeshHeader::new(self.stride, vertex_count);
        w.write_raw(&header.to_bytes())?;
        w.write_raw(&self.vertex_data)?;

        w.write_u16(index_count)?;
        for i in &self.indices {
            w.write_u16(*i)?;
        }
        Ok(())
    }

    pub fn read_from(r: &mut BinaryReader<'_>) -> Result<Self, DecodeError> {
        let offset = r.position();
        let header_bytes = r.read_bytes(MeshHeader::SIZE)?;
        let header = MeshHeader::from_bytes(header_bytes).ok_or(DecodeError::UnexpectedEof {
            offset,
            needed: MeshHeader::SIZE,
            available: header_bytes.len(),
        })?;

        let vertex_data = r.read_bytes(header.vertex_data_size())?.to_vec();
        if header.stride % 4 != 0 {
            return Err(DecodeError::InvalidStride {
                len: vertex_data.len(),
                stride: header.stride as usize,
            });
        }

        let index_count = r.read_u16()? as usize;
        let mut indices = Vec::with_capacity(index_count);
        for _ in 0..index_count {
            indices.push(r.read_u16()?);
        }

        Ok(Self {
            stride: header.stride,
            vertex_data,
            indices,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mesh_header_roundtrip() {
        let header = MeshHeader::new(32, 3);
        let bytes = header.to_bytes();
        assert_eq!(bytes, [32, 0, 3, 0]);
        assert_eq!(MeshHeader::from_bytes(&bytes), Some(header));
        assert_eq!(header.vertex_data_size(), 96);
    }

    #[test]
    fn test_mesh_header_from_short_bytes() {
        assert!(MeshHeader::from_bytes(&[0u8; 3]).is_none());
    }

    #[test]
    fn test_mesh_record_decode() {
        let vertex_data: Vec<u8> = [1.0f32, 2.0, 3.0, 4.0, 5.0, 6.0]
            .iter()
            .flat_map(|f| f.to_le_bytes())
            .collect();
        let record = MeshRecord {
            stride: 12,
            vertex_data,
            indices: vec![0, 1, 0],
        };

        let mut w = BinaryWriter::new(Vec::new());
        record.write_to(&mut w).unwrap();
        let bytes = w.into_inner();
        assert_eq!(bytes.len(), 4 + 24 + 2 + 6);

        let mut r = BinaryReader::new(&bytes);
        let decoded = MeshRecord::read_from(&mut r).unwrap();
        assert!(r.is_empty());
        assert_eq!(decoded.vertex_count(), 2);
        assert_eq!(decoded.vertex_floats(1).unwrap(), vec![4.0, 5.0, 6.0]);
        assert_eq!(decoded.triangles().collect::<Vec<_>>(), vec![[0, 1, 0]]);
    }

    #[test]
    fn test_truncated_vertex_data() {
        // stride 12, 2 vertices promised, only 12 bytes present
        let mut bytes = vec![12, 0, 2, 0];
        bytes.extend_from_slice(&[0u8; 12]);
        let mut r = BinaryReader::new(&bytes);
        assert!(matches!(
            MeshRecord::read_from(&mut r),
            Err(DecodeError::UnexpectedEof { offset: 4, .. })
        ));
    }
}
