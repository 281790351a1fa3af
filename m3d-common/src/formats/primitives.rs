//! Little-endian binary primitives
//!
//! Every `.m3d` field is one of three primitives:
//! - `u16` little-endian
//! - `f32` little-endian
//! - length-prefixed UTF-8 string (`len: u16` followed by `len` raw bytes, no terminator)
//!
//! [`BinaryWriter`] appends them to any [`Write`] sink without seeking;
//! [`BinaryReader`] decodes them from a byte slice.

use std::io::{self, Write};

/// Reserved value meaning "no parent", "end of track" or "unresolved reference"
pub const SENTINEL: u16 = 0xFFFF;

/// Append-only little-endian writer over an output sink
#[derive(Debug)]
pub struct BinaryWriter<W: Write> {
    inner: W,
    written: u64,
}

impl<W: Write> BinaryWriter<W> {
    pub fn new(inner: W) -> Self {
        Self { inner, written: 0 }
    }

    /// Total bytes written through this writer
    pub fn bytes_written(&self) -> u64 {
        self.written
    }

    pub fn write_u16(&mut self, value: u16) -> io::Result<()> {
        self.write_raw(&value.to_le_bytes())
    }

    pub fn write_f32(&mut self, value: f32) -> io::Result<()> {
        self.write_raw(&value.to_le_bytes())
    }

    pub fn write_f32s(&mut self, values: &[f32]) -> io::Result<()> {
        for v in values {
            self.write_f32(*v)?;
        }
        Ok(())
    }

    /// Write a `u16` byte-length prefix followed by the UTF-8 bytes of `s`
    pub fn write_string(&mut self, s: &str) -> io::Result<()> {
        let bytes = s.as_bytes();
        let len = u16::try_from(bytes.len()).map_err(|_| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("string of {} bytes exceeds u16 length prefix", bytes.len()),
            )
        })?;
        self.write_u16(len)?;
        self.write_raw(bytes)
    }

    /// Write bytes verbatim (already encoded data such as packed vertices)
    pub fn write_raw(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.inner.write_all(bytes)?;
        self.written += bytes.len() as u64;
        Ok(())
    }

    pub fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }

    pub fn into_inner(self) -> W {
        self.inner
    }
}

/// Error produced while decoding `.m3d` data
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    #[error("unexpected end of data at offset {offset}: needed {needed} bytes, {available} available")]
    UnexpectedEof {
        offset: usize,
        needed: usize,
        available: usize,
    },

    #[error("invalid UTF-8 string at offset {offset}")]
    InvalidUtf8 { offset: usize },

    #[error("expected separator {expected:?}, found {found:?}")]
    InvalidSeparator { expected: String, found: String },

    #[error("invalid track word {word:#06x} at offset {offset}")]
    InvalidTrackWord { word: u16, offset: usize },

    #[error("vertex data of {len} bytes is not a multiple of stride {stride}")]
    InvalidStride { len: usize, stride: usize },

    #[error("name table indices are not a permutation of 0..{count}")]
    InvalidNameIndex { count: usize },

    #[error("{0} trailing bytes after last section")]
    TrailingBytes(usize),
}

/// Cursor over a byte slice decoding little-endian primitives
#[derive(Debug, Clone)]
pub struct BinaryReader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> BinaryReader<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    /// Current offset from the start of the slice
    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.bytes.len() - self.pos
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    pub fn read_bytes(&mut self, len: usize) -> Result<&'a [u8], DecodeError> {
        if self.remaining() < len {
            return Err(DecodeError::UnexpectedEof {
                offset: self.pos,
                needed: len,
                available: self.remaining(),
            });
        }
        let slice = &self.bytes[self.pos..self.pos + len];
        self.pos += len;
        Ok(slice)
    }

    pub fn read_u16(&mut self) -> Result<u16, DecodeError> {
        let b = self.read_bytes(2)?;
        Ok(u16::from_le_bytes([b[0], b[1]]))
    }

    /// Read a `u16` without advancing
    pub fn peek_u16(&self) -> Result<u16, DecodeError> {
        self.clone().read_u16()
    }

    pub fn read_f32(&mut self) -> Result<f32, DecodeError> {
        let b = self.read_bytes(4)?;
        Ok(f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    pub fn read_f32_array<const N: usize>(&mut self) -> Result<[f32; N], DecodeError> {
        let mut out = [0.0f32; N];
        for v in out.iter_mut() {
            *v = self.read_f32()?;
        }
        Ok(out)
    }

    pub fn read_string(&mut self) -> Result<String, DecodeError> {
        let len = self.read_u16()? as usize;
        let offset = self.pos;
        let bytes = self.read_bytes(len)?;
        std::str::from_utf8(bytes)
            .map(str::to_owned)
            .map_err(|_| DecodeError::InvalidUtf8 { offset })
    }
}
