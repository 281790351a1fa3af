//! Animation stream header structure and operations

use super::record::{SAMPLE_RECORD_SIZE, SENTINEL_RECORD_SIZE, TERMINATOR_SIZE};

/// Animation stream header (8 bytes)
///
/// Note: Not packed - we use explicit byte serialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(C)]
pub struct AnimationStreamHeader {
    /// Bytes following the `byte_length` field itself
    pub byte_length: u16,
    /// Animation length in frames
    pub frame_count: u16,
    /// Number of animated joints
    pub joint_count: u16,
    /// Number of tracks in the stream (same as `joint_count`)
    pub track_count: u16,
}

impl AnimationStreamHeader {
    pub const SIZE: usize = 8;

    /// Header bytes counted by `byte_length` (everything after that field)
    pub const COUNTED_HEADER_SIZE: usize = Self::SIZE - 2;

    pub fn new(byte_length: u16, frame_count: u16, track_count: u16) -> Self {
        Self {
            byte_length,
            frame_count,
            joint_count: track_count,
            track_count,
        }
    }

    /// Value of `byte_length` for a stream holding `sample_records` data
    /// records across `track_count` tracks (one sentinel each)
    pub fn body_length(sample_records: usize, track_count: usize) -> usize {
        Self::COUNTED_HEADER_SIZE
            + sample_records * SAMPLE_RECORD_SIZE
            + track_count * SENTINEL_RECORD_SIZE
            + TERMINATOR_SIZE
    }

    /// Write header to bytes
    pub fn to_bytes(&self) -> [u8; Self::SIZE] {
        let mut bytes = [0u8; Self::SIZE];
        bytes[0..2].copy_from_slice(&self.byte_length.to_le_bytes());
        bytes[2..4].copy_from_slice(&self.frame_count.to_le_bytes());
        bytes[4..6].copy_from_slice(&self.joint_count.to_le_bytes());
        bytes[6..8].copy_from_slice(&self.track_count.to_le_bytes());
        bytes
    }

    /// Read header from bytes
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        if bytes.len() < Self::SIZE {
            return None;
        }
        Some(Self {
            byte_length: u16::from_le_bytes([bytes[0], bytes[1]]),
            frame_count: u16::from_le_bytes([bytes[2], bytes[3]]),
            joint_count: u16::from_le_bytes([bytes[4], bytes[5]]),
            track_count: u16::from_le_bytes([bytes[6], bytes[7]]),
        })
    }

    /// Total stream size including the `byte_length` field
    pub fn stream_size(&self) -> usize {
        2 + self.byte_length as usize
    }
}
