//! Keyframe records and track word packing

use std::io::{self, Write};

use crate::formats::primitives::{BinaryReader, BinaryWriter, DecodeError, SENTINEL};

/// Low-bit tag carried by every record word (distinguishes records from the terminator)
pub const TRACK_TAG: u16 = 0x1;

/// Bit position of the track index inside a record word
pub const TRACK_SHIFT: u32 = 4;

/// Largest number of tracks addressable by the 12-bit track index
pub const MAX_TRACKS: usize = (u16::MAX >> TRACK_SHIFT) as usize + 1;

/// Size of a record carrying a rotation (word + time + 4 × f32)
pub const SAMPLE_RECORD_SIZE: usize = 20;

/// Size of an end-of-track record (word + time)
pub const SENTINEL_RECORD_SIZE: usize = 4;

/// Size of the all-zero stream terminator
pub const TERMINATOR_SIZE: usize = 4;

/// Combine a track index with the record tag
///
/// Returns `None` if the index does not fit in 12 bits.
#[inline]
pub fn pack_track_word(track: u16) -> Option<u16> {
    if (track as usize) >= MAX_TRACKS {
        return None;
    }
    Some((track << TRACK_SHIFT) | TRACK_TAG)
}

/// Extract the track index from a record word
///
/// Returns `None` if the word does not carry the record tag.
#[inline]
pub fn unpack_track_word(word: u16) -> Option<u16> {
    if word & ((1 << TRACK_SHIFT) - 1) != TRACK_TAG {
        return None;
    }
    Some(word >> TRACK_SHIFT)
}

/// One record of the multiplexed stream
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KeyframeRecord {
    pub track: u16,
    /// Frame number, [`SENTINEL`] for end of track
    pub time: u16,
    /// Rotation quaternion in storage order (x, y, z, w); `None` for end of track
    pub rotation: Option<[f32; 4]>,
}

impl KeyframeRecord {
    pub fn sample(track: u16, time: u16, rotation: [f32; 4]) -> Self {
        Self {
            track,
            time,
            rotation: Some(rotation),
        }
    }

    pub fn end_of_track(track: u16) -> Self {
        Self {
            track,
            time: SENTINEL,
            rotation: None,
        }
    }

    pub fn is_end_of_track(&self) -> bool {
        self.time == SENTINEL
    }

    /// Encoded size in bytes
    pub fn byte_size(&self) -> usize {
        if self.is_end_of_track() {
            SENTINEL_RECORD_SIZE
        } else {
            SAMPLE_RECORD_SIZE
        }
    }

    pub fn write_to<W: Write>(&self, w: &mut BinaryWriter<W>) -> io::Result<()> {
        let word = pack_track_word(self.track).ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("track index {} exceeds {}", self.track, MAX_TRACKS - 1),
            )
        })?;
        w.write_u16(word)?;
        w.write_u16(self.time)?;
        if !self.is_end_of_track() {
            w.write_f32s(&self.rotation.unwrap_or([0.0, 0.0, 0.0, 1.0]))?;
        }
        Ok(())
    }

    /// Read one record, or `None` on the all-zero terminator
    pub fn read_from(r: &mut BinaryReader<'_>) -> Result<Option<Self>, DecodeError> {
        let offset = r.position();
        let word = r.read_u16()?;
        let time = r.read_u16()?;
        if word == 0 && time == 0 {
            return Ok(None);
        }

        let track =
            unpack_track_word(word).ok_or(DecodeError::InvalidTrackWord { word, offset })?;
        if time == SENTINEL {
            return Ok(Some(Self::end_of_track(track)));
        }
        let rotation = r.read_f32_array::<4>()?;
        Ok(Some(Self::sample(track, time, rotation)))
    }
}
