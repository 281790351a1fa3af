//! Whole-stream encode/decode

use std::io::{self, Write};

use super::header::AnimationStreamHeader;
use super::record::KeyframeRecord;
use crate::formats::primitives::{BinaryReader, BinaryWriter, DecodeError};

/// A decoded (or ready-to-write) animation stream
#[derive(Debug, Clone, PartialEq)]
pub struct AnimationStream {
    pub header: AnimationStreamHeader,
    /// Records in stream order, without the terminator
    pub records: Vec<KeyframeRecord>,
}

impl AnimationStream {
    /// Build a stream, computing `byte_length` from the records
    ///
    /// Fails if the stream does not fit in the u16 length field.
    pub fn new(frame_count: u16, track_count: u16, records: Vec<KeyframeRecord>) -> io::Result<Self> {
        let body: usize = AnimationStreamHeader::COUNTED_HEADER_SIZE
            + records.iter().map(KeyframeRecord::byte_size).sum::<usize>()
            + super::TERMINATOR_SIZE;
        let byte_length = u16::try_from(body).map_err(|_| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("animation stream of {} bytes exceeds u16 length field", body),
            )
        })?;
        Ok(Self {
            header: AnimationStreamHeader::new(byte_length, frame_count, track_count),
            records,
        })
    }

    pub fn write_to<W: Write>(&self, w: &mut BinaryWriter<W>) -> io::Result<()> {
        w.write_raw(&self.header.to_bytes())?;
        for record in &self.records {
            record.write_to(w)?;
        }
        // end of stream
        w.write_u16(0)?;
        w.write_u16(0)
    }

    pub fn read_from(r: &mut BinaryReader<'_>) -> Result<Self, DecodeError> {
        let offset = r.position();
        let header_bytes = r.read_bytes(AnimationStreamHeader::SIZE)?;
        let header =
            AnimationStreamHeader::from_bytes(header_bytes).ok_or(DecodeError::UnexpectedEof {
                offset,
                needed: AnimationStreamHeader::SIZE,
                available: header_bytes.len(),
            })?;

        let mut records = Vec::new();
        while let Some(record) = KeyframeRecord::read_from(r)? {
            records.push(record);
        }

        Ok(Self { header, records })
    }

    /// Records belonging to one track, in stream order
    pub fn track_records(&self, track: u16) -> impl Iterator<Item = &KeyframeRecord> + '_ {
        self.records.iter().filter(move |r| r.track == track)
    }

    /// Number of records carrying rotation data
    pub fn sample_count(&self) -> usize {
        self.records.iter().filter(|r| !r.is_end_of_track()).count()
    }

    /// Number of end-of-track records
    pub fn end_of_track_count(&self) -> usize {
        self.records.iter().filter(|r| r.is_end_of_track()).count()
    }
}
