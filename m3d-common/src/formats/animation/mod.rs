//! Animation stream format (actions section)
//!
//! One action is stored as a single multiplexed keyframe stream: the
//! per-bone rotation tracks are merged into one list ordered by time, so the
//! runtime advances one cursor instead of one per bone.
//!
//! # Layout
//! ```text
//! Header (8 bytes):
//! 0x00: byte_length u16   - bytes following this field (header rest + records + terminator)
//! 0x02: frame_count u16   - animation length in frames
//! 0x04: joint_count u16   - number of animated joints
//! 0x06: track_count u16   - number of tracks (equal to joint_count)
//!
//! Records, ordered by time, ties in track order:
//!   word u16              - (track_index << 4) | 0x1
//!   time u16              - frame number, 0xFFFF = end of track
//!   rotation f32 × 4      - x, y, z, w (absent when time == 0xFFFF)
//!
//! Terminator:
//!   0x0000 0x0000
//! ```

mod header;
mod record;
mod stream;


// Re-export public API
pub use header::AnimationStreamHeader;
pub use record::{
    KeyframeRecord, MAX_TRACKS, SAMPLE_RECORD_SIZE, SENTINEL_RECORD_SIZE, TERMINATOR_SIZE,
    TRACK_SHIFT, TRACK_TAG, pack_track_word, unpack_track_word,
};
pub use stream::AnimationStream;
