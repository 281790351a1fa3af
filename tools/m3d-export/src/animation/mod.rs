//! Animation multiplexer
//!
//! Converts actions (per-component rotation curves) into multiplexed
//! keyframe streams.
//!
//! # Pipeline
//! ```text
//! fcurves ──group by bone──▶ 4 component curves per bone
//!         ──sample at union of key frames──▶ Track (normalized x,y,z,w)
//!         ──merge by minimum time──▶ records + end-of-track markers
//! ```

mod channel;
mod curve;
mod multiplex;


pub use channel::{bone_data_path, parse_data_path, ChannelTarget, ROTATION_QUATERNION};
pub use curve::{evaluate_keyframes, Curve};
pub use multiplex::{build_tracks, encode_action, frame_count, merge_tracks, Track, MAX_FRAME};
