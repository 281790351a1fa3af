//! Animation multiplexer
//!
//! Groups an action's quaternion channels per bone, samples each bone at the
//! union of its key times, and merges all bones into one time-ordered stream.

use glam::Vec4;
use hashbrown::HashMap;
use m3d_common::formats::{AnimationStream, AnimationStreamHeader, KeyframeRecord, MAX_TRACKS};
use std::collections::BTreeSet;

use super::channel::{parse_data_path, ROTATION_QUATERNION};
use super::curve::Curve;
use crate::error::{check_count, ExportError};
use crate::scene::{Action, FCurve};

/// Exclusive upper bound for frame numbers (0xFFFF marks end of track)
pub const MAX_FRAME: f32 = 65535.0;

/// Authoring-order (w, x, y, z) identity
const IDENTITY_WXYZ: [f32; 4] = [1.0, 0.0, 0.0, 0.0];

/// Sampled rotations of one bone
#[derive(Debug, Clone, PartialEq)]
pub struct Track {
    pub bone: String,
    /// `(frame, rotation)` in ascending frame order, rotation stored (x, y, z, w)
    pub samples: Vec<(u16, [f32; 4])>,
}

/// Integer frame of a key, checked against the stream range
fn key_frame(action: &Action, frame: f32) -> Result<u16, ExportError> {
    let floored = frame.floor();
    if !(0.0..MAX_FRAME).contains(&floored) {
        return Err(ExportError::FrameOutOfRange {
            action: action.name.clone(),
            frame,
        });
    }
    Ok(floored as u16)
}

/// Rotation channels per bone, bones in order of first appearance
fn group_channels(action: &Action) -> Vec<(String, [Option<FCurve>; 4])> {
    let mut bones: Vec<(String, [Option<FCurve>; 4])> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for fcurve in &action.fcurves {
        let Some(target) = parse_data_path(&fcurve.data_path) else {
            tracing::debug!(
                "Action '{}': skipping channel '{}'",
                action.name,
                fcurve.data_path
            );
            continue;
        };
        if target.property != ROTATION_QUATERNION {
            continue;
        }
        if fcurve.array_index > 3 {
            tracing::warn!(
                "Action '{}': ignoring quaternion component {} of bone '{}'",
                action.name,
                fcurve.array_index,
                target.bone
            );
            continue;
        }

        let slot = *index.entry(target.bone.clone()).or_insert_with(|| {
            bones.push((target.bone.clone(), Default::default()));
            bones.len() - 1
        });

        let mut sorted = fcurve.clone();
        sorted
            .keyframes
            .sort_by(|a, b| a.frame().total_cmp(&b.frame()));
        bones[slot].1[fcurve.array_index] = Some(sorted);
    }

    bones
}

/// Build one track per animated bone
pub fn build_tracks(action: &Action) -> Result<Vec<Track>, ExportError> {
    let grouped = group_channels(action);
    if grouped.is_empty() {
        return Err(ExportError::EmptyTrackList {
            action: action.name.clone(),
        });
    }
    check_count(
        || format!("action '{}' tracks", action.name),
        grouped.len(),
        MAX_TRACKS,
    )?;

    grouped
        .into_iter()
        .map(|(bone, channels)| {
            let mut times = BTreeSet::new();
            for channel in channels.iter().flatten() {
                for key in &channel.keyframes {
                    times.insert(key_frame(action, key.frame())?);
                }
            }

            let samples = times
                .into_iter()
                .map(|time| {
                    let mut wxyz = IDENTITY_WXYZ;
                    for (component, channel) in channels.iter().enumerate() {
                        if let Some(channel) = channel.as_ref().filter(|c| !c.keyframes.is_empty()) {
                            wxyz[component] = channel.evaluate(time as f32);
                        }
                    }
                    let [w, x, y, z] = wxyz;
                    let q = Vec4::new(x, y, z, w).try_normalize().unwrap_or(Vec4::W);
                    (time, q.to_array())
                })
                .collect();

            Ok(Track { bone, samples })
        })
        .collect()
}

/// Interleave tracks by time
///
/// Repeatedly takes the smallest head time over all unfinished tracks and
/// emits every track sitting on it, in track order. Once all samples are out,
/// each track gets its end-of-track record, again in track order.
pub fn merge_tracks(tracks: &[Track]) -> Vec<KeyframeRecord> {
    let total: usize = tracks.iter().map(|t| t.samples.len()).sum();
    let mut records = Vec::with_capacity(total + tracks.len());
    let mut cursors = vec![0usize; tracks.len()];

    loop {
        let head = tracks
            .iter()
            .zip(&cursors)
            .filter_map(|(track, &c)| track.samples.get(c).map(|s| s.0))
            .min();
        let Some(time) = head else {
            break;
        };

        for (i, track) in tracks.iter().enumerate() {
            if let Some(&(t, rotation)) = track.samples.get(cursors[i]) {
                if t == time {
                    records.push(KeyframeRecord::sample(i as u16, t, rotation));
                    cursors[i] += 1;
                }
            }
        }
    }

    for i in 0..tracks.len() {
        records.push(KeyframeRecord::end_of_track(i as u16));
    }
    records
}

/// Stream frame count: the end of the frame range, else the last key frame
pub fn frame_count(action: &Action, tracks: &[Track]) -> Result<u16, ExportError> {
    match action.frame_range {
        Some([_, end]) => {
            let end = end.trunc();
            if !(0.0..MAX_FRAME).contains(&end) {
                return Err(ExportError::FrameOutOfRange {
                    action: action.name.clone(),
                    frame: end,
                });
            }
            Ok(end as u16)
        }
        None => Ok(tracks
            .iter()
            .filter_map(|t| t.samples.last().map(|s| s.0))
            .max()
            .unwrap_or(0)),
    }
}

/// Encode an action as a multiplexed animation stream
pub fn encode_action(action: &Action) -> Result<AnimationStream, ExportError> {
    let tracks = build_tracks(action)?;
    let frames = frame_count(action, &tracks)?;
    let records = merge_tracks(&tracks);

    let samples = records.len() - tracks.len();
    check_count(
        || format!("action '{}' stream bytes", action.name),
        AnimationStreamHeader::body_length(samples, tracks.len()),
        u16::MAX as usize,
    )?;

    tracing::debug!(
        "Encoded action '{}': {} tracks, {} samples, {} frames",
        action.name,
        tracks.len(),
        samples,
        frames
    );

    Ok(AnimationStream::new(frames, tracks.len() as u16, records)?)
}
