//! Animation channel data paths
//!
//! Pose channels address a bone property as
//! `pose.bones["<bone>"].<property>`; quotes and backslashes inside the bone
//! name are backslash-escaped.

use regex::Regex;
use std::sync::OnceLock;

/// Property animated by rotation channels
pub const ROTATION_QUATERNION: &str = "rotation_quaternion";

/// Bone and property addressed by a data path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelTarget {
    pub bone: String,
    pub property: String,
}

fn data_path_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r#"^pose\.bones\["((?:[^"\\]|\\.)*)"\]\.([A-Za-z_][A-Za-z0-9_]*)$"#)
            .expect("data path pattern is valid")
    })
}

/// Parse a pose-bone data path; `None` for any other path
pub fn parse_data_path(path: &str) -> Option<ChannelTarget> {
    let captures = data_path_pattern().captures(path)?;
    Some(ChannelTarget {
        bone: unescape(&captures[1]),
        property: captures[2].to_string(),
    })
}

/// Build the data path for `property` of `bone`
pub fn bone_data_path(bone: &str, property: &str) -> String {
    format!("pose.bones[\"{}\"].{}", escape(bone), property)
}

fn escape(name: &str) -> String {
    name.replace('\\', "\\\\").replace('"', "\\\"")
}

fn unescape(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut chars = name.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(next) = chars.next() {
                out.push(next);
                continue;
            }
        }
        out.push(c);
    }
    out
}
