//! Export errors

use std::io;

/// Longest name a u16 length prefix can carry
pub const MAX_NAME_LEN: usize = u16::MAX as usize;

/// Error produced while validating or encoding a scene
///
/// Everything except [`ExportError::Io`] describes bad input and is reported
/// before the output sink is opened.
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("armature '{armature}': bone '{bone}' is part of a parent cycle")]
    CyclicBoneHierarchy { armature: String, bone: String },

    #[error("{referrer}: unresolved {kind} reference '{name}'")]
    UnresolvedReference {
        kind: &'static str,
        name: String,
        referrer: String,
    },

    #[error("mesh '{mesh}': attribute set mismatch: {reason}")]
    AttributeSetMismatch { mesh: String, reason: String },

    #[error("action '{action}' has no rotation_quaternion channels")]
    EmptyTrackList { action: String },

    #[error("mesh '{mesh}': face {face} is invalid ({corners} corners)")]
    InvalidFace {
        mesh: String,
        face: usize,
        corners: usize,
    },

    #[error("{kind} name '{prefix}...' is {len} bytes, maximum is {max}", max = MAX_NAME_LEN)]
    NameTooLong {
        kind: &'static str,
        prefix: String,
        len: usize,
    },

    #[error("{what}: count {count} exceeds maximum {max}")]
    CountOverflow {
        what: String,
        count: usize,
        max: usize,
    },

    #[error("action '{action}': key frame {frame} outside 0..65535")]
    FrameOutOfRange { action: String, frame: f32 },

    #[error("failed to write asset: {0}")]
    Io(#[from] io::Error),
}

impl ExportError {
    /// True for errors caused by the scene rather than the output sink
    pub fn is_input_error(&self) -> bool {
        !matches!(self, ExportError::Io(_))
    }

    pub(crate) fn unresolved(
        kind: &'static str,
        name: impl Into<String>,
        referrer: impl Into<String>,
    ) -> Self {
        ExportError::UnresolvedReference {
            kind,
            name: name.into(),
            referrer: referrer.into(),
        }
    }

    pub(crate) fn overflow(what: impl Into<String>, count: usize, max: usize) -> Self {
        ExportError::CountOverflow {
            what: what.into(),
            count,
            max,
        }
    }
}

/// Check that a name fits its u16 length prefix
pub(crate) fn check_name(kind: &'static str, name: &str) -> Result<(), ExportError> {
    if name.len() > MAX_NAME_LEN {
        return Err(ExportError::NameTooLong {
            kind,
            prefix: name.chars().take(32).collect(),
            len: name.len(),
        });
    }
    Ok(())
}

/// Check a count against a u16-sized limit
pub(crate) fn check_count(what: impl FnOnce() -> String, count: usize, max: usize) -> Result<u16, ExportError> {
    if count > max {
        return Err(ExportError::overflow(what(), count, max));
    }
    Ok(count as u16)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = ExportError::unresolved("mesh", "Cube", "object 'CubeObj'");
        assert_eq!(
            err.to_string(),
            "object 'CubeObj': unresolved mesh reference 'Cube'"
        );
        assert!(err.is_input_error());

        let err = ExportError::from(io::Error::new(io::ErrorKind::Other, "disk full"));
        assert!(!err.is_input_error());
    }

    #[test]
    fn test_check_count() {
        assert_eq!(check_count(|| "vertices".into(), 3, 65535).unwrap(), 3);
        assert!(matches!(
            check_count(|| "vertices".into(), 70000, 65535),
            Err(ExportError::CountOverflow { count: 70000, .. })
        ));
    }

    #[test]
    fn test_check_name() {
        assert!(check_name("mesh", &"a".repeat(MAX_NAME_LEN)).is_ok());

        let err = check_name("mesh", &"a".repeat(MAX_NAME_LEN + 1)).unwrap_err();
        assert!(matches!(err, ExportError::NameTooLong { len: 65536, .. }));
        assert_eq!(
            err.to_string(),
            format!("mesh name '{}...' is 65536 bytes, maximum is 65535", "a".repeat(32))
        );
    }
}
