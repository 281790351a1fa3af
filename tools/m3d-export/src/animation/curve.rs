//! Scalar curve evaluation

use glam::Vec2;

use crate::scene::{FCurve, Interpolation, Keyframe};

/// Bisection steps when solving a Bézier segment for its parameter
const BEZIER_ITERATIONS: usize = 32;

/// Anything that yields a value for a (fractional) frame
pub trait Curve {
    fn evaluate(&self, frame: f32) -> f32;
}

impl Curve for FCurve {
    /// Keyframes must be sorted by frame
    fn evaluate(&self, frame: f32) -> f32 {
        evaluate_keyframes(&self.keyframes, frame)
    }
}

/// Evaluate sorted keyframes at `frame`
///
/// Each segment uses the interpolation of its left key. Before the first and
/// after the last key the curve holds the end values. An empty curve is 0.
pub fn evaluate_keyframes(keys: &[Keyframe], frame: f32) -> f32 {
    let (Some(first), Some(last)) = (keys.first(), keys.last()) else {
        return 0.0;
    };
    if frame <= first.frame() {
        return first.value();
    }
    if frame >= last.frame() {
        return last.value();
    }

    let i = keys.partition_point(|k| k.frame() <= frame);
    let (k0, k1) = (&keys[i - 1], &keys[i]);

    match k0.interpolation {
        Interpolation::Constant => k0.value(),
        Interpolation::Linear => {
            let span = k1.frame() - k0.frame();
            if span <= 0.0 {
                return k1.value();
            }
            let t = (frame - k0.frame()) / span;
            k0.value() + (k1.value() - k0.value()) * t
        }
        Interpolation::Bezier => evaluate_bezier(k0, k1, frame),
    }
}

/// Cubic Bézier between two keys, using their handles
///
/// Missing handles default to the thirds of the segment (a straight line).
/// Handle frames are clamped into the segment so the curve stays a function
/// of time.
fn evaluate_bezier(k0: &Keyframe, k1: &Keyframe, frame: f32) -> f32 {
    let p0 = Vec2::from(k0.co);
    let p3 = Vec2::from(k1.co);
    let third = (p3 - p0) / 3.0;

    let mut p1 = k0.handle_right.map(Vec2::from).unwrap_or(p0 + third);
    let mut p2 = k1.handle_left.map(Vec2::from).unwrap_or(p3 - third);
    p1.x = p1.x.clamp(p0.x, p3.x);
    p2.x = p2.x.clamp(p0.x, p3.x);

    let point = |s: f32| {
        let u = 1.0 - s;
        p0 * (u * u * u) + p1 * (3.0 * u * u * s) + p2 * (3.0 * u * s * s) + p3 * (s * s * s)
    };

    // x(s) is monotonic on [0, 1] with clamped handles
    let (mut lo, mut hi) = (0.0f32, 1.0f32);
    for _ in 0..BEZIER_ITERATIONS {
        let mid = 0.5 * (lo + hi);
        if point(mid).x < frame {
            lo = mid;
        } else {
            hi = mid;
        }
    }
    point(0.5 * (lo + hi)).y
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(frame: f32, value: f32, interpolation: Interpolation) -> Keyframe {
        Keyframe::new(frame, value, interpolation)
    }

    #[test]
    fn test_empty_and_single_key() {
        assert_eq!(evaluate_keyframes(&[], 3.0), 0.0);
        let keys = [key(5.0, 2.0, Interpolation::Linear)];
        assert_eq!(evaluate_keyframes(&keys, 0.0), 2.0);
        assert_eq!(evaluate_keyframes(&keys, 9.0), 2.0);
    }

    #[test]
    fn test_linear() {
        let keys = [
            key(0.0, 0.0, Interpolation::Linear),
            key(10.0, 1.0, Interpolation::Linear),
        ];
        assert!((evaluate_keyframes(&keys, 5.0) - 0.5).abs() < 1e-6);
        assert!((evaluate_keyframes(&keys, 2.5) - 0.25).abs() < 1e-6);
        // end hold
        assert_eq!(evaluate_keyframes(&keys, -4.0), 0.0);
        assert_eq!(evaluate_keyframes(&keys, 40.0), 1.0);
    }

    #[test]
    fn test_constant_holds_left_key() {
        let keys = [
            key(0.0, 0.0, Interpolation::Constant),
            key(10.0, 1.0, Interpolation::Linear),
        ];
        assert_eq!(evaluate_keyframes(&keys, 9.9), 0.0);
        assert_eq!(evaluate_keyframes(&keys, 10.0), 1.0);
    }

    #[test]
    fn test_bezier_without_handles_is_linear() {
        let keys = [
            key(0.0, 0.0, Interpolation::Bezier),
            key(10.0, 1.0, Interpolation::Bezier),
        ];
        assert!((evaluate_keyframes(&keys, 5.0) - 0.5).abs() < 1e-4);
        assert!((evaluate_keyframes(&keys, 2.0) - 0.2).abs() < 1e-4);
    }

    #[test]
    fn test_bezier_ease() {
        let mut k0 = key(0.0, 0.0, Interpolation::Bezier);
        let mut k1 = key(10.0, 1.0, Interpolation::Bezier);
        // flat handles: ease in/out
        k0.handle_right = Some([4.0, 0.0]);
        k1.handle_left = Some([6.0, 1.0]);
        let keys = [k0, k1];

        assert!((evaluate_keyframes(&keys, 5.0) - 0.5).abs() < 1e-4);
        assert!(evaluate_keyframes(&keys, 2.0) < 0.2);
        assert!(evaluate_keyframes(&keys, 8.0) > 0.8);
    }

    #[test]
    fn test_fcurve_trait() {
        let curve = FCurve {
            data_path: "pose.bones[\"Root\"].rotation_quaternion".into(),
            array_index: 0,
            keyframes: vec![
                key(0.0, 1.0, Interpolation::Linear),
                key(4.0, 0.0, Interpolation::Linear),
            ],
        };
        assert!((curve.evaluate(1.0) - 0.75).abs() < 1e-6);
    }
}
