//! Skeleton encoder (armature → flattened bone list)
//!
//! Bones are reordered depth-first from the roots, so every parent gets a
//! lower index than its children. Each bone stores its head relative to the
//! parent head and a single roll angle derived from its orientation.

use glam::{Mat3, Quat, Vec3};
use m3d_common::{ArmatureRecord, BoneRecord, SENTINEL};

use crate::error::{check_count, ExportError};
use crate::scene::Armature;

/// Largest bone count (0xFFFF is the "no parent" marker)
pub const MAX_BONES: usize = SENTINEL as usize;

/// |w| below which the orientation is treated as a half turn
const HALF_TURN_EPSILON: f32 = 1e-4;

/// Order bones parent-first
///
/// Returns the original bone indices in export order: depth-first from the
/// roots in declaration order, children in declaration order. Bones that are
/// never reached sit on a parent cycle.
pub fn flatten_bones(armature: &Armature) -> Result<Vec<usize>, ExportError> {
    let count = armature.bones.len();
    let mut children: Vec<Vec<usize>> = vec![Vec::new(); count];
    let mut roots = Vec::new();

    for (i, bone) in armature.bones.iter().enumerate() {
        match bone.parent {
            None => roots.push(i),
            Some(p) if p < count => children[p].push(i),
            Some(p) => {
                return Err(ExportError::unresolved(
                    "parent bone",
                    p.to_string(),
                    format!("bone '{}' in armature '{}'", bone.name, armature.name),
                ))
            }
        }
    }

    let mut order = Vec::with_capacity(count);
    let mut stack: Vec<usize> = roots.into_iter().rev().collect();
    while let Some(i) = stack.pop() {
        order.push(i);
        stack.extend(children[i].iter().rev());
    }

    if order.len() != count {
        let mut visited = vec![false; count];
        for &i in &order {
            visited[i] = true;
        }
        let stuck = visited.iter().position(|v| !v).unwrap_or(0);
        return Err(ExportError::CyclicBoneHierarchy {
            armature: armature.name.clone(),
            bone: armature.bones[stuck].name.clone(),
        });
    }

    Ok(order)
}

/// Roll angle of a bone orientation (column-major 3x3)
///
/// Scale is stripped from the columns, then the matrix is converted to a unit
/// quaternion `q` (with `w >= 0`); the roll is `2 * atan2(q.y, q.w)`, or π
/// when `q.w` is (nearly) zero.
pub fn bone_roll(matrix: &[[f32; 3]; 3]) -> f32 {
    let m = Mat3::from_cols_array_2d(matrix);
    let rotation = Mat3::from_cols(
        m.x_axis.try_normalize().unwrap_or(Vec3::X),
        m.y_axis.try_normalize().unwrap_or(Vec3::Y),
        m.z_axis.try_normalize().unwrap_or(Vec3::Z),
    );
    let mut q = Quat::from_mat3(&rotation).normalize();
    if q.w < 0.0 {
        q = -q;
    }
    if q.w.abs() < HALF_TURN_EPSILON {
        std::f32::consts::PI
    } else {
        2.0 * q.y.atan2(q.w)
    }
}

/// Encode an armature as a flattened bone list
pub fn encode_armature(armature: &Armature) -> Result<ArmatureRecord, ExportError> {
    check_count(
        || format!("armature '{}' bones", armature.name),
        armature.bones.len(),
        MAX_BONES,
    )?;

    let order = flatten_bones(armature)?;

    // original index -> export index
    let mut export_index = vec![0u16; order.len()];
    for (new, &old) in order.iter().enumerate() {
        export_index[old] = new as u16;
    }

    let bones = order
        .iter()
        .map(|&i| {
            let bone = &armature.bones[i];
            let head = Vec3::from(bone.head);
            let (parent, offset) = match bone.parent {
                Some(p) => (
                    export_index[p],
                    head - Vec3::from(armature.bones[p].head),
                ),
                None => (SENTINEL, head),
            };
            BoneRecord {
                name: bone.name.clone(),
                parent,
                offset: offset.to_array(),
                roll: bone_roll(&bone.matrix),
            }
        })
        .collect();

    tracing::debug!(
        "Encoded armature '{}': {} bones",
        armature.name,
        order.len()
    );

    Ok(ArmatureRecord { bones })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::Bone;

    const IDENTITY: [[f32; 3]; 3] = [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]];

    fn bone(name: &str, parent: Option<usize>, head: [f32; 3]) -> Bone {
        Bone {
            name: name.into(),
            parent,
            head,
            matrix: IDENTITY,
        }
    }

    fn armature(bones: Vec<Bone>) -> Armature {
        Armature {
            name: "Rig".into(),
            export: true,
            bones,
        }
    }

    #[test]
    fn test_single_root_bone() {
        let record = encode_armature(&armature(vec![bone("Root", None, [1.0, 2.0, 3.0])])).unwrap();
        assert_eq!(record.bones.len(), 1);
        assert_eq!(record.bones[0].parent, SENTINEL);
        assert_eq!(record.bones[0].offset, [1.0, 2.0, 3.0]);
        assert_eq!(record.bones[0].roll, 0.0);
    }

    #[test]
    fn test_parent_first_order_is_unchanged() {
        let arm = armature(vec![
            bone("Root", None, [0.0, 0.0, 0.0]),
            bone("Spine", Some(0), [0.0, 0.0, 1.0]),
            bone("Head", Some(1), [0.0, 0.0, 2.0]),
        ]);
        assert_eq!(flatten_bones(&arm).unwrap(), vec![0, 1, 2]);

        let record = encode_armature(&arm).unwrap();
        assert_eq!(record.bones[2].parent, 1);
        assert_eq!(record.bones[2].offset, [0.0, 0.0, 1.0]);
    }

    #[test]
    fn test_children_declared_before_parents() {
        let arm = armature(vec![
            bone("Hand", Some(2), [2.0, 0.0, 0.0]),
            bone("Root", None, [0.0, 0.0, 0.0]),
            bone("Arm", Some(1), [1.0, 0.0, 0.0]),
        ]);
        assert_eq!(flatten_bones(&arm).unwrap(), vec![1, 2, 0]);

        let record = encode_armature(&arm).unwrap();
        assert!(record.parents_precede_children());
        let names: Vec<_> = record.bones.iter().map(|b| b.name.as_str()).collect();
        assert_eq!(names, ["Root", "Arm", "Hand"]);
        assert_eq!(record.bones[2].parent, 1);
        assert_eq!(record.bones[2].offset, [1.0, 0.0, 0.0]);
    }

    #[test]
    fn test_depth_first_sibling_order() {
        let arm = armature(vec![
            bone("Root", None, [0.0; 3]),
            bone("L", Some(0), [0.0; 3]),
            bone("R", Some(0), [0.0; 3]),
            bone("L.child", Some(1), [0.0; 3]),
        ]);
        assert_eq!(flatten_bones(&arm).unwrap(), vec![0, 1, 3, 2]);
    }

    #[test]
    fn test_cycle_detected() {
        let arm = armature(vec![
            bone("Root", None, [0.0; 3]),
            bone("A", Some(2), [0.0; 3]),
            bone("B", Some(1), [0.0; 3]),
        ]);
        assert!(matches!(
            flatten_bones(&arm),
            Err(ExportError::CyclicBoneHierarchy { bone, .. }) if bone == "A"
        ));
    }

    #[test]
    fn test_parent_out_of_range() {
        let arm = armature(vec![bone("Root", Some(4), [0.0; 3])]);
        assert!(matches!(
            flatten_bones(&arm),
            Err(ExportError::UnresolvedReference { kind: "parent bone", .. })
        ));
    }

    #[test]
    fn test_roll_recovery() {
        for step in 1..30 {
            let t = step as f32 * 0.1;
            let q = Quat::from_xyzw(0.0, (t / 2.0).sin(), 0.0, (t / 2.0).cos());
            let matrix = Mat3::from_quat(q).to_cols_array_2d();
            let roll = bone_roll(&matrix);
            assert!((roll - t).abs() < 1e-4, "t={} roll={}", t, roll);
        }
    }

    #[test]
    fn test_roll_ignores_scale() {
        let q = Quat::from_rotation_y(0.7);
        let unscaled = bone_roll(&Mat3::from_quat(q).to_cols_array_2d());
        for scale in [Vec3::splat(2.5), Vec3::new(2.0, 3.0, 0.5)] {
            let matrix = (Mat3::from_quat(q) * Mat3::from_diagonal(scale)).to_cols_array_2d();
            let roll = bone_roll(&matrix);
            assert!((roll - unscaled).abs() < 1e-4, "scale={} roll={}", scale, roll);
        }
        assert!((unscaled - 0.7).abs() < 1e-4);
    }

    #[test]
    fn test_half_turn_roll() {
        // 180 degrees about X: w == 0
        let matrix = [[1.0, 0.0, 0.0], [0.0, -1.0, 0.0], [0.0, 0.0, -1.0]];
        assert_eq!(bone_roll(&matrix), std::f32::consts::PI);
    }
}
