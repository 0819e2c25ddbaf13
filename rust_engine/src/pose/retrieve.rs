//! 从骨骼全局变换反推姿态

use glam::{Mat3, Mat4};

use super::{Part, PartOffset, PlayerPose};
use crate::skeleton::BoneManager;
use crate::util::{euler_zyx_to_quat, rotation_euler_zyx, MatrixEntry, MatrixStack};

impl BoneManager {
    /// 反推每个部位骨骼的姿态；没有对应骨骼的部位保留 `base` 中的值
    ///
    /// 从根骨骼前序遍历，跳过不含部位骨骼的子树。
    /// 只有祖先或自身存在缩放/残差时才计算残差矩阵。
    pub fn retrieve_pose(&self, base: &PlayerPose) -> PlayerPose {
        let mut pose = *base;
        if !self.affects_pose() {
            return pose;
        }

        let bones = self.bones();
        // (全局矩阵, 祖先或自身是否有缩放)，跳过的子树为 None
        let mut visited: Vec<Option<(Mat4, bool)>> = vec![None; bones.len()];

        for &index in self.order() {
            let bone = &bones[index];
            if !bone.affects_pose {
                continue;
            }
            let (parent_matrix, parent_scaling) = match bone.parent {
                Some(parent) => match visited[parent] {
                    Some(entry) => entry,
                    None => continue,
                },
                None => (Mat4::IDENTITY, false),
            };

            let mut stack = MatrixStack::from_entry(MatrixEntry {
                model: parent_matrix,
                normal: Mat3::IDENTITY,
            });
            bone.apply_transform(&mut stack);
            let matrix = stack.peek().model;
            let has_scaling = parent_scaling || bone.has_scaling();
            visited[index] = Some((matrix, has_scaling));

            let Some(part) = bone.pose_part() else {
                continue;
            };
            let offset = PartOffset::of(part);

            // 撤销最后的 T(-pivot) 即得到本地 pivot
            let global_pivot = matrix.transform_point3(bone.pivot);
            let global_rotation = rotation_euler_zyx(&matrix);

            let extra = has_scaling.then(|| {
                // M = R · X，其中 R 只含平移与旋转，X 为残差
                let result =
                    Mat4::from_rotation_translation(euler_zyx_to_quat(global_rotation), global_pivot);
                let expected = matrix * Mat4::from_translation(bone.pivot);
                Mat3::from_mat4(result.inverse() * expected)
            });

            if let Some(slot) = pose.part_mut(part) {
                *slot = Part {
                    pivot: offset.pose_pivot(global_pivot),
                    rotation: global_rotation,
                    extra,
                };
            }
        }

        pose
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::model::BoneDefinition;
    use crate::skeleton::EnumPart;
    use glam::{Quat, Vec3};

    fn independent_parts() -> BoneManager {
        let definitions: Vec<_> = EnumPart::ALL
            .into_iter()
            .filter(|part| part.is_pose_part())
            .map(|part| BoneDefinition::new(part.bone_name()).with_pivot(PartOffset::of(part).pivot))
            .collect();
        BoneManager::build(&definitions).0
    }

    #[test]
    fn test_round_trip_without_scale() {
        let mut manager = independent_parts();
        let pose = PlayerPose::neutral()
            .with(EnumPart::Head, Part::new(Vec3::new(0.5, -1.0, 2.0), Vec3::new(0.2, -0.4, 0.1)))
            .with(EnumPart::LeftLeg, Part::new(Vec3::new(2.0, 11.0, -1.0), Vec3::new(-0.7, 0.0, 0.3)));
        manager.apply_pose(&pose, Quat::IDENTITY, &EngineConfig::default());
        let retrieved = manager.retrieve_pose(&PlayerPose::neutral());

        for part in EnumPart::ALL.into_iter().filter(|part| part.is_pose_part()) {
            let expected = pose.part(part).unwrap();
            let actual = retrieved.part(part).unwrap();
            assert!(actual.pivot.abs_diff_eq(expected.pivot, 1.0e-4), "{part:?}");
            assert!(actual.rotation.abs_diff_eq(expected.rotation, 1.0e-4), "{part:?}");
            assert!(actual.extra.is_none(), "{part:?}");
        }
    }

    #[test]
    fn test_scaled_ancestor_produces_extra() {
        let (mut manager, _) = BoneManager::build(&[
            BoneDefinition::new("stretch").with_pivot(Vec3::new(0.0, -24.0, 0.0)),
            BoneDefinition::new("head")
                .with_parent("stretch")
                .with_pivot(Vec3::new(0.0, -24.0, 0.0)),
        ]);
        let stretch = manager.find_bone_by_name("stretch").unwrap();
        manager.get_bone_mut(stretch).unwrap().anim_scale = Vec3::new(1.0, 2.0, 1.0);
        manager.apply_pose(&PlayerPose::neutral(), Quat::IDENTITY, &EngineConfig::default());

        let pose = manager.retrieve_pose(&PlayerPose::neutral());
        let extra = pose.head.extra.unwrap();
        assert!(!extra.abs_diff_eq(Mat3::IDENTITY, 1.0e-3));
        assert!(extra.abs_diff_eq(Mat3::from_diagonal(Vec3::new(1.0, 2.0, 1.0)), 1.0e-5));
        // 其余部位没有骨骼，保持原值
        assert_eq!(pose.body, PlayerPose::neutral().body);
    }

    #[test]
    fn test_model_without_parts_returns_base() {
        let (manager, _) = BoneManager::build(&[BoneDefinition::new("sword")]);
        let base = PlayerPose::neutral().with(EnumPart::Head, Part::MISSING);
        assert_eq!(manager.retrieve_pose(&base), base);
    }
}
