//! 姿态写入骨骼

use glam::Quat;

use super::{PartOffset, PlayerPose};
use crate::config::EngineConfig;
use crate::skeleton::{BoneManager, EnumPart};

impl BoneManager {
    /// 把姿态写入部位骨骼，然后传播万向节旋转
    ///
    /// `entity_rotation` 是实体当前朝向，只有世界万向节骨骼会用到。
    /// 动画字段需在此之前写好（幼年头部会在动画偏移上再下移）。
    pub fn apply_pose(&mut self, pose: &PlayerPose, entity_rotation: Quat, config: &EngineConfig) {
        for bone in self.bones_mut() {
            let Some(part) = bone.pose_part() else {
                continue;
            };
            let Some(value) = pose.part(part) else {
                continue;
            };
            let offset = PartOffset::of(part);

            bone.pose_rotation = value.rotation;
            bone.pose_offset = offset.pose_offset(value.pivot);
            bone.pose_extra = value.extra;
            bone.child_scale = 1.0;

            if pose.child {
                if part == EnumPart::Head {
                    bone.child_scale = config.child_head_scale;
                    bone.anim_offset.y -= config.child_head_offset_y;
                } else {
                    bone.child_scale = config.child_limb_scale;
                }
            }
        }

        let (any_gimbal, any_world_gimbal) = self.gimbal_flags();
        if any_gimbal {
            let target = if any_world_gimbal {
                // 渲染端对实体做了 X/Y 翻转
                let rotation = entity_rotation.normalize();
                Quat::from_xyzw(-rotation.x, -rotation.y, rotation.z, rotation.w)
            } else {
                Quat::IDENTITY
            };
            self.propagate_gimbal(target);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::BoneDefinition;
    use crate::pose::Part;
    use glam::Vec3;

    fn model() -> BoneManager {
        let (manager, _) = BoneManager::build(&[
            BoneDefinition::new("head").with_pivot(Vec3::new(0.0, -24.0, 0.0)),
            BoneDefinition::new("right_arm").with_pivot(Vec3::new(-5.0, -22.0, 0.0)),
            BoneDefinition::new("feather").with_parent("head"),
        ]);
        manager
    }

    #[test]
    fn test_neutral_pose_leaves_bones_at_rest() {
        let mut manager = model();
        manager.apply_pose(&PlayerPose::neutral(), Quat::IDENTITY, &EngineConfig::default());
        for bone in manager.bones() {
            assert_eq!(bone.pose_offset, Vec3::ZERO, "{}", bone.name);
            assert_eq!(bone.pose_rotation, Vec3::ZERO, "{}", bone.name);
        }
    }

    #[test]
    fn test_pose_values_are_copied_with_offsets() {
        let mut manager = model();
        let pose = PlayerPose::neutral().with(
            EnumPart::RightArm,
            Part::new(Vec3::new(-4.0, 3.0, 1.0), Vec3::new(0.5, 0.0, 0.0)),
        );
        manager.apply_pose(&pose, Quat::IDENTITY, &EngineConfig::default());

        let arm = manager.find_bone_by_part(EnumPart::RightArm).unwrap();
        let bone = manager.get_bone(arm).unwrap();
        assert!(bone.pose_offset.abs_diff_eq(Vec3::new(1.0, -1.0, 1.0), 1.0e-6));
        assert_eq!(bone.pose_rotation, Vec3::new(0.5, 0.0, 0.0));
    }

    #[test]
    fn test_child_pose_scales_parts() {
        let mut manager = model();
        let pose = PlayerPose {
            child: true,
            ..PlayerPose::neutral()
        };
        let config = EngineConfig::default();
        manager.apply_pose(&pose, Quat::IDENTITY, &config);

        let head = manager.get_bone(manager.find_bone_by_part(EnumPart::Head).unwrap()).unwrap();
        assert_eq!(head.child_scale, 0.75);
        assert_eq!(head.anim_offset.y, -8.0);
        let arm = manager.get_bone(manager.find_bone_by_part(EnumPart::RightArm).unwrap()).unwrap();
        assert_eq!(arm.child_scale, 0.5);
        let feather = manager.get_bone(manager.find_bone_by_name("feather").unwrap()).unwrap();
        assert_eq!(feather.child_scale, 1.0);
    }
}
