//! 姿态往返与万向节的随机化性质测试

use cosmetics_engine::model::BoneDefinition;
use cosmetics_engine::pose::PartOffset;
use cosmetics_engine::{BoneManager, EngineConfig, EnumPart, Part, PlayerPose};
use glam::{Mat3, Mat4, Quat, Vec3};
use proptest::prelude::*;

const EPSILON: f32 = 1.0e-3;

/// 每个部位一根独立骨骼，pivot 与偏移表一致
fn independent_parts() -> BoneManager {
    let definitions: Vec<_> = pose_parts()
        .map(|part| BoneDefinition::new(part.bone_name()).with_pivot(PartOffset::of(part).pivot))
        .collect();
    BoneManager::build(&definitions).0
}

fn pose_parts() -> impl Iterator<Item = EnumPart> {
    EnumPart::ALL.into_iter().filter(|part| part.is_pose_part())
}

fn bone_matrix(manager: &BoneManager, name: &str) -> Mat4 {
    let index = manager.find_bone_by_name(name).unwrap();
    manager.global_transforms()[index].model
}

fn vec3(range: std::ops::Range<f32>) -> impl Strategy<Value = Vec3> {
    (range.clone(), range.clone(), range).prop_map(|(x, y, z)| Vec3::new(x, y, z))
}

/// 远离万向锁的欧拉角
fn angles() -> impl Strategy<Value = Vec3> {
    vec3(-1.2..1.2)
}

fn arb_part() -> impl Strategy<Value = Part> {
    (vec3(-8.0..8.0), angles()).prop_map(|(pivot, rotation)| Part::new(pivot, rotation))
}

fn arb_pose() -> impl Strategy<Value = PlayerPose> {
    (arb_part(), arb_part(), arb_part(), arb_part(), arb_part(), arb_part()).prop_map(
        |(head, body, right_arm, left_arm, right_leg, cape)| PlayerPose {
            head,
            body,
            right_arm,
            left_arm,
            right_leg,
            cape,
            ..PlayerPose::neutral()
        },
    )
}

proptest! {
    /// 无缩放时 apply 后 retrieve 得到原姿态，且没有残差
    #[test]
    fn round_trip_without_scale(pose in arb_pose()) {
        let mut manager = independent_parts();
        manager.apply_pose(&pose, Quat::IDENTITY, &EngineConfig::default());
        let retrieved = manager.retrieve_pose(&PlayerPose::neutral());

        for part in pose_parts() {
            let expected = pose.part(part).unwrap();
            let actual = retrieved.part(part).unwrap();
            prop_assert!(actual.pivot.abs_diff_eq(expected.pivot, EPSILON), "{:?}: {} vs {}", part, actual.pivot, expected.pivot);
            prop_assert!(actual.rotation.abs_diff_eq(expected.rotation, EPSILON), "{:?}: {} vs {}", part, actual.rotation, expected.rotation);
            prop_assert!(actual.extra.is_none());
        }
    }

    /// 有缩放时，把反推出的姿态（含残差）套到另一个模型上，
    /// 部位骨骼的全局变换与原模型一致，再次反推得到同一姿态
    #[test]
    fn round_trip_with_scale(
        scale in vec3(0.5..2.0),
        head in arb_part(),
    ) {
        let config = EngineConfig::default();
        let (mut stretched, _) = BoneManager::build(&[
            BoneDefinition::new("stretch").with_pivot(Vec3::new(0.0, -24.0, 0.0)),
            BoneDefinition::new("head")
                .with_parent("stretch")
                .with_pivot(Vec3::new(0.0, -24.0, 0.0)),
        ]);
        let index = stretched.find_bone_by_name("stretch").unwrap();
        stretched.get_bone_mut(index).unwrap().anim_scale = scale;
        stretched.apply_pose(&PlayerPose::neutral().with(EnumPart::Head, head), Quat::IDENTITY, &config);
        let pose = stretched.retrieve_pose(&PlayerPose::neutral());
        prop_assert!(pose.head.extra.is_some());

        let mut plain = independent_parts();
        plain.apply_pose(&pose, Quat::IDENTITY, &config);
        let expected = bone_matrix(&stretched, "head");
        let actual = bone_matrix(&plain, "head");
        prop_assert!(actual.abs_diff_eq(expected, EPSILON), "{} vs {}", actual, expected);

        let again = plain.retrieve_pose(&PlayerPose::neutral());
        prop_assert!(again.head.pivot.abs_diff_eq(pose.head.pivot, EPSILON));
        prop_assert!(again.head.rotation.abs_diff_eq(pose.head.rotation, EPSILON));
        let (extra, expected_extra) = (again.head.extra.unwrap(), pose.head.extra.unwrap());
        prop_assert!(extra.abs_diff_eq(expected_extra, EPSILON), "{} vs {}", extra, expected_extra);
    }

    /// 幼年姿态：部位缩放不算残差，旋转原样返回，头部 pivot 带上幼年下移量
    #[test]
    fn round_trip_child_pose(pose in arb_pose()) {
        let config = EngineConfig::default();
        let pose = PlayerPose { child: true, ..pose };
        let mut manager = independent_parts();
        manager.apply_pose(&pose, Quat::IDENTITY, &config);
        let retrieved = manager.retrieve_pose(&pose);
        prop_assert!(retrieved.child);

        for part in pose_parts() {
            let expected = pose.part(part).unwrap();
            let actual = retrieved.part(part).unwrap();
            let shift = if part == EnumPart::Head {
                Vec3::new(0.0, config.child_head_offset_y, 0.0)
            } else {
                Vec3::ZERO
            };
            prop_assert!(actual.pivot.abs_diff_eq(expected.pivot + shift, EPSILON), "{:?}: {} vs {}", part, actual.pivot, expected.pivot + shift);
            prop_assert!(actual.rotation.abs_diff_eq(expected.rotation, EPSILON), "{:?}: {} vs {}", part, actual.rotation, expected.rotation);
            prop_assert!(actual.extra.is_none());
        }

        let head = Mat3::from_mat4(bone_matrix(&manager, "head"));
        prop_assert!((head.x_axis.length() - config.child_head_scale).abs() < EPSILON);
        let arm = Mat3::from_mat4(bone_matrix(&manager, "right_arm"));
        prop_assert!((arm.y_axis.length() - config.child_limb_scale).abs() < EPSILON);
    }

    /// 嵌套在旋转部位下的部位：反推出的是全局姿态，
    /// 套到各部位独立的模型上得到同样的全局变换
    #[test]
    fn round_trip_nested_part(
        body_pivot in vec3(-8.0..8.0),
        body_rotation in vec3(-0.4..0.4),
        head_pivot in vec3(-8.0..8.0),
        head_rotation in vec3(-0.4..0.4),
    ) {
        let config = EngineConfig::default();
        let (mut nested, _) = BoneManager::build(&[
            BoneDefinition::new("body").with_pivot(PartOffset::of(EnumPart::Body).pivot),
            BoneDefinition::new("head")
                .with_parent("body")
                .with_pivot(PartOffset::of(EnumPart::Head).pivot),
        ]);
        let pose = PlayerPose::neutral()
            .with(EnumPart::Body, Part::new(body_pivot, body_rotation))
            .with(EnumPart::Head, Part::new(head_pivot, head_rotation));
        nested.apply_pose(&pose, Quat::IDENTITY, &config);
        let retrieved = nested.retrieve_pose(&PlayerPose::neutral());

        prop_assert!(retrieved.body.pivot.abs_diff_eq(body_pivot, EPSILON));
        prop_assert!(retrieved.body.rotation.abs_diff_eq(body_rotation, EPSILON));
        prop_assert!(retrieved.head.extra.is_none());

        let mut flat = independent_parts();
        flat.apply_pose(&retrieved, Quat::IDENTITY, &config);
        for name in ["body", "head"] {
            let expected = bone_matrix(&nested, name);
            let actual = bone_matrix(&flat, name);
            prop_assert!(actual.abs_diff_eq(expected, EPSILON), "{}: {} vs {}", name, actual, expected);
        }
    }

    /// 万向节骨骼的全局旋转与祖先旋转无关
    #[test]
    fn gimbal_ignores_ancestor_rotation(
        spin in angles(),
        arm in angles(),
        own in angles(),
    ) {
        let (mut manager, _) = BoneManager::build(&[
            BoneDefinition::new("spin").with_pivot(Vec3::new(0.0, -20.0, 0.0)),
            BoneDefinition::new("arm").with_parent("spin").with_rotation(arm),
            BoneDefinition::new("level")
                .with_parent("arm")
                .with_pivot(Vec3::new(0.0, -30.0, 4.0))
                .with_gimbal(false),
        ]);
        let index = manager.find_bone_by_name("spin").unwrap();
        manager.get_bone_mut(index).unwrap().anim_rotation = spin;
        let index = manager.find_bone_by_name("level").unwrap();
        manager.get_bone_mut(index).unwrap().anim_rotation = own;
        manager.apply_pose(&PlayerPose::neutral(), Quat::IDENTITY, &EngineConfig::default());

        let rotation = Mat3::from_mat4(bone_matrix(&manager, "level"));
        let expected = Mat3::from_quat(cosmetics_engine::util::euler_zyx_to_quat(own));
        prop_assert!(rotation.abs_diff_eq(expected, EPSILON), "{} vs {}", rotation, expected);
    }

    /// 世界万向节骨骼还抵消实体朝向（渲染端 X/Y 翻转）
    #[test]
    fn world_gimbal_follows_entity(spin in angles(), yaw in -3.0f32..3.0) {
        let (mut manager, _) = BoneManager::build(&[
            BoneDefinition::new("spin"),
            BoneDefinition::new("level").with_parent("spin").with_gimbal(true),
        ]);
        let index = manager.find_bone_by_name("spin").unwrap();
        manager.get_bone_mut(index).unwrap().anim_rotation = spin;
        manager.apply_pose(&PlayerPose::neutral(), Quat::from_rotation_y(yaw), &EngineConfig::default());

        let rotation = Mat3::from_mat4(bone_matrix(&manager, "level"));
        let expected = Mat3::from_quat(Quat::from_rotation_y(-yaw));
        prop_assert!(rotation.abs_diff_eq(expected, EPSILON), "{} vs {}", rotation, expected);
    }
}
