//! 通用玩家姿态，以及它与骨骼字段之间的双向转换
//!
//! `apply_pose` 把每个部位的 pivot/旋转/残差矩阵按固定偏移表写入骨骼，
//! `retrieve_pose` 从骨骼的全局变换反推出同样格式的姿态，
//! 两者互为逆运算，因此一个饰品的输出姿态可以作为另一个饰品的输入。

mod apply;
mod offset;
mod retrieve;

pub use offset::PartOffset;

use glam::{Mat3, Vec3};

use crate::skeleton::EnumPart;

/// 单个部位的姿态
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Part {
    pub pivot: Vec3,
    /// ZYX 欧拉角（弧度）
    pub rotation: Vec3,
    /// 无法用 pivot + 旋转表示的缩放/剪切残差
    pub extra: Option<Mat3>,
}

impl Part {
    /// 远离玩家的部位，用于无法确定是否可见的部位
    pub const MISSING: Part = Part::new(Vec3::new(0.0, 10_000.0, 0.0), Vec3::ZERO);

    pub const fn new(pivot: Vec3, rotation: Vec3) -> Self {
        Self {
            pivot,
            rotation,
            extra: None,
        }
    }

    pub fn with_extra(mut self, extra: Mat3) -> Self {
        self.extra = Some(extra);
        self
    }
}

impl Default for Part {
    fn default() -> Self {
        Self::new(Vec3::ZERO, Vec3::ZERO)
    }
}

/// 玩家姿态快照
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PlayerPose {
    pub head: Part,
    pub body: Part,
    pub right_arm: Part,
    pub left_arm: Part,
    pub right_leg: Part,
    pub left_leg: Part,
    pub right_shoulder_entity: Part,
    pub left_shoulder_entity: Part,
    pub right_wing: Part,
    pub left_wing: Part,
    pub cape: Part,
    /// 幼年模型
    pub child: bool,
}

impl PlayerPose {
    /// 所有部位处于原位（应用后骨骼姿态偏移为零）
    pub fn neutral() -> Self {
        Self {
            head: Part::default(),
            body: Part::default(),
            right_arm: Part::new(Vec3::new(-5.0, 2.0, 0.0), Vec3::ZERO),
            left_arm: Part::new(Vec3::new(5.0, 2.0, 0.0), Vec3::ZERO),
            right_leg: Part::new(Vec3::new(-1.9, 12.0, 0.0), Vec3::ZERO),
            left_leg: Part::new(Vec3::new(1.9, 12.0, 0.0), Vec3::ZERO),
            right_shoulder_entity: Part::default(),
            left_shoulder_entity: Part::default(),
            right_wing: Part::new(Vec3::new(-5.0, 0.0, 2.0), Vec3::ZERO),
            left_wing: Part::new(Vec3::new(5.0, 0.0, 2.0), Vec3::ZERO),
            cape: Part::new(Vec3::new(0.0, 0.0, 2.0), Vec3::ZERO),
            child: false,
        }
    }

    /// 中立姿态，但肩部实体、鞘翅和披风移到远处
    pub fn neutral_without_extras() -> Self {
        Self {
            right_shoulder_entity: Part::MISSING,
            left_shoulder_entity: Part::MISSING,
            right_wing: Part::MISSING,
            left_wing: Part::MISSING,
            cape: Part::MISSING,
            ..Self::neutral()
        }
    }

    /// ROOT 不属于姿态，返回 `None`
    pub fn part(&self, part: EnumPart) -> Option<&Part> {
        Some(match part {
            EnumPart::Root => return None,
            EnumPart::Head => &self.head,
            EnumPart::Body => &self.body,
            EnumPart::RightArm => &self.right_arm,
            EnumPart::LeftArm => &self.left_arm,
            EnumPart::RightLeg => &self.right_leg,
            EnumPart::LeftLeg => &self.left_leg,
            EnumPart::LeftShoulderEntity => &self.left_shoulder_entity,
            EnumPart::RightShoulderEntity => &self.right_shoulder_entity,
            EnumPart::LeftWing => &self.left_wing,
            EnumPart::RightWing => &self.right_wing,
            EnumPart::Cape => &self.cape,
        })
    }

    pub fn part_mut(&mut self, part: EnumPart) -> Option<&mut Part> {
        Some(match part {
            EnumPart::Root => return None,
            EnumPart::Head => &mut self.head,
            EnumPart::Body => &mut self.body,
            EnumPart::RightArm => &mut self.right_arm,
            EnumPart::LeftArm => &mut self.left_arm,
            EnumPart::RightLeg => &mut self.right_leg,
            EnumPart::LeftLeg => &mut self.left_leg,
            EnumPart::LeftShoulderEntity => &mut self.left_shoulder_entity,
            EnumPart::RightShoulderEntity => &mut self.right_shoulder_entity,
            EnumPart::LeftWing => &mut self.left_wing,
            EnumPart::RightWing => &mut self.right_wing,
            EnumPart::Cape => &mut self.cape,
        })
    }

    /// 替换单个部位后的新姿态
    pub fn with(mut self, part: EnumPart, value: Part) -> Self {
        if let Some(slot) = self.part_mut(part) {
            *slot = value;
        }
        self
    }
}

impl Default for PlayerPose {
    fn default() -> Self {
        Self::neutral()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_part_access() {
        let pose = PlayerPose::neutral().with(EnumPart::Cape, Part::MISSING);
        assert_eq!(pose.part(EnumPart::Cape), Some(&Part::MISSING));
        assert_eq!(pose.part(EnumPart::Root), None);
        assert_eq!(pose.part(EnumPart::LeftLeg).unwrap().pivot, Vec3::new(1.9, 12.0, 0.0));
    }

    #[test]
    fn test_neutral_pose_matches_offset_table() {
        let pose = PlayerPose::neutral();
        for part in EnumPart::ALL.into_iter().filter(|part| part.is_pose_part()) {
            let offset = PartOffset::of(part);
            let value = pose.part(part).unwrap();
            // 对应的骨骼姿态偏移为零
            assert_eq!(offset.pose_offset(value.pivot), Vec3::ZERO, "{part:?}");
        }
    }

    #[test]
    fn test_neutral_without_extras() {
        let pose = PlayerPose::neutral_without_extras();
        assert_eq!(pose.cape, Part::MISSING);
        assert_eq!(pose.head, PlayerPose::neutral().head);
    }
}
