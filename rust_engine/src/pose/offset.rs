//! 部位偏移表
//!
//! 通用姿态以玩家原点为基准，骨骼 pivot 则是模型中的绝对位置，
//! 这张表把两种约定对齐。数值必须与玩家模型保持一致，改动任何一项
//! 都会让姿态往返失配。

use glam::Vec3;

use crate::skeleton::EnumPart;

/// 单个部位的基准 pivot 与附加偏移
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PartOffset {
    pub pivot: Vec3,
    pub offset: Vec3,
}

const fn offset(pivot: [f32; 3], offset: [f32; 3]) -> PartOffset {
    PartOffset {
        pivot: Vec3::from_array(pivot),
        offset: Vec3::from_array(offset),
    }
}

const ZERO: PartOffset = offset([0.0, 0.0, 0.0], [0.0, 0.0, 0.0]);
const BASE: PartOffset = offset([0.0, -24.0, 0.0], [0.0, 0.0, 0.0]);
const RIGHT_ARM: PartOffset = offset([-5.0, -22.0, 0.0], [5.0, 2.0, 0.0]);
const LEFT_ARM: PartOffset = offset([5.0, -22.0, 0.0], [-5.0, 2.0, 0.0]);
const RIGHT_LEG: PartOffset = offset([-1.9, -12.0, 0.0], [1.9, 12.0, 0.0]);
const LEFT_LEG: PartOffset = offset([1.9, -12.0, 0.0], [-1.9, 12.0, 0.0]);
const CAPE: PartOffset = offset([0.0, -24.0, 2.0], [0.0, 0.0, -2.0]);
const LEFT_WING: PartOffset = offset([5.0, -24.0, 2.0], [-5.0, 0.0, -2.0]);
const RIGHT_WING: PartOffset = offset([-5.0, -24.0, 2.0], [5.0, 0.0, -2.0]);

impl PartOffset {
    pub const fn of(part: EnumPart) -> PartOffset {
        match part {
            EnumPart::Root => ZERO,
            EnumPart::Head
            | EnumPart::Body
            | EnumPart::LeftShoulderEntity
            | EnumPart::RightShoulderEntity => BASE,
            EnumPart::RightArm => RIGHT_ARM,
            EnumPart::LeftArm => LEFT_ARM,
            EnumPart::RightLeg => RIGHT_LEG,
            EnumPart::LeftLeg => LEFT_LEG,
            EnumPart::Cape => CAPE,
            EnumPart::LeftWing => LEFT_WING,
            EnumPart::RightWing => RIGHT_WING,
        }
    }

    /// 姿态 pivot -> 骨骼姿态偏移（Y 轴符号相反）
    pub fn pose_offset(&self, pose_pivot: Vec3) -> Vec3 {
        Vec3::new(
            pose_pivot.x + self.offset.x,
            -pose_pivot.y + self.offset.y,
            pose_pivot.z + self.offset.z,
        )
    }

    /// 全局 pivot -> 姿态 pivot，是 [`pose_offset`](Self::pose_offset) 经骨骼变换后的逆
    pub fn pose_pivot(&self, global_pivot: Vec3) -> Vec3 {
        Vec3::new(
            global_pivot.x - self.pivot.x - self.offset.x,
            global_pivot.y - self.pivot.y + self.offset.y,
            global_pivot.z - self.pivot.z - self.offset.z,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_offset_then_pivot_is_identity() {
        let pivot = Vec3::new(1.5, -3.0, 0.25);
        for part in EnumPart::ALL {
            let table = PartOffset::of(part);
            let offset = table.pose_offset(pivot);
            // 骨骼 pivot 等于表中 pivot 时，全局 pivot = pivot + (o.x, -o.y, o.z)
            let global = table.pivot + Vec3::new(offset.x, -offset.y, offset.z);
            assert!(table.pose_pivot(global).abs_diff_eq(pivot, 1.0e-5), "{part:?}");
        }
    }

    #[test]
    fn test_arm_table_is_mirrored() {
        let right = PartOffset::of(EnumPart::RightArm);
        let left = PartOffset::of(EnumPart::LeftArm);
        assert_eq!(right.pivot.x, -left.pivot.x);
        assert_eq!(right.offset.x, -left.offset.x);
        assert_eq!(right.offset.y, left.offset.y);
    }
}
