//! 身体部位与左右侧标记

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// 骨骼可绑定的语义部位
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EnumPart {
    Root,
    Head,
    Body,
    RightArm,
    LeftArm,
    RightLeg,
    LeftLeg,
    LeftShoulderEntity,
    RightShoulderEntity,
    LeftWing,
    RightWing,
    Cape,
}

impl EnumPart {
    pub const ALL: [EnumPart; 12] = [
        EnumPart::Root,
        EnumPart::Head,
        EnumPart::Body,
        EnumPart::RightArm,
        EnumPart::LeftArm,
        EnumPart::RightLeg,
        EnumPart::LeftLeg,
        EnumPart::LeftShoulderEntity,
        EnumPart::RightShoulderEntity,
        EnumPart::LeftWing,
        EnumPart::RightWing,
        EnumPart::Cape,
    ];

    /// 模型文件中约定的骨骼名
    pub fn bone_name(self) -> &'static str {
        match self {
            EnumPart::Root => "root",
            EnumPart::Head => "head",
            EnumPart::Body => "body",
            EnumPart::RightArm => "right_arm",
            EnumPart::LeftArm => "left_arm",
            EnumPart::RightLeg => "right_leg",
            EnumPart::LeftLeg => "left_leg",
            EnumPart::LeftShoulderEntity => "left_shoulder_entity",
            EnumPart::RightShoulderEntity => "right_shoulder_entity",
            EnumPart::LeftWing => "left_wing",
            EnumPart::RightWing => "right_wing",
            EnumPart::Cape => "cape",
        }
    }

    /// 根据骨骼名识别部位（不区分大小写）
    pub fn from_bone_name(name: &str) -> Option<EnumPart> {
        EnumPart::ALL
            .into_iter()
            .find(|part| part.bone_name().eq_ignore_ascii_case(name))
    }

    /// 是否参与姿态读写（ROOT 只用于层级）
    pub fn is_pose_part(self) -> bool {
        self != EnumPart::Root
    }
}

/// 左右侧变体
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Side {
    Left,
    Right,
}

impl Side {
    /// 模型声明了侧面选项但没有指定时使用的侧面
    pub fn default_side_or_none(options: &BTreeSet<Side>) -> Option<Side> {
        if options.contains(&Side::Left) {
            Some(Side::Left)
        } else {
            options.iter().next().copied()
        }
    }
}
