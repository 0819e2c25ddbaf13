//! 饰品属性
//!
//! 以 `type` 字段区分的属性列表，未知类型保留为 [`CosmeticProperty::Unknown`]。

use std::collections::{BTreeMap, BTreeSet};

use glam::Vec3;
use serde::{Deserialize, Deserializer};

use crate::skeleton::Side;

/// 单个饰品属性
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CosmeticProperty {
    ArmorHandling {
        #[serde(default)]
        id: Option<String>,
        #[serde(default = "enabled")]
        enabled: bool,
        data: BodyRegions,
    },
    CosmeticBoneHiding {
        /// 受影响的饰品
        id: String,
        #[serde(default = "enabled")]
        enabled: bool,
        data: BodyRegions,
    },
    PositionRange {
        #[serde(default)]
        id: Option<String>,
        #[serde(default = "enabled")]
        enabled: bool,
        data: PositionRangeData,
    },
    ExternalHiddenBone {
        /// 受影响的饰品
        id: String,
        #[serde(default = "enabled")]
        enabled: bool,
        #[serde(deserialize_with = "hidden_bones")]
        data: BTreeSet<String>,
    },
    InterruptsEmote {
        #[serde(default)]
        id: Option<String>,
        #[serde(default = "enabled")]
        enabled: bool,
        data: InterruptsEmoteData,
    },
    LocksPlayerRotation {
        #[serde(default)]
        id: Option<String>,
        #[serde(default = "enabled")]
        enabled: bool,
        data: LocksPlayerRotationData,
    },
    PreviewResetTime {
        #[serde(default)]
        id: Option<String>,
        #[serde(default = "enabled")]
        enabled: bool,
        data: TimeData<f64>,
    },
    TransitionDelay {
        #[serde(default)]
        id: Option<String>,
        #[serde(default = "enabled")]
        enabled: bool,
        /// 毫秒
        data: TimeData<i64>,
    },
    DefaultSide {
        #[serde(default)]
        id: Option<String>,
        #[serde(default = "enabled")]
        enabled: bool,
        data: DefaultSideData,
    },
    #[serde(other)]
    Unknown,
}

fn enabled() -> bool {
    true
}

impl CosmeticProperty {
    /// 解析属性数组，兼容历史拼写错误 `COSEMTIC`
    pub fn from_json_array(json: &str) -> crate::Result<Vec<CosmeticProperty>> {
        Ok(serde_json::from_str(&json.replace("COSEMTIC", "COSMETIC"))?)
    }

    pub fn from_json(json: &str) -> crate::Result<CosmeticProperty> {
        Ok(serde_json::from_str(&json.replace("COSEMTIC", "COSMETIC"))?)
    }

    pub fn is_enabled(&self) -> bool {
        match self {
            CosmeticProperty::ArmorHandling { enabled, .. }
            | CosmeticProperty::CosmeticBoneHiding { enabled, .. }
            | CosmeticProperty::PositionRange { enabled, .. }
            | CosmeticProperty::ExternalHiddenBone { enabled, .. }
            | CosmeticProperty::InterruptsEmote { enabled, .. }
            | CosmeticProperty::LocksPlayerRotation { enabled, .. }
            | CosmeticProperty::PreviewResetTime { enabled, .. }
            | CosmeticProperty::TransitionDelay { enabled, .. }
            | CosmeticProperty::DefaultSide { enabled, .. } => *enabled,
            CosmeticProperty::Unknown => false,
        }
    }
}

/// 按身体区域的开关
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct BodyRegions {
    pub head: bool,
    pub arms: bool,
    pub body: bool,
    pub legs: bool,
}

/// 用户可调整的位置范围，缺省的边界不限制
#[derive(Clone, Copy, Debug, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct PositionRangeData {
    pub x_min: Option<f32>,
    pub x_max: Option<f32>,
    pub y_min: Option<f32>,
    pub y_max: Option<f32>,
    pub z_min: Option<f32>,
    pub z_max: Option<f32>,
}

impl PositionRangeData {
    /// 将位置调整限制在范围内
    pub fn clamp(&self, adjustment: Vec3) -> Vec3 {
        Vec3::new(
            clamp_axis(adjustment.x, self.x_min, self.x_max),
            clamp_axis(adjustment.y, self.y_min, self.y_max),
            clamp_axis(adjustment.z, self.z_min, self.z_max),
        )
    }
}

fn clamp_axis(value: f32, min: Option<f32>, max: Option<f32>) -> f32 {
    let value = min.map_or(value, |min| value.max(min));
    max.map_or(value, |max| value.min(max))
}

#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct InterruptsEmoteData {
    #[serde(rename = "MOVEMENT")]
    pub movement: bool,
    /// 开始后的这段时间内（毫秒）忽略移动
    #[serde(rename = "MOVEMENT_ACTIVE_AFTER")]
    pub movement_grace_time: f64,
    #[serde(rename = "ATTACK")]
    pub attack: bool,
    #[serde(rename = "DAMAGED")]
    pub damaged: bool,
    #[serde(rename = "ARM_SWING")]
    pub arm_swing: bool,
}

impl Default for InterruptsEmoteData {
    fn default() -> Self {
        Self {
            movement: false,
            movement_grace_time: 0.0,
            attack: true,
            damaged: false,
            arm_swing: true,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LocksPlayerRotationData {
    #[serde(rename = "ROTATION_LOCK")]
    pub rotation_lock: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
pub struct TimeData<T> {
    pub time: T,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
pub struct DefaultSideData {
    pub side: Side,
}

/// `{ "bone": true, ... }` 中值为 true 的骨骼名
fn hidden_bones<'de, D: Deserializer<'de>>(deserializer: D) -> Result<BTreeSet<String>, D::Error> {
    let map = BTreeMap::<String, serde_json::Value>::deserialize(deserializer)?;
    Ok(map
        .into_iter()
        .filter(|(_, value)| match value {
            serde_json::Value::Bool(flag) => *flag,
            serde_json::Value::String(text) => text.eq_ignore_ascii_case("true"),
            _ => false,
        })
        .map(|(bone, _)| bone)
        .collect())
}
