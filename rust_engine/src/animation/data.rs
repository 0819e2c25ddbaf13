//! 动画文件数据（反序列化结构）
//!
//! 与 Bedrock `animations.json` 对应，额外带有触发器列表。
//! 表达式在反序列化时解析，格式错误的文件不会进入播放阶段。

use std::collections::BTreeMap;

use serde::Deserialize;

use crate::molang::MolangVec3;

/// 动画文件
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct AnimationFile {
    #[serde(default)]
    pub animations: BTreeMap<String, AnimationData>,
    #[serde(default)]
    pub triggers: Vec<AnimationTrigger>,
}

impl AnimationFile {
    pub fn from_json(json: &str) -> crate::Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// 所有触发器（含 `onComplete` 链）引用到的动画名
    pub fn referenced_animations(&self) -> impl Iterator<Item = &str> + '_ {
        self.triggers.iter().flat_map(AnimationTrigger::chain).map(|trigger| trigger.name.as_str())
    }
}

/// 循环方式
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(try_from = "LoopValue")]
pub enum LoopMode {
    #[default]
    Once,
    Loop,
    HoldOnLastFrame,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum LoopValue {
    Flag(bool),
    Name(String),
}

impl TryFrom<LoopValue> for LoopMode {
    type Error = String;

    fn try_from(value: LoopValue) -> Result<Self, Self::Error> {
        match value {
            LoopValue::Flag(false) => Ok(LoopMode::Once),
            LoopValue::Flag(true) => Ok(LoopMode::Loop),
            LoopValue::Name(name) => match name.as_str() {
                "false" | "once" => Ok(LoopMode::Once),
                "true" | "loop" => Ok(LoopMode::Loop),
                "hold_on_last_frame" => Ok(LoopMode::HoldOnLastFrame),
                other => Err(format!("unknown loop mode `{other}`")),
            },
        }
    }
}

/// 单个动画
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct AnimationData {
    #[serde(rename = "loop", default)]
    pub loop_mode: LoopMode,
    /// 缺省时取最后一个关键帧的时间
    #[serde(default)]
    pub animation_length: Option<f32>,
    #[serde(default)]
    pub override_previous_animation: bool,
    #[serde(default)]
    pub bones: BTreeMap<String, BoneTrackData>,
    /// 时间 -> 粒子效果
    #[serde(default)]
    pub particle_effects: BTreeMap<String, OneOrMany<EffectData>>,
    /// 时间 -> 声音效果
    #[serde(default)]
    pub sound_effects: BTreeMap<String, OneOrMany<EffectData>>,
}

/// 单根骨骼的三个通道
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct BoneTrackData {
    #[serde(default)]
    pub position: Option<ChannelData>,
    #[serde(default)]
    pub rotation: Option<ChannelData>,
    #[serde(default)]
    pub scale: Option<ChannelData>,
}

/// 通道：常量表达式或按时间排列的关键帧
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum ChannelData {
    Constant(MolangVec3),
    /// 时间字符串 -> 关键帧
    Keyframes(BTreeMap<String, KeyframeData>),
}

/// 关键帧插值方式
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LerpMode {
    #[default]
    Linear,
    #[serde(alias = "catmull_rom")]
    Catmullrom,
}

/// 关键帧：单个值，或分别给出前后值
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum KeyframeData {
    Value(MolangVec3),
    Split {
        #[serde(default)]
        pre: Option<MolangVec3>,
        #[serde(default)]
        post: Option<MolangVec3>,
        #[serde(default)]
        lerp_mode: LerpMode,
    },
}

/// 粒子/声音效果
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct EffectData {
    pub effect: String,
    #[serde(default)]
    pub locator: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany<T> {
    One(T),
    Many(Vec<T>),
}

impl<T> OneOrMany<T> {
    pub fn as_slice(&self) -> &[T] {
        match self {
            OneOrMany::One(value) => std::slice::from_ref(value),
            OneOrMany::Many(values) => values,
        }
    }
}

/// 触发动画的事件类型
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AnimationEventType {
    Emote,
    Idle,
    Equip,
    Interact,
    #[serde(other)]
    Unknown,
}

/// 动画触发器
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct AnimationTrigger {
    #[serde(rename = "type")]
    pub kind: AnimationEventType,
    pub name: String,
    /// 播放次数，0 表示无限
    #[serde(default = "default_loops")]
    pub loops: u32,
    #[serde(default)]
    pub priority: i32,
    #[serde(default, rename = "onComplete")]
    pub on_complete: Option<Box<AnimationTrigger>>,
}

fn default_loops() -> u32 {
    1
}

impl AnimationTrigger {
    pub fn new(kind: AnimationEventType, name: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
            loops: default_loops(),
            priority: 0,
            on_complete: None,
        }
    }

    pub fn with_loops(mut self, loops: u32) -> Self {
        self.loops = loops;
        self
    }

    pub fn then(mut self, next: AnimationTrigger) -> Self {
        self.on_complete = Some(Box::new(next));
        self
    }

    /// 自身及其 `onComplete` 链
    pub fn chain(&self) -> impl Iterator<Item = &AnimationTrigger> + '_ {
        std::iter::successors(Some(self), |trigger| trigger.on_complete.as_deref())
    }
}
