//! 动画系统
//!
//! 提供 Bedrock 动画文件解析、关键帧求值、动画状态机等功能。

mod clip;
mod data;
mod keyframe;
mod state;

pub use clip::{Animation, BoneTrack, EffectKeyframe, EffectKind};
pub use data::{
    AnimationData, AnimationEventType, AnimationFile, AnimationTrigger, BoneTrackData, ChannelData, EffectData,
    KeyframeData, LerpMode, LoopMode, OneOrMany,
};
pub use keyframe::{Channel, Keyframe};
pub use state::{ActiveAnimation, FiredEffect, ModelAnimationState};
