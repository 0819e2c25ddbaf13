//! 动画关键帧与通道求值

use glam::Vec3;

use super::data::{ChannelData, KeyframeData, LerpMode};
use crate::diagnostic::Diagnostic;
use crate::molang::{MolangContext, MolangVec3};

/// 单个关键帧
#[derive(Clone, Debug, PartialEq)]
pub struct Keyframe {
    pub time: f32,
    /// 到达该帧前的值
    pub pre: MolangVec3,
    /// 离开该帧后的值
    pub post: MolangVec3,
    pub lerp_mode: LerpMode,
}

impl Keyframe {
    pub fn new(time: f32, value: MolangVec3) -> Self {
        Self {
            time,
            pre: value.clone(),
            post: value,
            lerp_mode: LerpMode::Linear,
        }
    }

    fn from_data(time: f32, data: &KeyframeData) -> Self {
        match data {
            KeyframeData::Value(value) => Self::new(time, value.clone()),
            KeyframeData::Split { pre, post, lerp_mode } => {
                // 只给出一侧时两侧相同
                let pre_value = pre.clone().or_else(|| post.clone()).unwrap_or_default();
                let post_value = post.clone().unwrap_or_else(|| pre_value.clone());
                Self {
                    time,
                    pre: pre_value,
                    post: post_value,
                    lerp_mode: *lerp_mode,
                }
            }
        }
    }
}

/// 一个通道（位置/旋转/缩放）
#[derive(Clone, Debug, PartialEq)]
pub enum Channel {
    Constant(MolangVec3),
    /// 按时间升序
    Keyframes(Vec<Keyframe>),
}

impl Channel {
    /// 从文件数据构建，无法解析的时间键被跳过并记录诊断
    pub fn from_data(data: &ChannelData, diagnostics: &mut Vec<Diagnostic>) -> Self {
        match data {
            ChannelData::Constant(value) => Channel::Constant(value.clone()),
            ChannelData::Keyframes(map) => {
                let mut keyframes: Vec<Keyframe> = map
                    .iter()
                    .filter_map(|(key, value)| match parse_time(key) {
                        Some(time) => Some(Keyframe::from_data(time, value)),
                        None => {
                            diagnostics.push(Diagnostic::warning(format!(
                                "Keyframe time `{key}` is not a valid number, keyframe ignored."
                            )));
                            None
                        }
                    })
                    .collect();
                keyframes.sort_by(|a, b| a.time.total_cmp(&b.time));
                Channel::Keyframes(keyframes)
            }
        }
    }

    /// 最后一个关键帧的时间
    pub fn last_time(&self) -> Option<f32> {
        match self {
            Channel::Constant(_) => None,
            Channel::Keyframes(keyframes) => keyframes.last().map(|keyframe| keyframe.time),
        }
    }

    /// 求通道在动画时间 `time` 的值
    pub fn eval(&self, time: f32, context: &MolangContext<'_>) -> Vec3 {
        let keyframes = match self {
            Channel::Constant(value) => return value.eval(context),
            Channel::Keyframes(keyframes) => keyframes,
        };
        let (Some(first), Some(last)) = (keyframes.first(), keyframes.last()) else {
            return Vec3::ZERO;
        };
        if time <= first.time {
            return first.pre.eval(context);
        }
        if time >= last.time {
            return last.post.eval(context);
        }

        // 第一个时间大于 time 的关键帧，前面至少有一个
        let next = keyframes.partition_point(|keyframe| keyframe.time <= time);
        let from = &keyframes[next - 1];
        let to = &keyframes[next];
        let span = to.time - from.time;
        let alpha = if span > 0.0 { (time - from.time) / span } else { 1.0 };

        let start = from.post.eval(context);
        let end = to.pre.eval(context);
        if from.lerp_mode == LerpMode::Catmullrom || to.lerp_mode == LerpMode::Catmullrom {
            let before = keyframes
                .get(next.wrapping_sub(2))
                .map_or(start, |keyframe| keyframe.post.eval(context));
            let after = keyframes.get(next + 1).map_or(end, |keyframe| keyframe.pre.eval(context));
            catmull_rom(before, start, end, after, alpha)
        } else {
            start.lerp(end, alpha)
        }
    }
}

fn parse_time(key: &str) -> Option<f32> {
    key.trim().parse::<f32>().ok().filter(|time| time.is_finite())
}

/// 均匀 Catmull-Rom 样条，在 p1 与 p2 之间插值
fn catmull_rom(p0: Vec3, p1: Vec3, p2: Vec3, p3: Vec3, t: f32) -> Vec3 {
    let t2 = t * t;
    let t3 = t2 * t;
    0.5 * ((2.0 * p1)
        + (p2 - p0) * t
        + (2.0 * p0 - 5.0 * p1 + 4.0 * p2 - p3) * t2
        + (3.0 * p1 - p0 - 3.0 * p2 + p3) * t3)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::molang::test_support::TestEntity;
    use std::collections::HashMap;

    fn channel(json: &str) -> Channel {
        let data: ChannelData = serde_json::from_str(json).unwrap();
        let mut diagnostics = Vec::new();
        let channel = Channel::from_data(&data, &mut diagnostics);
        assert!(diagnostics.is_empty());
        channel
    }

    fn eval_at(channel: &Channel, time: f32) -> Vec3 {
        let entity = TestEntity::default();
        let variables = HashMap::new();
        let context = MolangContext::new(&entity, &variables).with_animation(time, 2.0);
        channel.eval(time, &context)
    }

    #[test]
    fn test_linear_interpolation() {
        let channel = channel(r#"{ "0": [0, 0, 0], "1": [0, 90, 0], "2": [0, 90, 30] }"#);
        assert_eq!(eval_at(&channel, -1.0), Vec3::ZERO);
        assert!(eval_at(&channel, 0.5).abs_diff_eq(Vec3::new(0.0, 45.0, 0.0), 1.0e-5));
        assert!(eval_at(&channel, 1.5).abs_diff_eq(Vec3::new(0.0, 90.0, 15.0), 1.0e-5));
        assert_eq!(eval_at(&channel, 5.0), Vec3::new(0.0, 90.0, 30.0));
        assert_eq!(channel.last_time(), Some(2.0));
    }

    #[test]
    fn test_pre_and_post_values() {
        let channel = channel(r#"{ "0": [0, 0, 0], "1": { "pre": [10, 0, 0], "post": [20, 0, 0] }, "2": [20, 0, 0] }"#);
        assert!(eval_at(&channel, 0.999).abs_diff_eq(Vec3::new(9.99, 0.0, 0.0), 1.0e-3));
        assert!(eval_at(&channel, 1.0).abs_diff_eq(Vec3::new(20.0, 0.0, 0.0), 1.0e-5));
    }

    #[test]
    fn test_keys_are_sorted_numerically() {
        let channel = channel(r#"{ "10": [10, 0, 0], "2": [2, 0, 0] }"#);
        assert!(eval_at(&channel, 6.0).abs_diff_eq(Vec3::new(6.0, 0.0, 0.0), 1.0e-4));
    }

    #[test]
    fn test_catmull_rom_passes_through_keys() {
        let channel = channel(
            r#"{ "0": [0, 0, 0], "1": { "post": [10, 0, 0], "lerp_mode": "catmullrom" }, "2": [0, 0, 0] }"#,
        );
        assert!(eval_at(&channel, 1.0).abs_diff_eq(Vec3::new(10.0, 0.0, 0.0), 1.0e-5));
        let middle = eval_at(&channel, 1.5);
        assert!(middle.x > 5.0, "{middle}");
    }

    #[test]
    fn test_constant_channel_uses_anim_time() {
        let channel = channel(r#"[0, "q.anim_time * 10", 0]"#);
        assert_eq!(eval_at(&channel, 1.5), Vec3::new(0.0, 15.0, 0.0));
    }

    #[test]
    fn test_invalid_time_key_is_reported() {
        let data: ChannelData = serde_json::from_str(r#"{ "soon": [1, 1, 1], "1": [0, 0, 0] }"#).unwrap();
        let mut diagnostics = Vec::new();
        let channel = Channel::from_data(&data, &mut diagnostics);
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(channel.last_time(), Some(1.0));
    }
}
