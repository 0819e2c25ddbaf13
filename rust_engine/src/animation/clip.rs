//! 可播放的动画片段

use super::data::{AnimationData, EffectData, LoopMode, OneOrMany};
use super::keyframe::Channel;
use crate::diagnostic::Diagnostic;
use crate::skeleton::BoneManager;

/// 单根骨骼的动画轨道
#[derive(Clone, Debug, PartialEq)]
pub struct BoneTrack {
    pub bone: String,
    pub position: Option<Channel>,
    pub rotation: Option<Channel>,
    pub scale: Option<Channel>,
}

impl BoneTrack {
    fn last_time(&self) -> Option<f32> {
        [&self.position, &self.rotation, &self.scale]
            .into_iter()
            .flatten()
            .filter_map(Channel::last_time)
            .reduce(f32::max)
    }
}

/// 效果种类
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EffectKind {
    Particle,
    Sound,
}

/// 在固定时间点触发的效果
#[derive(Clone, Debug, PartialEq)]
pub struct EffectKeyframe {
    pub time: f32,
    pub kind: EffectKind,
    pub effect: String,
    pub locator: Option<String>,
}

/// 动画片段
#[derive(Clone, Debug, PartialEq)]
pub struct Animation {
    pub name: String,
    /// 长度（秒），可能 ≤ 0，由模型构建时过滤
    pub length: f32,
    pub loop_mode: LoopMode,
    pub override_previous_animation: bool,
    pub tracks: Vec<BoneTrack>,
    /// 按时间升序
    pub effects: Vec<EffectKeyframe>,
    /// 是否驱动任何部位骨骼（或其祖先）
    pub affects_pose: bool,
}

impl Animation {
    /// 从文件数据构建
    ///
    /// 长度缺省时取最后一个关键帧或效果的时间。
    pub fn new(name: impl Into<String>, data: &AnimationData, bones: &BoneManager) -> (Self, Vec<Diagnostic>) {
        let name = name.into();
        let mut diagnostics = Vec::new();

        let tracks: Vec<BoneTrack> = data
            .bones
            .iter()
            .map(|(bone, track)| BoneTrack {
                bone: bone.clone(),
                position: track.position.as_ref().map(|c| Channel::from_data(c, &mut diagnostics)),
                rotation: track.rotation.as_ref().map(|c| Channel::from_data(c, &mut diagnostics)),
                scale: track.scale.as_ref().map(|c| Channel::from_data(c, &mut diagnostics)),
            })
            .collect();

        let mut effects = Vec::new();
        collect_effects(&data.particle_effects, EffectKind::Particle, &mut effects, &mut diagnostics);
        collect_effects(&data.sound_effects, EffectKind::Sound, &mut effects, &mut diagnostics);
        effects.sort_by(|a, b| a.time.total_cmp(&b.time));

        let length = data.animation_length.unwrap_or_else(|| {
            tracks
                .iter()
                .filter_map(BoneTrack::last_time)
                .chain(effects.iter().map(|effect| effect.time))
                .fold(0.0, f32::max)
        });

        let affects_pose = tracks.iter().any(|track| {
            bones
                .find_bone_by_name(&track.bone)
                .and_then(|index| bones.get_bone(index))
                .is_some_and(|bone| bone.affects_pose)
        });

        for diagnostic in &mut diagnostics {
            diagnostic.message = format!("Animation `{name}`: {}", diagnostic.message);
        }

        let animation = Self {
            name,
            length,
            loop_mode: data.loop_mode,
            override_previous_animation: data.override_previous_animation,
            tracks,
            effects,
            affects_pose,
        };
        (animation, diagnostics)
    }

    pub fn has_effects(&self) -> bool {
        !self.effects.is_empty()
    }
}

fn collect_effects(
    source: &std::collections::BTreeMap<String, OneOrMany<EffectData>>,
    kind: EffectKind,
    effects: &mut Vec<EffectKeyframe>,
    diagnostics: &mut Vec<Diagnostic>,
) {
    for (key, entries) in source {
        let Some(time) = key.trim().parse::<f32>().ok().filter(|time| time.is_finite()) else {
            diagnostics.push(Diagnostic::warning(format!(
                "{kind:?} effect time `{key}` is not a valid number, effect ignored."
            )));
            continue;
        };
        for entry in entries.as_slice() {
            effects.push(EffectKeyframe {
                time,
                kind,
                effect: entry.effect.clone(),
                locator: entry.locator.clone(),
            });
        }
    }
}
