//! 动画播放状态
//!
//! 一个模型实例同时播放的所有动画：
//! - 按激活顺序应用，后者可覆盖或叠加前者
//! - `once` 动画结束后按触发器重播、切换到 `onComplete`，或被移除
//! - 粒子/声音关键帧在时间越过时触发一次，排入队列

use std::collections::HashMap;
use std::f32::consts::PI;
use std::sync::Arc;

use glam::Vec3;

use super::clip::{Animation, EffectKind};
use super::data::{AnimationEventType, AnimationTrigger, LoopMode};
use crate::config::EngineConfig;
use crate::locator::{resolve_world_transform, EntityTransform, Locator};
use crate::molang::{MolangContext, MolangQueryEntity};
use crate::skeleton::BoneManager;
use crate::util::MatrixEntry;

const DEGREES_TO_RADIANS: f32 = PI / 180.0;

/// 正在播放的动画实例
#[derive(Clone, Debug)]
pub struct ActiveAnimation {
    pub animation: Arc<Animation>,
    /// 开始时间（秒，与 `update` 的 `now` 同一时间轴）
    pub start_time: f32,
    /// 已播放时间，不小于 0
    pub elapsed: f32,
    pub trigger: Option<AnimationTrigger>,
    /// 剩余播放次数（含本次），`None` 表示无限
    pub loops_remaining: Option<u32>,
    /// 骨骼名重定向
    pub bone_remap: Option<Arc<HashMap<String, String>>>,
    /// 上次处理效果时的动画时间
    last_effect_time: Option<f32>,
}

impl ActiveAnimation {
    pub fn new(animation: Arc<Animation>, start_time: f32, trigger: Option<AnimationTrigger>) -> Self {
        let loops_remaining = match trigger.as_ref().map(|trigger| trigger.loops) {
            Some(0) => None,
            Some(loops) => Some(loops),
            None => Some(1),
        };
        Self {
            animation,
            start_time,
            elapsed: 0.0,
            trigger,
            loops_remaining,
            bone_remap: None,
            last_effect_time: None,
        }
    }

    pub fn with_bone_remap(mut self, remap: Arc<HashMap<String, String>>) -> Self {
        self.bone_remap = Some(remap);
        self
    }

    /// 当前的动画本地时间
    pub fn anim_time(&self) -> f32 {
        let length = self.animation.length;
        match self.animation.loop_mode {
            LoopMode::Loop if length > 0.0 => self.elapsed.rem_euclid(length),
            LoopMode::Loop => 0.0,
            LoopMode::HoldOnLastFrame => self.elapsed.min(length.max(0.0)),
            LoopMode::Once => self.elapsed,
        }
    }

    /// 跳过已经播完的若干轮，一步算出当前这一轮
    ///
    /// 中间整轮的效果不再补发。次数用尽时 `elapsed` 仍大于长度，交给调用方结束动画。
    fn restart(&mut self, now: f32) {
        let length = self.animation.length;
        // 恰好等于长度仍算在上一轮内
        let passed = ((self.elapsed / length).ceil() - 1.0).max(1.0);
        let cycles = match self.loops_remaining {
            Some(loops) => passed.min(loops.saturating_sub(1) as f32),
            None => passed,
        };
        self.loops_remaining = self.loops_remaining.map(|loops| loops - cycles as u32);

        let remainder = self.elapsed - cycles * length;
        self.elapsed = if cycles < passed {
            remainder
        } else {
            remainder.clamp(0.0, length)
        };
        self.start_time = now - self.elapsed;
    }

    /// 该实例（按重定向后的骨骼）是否改变部位骨骼
    pub fn affects_pose(&self, bones: &BoneManager) -> bool {
        if self.bone_remap.is_none() {
            return self.animation.affects_pose;
        }
        self.animation.tracks.iter().any(|track| {
            bones
                .find_bone_by_name(self.target_bone(&track.bone))
                .and_then(|index| bones.get_bone(index))
                .is_some_and(|bone| bone.affects_pose)
        })
    }

    fn target_bone<'a>(&'a self, bone: &'a str) -> &'a str {
        self.bone_remap
            .as_ref()
            .and_then(|remap| remap.get(bone))
            .map_or(bone, String::as_str)
    }
}

/// 已触发、等待宿主处理的效果
#[derive(Clone, Debug)]
pub struct FiredEffect {
    pub kind: EffectKind,
    pub effect: String,
    pub locator: Option<Arc<Locator>>,
}

/// 模型动画状态
#[derive(Debug)]
pub struct ModelAnimationState {
    library: HashMap<String, Arc<Animation>>,
    triggers: Vec<AnimationTrigger>,
    active: Vec<ActiveAnimation>,
    variables: HashMap<String, f32>,
    locators: HashMap<String, Arc<Locator>>,
    effects: Vec<FiredEffect>,
    config: EngineConfig,
}

impl ModelAnimationState {
    pub fn new(
        animations: impl IntoIterator<Item = Arc<Animation>>,
        triggers: Vec<AnimationTrigger>,
        config: EngineConfig,
    ) -> Self {
        let library = animations
            .into_iter()
            .map(|animation| (animation.name.clone(), animation))
            .collect();
        Self {
            library,
            triggers,
            active: Vec::new(),
            variables: HashMap::new(),
            locators: HashMap::new(),
            effects: Vec::new(),
            config,
        }
    }

    /// 按名称直接播放（无触发器，播放一次）
    pub fn start(&mut self, name: &str, now: f32) -> bool {
        let Some(animation) = self.library.get(name) else {
            log::warn!("Animation `{}` is not playable", name);
            return false;
        };
        self.active.push(ActiveAnimation::new(Arc::clone(animation), now, None));
        log::debug!("Started animation `{}` at {:.3}", name, now);
        true
    }

    /// 按触发器播放
    pub fn start_trigger(&mut self, trigger: &AnimationTrigger, now: f32) -> bool {
        let Some(animation) = self.library.get(&trigger.name) else {
            log::warn!("Trigger {:?} references unplayable animation `{}`", trigger.kind, trigger.name);
            return false;
        };
        self.active
            .push(ActiveAnimation::new(Arc::clone(animation), now, Some(trigger.clone())));
        log::debug!("Started animation `{}` by {:?} trigger at {:.3}", trigger.name, trigger.kind, now);
        true
    }

    /// 启动某类事件的所有触发器（按优先级升序），返回启动的个数
    pub fn fire_event(&mut self, kind: AnimationEventType, now: f32) -> usize {
        let mut matching: Vec<AnimationTrigger> = self
            .triggers
            .iter()
            .filter(|trigger| trigger.kind == kind)
            .cloned()
            .collect();
        matching.sort_by_key(|trigger| trigger.priority);
        matching
            .iter()
            .filter(|trigger| self.start_trigger(trigger, now))
            .count()
    }

    /// 停止某个动画的所有实例
    pub fn stop(&mut self, name: &str) {
        self.active.retain(|active| active.animation.name != name);
    }

    /// 推进所有动画到时间 `now`
    pub fn update(&mut self, now: f32) {
        let mut index = 0;
        while index < self.active.len() {
            let active = &mut self.active[index];
            active.elapsed = (now - active.start_time).max(0.0);
            let length = active.animation.length;

            if active.animation.loop_mode == LoopMode::Once && active.elapsed > length {
                fire_effects(
                    &active.animation,
                    active.last_effect_time,
                    length,
                    &mut self.locators,
                    &mut self.effects,
                );
                active.last_effect_time = None;

                if length > 0.0 && active.loops_remaining.map_or(true, |loops| loops > 1) {
                    active.restart(now);
                    log::debug!("Restarting animation `{}`", active.animation.name);
                }
            }

            if active.animation.loop_mode == LoopMode::Once && active.elapsed > length {
                let completed_at = active.start_time + length;
                let remap = active.bone_remap.clone();
                let next = active
                    .trigger
                    .as_ref()
                    .and_then(|trigger| trigger.on_complete.as_deref())
                    .cloned();
                log::debug!("Animation `{}` completed at {:.3}", active.animation.name, completed_at);

                let replacement = next.and_then(|trigger| {
                    let animation = Arc::clone(self.library.get(&trigger.name)?);
                    Some(ActiveAnimation::new(animation, completed_at, Some(trigger)))
                });
                match replacement {
                    Some(mut replacement) => {
                        replacement.bone_remap = remap;
                        log::debug!("Continuing with animation `{}`", replacement.animation.name);
                        self.active[index] = replacement;
                    }
                    None => {
                        self.active.remove(index);
                    }
                }
                continue;
            }

            let anim_time = active.anim_time();
            match active.last_effect_time {
                // 循环回到开头
                Some(last) if anim_time < last => {
                    fire_effects(&active.animation, Some(last), length, &mut self.locators, &mut self.effects);
                    fire_effects(&active.animation, None, anim_time, &mut self.locators, &mut self.effects);
                }
                last => {
                    fire_effects(&active.animation, last, anim_time, &mut self.locators, &mut self.effects);
                }
            }
            active.last_effect_time = Some(anim_time);
            index += 1;
        }
    }

    /// 将所有动画叠加到骨骼的动画字段
    ///
    /// 不会先重置骨骼，由调用方负责。`affect_pose` 为 false 时跳过
    /// 影响姿态的骨骼（它们的运动已经烘焙进姿态）。
    pub fn apply(&self, bones: &mut BoneManager, entity: &dyn MolangQueryEntity, affect_pose: bool) {
        for active in &self.active {
            let animation = &active.animation;
            let time = active.anim_time();
            let context = MolangContext::new(entity, &self.variables).with_animation(time, animation.length);

            for track in &animation.tracks {
                let Some(index) = bones.find_bone_by_name(active.target_bone(&track.bone)) else {
                    continue;
                };
                let Some(bone) = bones.get_bone_mut(index) else {
                    continue;
                };
                if !affect_pose && bone.affects_pose {
                    continue;
                }
                if animation.override_previous_animation {
                    bone.reset_animation();
                }

                if let Some(position) = &track.position {
                    bone.anim_offset += position.eval(time, &context);
                }
                if let Some(rotation) = &track.rotation {
                    bone.anim_rotation += rotation.eval(time, &context) * DEGREES_TO_RADIANS;
                }
                if let Some(scale) = &track.scale {
                    let scaled = bone.anim_scale * scale.eval(time, &context);
                    bone.anim_scale = Vec3::new(
                        self.config.clamp_scale(scaled.x),
                        self.config.clamp_scale(scaled.y),
                        self.config.clamp_scale(scaled.z),
                    );
                }
            }
        }
    }

    /// 是否有动画会改变部位骨骼，考虑骨骼名重定向
    pub fn affects_pose(&self, bones: &BoneManager) -> bool {
        self.active.iter().any(|active| active.affects_pose(bones))
    }

    /// 是否需要更新定位点：有外部持有的句柄，或正在播放带效果的动画
    pub fn locators_need_updating(&self) -> bool {
        self.locators.values().any(|locator| Arc::strong_count(locator) > 1)
            || self.active.iter().any(|active| active.animation.has_effects())
    }

    /// 获取（必要时创建）定位点句柄
    pub fn locator(&mut self, name: &str) -> Arc<Locator> {
        locator_handle(&mut self.locators, name)
    }

    /// 用渲染变换更新所有已请求的定位点
    ///
    /// `transforms` 由 [`BoneManager::render_transforms`] 以单位矩阵为基础计算。
    /// 模型中不存在的定位点被标记为无效。
    pub fn update_locators(&self, bones: &BoneManager, transforms: &[MatrixEntry], entity: EntityTransform) {
        for (name, handle) in &self.locators {
            let resolved = bones
                .locators()
                .iter()
                .find(|locator| &locator.name == name)
                .and_then(|locator| {
                    let transform = transforms.get(locator.bone)?;
                    let bone = bones.get_bone(locator.bone)?;
                    Some((locator, transform, bone.is_visible))
                });
            match resolved {
                Some((locator, transform, is_visible)) => {
                    let (position, rotation) = resolve_world_transform(
                        &transform.model,
                        locator.offset,
                        locator.rotation,
                        entity,
                        &self.config,
                    );
                    handle.update(position, rotation, is_visible);
                }
                None => handle.invalidate(),
            }
        }
    }

    /// 将所有定位点标记为无效
    pub fn invalidate_locators(&self) {
        for locator in self.locators.values() {
            locator.invalidate();
        }
    }

    /// 取出已触发的效果
    pub fn drain_effects(&mut self) -> Vec<FiredEffect> {
        std::mem::take(&mut self.effects)
    }

    pub fn active(&self) -> &[ActiveAnimation] {
        &self.active
    }

    pub fn active_mut(&mut self) -> &mut [ActiveAnimation] {
        &mut self.active
    }

    pub fn variables(&self) -> &HashMap<String, f32> {
        &self.variables
    }

    pub fn variables_mut(&mut self) -> &mut HashMap<String, f32> {
        &mut self.variables
    }

    pub fn get_animation(&self, name: &str) -> Option<&Arc<Animation>> {
        self.library.get(name)
    }
}

fn locator_handle(locators: &mut HashMap<String, Arc<Locator>>, name: &str) -> Arc<Locator> {
    Arc::clone(
        locators
            .entry(name.to_string())
            .or_insert_with(|| Locator::new(name)),
    )
}

/// 触发时间落在 `(from, to]` 的效果；`from` 为 `None` 时区间为 `[0, to]`
fn fire_effects(
    animation: &Animation,
    from: Option<f32>,
    to: f32,
    locators: &mut HashMap<String, Arc<Locator>>,
    queue: &mut Vec<FiredEffect>,
) {
    let due = animation.effects.iter().filter(|effect| {
        let after_start = match from {
            Some(from) => effect.time > from,
            None => effect.time >= 0.0,
        };
        after_start && effect.time <= to
    });
    for effect in due {
        queue.push(FiredEffect {
            kind: effect.kind,
            effect: effect.effect.clone(),
            locator: effect.locator.as_deref().map(|name| locator_handle(locators, name)),
        });
    }
}
