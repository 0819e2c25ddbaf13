//! 模型实例
//!
//! 每个装备中的饰品一个实例，持有骨骼副本、动画状态和纹理动画同步。
//! 所有方法都在同一线程按帧调用，切换模型发生在两帧之间。

use std::sync::Arc;

use super::{BedrockModel, RenderMetadata, VertexConsumerProvider};
use crate::animation::ModelAnimationState;
use crate::config::EngineConfig;
use crate::cosmetic::{Cosmetic, CosmeticsState};
use crate::locator::EntityTransform;
use crate::molang::MolangQueryEntity;
use crate::pose::PlayerPose;
use crate::skeleton::BoneManager;
use crate::util::{MatrixEntry, MatrixStack};

/// 纹理帧动画同步
///
/// 以第一次渲染时的实体存在时间为零点，使动画总是从第一帧开始。
#[derive(Clone, Debug, PartialEq)]
pub struct TextureAnimationSync {
    frame_count: u32,
    start: Option<f32>,
}

impl TextureAnimationSync {
    pub fn new(frame_count: u32) -> Self {
        Self {
            frame_count,
            start: None,
        }
    }

    pub fn frame_count(&self) -> u32 {
        self.frame_count
    }

    /// 相对零点的存在时间；只有一帧时不需要同步
    pub fn adjusted_lifetime(&mut self, lifetime: f32) -> f32 {
        if self.frame_count <= 1 {
            return lifetime;
        }
        let start = *self.start.get_or_insert(lifetime);
        lifetime - start
    }
}

/// 模型实例
#[derive(Debug)]
pub struct ModelInstance {
    model: Arc<BedrockModel>,
    bones: BoneManager,
    animation_state: ModelAnimationState,
    texture_sync: TextureAnimationSync,
    config: EngineConfig,
}

impl ModelInstance {
    pub fn new(model: Arc<BedrockModel>, config: EngineConfig) -> Self {
        Self {
            bones: model.bones().clone(),
            animation_state: model.new_animation_state(&config),
            texture_sync: TextureAnimationSync::new(model.texture_frame_count),
            model,
            config,
        }
    }

    pub fn model(&self) -> &Arc<BedrockModel> {
        &self.model
    }

    pub fn cosmetic(&self) -> &Cosmetic {
        &self.model.cosmetic
    }

    pub fn bones(&self) -> &BoneManager {
        &self.bones
    }

    pub fn animation_state(&self) -> &ModelAnimationState {
        &self.animation_state
    }

    pub fn animation_state_mut(&mut self) -> &mut ModelAnimationState {
        &mut self.animation_state
    }

    pub fn texture_sync(&self) -> &TextureAnimationSync {
        &self.texture_sync
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// 切换到新模型
    ///
    /// 定位点总是失效；动画或触发器不同时重建动画状态，
    /// 纹理帧数不同时重建纹理同步，骨骼总是重新克隆。
    pub fn switch_model(&mut self, model: Arc<BedrockModel>) {
        let new_texture_animation = self.model.texture_frame_count != model.texture_frame_count;
        let new_animations =
            self.model.animations != model.animations || self.model.animation_events != model.animation_events;

        self.animation_state.invalidate_locators();
        if new_animations {
            self.animation_state = model.new_animation_state(&self.config);
        }
        if new_texture_animation {
            self.texture_sync = TextureAnimationSync::new(model.texture_frame_count);
        }
        self.bones = model.bones().clone();

        log::debug!(
            "Switched `{}` to variant `{}` (animations reset: {}, texture sync reset: {})",
            model.cosmetic.id,
            model.variant,
            new_animations,
            new_texture_animation
        );
        self.model = model;
    }

    /// 计算动画作用后的姿态，可作为下一个饰品的基础姿态
    pub fn compute_pose(&mut self, base: &PlayerPose, entity: &dyn MolangQueryEntity) -> PlayerPose {
        self.model
            .compute_pose(&mut self.bones, base, &self.animation_state, entity, &self.config)
    }

    /// 更新本实例的所有定位点
    ///
    /// 未渲染的实体也要调用，`rendered_pose` 传 `None` 时使用中立姿态，
    /// 并把无法确定可见性的部位移到远处。
    pub fn update_locators(
        &mut self,
        rendered_pose: Option<&PlayerPose>,
        state: &CosmeticsState,
        entity: &dyn MolangQueryEntity,
    ) {
        if !self.animation_state.locators_need_updating() {
            return;
        }
        let pose = rendered_pose.copied().unwrap_or_else(PlayerPose::neutral_without_extras);

        self.bones.reset_animation();
        self.animation_state.apply(&mut self.bones, entity, false);
        self.bones.apply_pose(&pose, entity.rotation(), &self.config);

        let id = &self.model.cosmetic.id;
        let parts = state.visible_parts(id);
        self.model
            .propagate_visibility(&mut self.bones, state.side(id), &state.hidden_bones(id), Some(&parts));

        let transforms = self.bones.render_transforms(MatrixEntry::default());
        let entity = EntityTransform {
            position: entity.position(),
            rotation: entity.rotation(),
        };
        self.animation_state.update_locators(&self.bones, &transforms, entity);
    }

    /// 渲染
    ///
    /// 影响姿态的动画已经烘焙进 `metadata.pose`，这里只叠加其余动画。
    pub fn render(
        &mut self,
        stack: &mut MatrixStack,
        provider: &mut dyn VertexConsumerProvider,
        entity: &dyn MolangQueryEntity,
        metadata: &RenderMetadata,
    ) {
        self.bones.reset_animation();
        self.animation_state.apply(&mut self.bones, entity, false);

        let adjustment = match self.model.cosmetic.position_range() {
            Some(range) => range.clamp(metadata.position_adjustment),
            None => metadata.position_adjustment,
        };
        self.bones.set_part_user_offset(adjustment);

        let lifetime = self.texture_sync.adjusted_lifetime(entity.life_time());
        self.model.render(
            &mut self.bones,
            stack,
            provider,
            entity,
            metadata,
            lifetime,
            &self.config,
        );
    }
}
