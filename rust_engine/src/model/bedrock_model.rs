//! Bedrock 饰品模型
//!
//! 不可变的模型数据：骨骼模板、几何、动画库、效果定义和构建期诊断。
//! 每个实例持有自己的骨骼副本，逐帧状态都写在副本上。

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use glam::{Vec2, Vec3};

use super::effects::{ParticleEffect, ParticlesFile, SoundDefinitionsFile, SoundEffect, SoundEntryData};
use super::render::{transform_quads, RenderMetadata, VertexConsumer, VertexConsumerProvider};
use super::{ModelData, Quad};
use crate::animation::{Animation, AnimationFile, AnimationTrigger, ModelAnimationState};
use crate::config::EngineConfig;
use crate::cosmetic::Cosmetic;
use crate::diagnostic::Diagnostic;
use crate::molang::MolangQueryEntity;
use crate::pose::PlayerPose;
use crate::skeleton::{BoneManager, EnumPart, Side};
use crate::texture::Texture;
use crate::util::MatrixStack;

const ANIMATIONS_FILE: &str = "animations.json";

/// 构建模型所需的已解析资源
#[derive(Clone, Debug, Default)]
pub struct ModelAssets {
    pub model: Option<ModelData>,
    pub animations: Option<AnimationFile>,
    /// 文件路径 -> 粒子定义
    pub particles: BTreeMap<String, ParticlesFile>,
    pub sounds: Option<SoundDefinitionsFile>,
    pub texture: Option<Texture>,
    pub emissive_texture: Option<Texture>,
}

/// Bedrock 饰品模型
#[derive(Debug)]
pub struct BedrockModel {
    pub cosmetic: Arc<Cosmetic>,
    pub variant: String,
    /// 骨骼模板，实例会克隆一份
    bones: BoneManager,
    /// 按骨骼索引的面片
    geometry: Vec<Vec<Quad>>,
    pub texture: Option<Texture>,
    pub emissive_texture: Option<Texture>,
    pub texture_frame_count: u32,
    pub translucent: bool,
    /// 可播放的动画（被触发器引用且长度为正）
    pub animations: Vec<Arc<Animation>>,
    pub animation_events: Vec<AnimationTrigger>,
    pub particle_effects: BTreeMap<String, ParticleEffect>,
    pub sound_effects: BTreeMap<String, SoundEffect>,
    pub diagnostics: Vec<Diagnostic>,
}

impl BedrockModel {
    pub fn new(cosmetic: Arc<Cosmetic>, variant: impl Into<String>, assets: ModelAssets) -> Self {
        let variant = variant.into();
        let mut diagnostics = Vec::new();

        let has_model = assets.model.is_some();
        let model = assets.model.unwrap_or_default();
        let (bones, bone_diagnostics) = BoneManager::build(&model.bones);
        diagnostics.extend(bone_diagnostics);
        let geometry = collect_geometry(&bones, &model);

        let mut translucent = model.translucent;
        if translucent && assets.emissive_texture.is_some() {
            // 自发光与普通纹理无法合并为一次绘制，半透明排序无法保证
            diagnostics.push(Diagnostic::fatal(
                "Model cannot be both emissive and translucent at the same time.",
            ));
            translucent = false;
        }

        let texture_size = assets.texture.as_ref().map_or(Texture::DEFAULT_SIZE, Texture::size);
        if let Some(emissive_size) = assets.emissive_texture.as_ref().map(Texture::size) {
            if emissive_size != texture_size {
                diagnostics.push(Diagnostic::error(format!(
                    "Emissive texture must be same size as regular texture ({}x{}) but is {}x{}",
                    texture_size.0, texture_size.1, emissive_size.0, emissive_size.1
                )));
            }
        }

        let particle_effects = if has_model {
            register_particles(&assets.particles, &mut diagnostics)
        } else {
            BTreeMap::new()
        };
        let sound_effects = assets
            .sounds
            .as_ref()
            .map(|sounds| register_sounds(sounds, &cosmetic, &mut diagnostics))
            .unwrap_or_default();

        let (animations, animation_events) = match &assets.animations {
            Some(file) => (load_animations(file, &bones, &mut diagnostics), file.triggers.clone()),
            None => (Vec::new(), Vec::new()),
        };

        for diagnostic in &diagnostics {
            diagnostic.log();
        }
        log::info!(
            "Loaded model `{}` ({}): {} bones, {} quads, {} animations, {} diagnostics",
            cosmetic.id,
            variant,
            bones.bone_count(),
            model.quad_count(),
            animations.len(),
            diagnostics.len()
        );

        Self {
            cosmetic,
            variant,
            bones,
            geometry,
            texture: assets.texture,
            emissive_texture: assets.emissive_texture,
            texture_frame_count: model.texture_frame_count.max(1),
            translucent,
            animations,
            animation_events,
            particle_effects,
            sound_effects,
            diagnostics,
        }
    }

    /// 骨骼模板
    pub fn bones(&self) -> &BoneManager {
        &self.bones
    }

    pub fn side_options(&self) -> &BTreeSet<Side> {
        self.bones.side_options()
    }

    pub fn get_animation_by_name(&self, name: &str) -> Option<&Arc<Animation>> {
        self.animations.iter().find(|animation| animation.name == name)
    }

    /// 新建与本模型匹配的动画状态
    pub fn new_animation_state(&self, config: &EngineConfig) -> ModelAnimationState {
        ModelAnimationState::new(
            self.animations.iter().cloned(),
            self.animation_events.clone(),
            config.clone(),
        )
    }

    /// 计算动画作用后的姿态
    ///
    /// 没有影响姿态的动画时直接返回 `base`，不遍历骨骼。
    pub fn compute_pose(
        &self,
        bones: &mut BoneManager,
        base: &PlayerPose,
        state: &ModelAnimationState,
        entity: &dyn MolangQueryEntity,
        config: &EngineConfig,
    ) -> PlayerPose {
        if !state.affects_pose(bones) {
            return *base;
        }
        bones.reset_animation();
        bones.reset_pose();
        bones.set_part_user_offset(Vec3::ZERO);
        state.apply(bones, entity, true);
        bones.apply_pose(base, entity.rotation(), config);
        bones.retrieve_pose(base)
    }

    /// 设置显式可见性并从根骨骼传播
    ///
    /// 侧面优先级：`side` 参数、饰品默认侧面、模型侧面选项的默认值。
    pub fn propagate_visibility(
        &self,
        bones: &mut BoneManager,
        side: Option<Side>,
        hidden_bones: &BTreeSet<String>,
        parts: Option<&BTreeSet<EnumPart>>,
    ) {
        let side = side
            .or_else(|| self.cosmetic.default_side())
            .or_else(|| Side::default_side_or_none(bones.side_options()));

        for bone in bones.bones_mut() {
            let hidden = hidden_bones.contains(&bone.name);
            bone.visible = match bone.part {
                None => hidden.then_some(false),
                Some(part) => Some(parts.map_or(true, |parts| parts.contains(&part)) && !hidden),
            };
        }
        bones.propagate_visibility(side);
    }

    /// 渲染
    ///
    /// 调用前骨骼的动画字段应已写好（通常只含不影响姿态的动画）。
    #[allow(clippy::too_many_arguments)]
    pub fn render(
        &self,
        bones: &mut BoneManager,
        stack: &mut MatrixStack,
        provider: &mut dyn VertexConsumerProvider,
        entity: &dyn MolangQueryEntity,
        metadata: &RenderMetadata,
        lifetime: f32,
        config: &EngineConfig,
    ) {
        let texture = self
            .texture
            .as_ref()
            .map_or(&metadata.skin, |texture| &texture.handle);
        let uv_offset = self.texture_frame_offset(lifetime, config);

        if let Some(pose) = &metadata.pose {
            bones.apply_pose(pose, entity.rotation(), config);
        }
        self.propagate_visibility(bones, metadata.side, &metadata.hidden_bones, metadata.parts.as_ref());

        stack.push();
        stack.scale(Vec3::splat(config.model_scale));
        let transforms = bones.render_transforms(*stack.peek());
        stack.pop();

        let batches: Vec<_> = bones
            .bones()
            .iter()
            .enumerate()
            .filter(|(_, bone)| bone.is_visible)
            .filter_map(|(index, _)| {
                let quads = self.geometry.get(index)?;
                (!quads.is_empty()).then(|| (transforms[index], quads.as_slice()))
            })
            .collect();
        let vertices = transform_quads(&batches, config.parallel_quad_threshold);
        if config.debug_log {
            log::debug!(
                "Rendering `{}`: {} vertices, frame offset {:.3}",
                self.cosmetic.id,
                vertices.len(),
                uv_offset
            );
        }

        let mut draw = |consumer: &mut dyn VertexConsumer| {
            for vertex in &vertices {
                let uv = vertex.uv + Vec2::new(0.0, uv_offset);
                consumer.vertex(vertex.position, uv, metadata.light, vertex.normal);
            }
        };
        provider.provide(texture, false, &mut draw);
        if let Some(emissive) = &self.emissive_texture {
            provider.provide(&emissive.handle, true, &mut draw);
        }
    }

    /// 纹理帧动画的 V 偏移
    pub fn texture_frame_offset(&self, lifetime: f32, config: &EngineConfig) -> f32 {
        let frames = self.texture_frame_count.max(1) as i64;
        let frame = (lifetime * config.texture_animation_fps).floor() as i64;
        frame.rem_euclid(frames) as f32 / frames as f32
    }
}

/// 按骨骼索引整理面片；重名而被丢弃的骨骼没有几何
fn collect_geometry(bones: &BoneManager, model: &ModelData) -> Vec<Vec<Quad>> {
    let mut geometry = vec![Vec::new(); bones.bone_count()];
    let mut assigned = vec![false; bones.bone_count()];
    for definition in &model.bones {
        let Some(index) = bones.find_bone_by_name(&definition.name) else {
            continue;
        };
        if !assigned[index] {
            assigned[index] = true;
            geometry[index] = definition.quads.clone();
        }
    }
    geometry
}

fn register_particles(
    particles: &BTreeMap<String, ParticlesFile>,
    diagnostics: &mut Vec<Diagnostic>,
) -> BTreeMap<String, ParticleEffect> {
    let mut effects: BTreeMap<String, ParticleEffect> = BTreeMap::new();
    for (path, file) in particles {
        let identifier = file.identifier();
        if let Some(existing) = effects.get(identifier) {
            diagnostics.push(
                Diagnostic::error(format!(
                    "Particle with id `{}` is already defined in `{}`.",
                    identifier, existing.file
                ))
                .with_file(path.clone()),
            );
            continue;
        }
        let material = file
            .particle_effect
            .description
            .basic_render_parameters
            .as_ref()
            .and_then(|parameters| parameters.material.clone());
        effects.insert(
            identifier.to_string(),
            ParticleEffect {
                file: path.clone(),
                identifier: identifier.to_string(),
                material,
            },
        );
    }
    effects
}

fn register_sounds(
    sounds: &SoundDefinitionsFile,
    cosmetic: &Cosmetic,
    diagnostics: &mut Vec<Diagnostic>,
) -> BTreeMap<String, SoundEffect> {
    sounds
        .definitions
        .iter()
        .map(|(identifier, definition)| {
            let entries = definition
                .sounds
                .iter()
                .cloned()
                .map(SoundEntryData::into_entry)
                .filter(|entry| {
                    let path = entry.asset_path();
                    let found = cosmetic.has_asset(&path);
                    if !found {
                        diagnostics.push(
                            Diagnostic::error(format!("File `{}` not found.", path))
                                .with_file(SoundDefinitionsFile::PATH),
                        );
                    }
                    found
                })
                .collect();
            let effect = SoundEffect {
                identifier: identifier.clone(),
                category: definition.category.clone(),
                entries,
            };
            (identifier.clone(), effect)
        })
        .collect()
}

/// 只构建被触发器链引用的动画，拒绝长度不为正的动画
fn load_animations(file: &AnimationFile, bones: &BoneManager, diagnostics: &mut Vec<Diagnostic>) -> Vec<Arc<Animation>> {
    let referenced: BTreeSet<&str> = file.referenced_animations().collect();
    file.animations
        .iter()
        .filter(|(name, _)| referenced.contains(name.as_str()))
        .filter_map(|(name, data)| {
            let (animation, warnings) = Animation::new(name.clone(), data, bones);
            diagnostics.extend(warnings.into_iter().map(|warning| warning.with_file(ANIMATIONS_FILE)));
            if animation.length <= 0.0 || animation.length.is_nan() {
                diagnostics.push(
                    Diagnostic::error(format!("Animation `{}` has zero or negative duration.", name))
                        .with_file(ANIMATIONS_FILE),
                );
                return None;
            }
            Some(Arc::new(animation))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostic::Severity;
    use crate::model::{BoneDefinition, RenderVertex, Vertex};
    use crate::molang::test_support::TestEntity;
    use crate::texture::TextureHandle;

    fn square() -> Quad {
        Quad::new(
            [
                Vertex::new(Vec3::new(0.0, -16.0, 0.0), Vec2::new(0.0, 0.0)),
                Vertex::new(Vec3::new(16.0, -16.0, 0.0), Vec2::new(0.5, 0.0)),
                Vertex::new(Vec3::new(16.0, 0.0, 0.0), Vec2::new(0.5, 0.5)),
                Vertex::new(Vec3::new(0.0, 0.0, 0.0), Vec2::new(0.0, 0.5)),
            ],
            Vec3::NEG_Z,
        )
    }

    fn model_data() -> ModelData {
        ModelData::new(vec![
            BoneDefinition::new("head")
                .with_pivot(Vec3::new(0.0, -24.0, 0.0))
                .with_quad(square()),
            BoneDefinition::new("brim").with_parent("head").with_quad(square()),
            BoneDefinition::new("left_flap").with_side(Side::Left).with_quad(square()),
            BoneDefinition::new("right_flap").with_side(Side::Right).with_quad(square()),
        ])
    }

    fn texture(id: &str, width: u32, height: u32) -> Texture {
        Texture::new(TextureHandle::new(id), width, height)
    }

    #[derive(Default)]
    struct Recorder {
        draws: Vec<(TextureHandle, bool, Vec<RenderVertex>)>,
    }

    impl VertexConsumerProvider for Recorder {
        fn provide(
            &mut self,
            texture: &TextureHandle,
            emissive: bool,
            draw: &mut dyn FnMut(&mut dyn VertexConsumer),
        ) {
            let mut vertices = Vec::new();
            draw(&mut vertices);
            self.draws.push((texture.clone(), emissive, vertices));
        }
    }

    #[test]
    fn test_emissive_translucent_is_fatal() {
        let mut data = model_data();
        data.translucent = true;
        let model = BedrockModel::new(
            Arc::new(Cosmetic::new("hat")),
            "default",
            ModelAssets {
                model: Some(data),
                texture: Some(texture("main", 64, 64)),
                emissive_texture: Some(texture("glow", 32, 32)),
                ..ModelAssets::default()
            },
        );
        assert!(!model.translucent);
        let severities: Vec<_> = model.diagnostics.iter().map(|d| d.severity).collect();
        assert_eq!(severities, vec![Severity::Fatal, Severity::Error]);
    }

    #[test]
    fn test_particles_and_sounds() {
        let spark = ParticlesFile::from_json(r#"{ "particle_effect": { "description": { "identifier": "c:spark" } } }"#)
            .unwrap();
        let sounds = SoundDefinitionsFile::from_json(
            r#"{ "sound_definitions": { "c.flap": { "sounds": [ "sounds/flap", "sounds/missing" ] } } }"#,
        )
        .unwrap();
        let cosmetic = Cosmetic::new("wings").with_asset("sounds/flap.ogg");
        let model = BedrockModel::new(
            Arc::new(cosmetic),
            "default",
            ModelAssets {
                model: Some(model_data()),
                particles: BTreeMap::from([
                    ("particles/a.json".to_string(), spark.clone()),
                    ("particles/b.json".to_string(), spark),
                ]),
                sounds: Some(sounds),
                ..ModelAssets::default()
            },
        );

        assert_eq!(model.particle_effects.len(), 1);
        assert_eq!(model.particle_effects["c:spark"].file, "particles/a.json");
        assert_eq!(model.sound_effects["c.flap"].entries.len(), 1);

        let errors: Vec<_> = model.diagnostics.iter().filter(|d| d.severity == Severity::Error).collect();
        assert_eq!(errors.len(), 2);
        assert_eq!(errors[0].file.as_deref(), Some("particles/b.json"));
        assert_eq!(errors[1].file.as_deref(), Some(SoundDefinitionsFile::PATH));
    }

    #[test]
    fn test_unreferenced_animations_are_dropped() {
        let animations = AnimationFile::from_json(
            r#"{ "animations": {
                    "used": { "animation_length": 1 },
                    "unused": { "animation_length": 0 }
                },
                "triggers": [ { "type": "IDLE", "name": "used" } ] }"#,
        )
        .unwrap();
        let model = BedrockModel::new(
            Arc::new(Cosmetic::new("hat")),
            "default",
            ModelAssets {
                model: Some(model_data()),
                animations: Some(animations),
                ..ModelAssets::default()
            },
        );
        assert!(model.diagnostics.is_empty());
        assert!(model.get_animation_by_name("used").is_some());
        assert!(model.get_animation_by_name("unused").is_none());
    }

    #[test]
    fn test_visibility_rules() {
        let model = BedrockModel::new(
            Arc::new(Cosmetic::new("hat")),
            "default",
            ModelAssets {
                model: Some(model_data()),
                ..ModelAssets::default()
            },
        );
        let mut bones = model.bones().clone();
        let index = |bones: &BoneManager, name: &str| bones.find_bone_by_name(name).unwrap();
        let visible = |bones: &BoneManager, name: &str| bones.get_bone(index(bones, name)).unwrap().is_visible;

        // 没有指定侧面时默认左侧
        model.propagate_visibility(&mut bones, None, &BTreeSet::new(), None);
        assert!(visible(&bones, "head"));
        assert!(visible(&bones, "left_flap"));
        assert!(!visible(&bones, "right_flap"));

        let hidden = BTreeSet::from(["brim".to_string()]);
        model.propagate_visibility(&mut bones, Some(Side::Right), &hidden, None);
        assert!(!visible(&bones, "brim"));
        assert!(visible(&bones, "right_flap"));

        // 头部不在可见部位中，子骨骼随之隐藏
        let parts = BTreeSet::from([EnumPart::Body]);
        model.propagate_visibility(&mut bones, None, &BTreeSet::new(), Some(&parts));
        assert!(!visible(&bones, "head"));
        assert!(!visible(&bones, "brim"));
        assert!(visible(&bones, "left_flap"));
    }

    #[test]
    fn test_render_streams_main_and_emissive() {
        let mut data = model_data();
        data.texture_frame_count = 4;
        let model = BedrockModel::new(
            Arc::new(Cosmetic::new("hat")),
            "default",
            ModelAssets {
                model: Some(data),
                emissive_texture: Some(texture("glow", 64, 64)),
                ..ModelAssets::default()
            },
        );
        let config = EngineConfig::default();
        let mut bones = model.bones().clone();
        let mut recorder = Recorder::default();
        let metadata = RenderMetadata::new(TextureHandle::new("skin")).with_pose(PlayerPose::neutral());

        // 1.5 秒 * 7 fps = 第 10 帧，10 % 4 = 2
        model.render(
            &mut bones,
            &mut MatrixStack::new(),
            &mut recorder,
            &TestEntity::default(),
            &metadata,
            1.5,
            &config,
        );

        assert_eq!(recorder.draws.len(), 2);
        let (skin, emissive, vertices) = &recorder.draws[0];
        assert_eq!(skin.id(), "skin");
        assert!(!emissive);
        // head、brim、left_flap 可见
        assert_eq!(vertices.len(), 12);
        assert!((vertices[0].uv.y - 0.5).abs() < 1.0e-6);
        // 模型单位缩放到方块
        assert!(vertices[1].position.abs_diff_eq(Vec3::new(1.0, -1.0, 0.0), 1.0e-5));
        assert!(recorder.draws[1].1);
        assert_eq!(recorder.draws[1].0.id(), "glow");
    }
}
