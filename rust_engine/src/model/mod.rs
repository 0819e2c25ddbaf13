//! Bedrock 饰品模型
//!
//! `BedrockModel` 是一个饰品变体的不可变资源（骨骼模板、几何、动画、特效），
//! 可被多个实体共享；`ModelInstance` 是每个实体的可变运行时状态。

mod bedrock_model;
mod effects;
mod geometry;
mod instance;
mod render;

pub use bedrock_model::{BedrockModel, ModelAssets};
pub use effects::{
    BasicRenderParameters, ParticleDescription, ParticleEffect, ParticleEffectData, ParticlesFile,
    SoundDefinition, SoundDefinitionsFile, SoundEffect, SoundEntry, SoundEntryData,
};
pub use geometry::{BoneDefinition, LocatorDefinition, ModelData, Quad, Vertex};
pub use instance::{ModelInstance, TextureAnimationSync};
pub use render::{RenderMetadata, RenderVertex, VertexConsumer, VertexConsumerProvider};
