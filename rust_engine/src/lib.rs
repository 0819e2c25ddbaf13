//! Cosmetics Engine - Rust 实现的饰品模型运行时
//!
//! 提供以下功能：
//! - Bedrock 模型骨骼层级、部位与侧面可见性
//! - Molang 表达式与关键帧动画、触发器状态机
//! - 通用玩家姿态与骨骼之间的双向转换，多个饰品可串联修改姿态
//! - 定位点世界坐标跟踪，以及粒子/声音效果事件
//! - 顶点变换与纹理帧动画
//!
//! 文件读取、GPU 资源和粒子/声音播放由宿主程序完成。

pub mod animation;
pub mod config;
pub mod cosmetic;
pub mod diagnostic;
pub mod locator;
pub mod model;
pub mod molang;
pub mod pose;
pub mod skeleton;
pub mod texture;
pub mod util;

pub use animation::{Animation, AnimationFile, ModelAnimationState};
pub use config::EngineConfig;
pub use cosmetic::{Cosmetic, CosmeticProperty, CosmeticsState};
pub use diagnostic::{Diagnostic, Severity};
pub use locator::{EntityTransform, Locator};
pub use model::{BedrockModel, ModelAssets, ModelData, ModelInstance};
pub use molang::{Molang, MolangError, MolangQueryEntity};
pub use pose::{Part, PlayerPose};
pub use skeleton::{Bone, BoneManager, EnumPart, Side};
pub use texture::{Texture, TextureHandle};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Molang error: {0}")]
    Molang(#[from] MolangError),
}

pub type Result<T> = std::result::Result<T, EngineError>;
