//! 引擎配置
//!
//! 参数扁平化，默认值即常规玩家模型的约定。

use serde::Deserialize;

/// 引擎配置（扁平化，不嵌套）
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    // ========== 坐标 ==========
    /// 模型空间到方块空间的缩放，默认 1/16（每方块 16 单位）
    pub model_scale: f32,
    /// 渲染翻转后模型原点相对实体脚底的高度，默认 1.501
    pub model_origin_height: f32,

    // ========== 纹理动画 ==========
    /// 纹理帧动画速率（帧/秒），默认 7
    pub texture_animation_fps: f32,

    // ========== 幼年模型 ==========
    /// 幼年头部缩放，默认 0.75
    pub child_head_scale: f32,
    /// 幼年头部下移量（模型单位），默认 8
    pub child_head_offset_y: f32,
    /// 幼年其余部位缩放，默认 0.5
    pub child_limb_scale: f32,

    // ========== 数值保护 ==========
    /// 骨骼缩放分量的最小绝对值，避免矩阵不可逆，默认 1e-4
    pub min_bone_scale: f32,

    // ========== 渲染 ==========
    /// 顶点变换改用 rayon 并行的面片数阈值，默认 256
    pub parallel_quad_threshold: usize,

    // ========== 调试 ==========
    /// 是否输出逐帧调试日志，默认 false
    pub debug_log: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            model_scale: 1.0 / 16.0,
            model_origin_height: 1.501,
            texture_animation_fps: 7.0,
            child_head_scale: 0.75,
            child_head_offset_y: 8.0,
            child_limb_scale: 0.5,
            min_bone_scale: 1.0e-4,
            parallel_quad_threshold: 256,
            debug_log: false,
        }
    }
}

impl EngineConfig {
    /// 从 JSON 读取，缺省字段使用默认值
    pub fn from_json(json: &str) -> crate::Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// 将缩放分量限制在最小绝对值之外，保持符号
    pub fn clamp_scale(&self, value: f32) -> f32 {
        if value.abs() >= self.min_bone_scale {
            value
        } else if value < 0.0 {
            -self.min_bone_scale
        } else {
            self.min_bone_scale
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config = EngineConfig::from_json(r#"{ "texture_animation_fps": 12.0 }"#).unwrap();
        assert_eq!(config.texture_animation_fps, 12.0);
        assert_eq!(config.model_scale, 1.0 / 16.0);
        assert_eq!(config.child_head_scale, 0.75);
    }

    #[test]
    fn test_clamp_scale() {
        let config = EngineConfig::default();
        assert_eq!(config.clamp_scale(0.0), 1.0e-4);
        assert_eq!(config.clamp_scale(-1.0e-9), -1.0e-4);
        assert_eq!(config.clamp_scale(2.0), 2.0);
    }
}
