//! 渲染接口
//!
//! 引擎不直接管理 GPU 资源，只把变换后的顶点交给宿主提供的消费者。

use std::collections::BTreeSet;

use glam::{Vec2, Vec3};
use rayon::prelude::*;

use super::Quad;
use crate::pose::PlayerPose;
use crate::skeleton::{EnumPart, Side};
use crate::texture::TextureHandle;
use crate::util::MatrixEntry;

/// 顶点消费者
pub trait VertexConsumer {
    fn vertex(&mut self, position: Vec3, uv: Vec2, light: u32, normal: Vec3);
}

/// 为每个纹理提供顶点消费者
pub trait VertexConsumerProvider {
    /// 消费者只在 `draw` 回调期间有效
    fn provide(&mut self, texture: &TextureHandle, emissive: bool, draw: &mut dyn FnMut(&mut dyn VertexConsumer));
}

/// 变换后的顶点
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RenderVertex {
    pub position: Vec3,
    pub uv: Vec2,
    pub normal: Vec3,
}

impl VertexConsumer for Vec<RenderVertex> {
    fn vertex(&mut self, position: Vec3, uv: Vec2, _light: u32, normal: Vec3) {
        self.push(RenderVertex { position, uv, normal });
    }
}

/// 单次渲染的参数
#[derive(Clone, Debug, PartialEq)]
pub struct RenderMetadata {
    /// 要套用的姿态，`None` 时保留骨骼当前姿态
    pub pose: Option<PlayerPose>,
    /// 模型没有自带纹理时使用的皮肤
    pub skin: TextureHandle,
    pub light: u32,
    pub side: Option<Side>,
    pub hidden_bones: BTreeSet<String>,
    /// 可见部位，`None` 表示全部
    pub parts: Option<BTreeSet<EnumPart>>,
    /// 用户位置微调（模型单位）
    pub position_adjustment: Vec3,
}

impl RenderMetadata {
    pub fn new(skin: TextureHandle) -> Self {
        Self {
            pose: None,
            skin,
            light: 0x00F0_00F0,
            side: None,
            hidden_bones: BTreeSet::new(),
            parts: None,
            position_adjustment: Vec3::ZERO,
        }
    }

    pub fn with_pose(mut self, pose: PlayerPose) -> Self {
        self.pose = Some(pose);
        self
    }
}

/// 按骨骼变换所有面片
///
/// 面片数达到 `parallel_threshold` 时用 rayon 并行计算。
pub(crate) fn transform_quads(batches: &[(MatrixEntry, &[Quad])], parallel_threshold: usize) -> Vec<RenderVertex> {
    let quad_count: usize = batches.iter().map(|(_, quads)| quads.len()).sum();
    if quad_count >= parallel_threshold {
        batches
            .par_iter()
            .flat_map_iter(|(entry, quads)| quads.iter().flat_map(move |quad| transform_quad(entry, quad)))
            .collect()
    } else {
        batches
            .iter()
            .flat_map(|(entry, quads)| quads.iter().flat_map(move |quad| transform_quad(entry, quad)))
            .collect()
    }
}

fn transform_quad(entry: &MatrixEntry, quad: &Quad) -> [RenderVertex; 4] {
    let normal = (entry.normal * quad.normal).normalize_or_zero();
    quad.vertices.map(|vertex| RenderVertex {
        position: entry.model.transform_point3(vertex.position),
        uv: vertex.uv,
        normal,
    })
}
