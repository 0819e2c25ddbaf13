//! 已解析的模型几何与骨骼定义
//!
//! 所有坐标都在渲染空间：Y 轴向下，16 单位 = 1 格，旋转为弧度。
//! 文件格式转换由外部加载器完成。

use glam::{Vec2, Vec3};

use crate::skeleton::Side;

/// 渲染顶点
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Vertex {
    pub position: Vec3,
    pub uv: Vec2,
}

impl Vertex {
    pub fn new(position: Vec3, uv: Vec2) -> Self {
        Self { position, uv }
    }
}

/// 四边形面片
#[derive(Clone, Debug, PartialEq)]
pub struct Quad {
    pub vertices: [Vertex; 4],
    pub normal: Vec3,
}

impl Quad {
    pub fn new(vertices: [Vertex; 4], normal: Vec3) -> Self {
        Self { vertices, normal }
    }
}

/// 挂在骨骼上的定位点
#[derive(Clone, Debug, PartialEq)]
pub struct LocatorDefinition {
    pub name: String,
    /// 模型空间中的位置（与骨骼 pivot 同一坐标系）
    pub offset: Vec3,
    pub rotation: Vec3,
}

impl LocatorDefinition {
    pub fn new(name: impl Into<String>, offset: Vec3) -> Self {
        Self {
            name: name.into(),
            offset,
            rotation: Vec3::ZERO,
        }
    }

    pub fn with_rotation(mut self, rotation: Vec3) -> Self {
        self.rotation = rotation;
        self
    }
}

/// 骨骼定义
#[derive(Clone, Debug, PartialEq)]
pub struct BoneDefinition {
    pub name: String,
    pub parent: Option<String>,
    pub pivot: Vec3,
    pub rotation: Vec3,
    pub side: Option<Side>,
    pub gimbal: bool,
    pub world_gimbal: bool,
    pub quads: Vec<Quad>,
    pub locators: Vec<LocatorDefinition>,
}

impl BoneDefinition {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parent: None,
            pivot: Vec3::ZERO,
            rotation: Vec3::ZERO,
            side: None,
            gimbal: false,
            world_gimbal: false,
            quads: Vec::new(),
            locators: Vec::new(),
        }
    }

    pub fn with_parent(mut self, parent: impl Into<String>) -> Self {
        self.parent = Some(parent.into());
        self
    }

    pub fn with_pivot(mut self, pivot: Vec3) -> Self {
        self.pivot = pivot;
        self
    }

    pub fn with_rotation(mut self, rotation: Vec3) -> Self {
        self.rotation = rotation;
        self
    }

    pub fn with_side(mut self, side: Side) -> Self {
        self.side = Some(side);
        self
    }

    /// `world` 为真时额外抵消实体自身朝向
    pub fn with_gimbal(mut self, world: bool) -> Self {
        self.gimbal = true;
        self.world_gimbal = world;
        self
    }

    pub fn with_quad(mut self, quad: Quad) -> Self {
        self.quads.push(quad);
        self
    }

    pub fn with_locator(mut self, locator: LocatorDefinition) -> Self {
        self.locators.push(locator);
        self
    }
}

/// 单个模型文件解析后的数据
#[derive(Clone, Debug, PartialEq)]
pub struct ModelData {
    pub bones: Vec<BoneDefinition>,
    pub texture_frame_count: u32,
    pub translucent: bool,
}

impl ModelData {
    pub fn new(bones: Vec<BoneDefinition>) -> Self {
        Self {
            bones,
            texture_frame_count: 1,
            translucent: false,
        }
    }

    pub fn quad_count(&self) -> usize {
        self.bones.iter().map(|bone| bone.quads.len()).sum()
    }
}

impl Default for ModelData {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}
