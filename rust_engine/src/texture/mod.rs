//! 纹理句柄
//!
//! 纹理上传由宿主渲染后端完成，引擎只记录句柄和尺寸，
//! 用于诊断检查和提交顶点时选择纹理。

/// 宿主分配的不透明纹理标识
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TextureHandle(pub String);

impl TextureHandle {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn id(&self) -> &str {
        &self.0
    }
}

/// 纹理数据
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Texture {
    pub handle: TextureHandle,
    pub width: u32,
    pub height: u32,
}

impl Texture {
    /// 未提供纹理时假定的尺寸
    pub const DEFAULT_SIZE: (u32, u32) = (64, 64);

    pub fn new(handle: TextureHandle, width: u32, height: u32) -> Self {
        Self { handle, width, height }
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}
