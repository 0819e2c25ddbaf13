//! 骨骼节点

use glam::{Mat3, Mat4, Quat, Vec3};

use super::{EnumPart, Side};
use crate::model::BoneDefinition;
use crate::util::{euler_zyx_to_quat, MatrixStack};

/// 骨骼节点
///
/// 层级关系由 [`BoneManager`](super::BoneManager) 以索引保存。
/// 姿态字段由 `apply_pose` 写入，动画字段每帧先重置再由动画叠加。
#[derive(Clone, Debug, PartialEq)]
pub struct Bone {
    pub name: String,
    pub part: Option<EnumPart>,
    pub parent: Option<usize>,
    pub children: Vec<usize>,

    // 静态数据（渲染空间）
    pub pivot: Vec3,
    pub rotation: Vec3,
    pub side: Option<Side>,
    pub gimbal: bool,
    pub world_gimbal: bool,
    /// 自身或任一后代带有非 ROOT 部位
    pub affects_pose: bool,

    // 姿态
    pub pose_rotation: Vec3,
    pub pose_offset: Vec3,
    pub pose_extra: Option<Mat3>,
    pub child_scale: f32,

    // 动画
    pub anim_rotation: Vec3,
    pub anim_offset: Vec3,
    pub anim_scale: Vec3,

    /// 用户位置微调
    pub user_offset: Vec3,
    /// 万向节抵消旋转（由 `propagate_gimbal` 计算）
    pub gimbal_rotation: Quat,

    /// 显式可见性，`None` 表示继承父骨骼
    pub visible: Option<bool>,
    pub is_visible: bool,
}

impl Bone {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            part: None,
            parent: None,
            children: Vec::new(),
            pivot: Vec3::ZERO,
            rotation: Vec3::ZERO,
            side: None,
            gimbal: false,
            world_gimbal: false,
            affects_pose: false,
            pose_rotation: Vec3::ZERO,
            pose_offset: Vec3::ZERO,
            pose_extra: None,
            child_scale: 1.0,
            anim_rotation: Vec3::ZERO,
            anim_offset: Vec3::ZERO,
            anim_scale: Vec3::ONE,
            user_offset: Vec3::ZERO,
            gimbal_rotation: Quat::IDENTITY,
            visible: None,
            is_visible: true,
        }
    }

    /// 从骨骼定义创建（部位由名字推断，层级稍后由管理器填写）
    pub fn from_definition(definition: &BoneDefinition) -> Self {
        let mut bone = Self::new(definition.name.clone());
        bone.part = EnumPart::from_bone_name(&definition.name);
        bone.pivot = definition.pivot;
        bone.rotation = definition.rotation;
        bone.side = definition.side;
        bone.gimbal = definition.gimbal;
        bone.world_gimbal = definition.gimbal && definition.world_gimbal;
        bone
    }

    /// 带有可参与姿态读写的部位
    pub fn pose_part(&self) -> Option<EnumPart> {
        self.part.filter(|part| part.is_pose_part())
    }

    /// 静态、姿态、动画三部分欧拉角之和（ZYX 顺序）
    pub fn local_rotation(&self) -> Quat {
        euler_zyx_to_quat(self.rotation + self.pose_rotation + self.anim_rotation)
    }

    /// 姿态、动画、用户三部分平移之和
    pub fn total_offset(&self) -> Vec3 {
        self.pose_offset + self.anim_offset + self.user_offset
    }

    /// 缩放/剪切是否会出现在本骨骼的变换中
    pub fn has_scaling(&self) -> bool {
        self.anim_scale != Vec3::ONE || self.pose_extra.is_some()
    }

    /// 将本地变换右乘到矩阵栈：
    /// `T(pivot + offset) · G · R · X · S · T(-pivot)`
    pub fn apply_transform(&self, stack: &mut MatrixStack) {
        let offset = self.total_offset();
        // 渲染空间 Y 轴向下
        stack.translate(self.pivot + Vec3::new(offset.x, -offset.y, offset.z));
        stack.rotate(self.gimbal_rotation);
        stack.rotate(self.local_rotation());
        if let Some(extra) = self.pose_extra {
            stack.multiply(Mat4::from_mat3(extra));
        }
        stack.scale(self.anim_scale * self.child_scale);
        stack.translate(-self.pivot);
    }

    /// 本地变换矩阵
    pub fn local_matrix(&self) -> Mat4 {
        let mut stack = MatrixStack::new();
        self.apply_transform(&mut stack);
        stack.peek().model
    }

    /// 重置动画字段
    pub fn reset_animation(&mut self) {
        self.anim_rotation = Vec3::ZERO;
        self.anim_offset = Vec3::ZERO;
        self.anim_scale = Vec3::ONE;
    }

    /// 重置姿态字段
    pub fn reset_pose(&mut self) {
        self.pose_rotation = Vec3::ZERO;
        self.pose_offset = Vec3::ZERO;
        self.pose_extra = None;
        self.child_scale = 1.0;
        self.gimbal_rotation = Quat::IDENTITY;
    }
}

impl Default for Bone {
    fn default() -> Self {
        Self::new(String::new())
    }
}
