//! 定位点
//!
//! 定位点是挂在骨骼上的世界空间锚点，粒子和声音从这里生成。
//! 句柄以 `Arc` 共享给其他系统（可能在别的线程读取），
//! 模型切换后立即失效，直到下一次成功更新。

use std::sync::{Arc, PoisonError, RwLock};

use glam::{Mat4, Quat, Vec3};

use crate::config::EngineConfig;
use crate::util::euler_zyx_to_quat;

/// 定位点在某一时刻的状态
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LocatorState {
    pub position: Vec3,
    pub rotation: Quat,
    pub is_valid: bool,
    pub is_visible: bool,
}

impl Default for LocatorState {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            is_valid: false,
            is_visible: false,
        }
    }
}

/// 共享定位点
#[derive(Debug)]
pub struct Locator {
    name: String,
    state: RwLock<LocatorState>,
}

impl Locator {
    pub fn new(name: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            name: name.into(),
            state: RwLock::new(LocatorState::default()),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// 当前状态的快照
    pub fn state(&self) -> LocatorState {
        // 状态是纯数据，锁中毒时照常读取
        *self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn position(&self) -> Vec3 {
        self.state().position
    }

    pub fn rotation(&self) -> Quat {
        self.state().rotation
    }

    pub fn is_valid(&self) -> bool {
        self.state().is_valid
    }

    pub fn is_visible(&self) -> bool {
        self.state().is_visible
    }

    /// 写入新的位置并标记为有效
    pub fn update(&self, position: Vec3, rotation: Quat, is_visible: bool) {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        *state = LocatorState {
            position,
            rotation,
            is_valid: true,
            is_visible,
        };
    }

    /// 标记为无效，保留最后的位置
    pub fn invalidate(&self) {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        state.is_valid = false;
    }
}

/// 实体在世界中的位置与朝向
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EntityTransform {
    pub position: Vec3,
    pub rotation: Quat,
}

/// 由骨骼渲染变换计算定位点的世界坐标
///
/// `bone_transform` 在渲染空间（Y 向下，16 单位 = 1 格），
/// `offset`/`rotation` 是定位点在模型中的位置与欧拉角。
pub fn resolve_world_transform(
    bone_transform: &Mat4,
    offset: Vec3,
    rotation: Vec3,
    entity: EntityTransform,
    config: &EngineConfig,
) -> (Vec3, Quat) {
    let model_position = bone_transform.transform_point3(offset) * config.model_scale;
    // 渲染时模型绕 Z 轴翻转（X、Y 取反），并抬高到实体原点
    let local = Vec3::new(
        -model_position.x,
        config.model_origin_height - model_position.y,
        model_position.z,
    );
    let position = entity.position + entity.rotation * local;

    let (_, bone_rotation, _) = bone_transform.to_scale_rotation_translation();
    let model_rotation = bone_rotation * euler_zyx_to_quat(rotation);
    // 与位置相同的翻转：绕 Z 轴半圈
    let flip = Quat::from_rotation_z(std::f32::consts::PI);
    let world_rotation = (entity.rotation * flip * model_rotation).normalize();
    (position, world_rotation)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::FRAC_PI_2;

    #[test]
    fn test_update_and_invalidate() {
        let locator = Locator::new("hand");
        assert!(!locator.is_valid());

        locator.update(Vec3::ONE, Quat::IDENTITY, true);
        assert!(locator.is_valid());
        assert!(locator.is_visible());

        locator.invalidate();
        assert!(!locator.is_valid());
        assert_eq!(locator.position(), Vec3::ONE);
    }

    #[test]
    fn test_shared_handle_sees_updates() {
        let locator = Locator::new("hand");
        let shared = Arc::clone(&locator);
        std::thread::spawn(move || shared.update(Vec3::X, Quat::IDENTITY, false))
            .join()
            .unwrap();
        assert_eq!(locator.position(), Vec3::X);
    }

    #[test]
    fn test_world_position() {
        let config = EngineConfig::default();
        let entity = EntityTransform {
            position: Vec3::new(100.0, 64.0, -20.0),
            rotation: Quat::IDENTITY,
        };
        // 头顶上方 8 个单位
        let (position, _) =
            resolve_world_transform(&Mat4::IDENTITY, Vec3::new(0.0, -32.0, 0.0), Vec3::ZERO, entity, &config);
        assert!(position.abs_diff_eq(Vec3::new(100.0, 64.0 + 1.501 + 2.0, -20.0), 1.0e-4));

        // 模型空间 +X 在世界中对应 -X，再随实体旋转
        let turned = EntityTransform {
            rotation: Quat::from_rotation_y(FRAC_PI_2),
            ..entity
        };
        let (position, _) =
            resolve_world_transform(&Mat4::IDENTITY, Vec3::new(16.0, 0.0, 0.0), Vec3::ZERO, turned, &config);
        let expected = turned.position + Quat::from_rotation_y(FRAC_PI_2) * Vec3::new(-1.0, 1.501, 0.0);
        assert!(position.abs_diff_eq(expected, 1.0e-4));
    }
}
