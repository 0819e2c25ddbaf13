//! 欧拉角（ZYX 顺序）与矩阵之间的转换

use glam::{Mat4, Quat, Vec3};

/// 万向锁判定阈值（cos(y) 低于此值视为锁死）
const GIMBAL_LOCK_EPSILON: f32 = 1.0e-5;

/// 按 Z、Y、X 顺序组合旋转，即 `Rz * Ry * Rx`
pub fn euler_zyx_to_quat(angles: Vec3) -> Quat {
    Quat::from_rotation_z(angles.z) * Quat::from_rotation_y(angles.y) * Quat::from_rotation_x(angles.x)
}

/// 从矩阵的旋转子块分解 ZYX 欧拉角（忽略平移）
///
/// 各列先归一化，因此均匀缩放不影响结果；非均匀缩放/剪切时得到近似旋转，
/// 剩余部分由调用方另行补偿。返回值的分量与 [`euler_zyx_to_quat`] 的输入一致。
pub fn rotation_euler_zyx(matrix: &Mat4) -> Vec3 {
    let x_axis = matrix.x_axis.truncate().normalize_or_zero();
    let y_axis = matrix.y_axis.truncate().normalize_or_zero();
    let z_axis = matrix.z_axis.truncate().normalize_or_zero();

    // r20 = -sin(y)，r00/r10 = cos(y) * (cos(z), sin(z))
    let cos_y = x_axis.x.hypot(x_axis.y);
    let y = (-x_axis.z).atan2(cos_y);

    if cos_y > GIMBAL_LOCK_EPSILON {
        let x = y_axis.z.atan2(z_axis.z);
        let z = x_axis.y.atan2(x_axis.x);
        Vec3::new(x, y, z)
    } else {
        // 万向锁：X 归零，剩余旋转全部由 Z 表达
        let z = (-y_axis.x).atan2(y_axis.y);
        Vec3::new(0.0, y, z)
    }
}
