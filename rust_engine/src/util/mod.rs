//! 矩阵栈与欧拉角工具

mod math;
mod matrix_stack;

pub use math::{euler_zyx_to_quat, rotation_euler_zyx};
pub use matrix_stack::{MatrixEntry, MatrixStack};
