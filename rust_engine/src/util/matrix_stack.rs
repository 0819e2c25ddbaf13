//! 矩阵栈
//!
//! 与渲染端的模型视图栈语义相同：每次变换都右乘到栈顶，
//! 同时维护法线矩阵。

use glam::{Mat3, Mat4, Quat, Vec3};

/// 栈顶条目
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MatrixEntry {
    pub model: Mat4,
    pub normal: Mat3,
}

impl Default for MatrixEntry {
    fn default() -> Self {
        Self {
            model: Mat4::IDENTITY,
            normal: Mat3::IDENTITY,
        }
    }
}

/// 模型矩阵栈（至少保留一个条目）
#[derive(Clone, Debug)]
pub struct MatrixStack {
    stack: Vec<MatrixEntry>,
}

impl MatrixStack {
    pub fn new() -> Self {
        Self {
            stack: vec![MatrixEntry::default()],
        }
    }

    /// 以给定条目为底创建新栈
    pub fn from_entry(entry: MatrixEntry) -> Self {
        Self { stack: vec![entry] }
    }

    /// 只复制栈顶，得到独立的新栈
    pub fn fork(&self) -> Self {
        Self::from_entry(*self.peek())
    }

    pub fn push(&mut self) {
        let top = *self.peek();
        self.stack.push(top);
    }

    /// 弹出栈顶；底部条目不会被弹出
    pub fn pop(&mut self) {
        if self.stack.len() > 1 {
            self.stack.pop();
        }
    }

    pub fn peek(&self) -> &MatrixEntry {
        // 构造时保证非空，pop 也不会移除最后一个条目
        &self.stack[self.stack.len() - 1]
    }

    fn peek_mut(&mut self) -> &mut MatrixEntry {
        let last = self.stack.len() - 1;
        &mut self.stack[last]
    }

    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    pub fn translate(&mut self, translation: Vec3) {
        if translation == Vec3::ZERO {
            return;
        }
        let top = self.peek_mut();
        top.model *= Mat4::from_translation(translation);
    }

    pub fn rotate(&mut self, rotation: Quat) {
        if rotation == Quat::IDENTITY {
            return;
        }
        let top = self.peek_mut();
        top.model *= Mat4::from_quat(rotation);
        top.normal *= Mat3::from_quat(rotation);
    }

    pub fn scale(&mut self, scale: Vec3) {
        if scale == Vec3::ONE {
            return;
        }
        let top = self.peek_mut();
        top.model *= Mat4::from_scale(scale);
        if scale.x == scale.y && scale.y == scale.z {
            // 均匀缩放只可能翻转法线方向
            if scale.x < 0.0 {
                top.normal *= -1.0;
            }
        } else {
            top.normal *= Mat3::from_diagonal(scale.recip());
        }
    }

    /// 右乘任意仿射矩阵（缩放/剪切残差等）
    pub fn multiply(&mut self, matrix: Mat4) {
        let top = self.peek_mut();
        top.model *= matrix;
        let linear = Mat3::from_mat4(matrix);
        if linear.determinant().abs() > f32::EPSILON {
            top.normal *= linear.inverse().transpose();
        }
    }
}

impl Default for MatrixStack {
    fn default() -> Self {
        Self::new()
    }
}
