//! 骨骼管理器

use std::collections::{BTreeMap, BTreeSet, HashMap};

use glam::{Quat, Vec3};

use super::{Bone, EnumPart, Side};
use crate::diagnostic::Diagnostic;
use crate::model::BoneDefinition;
use crate::util::{MatrixEntry, MatrixStack};

/// 合成根骨骼的名字
pub const ROOT_BONE_NAME: &str = "__root__";

/// 已解析到骨骼索引的定位点
#[derive(Clone, Debug, PartialEq)]
pub struct BoneLocator {
    pub name: String,
    pub bone: usize,
    pub offset: Vec3,
    pub rotation: Vec3,
}

/// 骨骼管理器
///
/// 所有骨骼放在一个数组中，索引 0 是合成根骨骼，
/// 所有没有父骨骼的定义都挂在它下面。
#[derive(Clone, Debug)]
pub struct BoneManager {
    bones: Vec<Bone>,
    name_to_index: HashMap<String, usize>,
    part_to_index: BTreeMap<EnumPart, usize>,
    /// 前序遍历顺序（父骨骼总在子骨骼之前）
    order: Vec<usize>,
    locators: Vec<BoneLocator>,
    side_options: BTreeSet<Side>,
}

impl BoneManager {
    /// 只有根骨骼的空骨架
    pub fn new() -> Self {
        let (manager, _) = Self::build(&[]);
        manager
    }

    /// 从骨骼定义构建层级
    ///
    /// 重名骨骼被丢弃，重复部位的后者失去部位标记，
    /// 未知父骨骼和环都改挂到根骨骼，并各自产生诊断。
    pub fn build(definitions: &[BoneDefinition]) -> (Self, Vec<Diagnostic>) {
        let mut diagnostics = Vec::new();
        let mut bones = vec![Bone::new(ROOT_BONE_NAME)];
        let mut name_to_index = HashMap::new();
        let mut part_to_index = BTreeMap::new();
        let mut accepted = Vec::with_capacity(definitions.len());
        name_to_index.insert(ROOT_BONE_NAME.to_string(), 0);

        for definition in definitions {
            if name_to_index.contains_key(&definition.name) {
                diagnostics.push(Diagnostic::error(format!(
                    "Duplicate bone name `{}`, later definition ignored.",
                    definition.name
                )));
                continue;
            }

            let index = bones.len();
            let mut bone = Bone::from_definition(definition);
            if let Some(part) = bone.part {
                if part_to_index.contains_key(&part) {
                    diagnostics.push(Diagnostic::warning(format!(
                        "Part {:?} is already bound to another bone, `{}` keeps no part.",
                        part, definition.name
                    )));
                    bone.part = None;
                } else {
                    part_to_index.insert(part, index);
                }
            }
            name_to_index.insert(definition.name.clone(), index);
            bones.push(bone);
            accepted.push(definition);
        }

        // 父骨骼
        for (offset, definition) in accepted.iter().enumerate() {
            let index = offset + 1;
            let parent = match &definition.parent {
                None => 0,
                Some(name) => match name_to_index.get(name) {
                    Some(&parent) if parent != index => parent,
                    Some(_) => {
                        diagnostics.push(Diagnostic::error(format!(
                            "Bone `{}` is its own parent.",
                            definition.name
                        )));
                        0
                    }
                    None => {
                        diagnostics.push(Diagnostic::error(format!(
                            "Bone `{}` references unknown parent `{}`.",
                            definition.name, name
                        )));
                        0
                    }
                },
            };
            bones[index].parent = Some(parent);
        }

        // 断开环
        let count = bones.len();
        for index in 1..count {
            let mut current = bones[index].parent;
            let mut steps = 0;
            while let Some(ancestor) = current {
                if ancestor == index {
                    diagnostics.push(Diagnostic::error(format!(
                        "Bone `{}` is part of a parent cycle, attached to root instead.",
                        bones[index].name
                    )));
                    bones[index].parent = Some(0);
                    break;
                }
                steps += 1;
                if steps > count {
                    // 环不经过当前骨骼，轮到环上的骨骼时再处理
                    break;
                }
                current = bones[ancestor].parent;
            }
        }

        for index in 1..count {
            if let Some(parent) = bones[index].parent {
                bones[parent].children.push(index);
            }
        }

        let mut manager = Self {
            bones,
            name_to_index,
            part_to_index,
            order: Vec::with_capacity(count),
            locators: Vec::new(),
            side_options: BTreeSet::new(),
        };
        manager.build_order();
        manager.compute_affects_pose();

        for (offset, definition) in accepted.iter().enumerate() {
            for locator in &definition.locators {
                manager.locators.push(BoneLocator {
                    name: locator.name.clone(),
                    bone: offset + 1,
                    offset: locator.offset,
                    rotation: locator.rotation,
                });
            }
        }
        manager.side_options = manager.bones.iter().filter_map(|bone| bone.side).collect();

        (manager, diagnostics)
    }

    fn build_order(&mut self) {
        self.order.clear();
        let mut pending = vec![0];
        while let Some(index) = pending.pop() {
            self.order.push(index);
            // 逆序压栈以保持定义顺序
            pending.extend(self.bones[index].children.iter().rev().copied());
        }
    }

    fn compute_affects_pose(&mut self) {
        for &index in self.order.iter().rev() {
            let own = self.bones[index].pose_part().is_some();
            let children = self.bones[index]
                .children
                .iter()
                .any(|&child| self.bones[child].affects_pose);
            self.bones[index].affects_pose = own || children;
        }
    }

    /// 根骨骼索引
    pub fn root(&self) -> usize {
        0
    }

    /// 获取骨骼数量（含根骨骼）
    pub fn bone_count(&self) -> usize {
        self.bones.len()
    }

    pub fn bones(&self) -> &[Bone] {
        &self.bones
    }

    pub fn bones_mut(&mut self) -> &mut [Bone] {
        &mut self.bones
    }

    pub fn get_bone(&self, index: usize) -> Option<&Bone> {
        self.bones.get(index)
    }

    pub fn get_bone_mut(&mut self, index: usize) -> Option<&mut Bone> {
        self.bones.get_mut(index)
    }

    /// 通过名称查找骨骼
    pub fn find_bone_by_name(&self, name: &str) -> Option<usize> {
        self.name_to_index.get(name).copied()
    }

    /// 通过部位查找骨骼
    pub fn find_bone_by_part(&self, part: EnumPart) -> Option<usize> {
        self.part_to_index.get(&part).copied()
    }

    /// 所有部位骨骼（按部位排序）
    pub fn parts(&self) -> impl Iterator<Item = (EnumPart, usize)> + '_ {
        self.part_to_index.iter().map(|(&part, &index)| (part, index))
    }

    /// 前序遍历顺序
    pub fn order(&self) -> &[usize] {
        &self.order
    }

    pub fn locators(&self) -> &[BoneLocator] {
        &self.locators
    }

    /// 模型中出现过的侧面
    pub fn side_options(&self) -> &BTreeSet<Side> {
        &self.side_options
    }

    /// 是否有任何骨骼参与姿态读写
    pub fn affects_pose(&self) -> bool {
        self.bones[0].affects_pose
    }

    /// 重置所有骨骼的动画字段
    pub fn reset_animation(&mut self) {
        for bone in &mut self.bones {
            bone.reset_animation();
        }
    }

    /// 重置所有骨骼的姿态字段
    pub fn reset_pose(&mut self) {
        for bone in &mut self.bones {
            bone.reset_pose();
        }
    }

    /// 设置所有部位骨骼（含 ROOT 部位）的用户位置微调
    pub fn set_part_user_offset(&mut self, offset: Vec3) {
        for bone in &mut self.bones {
            if bone.part.is_some() {
                bone.user_offset = offset;
            }
        }
    }

    /// 从根骨骼开始累积的全局变换
    pub fn global_transforms(&self) -> Vec<MatrixEntry> {
        self.accumulate(MatrixEntry::default(), |_, _| false)
    }

    /// 渲染用变换：根骨骼和每个部位骨骼都从 `base` 开始，
    /// 部位骨骼按自己的全局姿态渲染，不继承父骨骼
    pub fn render_transforms(&self, base: MatrixEntry) -> Vec<MatrixEntry> {
        self.accumulate(base, |_, bone| bone.pose_part().is_some())
    }

    fn accumulate(&self, base: MatrixEntry, restarts: impl Fn(usize, &Bone) -> bool) -> Vec<MatrixEntry> {
        let mut entries = vec![base; self.bones.len()];
        for &index in &self.order {
            let bone = &self.bones[index];
            let start = match bone.parent {
                Some(parent) if !restarts(index, bone) => entries[parent],
                _ => base,
            };
            let mut stack = MatrixStack::from_entry(start);
            bone.apply_transform(&mut stack);
            entries[index] = *stack.peek();
        }
        entries
    }

    /// 计算万向节骨骼的抵消旋转
    ///
    /// 万向节骨骼抵消其祖先累积的旋转；世界万向节还抵消实体朝向
    /// （`entity_rotation` 由调用方给出，已按渲染约定翻转）。
    /// 部位骨骼按自身全局姿态渲染，累积从它们重新开始。
    pub fn propagate_gimbal(&mut self, entity_rotation: Quat) {
        let mut accumulated = vec![Quat::IDENTITY; self.bones.len()];
        for position in 0..self.order.len() {
            let index = self.order[position];
            let bone = &self.bones[index];
            let base = match bone.parent {
                Some(parent) if bone.pose_part().is_none() => accumulated[parent],
                _ => Quat::IDENTITY,
            };
            let gimbal_rotation = if bone.gimbal {
                let target = if bone.world_gimbal {
                    entity_rotation
                } else {
                    Quat::IDENTITY
                };
                (base.inverse() * target).normalize()
            } else {
                Quat::IDENTITY
            };
            accumulated[index] = base * gimbal_rotation * bone.local_rotation();
            self.bones[index].gimbal_rotation = gimbal_rotation;
        }
    }

    /// 是否存在万向节骨骼，以及是否存在世界万向节骨骼
    pub fn gimbal_flags(&self) -> (bool, bool) {
        let any = self.bones.iter().any(|bone| bone.gimbal);
        let world = self.bones.iter().any(|bone| bone.gimbal && bone.world_gimbal);
        (any, world)
    }

    /// 从根骨骼向下传播可见性
    pub fn propagate_visibility(&mut self, side: Option<Side>) {
        for position in 0..self.order.len() {
            let index = self.order[position];
            let parent_visible = match self.bones[index].parent {
                Some(parent) => self.bones[parent].is_visible,
                None => true,
            };
            let bone = &mut self.bones[index];
            let side_matches = bone.side.is_none() || bone.side == side;
            bone.is_visible = bone.visible.unwrap_or(parent_visible) && side_matches;
        }
    }
}

impl Default for BoneManager {
    fn default() -> Self {
        Self::new()
    }
}
