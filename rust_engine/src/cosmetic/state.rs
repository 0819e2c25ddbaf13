//! 每帧由宿主提供的饰品状态

use std::collections::{BTreeSet, HashMap};

use super::{Cosmetic, CosmeticProperty};
use crate::skeleton::{EnumPart, Side};

/// 按饰品 id 索引的侧面、隐藏骨骼和隐藏部位
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CosmeticsState {
    pub sides: HashMap<String, Side>,
    pub hidden_bones: HashMap<String, BTreeSet<String>>,
    pub hidden_parts: HashMap<String, BTreeSet<EnumPart>>,
}

impl CosmeticsState {
    pub fn new() -> Self {
        Self::default()
    }

    /// 由已装备饰品的 `EXTERNAL_HIDDEN_BONE` 属性生成隐藏骨骼表
    pub fn from_equipped<'a>(cosmetics: impl IntoIterator<Item = &'a Cosmetic>) -> Self {
        let mut state = Self::new();
        for cosmetic in cosmetics {
            for property in cosmetic.enabled_properties() {
                if let CosmeticProperty::ExternalHiddenBone { id, data, .. } = property {
                    state
                        .hidden_bones
                        .entry(id.clone())
                        .or_default()
                        .extend(data.iter().cloned());
                }
            }
        }
        state
    }

    pub fn side(&self, cosmetic: &str) -> Option<Side> {
        self.sides.get(cosmetic).copied()
    }

    pub fn hidden_bones(&self, cosmetic: &str) -> BTreeSet<String> {
        self.hidden_bones.get(cosmetic).cloned().unwrap_or_default()
    }

    /// 未被隐藏的部位
    pub fn visible_parts(&self, cosmetic: &str) -> BTreeSet<EnumPart> {
        let hidden = self.hidden_parts.get(cosmetic);
        EnumPart::ALL
            .into_iter()
            .filter(|part| !hidden.is_some_and(|hidden| hidden.contains(part)))
            .collect()
    }
}
