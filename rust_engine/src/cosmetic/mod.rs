//! 饰品元数据

mod property;
mod state;

pub use property::{
    BodyRegions, CosmeticProperty, DefaultSideData, InterruptsEmoteData, LocksPlayerRotationData, PositionRangeData,
    TimeData,
};
pub use state::CosmeticsState;

use std::collections::BTreeSet;

use crate::skeleton::Side;

/// 饰品
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Cosmetic {
    pub id: String,
    pub properties: Vec<CosmeticProperty>,
    /// 当前变体可用的资源文件（相对路径）
    pub assets: BTreeSet<String>,
}

impl Cosmetic {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }

    pub fn with_properties(mut self, properties: Vec<CosmeticProperty>) -> Self {
        self.properties = properties;
        self
    }

    pub fn with_asset(mut self, path: impl Into<String>) -> Self {
        self.assets.insert(path.into());
        self
    }

    pub fn has_asset(&self, path: &str) -> bool {
        self.assets.contains(path)
    }

    pub fn enabled_properties(&self) -> impl Iterator<Item = &CosmeticProperty> + '_ {
        self.properties.iter().filter(|property| property.is_enabled())
    }

    /// 声明的默认侧面
    pub fn default_side(&self) -> Option<Side> {
        self.enabled_properties().find_map(|property| match property {
            CosmeticProperty::DefaultSide { data, .. } => Some(data.side),
            _ => None,
        })
    }

    /// 位置调整范围
    pub fn position_range(&self) -> Option<&PositionRangeData> {
        self.enabled_properties().find_map(|property| match property {
            CosmeticProperty::PositionRange { data, .. } => Some(data),
            _ => None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_side_and_position_range() {
        let properties = CosmeticProperty::from_json_array(
            r#"[
                { "type": "DEFAULT_SIDE", "enabled": false, "data": { "side": "LEFT" } },
                { "type": "DEFAULT_SIDE", "data": { "side": "RIGHT" } },
                { "type": "POSITION_RANGE", "data": { "x_max": 1 } }
            ]"#,
        )
        .unwrap();
        let cosmetic = Cosmetic::new("shield").with_properties(properties);
        assert_eq!(cosmetic.default_side(), Some(Side::Right));
        assert_eq!(cosmetic.position_range().and_then(|range| range.x_max), Some(1.0));

        assert_eq!(Cosmetic::new("plain").default_side(), None);
        assert!(Cosmetic::new("plain").position_range().is_none());
    }
}
