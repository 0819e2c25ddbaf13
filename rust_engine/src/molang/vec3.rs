//! 三分量 Molang 向量

use std::fmt;

use glam::Vec3;
use serde::de::{self, Deserialize, Deserializer, SeqAccess, Visitor};

use super::{Molang, MolangContext};

/// 每个分量都是一个表达式
#[derive(Clone, Debug, PartialEq)]
pub struct MolangVec3 {
    pub x: Molang,
    pub y: Molang,
    pub z: Molang,
}

impl MolangVec3 {
    pub const ZERO: MolangVec3 = MolangVec3::new(Molang::ZERO, Molang::ZERO, Molang::ZERO);
    pub const ONE: MolangVec3 = MolangVec3::new(Molang::ONE, Molang::ONE, Molang::ONE);
    pub const UNIT_X: MolangVec3 = MolangVec3::new(Molang::ONE, Molang::ZERO, Molang::ZERO);
    pub const UNIT_Y: MolangVec3 = MolangVec3::new(Molang::ZERO, Molang::ONE, Molang::ZERO);
    pub const UNIT_Z: MolangVec3 = MolangVec3::new(Molang::ZERO, Molang::ZERO, Molang::ONE);

    pub const fn new(x: Molang, y: Molang, z: Molang) -> Self {
        Self { x, y, z }
    }

    pub fn splat(value: Molang) -> Self {
        Self::new(value.clone(), value.clone(), value)
    }

    pub fn from_vec3(value: Vec3) -> Self {
        Self::new(value.x.into(), value.y.into(), value.z.into())
    }

    pub fn eval(&self, context: &MolangContext<'_>) -> Vec3 {
        Vec3::new(self.x.eval(context), self.y.eval(context), self.z.eval(context))
    }

    /// 三个分量都是常量时返回其值
    pub fn as_constant(&self) -> Option<Vec3> {
        Some(Vec3::new(
            self.x.as_constant()?,
            self.y.as_constant()?,
            self.z.as_constant()?,
        ))
    }
}

struct MolangVec3Visitor;

impl<'de> Visitor<'de> for MolangVec3Visitor {
    type Value = MolangVec3;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("an array of 1 to 3 Molang values, a number or an expression string")
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<MolangVec3, A::Error> {
        let x: Molang = seq
            .next_element()?
            .ok_or_else(|| de::Error::invalid_length(0, &self))?;
        // 缺少的分量沿用前一个
        let y: Molang = seq.next_element()?.unwrap_or_else(|| x.clone());
        let z: Molang = seq.next_element()?.unwrap_or_else(|| y.clone());
        if seq.next_element::<de::IgnoredAny>()?.is_some() {
            return Err(de::Error::invalid_length(4, &self));
        }
        Ok(MolangVec3::new(x, y, z))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<MolangVec3, E> {
        match v.trim().to_ascii_lowercase().as_str() {
            "x" => Ok(MolangVec3::UNIT_X),
            "y" => Ok(MolangVec3::UNIT_Y),
            "z" => Ok(MolangVec3::UNIT_Z),
            _ => Molang::parse(v).map(MolangVec3::splat).map_err(E::custom),
        }
    }

    fn visit_bool<E: de::Error>(self, v: bool) -> Result<MolangVec3, E> {
        Ok(MolangVec3::splat(Molang::constant(if v { 1.0 } else { 0.0 })))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<MolangVec3, E> {
        Ok(MolangVec3::from_vec3(Vec3::splat(v as f32)))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<MolangVec3, E> {
        Ok(MolangVec3::from_vec3(Vec3::splat(v as f32)))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<MolangVec3, E> {
        Ok(MolangVec3::from_vec3(Vec3::splat(v as f32)))
    }
}

impl<'de> Deserialize<'de> for MolangVec3 {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(MolangVec3Visitor)
    }
}

impl Default for MolangVec3 {
    fn default() -> Self {
        Self::ZERO
    }
}

impl From<Vec3> for MolangVec3 {
    fn from(value: Vec3) -> Self {
        Self::from_vec3(value)
    }
}
