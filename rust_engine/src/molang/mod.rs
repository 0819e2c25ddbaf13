//! Molang 表达式
//!
//! 动画和粒子参数使用的小型表达式语言。表达式在加载（反序列化）时
//! 一次性解析为类型化语法树，逐帧求值时不再解析，也没有副作用。

mod expr;
mod parser;
mod vec3;

pub use expr::{BinaryOp, Expr, MathFn, Query, UnaryOp};
pub use vec3::MolangVec3;

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use glam::{Quat, Vec3};
use serde::de::{self, Deserialize, Deserializer, Visitor};
use thiserror::Error;

/// 表达式解析错误
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MolangError {
    #[error("unexpected character `{ch}` at {pos}")]
    UnexpectedChar { pos: usize, ch: char },

    #[error("invalid number `{text}` at {pos}")]
    InvalidNumber { pos: usize, text: String },

    #[error("unexpected token `{found}` at {pos}, expected {expected}")]
    UnexpectedToken {
        pos: usize,
        found: String,
        expected: &'static str,
    },

    #[error("unexpected end of expression, expected {0}")]
    UnexpectedEnd(&'static str),

    #[error("unknown identifier `{0}`")]
    UnknownIdentifier(String),

    #[error("unknown query `{0}`")]
    UnknownQuery(String),

    #[error("unknown function `{0}`")]
    UnknownFunction(String),

    #[error("function `{name}` takes {expected} argument(s), got {found}")]
    WrongArity {
        name: String,
        expected: usize,
        found: usize,
    },

    #[error("unsupported Molang feature: {0}")]
    Unsupported(String),

    #[error("expression nested deeper than {0} levels")]
    TooDeep(usize),
}

/// 表达式可查询的实体状态（由宿主程序每帧提供，只读）
pub trait MolangQueryEntity {
    /// 实体存在时间（秒）
    fn life_time(&self) -> f32;

    /// 世界坐标
    fn position(&self) -> Vec3;

    /// 实体（身体）朝向
    fn rotation(&self) -> Quat;

    fn modified_distance_moved(&self) -> f32 {
        0.0
    }

    fn modified_move_speed(&self) -> f32 {
        0.0
    }
}

/// 单次求值的上下文
#[derive(Clone, Copy)]
pub struct MolangContext<'a> {
    pub entity: &'a dyn MolangQueryEntity,
    /// 当前动画的本地时间（秒）
    pub anim_time: f32,
    /// 当前动画的长度（秒）
    pub anim_length: f32,
    pub variables: &'a HashMap<String, f32>,
}

impl<'a> MolangContext<'a> {
    pub fn new(entity: &'a dyn MolangQueryEntity, variables: &'a HashMap<String, f32>) -> Self {
        Self {
            entity,
            anim_time: 0.0,
            anim_length: 0.0,
            variables,
        }
    }

    pub fn with_animation(mut self, anim_time: f32, anim_length: f32) -> Self {
        self.anim_time = anim_time;
        self.anim_length = anim_length;
        self
    }
}

/// 已解析的 Molang 表达式
#[derive(Clone, Debug, PartialEq)]
pub struct Molang {
    expr: Expr,
}

impl Molang {
    pub const ZERO: Molang = Molang::constant(0.0);
    pub const ONE: Molang = Molang::constant(1.0);

    pub const fn constant(value: f32) -> Self {
        Self {
            expr: Expr::Constant(value),
        }
    }

    /// 解析表达式源码
    pub fn parse(source: &str) -> Result<Self, MolangError> {
        parser::parse(source).map(|expr| Self { expr })
    }

    pub fn eval(&self, context: &MolangContext<'_>) -> f32 {
        self.expr.eval(context)
    }

    /// 若为常量则返回其值
    pub fn as_constant(&self) -> Option<f32> {
        match self.expr {
            Expr::Constant(value) => Some(value),
            _ => None,
        }
    }

    pub fn expr(&self) -> &Expr {
        &self.expr
    }
}

impl FromStr for Molang {
    type Err = MolangError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl From<f32> for Molang {
    fn from(value: f32) -> Self {
        Self::constant(value)
    }
}

struct MolangVisitor;

impl<'de> Visitor<'de> for MolangVisitor {
    type Value = Molang;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("a number, boolean or Molang expression string")
    }

    fn visit_bool<E: de::Error>(self, v: bool) -> Result<Molang, E> {
        Ok(Molang::constant(if v { 1.0 } else { 0.0 }))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Molang, E> {
        Ok(Molang::constant(v as f32))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Molang, E> {
        Ok(Molang::constant(v as f32))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<Molang, E> {
        Ok(Molang::constant(v as f32))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Molang, E> {
        Molang::parse(v).map_err(E::custom)
    }
}

impl<'de> Deserialize<'de> for Molang {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(MolangVisitor)
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::TestEntity;
    use super::*;

    #[test]
    fn test_deserialize_number_and_string() {
        let number: Molang = serde_json::from_str("2.5").unwrap();
        assert_eq!(number.as_constant(), Some(2.5));

        let expr: Molang = serde_json::from_str(r#""q.anim_time * 2""#).unwrap();
        let entity = TestEntity::default();
        let variables = HashMap::new();
        let context = MolangContext::new(&entity, &variables).with_animation(1.5, 3.0);
        assert_eq!(expr.eval(&context), 3.0);
    }

    #[test]
    fn test_deserialize_rejects_malformed_expression() {
        let result: Result<Molang, _> = serde_json::from_str(r#""math.sin(""#);
        assert!(result.is_err());
        let result: Result<Molang, _> = serde_json::from_str(r#""query.does_not_exist""#);
        let message = result.unwrap_err().to_string();
        assert!(message.contains("unknown query"), "{message}");
    }

    #[test]
    fn test_deserialize_rejects_objects() {
        let result: Result<Molang, _> = serde_json::from_str(r#"{ "a": 1 }"#);
        assert!(result.is_err());
    }
}
