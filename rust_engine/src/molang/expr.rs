//! Molang 语法树与求值

use glam::EulerRot;

use super::MolangContext;

/// 可查询的实体/动画状态
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Query {
    AnimTime,
    AnimLength,
    LifeTime,
    ModifiedDistanceMoved,
    ModifiedMoveSpeed,
    BodyXRotation,
    BodyYRotation,
}

impl Query {
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "anim_time" => Self::AnimTime,
            "anim_length" => Self::AnimLength,
            "life_time" => Self::LifeTime,
            "modified_distance_moved" => Self::ModifiedDistanceMoved,
            "modified_move_speed" => Self::ModifiedMoveSpeed,
            "body_x_rotation" => Self::BodyXRotation,
            "body_y_rotation" => Self::BodyYRotation,
            _ => return None,
        })
    }

    fn eval(self, context: &MolangContext<'_>) -> f32 {
        match self {
            Self::AnimTime => context.anim_time,
            Self::AnimLength => context.anim_length,
            Self::LifeTime => context.entity.life_time(),
            Self::ModifiedDistanceMoved => context.entity.modified_distance_moved(),
            Self::ModifiedMoveSpeed => context.entity.modified_move_speed(),
            Self::BodyXRotation => {
                let (_, pitch, _) = context.entity.rotation().to_euler(EulerRot::YXZ);
                pitch.to_degrees()
            }
            Self::BodyYRotation => {
                let (yaw, _, _) = context.entity.rotation().to_euler(EulerRot::YXZ);
                yaw.to_degrees()
            }
        }
    }
}

/// `math.*` 函数（三角函数以角度为单位）
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MathFn {
    Abs,
    Sin,
    Cos,
    Asin,
    Acos,
    Atan,
    Atan2,
    Clamp,
    Lerp,
    LerpRotate,
    InverseLerp,
    Min,
    Max,
    Floor,
    Ceil,
    Round,
    Trunc,
    Sqrt,
    Pow,
    Mod,
    Exp,
    Ln,
    HermiteBlend,
    MinAngle,
}

impl MathFn {
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "abs" => Self::Abs,
            "sin" => Self::Sin,
            "cos" => Self::Cos,
            "asin" => Self::Asin,
            "acos" => Self::Acos,
            "atan" => Self::Atan,
            "atan2" => Self::Atan2,
            "clamp" => Self::Clamp,
            "lerp" => Self::Lerp,
            "lerprotate" => Self::LerpRotate,
            "inverse_lerp" => Self::InverseLerp,
            "min" => Self::Min,
            "max" => Self::Max,
            "floor" => Self::Floor,
            "ceil" => Self::Ceil,
            "round" => Self::Round,
            "trunc" => Self::Trunc,
            "sqrt" => Self::Sqrt,
            "pow" => Self::Pow,
            "mod" => Self::Mod,
            "exp" => Self::Exp,
            "ln" => Self::Ln,
            "hermite_blend" => Self::HermiteBlend,
            "min_angle" => Self::MinAngle,
            _ => return None,
        })
    }

    pub fn arity(self) -> usize {
        match self {
            Self::Abs
            | Self::Sin
            | Self::Cos
            | Self::Asin
            | Self::Acos
            | Self::Atan
            | Self::Floor
            | Self::Ceil
            | Self::Round
            | Self::Trunc
            | Self::Sqrt
            | Self::Exp
            | Self::Ln
            | Self::HermiteBlend
            | Self::MinAngle => 1,
            Self::Atan2 | Self::Min | Self::Max | Self::Pow | Self::Mod => 2,
            Self::Clamp | Self::Lerp | Self::LerpRotate | Self::InverseLerp => 3,
        }
    }

    fn apply(self, args: &[f32]) -> f32 {
        let arg = |i: usize| args.get(i).copied().unwrap_or(0.0);
        match self {
            Self::Abs => arg(0).abs(),
            Self::Sin => arg(0).to_radians().sin(),
            Self::Cos => arg(0).to_radians().cos(),
            Self::Asin => arg(0).asin().to_degrees(),
            Self::Acos => arg(0).acos().to_degrees(),
            Self::Atan => arg(0).atan().to_degrees(),
            Self::Atan2 => arg(0).atan2(arg(1)).to_degrees(),
            Self::Clamp => {
                let (low, high) = (arg(1).min(arg(2)), arg(1).max(arg(2)));
                arg(0).max(low).min(high)
            }
            Self::Lerp => arg(0) + (arg(1) - arg(0)) * arg(2),
            Self::LerpRotate => {
                let (from, to, t) = (arg(0), arg(1), arg(2));
                from + wrap_degrees(to - from) * t
            }
            Self::InverseLerp => {
                let (from, to, value) = (arg(0), arg(1), arg(2));
                if to == from {
                    0.0
                } else {
                    (value - from) / (to - from)
                }
            }
            Self::Min => arg(0).min(arg(1)),
            Self::Max => arg(0).max(arg(1)),
            Self::Floor => arg(0).floor(),
            Self::Ceil => arg(0).ceil(),
            Self::Round => arg(0).round(),
            Self::Trunc => arg(0).trunc(),
            Self::Sqrt => arg(0).sqrt(),
            Self::Pow => arg(0).powf(arg(1)),
            Self::Mod => safe_rem(arg(0), arg(1)),
            Self::Exp => arg(0).exp(),
            Self::Ln => arg(0).ln(),
            Self::HermiteBlend => {
                let t = arg(0);
                3.0 * t * t - 2.0 * t * t * t
            }
            Self::MinAngle => wrap_degrees(arg(0)),
        }
    }
}

/// 将角度规范到 [-180, 180)
fn wrap_degrees(angle: f32) -> f32 {
    (angle + 180.0).rem_euclid(360.0) - 180.0
}

fn safe_rem(lhs: f32, rhs: f32) -> f32 {
    if rhs == 0.0 {
        0.0
    } else {
        lhs % rhs
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Not,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
    And,
    Or,
}

/// 表达式语法树
#[derive(Clone, Debug, PartialEq)]
pub enum Expr {
    Constant(f32),
    Query(Query),
    Variable(String),
    Unary(UnaryOp, Box<Expr>),
    Binary(BinaryOp, Box<Expr>, Box<Expr>),
    Ternary(Box<Expr>, Box<Expr>, Box<Expr>),
    Call(MathFn, Vec<Expr>),
}

fn truth(value: bool) -> f32 {
    if value {
        1.0
    } else {
        0.0
    }
}

impl Expr {
    pub fn eval(&self, context: &MolangContext<'_>) -> f32 {
        match self {
            Self::Constant(value) => *value,
            Self::Query(query) => query.eval(context),
            // 未定义的变量视为 0
            Self::Variable(name) => context.variables.get(name).copied().unwrap_or(0.0),
            Self::Unary(op, operand) => {
                let value = operand.eval(context);
                match op {
                    UnaryOp::Neg => -value,
                    UnaryOp::Not => truth(value == 0.0),
                }
            }
            Self::Binary(op, lhs, rhs) => {
                let a = lhs.eval(context);
                match op {
                    BinaryOp::And => truth(a != 0.0 && rhs.eval(context) != 0.0),
                    BinaryOp::Or => truth(a != 0.0 || rhs.eval(context) != 0.0),
                    BinaryOp::Add => a + rhs.eval(context),
                    BinaryOp::Sub => a - rhs.eval(context),
                    BinaryOp::Mul => a * rhs.eval(context),
                    BinaryOp::Div => {
                        let b = rhs.eval(context);
                        if b == 0.0 {
                            0.0
                        } else {
                            a / b
                        }
                    }
                    BinaryOp::Lt => truth(a < rhs.eval(context)),
                    BinaryOp::Le => truth(a <= rhs.eval(context)),
                    BinaryOp::Gt => truth(a > rhs.eval(context)),
                    BinaryOp::Ge => truth(a >= rhs.eval(context)),
                    BinaryOp::Eq => truth(a == rhs.eval(context)),
                    BinaryOp::Ne => truth(a != rhs.eval(context)),
                }
            }
            Self::Ternary(condition, then, otherwise) => {
                if condition.eval(context) != 0.0 {
                    then.eval(context)
                } else {
                    otherwise.eval(context)
                }
            }
            Self::Call(function, args) => {
                let mut values = [0.0f32; 3];
                for (slot, arg) in values.iter_mut().zip(args) {
                    *slot = arg.eval(context);
                }
                function.apply(&values[..args.len().min(3)])
            }
        }
    }

    /// 是否不依赖任何上下文
    pub fn is_constant(&self) -> bool {
        match self {
            Self::Constant(_) => true,
            Self::Query(_) | Self::Variable(_) => false,
            Self::Unary(_, operand) => operand.is_constant(),
            Self::Binary(_, lhs, rhs) => lhs.is_constant() && rhs.is_constant(),
            Self::Ternary(a, b, c) => a.is_constant() && b.is_constant() && c.is_constant(),
            Self::Call(_, args) => args.iter().all(Expr::is_constant),
        }
    }
}
