//! Molang 词法与递归下降解析
//!
//! 优先级（由低到高）：`?:`、`||`、`&&`、`== !=`、`< <= > >=`、`+ -`、`* /`、一元 `- !`。

use std::f32::consts::PI;

use super::expr::{BinaryOp, Expr, MathFn, Query, UnaryOp};
use super::MolangError;

/// 括号、一元运算和连续二元运算的最大嵌套层数
const MAX_DEPTH: usize = 128;

#[derive(Clone, Debug, PartialEq)]
enum Token {
    Number(f32),
    Ident(String),
    LParen,
    RParen,
    Comma,
    Plus,
    Minus,
    Star,
    Slash,
    Question,
    Colon,
    Bang,
    AndAnd,
    OrOr,
    EqEq,
    NotEq,
    Lt,
    Le,
    Gt,
    Ge,
    Assign,
    Semicolon,
}

impl Token {
    fn describe(&self) -> String {
        match self {
            Token::Number(value) => value.to_string(),
            Token::Ident(name) => name.clone(),
            Token::LParen => "(".into(),
            Token::RParen => ")".into(),
            Token::Comma => ",".into(),
            Token::Plus => "+".into(),
            Token::Minus => "-".into(),
            Token::Star => "*".into(),
            Token::Slash => "/".into(),
            Token::Question => "?".into(),
            Token::Colon => ":".into(),
            Token::Bang => "!".into(),
            Token::AndAnd => "&&".into(),
            Token::OrOr => "||".into(),
            Token::EqEq => "==".into(),
            Token::NotEq => "!=".into(),
            Token::Lt => "<".into(),
            Token::Le => "<=".into(),
            Token::Gt => ">".into(),
            Token::Ge => ">=".into(),
            Token::Assign => "=".into(),
            Token::Semicolon => ";".into(),
        }
    }
}

fn tokenize(source: &str) -> Result<Vec<(usize, Token)>, MolangError> {
    let chars: Vec<char> = source.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let ch = chars[i];
        let start = i;

        if ch.is_whitespace() {
            i += 1;
            continue;
        }

        if ch.is_ascii_digit() || (ch == '.' && chars.get(i + 1).is_some_and(|c| c.is_ascii_digit())) {
            while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
                i += 1;
            }
            // 指数部分：1e3、2.5E-2
            if matches!(chars.get(i), Some('e' | 'E')) {
                let digits = match chars.get(i + 1) {
                    Some('+' | '-') => i + 2,
                    _ => i + 1,
                };
                if chars.get(digits).is_some_and(|c| c.is_ascii_digit()) {
                    i = digits;
                    while i < chars.len() && chars[i].is_ascii_digit() {
                        i += 1;
                    }
                }
            }
            // 允许 1.5f 这种带后缀的写法
            let text: String = chars[start..i].iter().collect();
            if i < chars.len() && (chars[i] == 'f' || chars[i] == 'F') {
                i += 1;
            }
            let value = text.parse::<f32>().map_err(|_| MolangError::InvalidNumber {
                pos: start,
                text: text.clone(),
            })?;
            tokens.push((start, Token::Number(value)));
            continue;
        }

        if ch.is_ascii_alphabetic() || ch == '_' {
            while i < chars.len() && (chars[i].is_ascii_alphanumeric() || chars[i] == '_' || chars[i] == '.') {
                i += 1;
            }
            // Molang 不区分大小写
            let text: String = chars[start..i].iter().collect::<String>().to_ascii_lowercase();
            tokens.push((start, Token::Ident(text)));
            continue;
        }

        let next = chars.get(i + 1).copied();
        let (token, width) = match (ch, next) {
            ('&', Some('&')) => (Token::AndAnd, 2),
            ('|', Some('|')) => (Token::OrOr, 2),
            ('=', Some('=')) => (Token::EqEq, 2),
            ('!', Some('=')) => (Token::NotEq, 2),
            ('<', Some('=')) => (Token::Le, 2),
            ('>', Some('=')) => (Token::Ge, 2),
            ('(', _) => (Token::LParen, 1),
            (')', _) => (Token::RParen, 1),
            (',', _) => (Token::Comma, 1),
            ('+', _) => (Token::Plus, 1),
            ('-', _) => (Token::Minus, 1),
            ('*', _) => (Token::Star, 1),
            ('/', _) => (Token::Slash, 1),
            ('?', _) => (Token::Question, 1),
            (':', _) => (Token::Colon, 1),
            ('!', _) => (Token::Bang, 1),
            ('<', _) => (Token::Lt, 1),
            ('>', _) => (Token::Gt, 1),
            ('=', _) => (Token::Assign, 1),
            (';', _) => (Token::Semicolon, 1),
            _ => return Err(MolangError::UnexpectedChar { pos: start, ch }),
        };
        tokens.push((start, token));
        i += width;
    }

    Ok(tokens)
}

struct Parser {
    tokens: Vec<(usize, Token)>,
    cursor: usize,
    depth: usize,
}

impl Parser {
    fn descend(&mut self) -> Result<(), MolangError> {
        if self.depth >= MAX_DEPTH {
            return Err(MolangError::TooDeep(MAX_DEPTH));
        }
        self.depth += 1;
        Ok(())
    }

    /// 在更深一层解析子表达式
    fn nested(&mut self, parse: fn(&mut Self) -> Result<Expr, MolangError>) -> Result<Expr, MolangError> {
        self.descend()?;
        let result = parse(self);
        self.depth -= 1;
        result
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.cursor).map(|(_, token)| token)
    }

    fn advance(&mut self) -> Option<(usize, Token)> {
        let token = self.tokens.get(self.cursor).cloned();
        if token.is_some() {
            self.cursor += 1;
        }
        token
    }

    fn eat(&mut self, expected: &Token) -> bool {
        if self.peek() == Some(expected) {
            self.cursor += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, expected: Token, description: &'static str) -> Result<(), MolangError> {
        match self.advance() {
            Some((_, token)) if token == expected => Ok(()),
            Some((pos, token)) => Err(MolangError::UnexpectedToken {
                pos,
                found: token.describe(),
                expected: description,
            }),
            None => Err(MolangError::UnexpectedEnd(description)),
        }
    }

    fn ternary(&mut self) -> Result<Expr, MolangError> {
        let condition = self.binary(0)?;
        if self.eat(&Token::Question) {
            let then = self.nested(Self::ternary)?;
            self.expect(Token::Colon, "`:`")?;
            let otherwise = self.nested(Self::ternary)?;
            return Ok(Expr::Ternary(Box::new(condition), Box::new(then), Box::new(otherwise)));
        }
        Ok(condition)
    }

    /// 按优先级爬升解析二元运算（左结合）
    fn binary(&mut self, min_level: u8) -> Result<Expr, MolangError> {
        let mut lhs = self.unary()?;
        let depth = self.depth;
        while let Some((level, op)) = self.peek().and_then(binary_op) {
            if level < min_level {
                break;
            }
            self.cursor += 1;
            // 左结合链每多一个运算符，树就深一层
            self.descend()?;
            let rhs = self.binary(level + 1)?;
            lhs = Expr::Binary(op, Box::new(lhs), Box::new(rhs));
        }
        self.depth = depth;
        Ok(lhs)
    }

    fn unary(&mut self) -> Result<Expr, MolangError> {
        if self.eat(&Token::Minus) {
            let operand = self.nested(Self::unary)?;
            // 负数字面量直接折叠
            return Ok(match operand {
                Expr::Constant(value) => Expr::Constant(-value),
                other => Expr::Unary(UnaryOp::Neg, Box::new(other)),
            });
        }
        if self.eat(&Token::Plus) {
            return self.nested(Self::unary);
        }
        if self.eat(&Token::Bang) {
            let operand = self.nested(Self::unary)?;
            return Ok(Expr::Unary(UnaryOp::Not, Box::new(operand)));
        }
        self.primary()
    }

    fn primary(&mut self) -> Result<Expr, MolangError> {
        match self.advance() {
            Some((_, Token::Number(value))) => Ok(Expr::Constant(value)),
            Some((_, Token::LParen)) => {
                let inner = self.nested(Self::ternary)?;
                self.expect(Token::RParen, "`)`")?;
                Ok(inner)
            }
            Some((_, Token::Ident(name))) => self.identifier(name),
            Some((pos, token)) => Err(MolangError::UnexpectedToken {
                pos,
                found: token.describe(),
                expected: "a value",
            }),
            None => Err(MolangError::UnexpectedEnd("a value")),
        }
    }

    fn identifier(&mut self, name: String) -> Result<Expr, MolangError> {
        match name.as_str() {
            "true" => return Ok(Expr::Constant(1.0)),
            "false" => return Ok(Expr::Constant(0.0)),
            "math.pi" => return Ok(Expr::Constant(PI)),
            _ => {}
        }

        let (namespace, member) = name.split_once('.').unwrap_or((name.as_str(), ""));
        match namespace {
            "query" | "q" => {
                let query =
                    Query::from_name(member).ok_or_else(|| MolangError::UnknownQuery(name.clone()))?;
                // 允许 `query.anim_time()` 写法
                if self.eat(&Token::LParen) {
                    self.expect(Token::RParen, "`)`")?;
                }
                Ok(Expr::Query(query))
            }
            "variable" | "v" if !member.is_empty() => {
                if self.peek() == Some(&Token::Assign) {
                    return Err(MolangError::Unsupported(format!("assignment to `{name}`")));
                }
                Ok(Expr::Variable(member.to_string()))
            }
            "math" => {
                let function =
                    MathFn::from_name(member).ok_or_else(|| MolangError::UnknownFunction(name.clone()))?;
                self.expect(Token::LParen, "`(`")?;
                let mut args = Vec::new();
                if !self.eat(&Token::RParen) {
                    loop {
                        args.push(self.nested(Self::ternary)?);
                        if self.eat(&Token::Comma) {
                            continue;
                        }
                        self.expect(Token::RParen, "`)` or `,`")?;
                        break;
                    }
                }
                if args.len() != function.arity() {
                    return Err(MolangError::WrongArity {
                        name,
                        expected: function.arity(),
                        found: args.len(),
                    });
                }
                Ok(Expr::Call(function, args))
            }
            "temp" | "t" | "context" | "c" => Err(MolangError::Unsupported(format!("`{name}`"))),
            _ => Err(MolangError::UnknownIdentifier(name)),
        }
    }
}

fn binary_op(token: &Token) -> Option<(u8, BinaryOp)> {
    Some(match token {
        Token::OrOr => (0, BinaryOp::Or),
        Token::AndAnd => (1, BinaryOp::And),
        Token::EqEq => (2, BinaryOp::Eq),
        Token::NotEq => (2, BinaryOp::Ne),
        Token::Lt => (3, BinaryOp::Lt),
        Token::Le => (3, BinaryOp::Le),
        Token::Gt => (3, BinaryOp::Gt),
        Token::Ge => (3, BinaryOp::Ge),
        Token::Plus => (4, BinaryOp::Add),
        Token::Minus => (4, BinaryOp::Sub),
        Token::Star => (5, BinaryOp::Mul),
        Token::Slash => (5, BinaryOp::Div),
        _ => return None,
    })
}

/// 解析单个表达式，可带一个结尾分号
pub(super) fn parse(source: &str) -> Result<Expr, MolangError> {
    let tokens = tokenize(source)?;
    let mut parser = Parser {
        tokens,
        cursor: 0,
        depth: 0,
    };
    let expr = parser.ternary()?;
    let terminated = parser.eat(&Token::Semicolon);
    match parser.advance() {
        None => Ok(expr),
        Some(_) if terminated => Err(MolangError::Unsupported("multi-statement scripts".into())),
        Some((_, Token::Assign)) => Err(MolangError::Unsupported("assignment".into())),
        Some((pos, token)) => Err(MolangError::UnexpectedToken {
            pos,
            found: token.describe(),
            expected: "end of expression",
        }),
    }
}
