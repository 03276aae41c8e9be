//! 过滤字符串的语法分析器
//!
//! ## 解析流程图
//!
//! ```text
//! parse()
//!   └─ parse_or_expression()
//!        ├─ parse_and_expression()
//!        │    ├─ parse_not_expression()
//!        │    │    └─ parse_primary_expression()
//!        │    │         ├─ "(" → 分组表达式 (递归调用 parse_or_expression，不产生节点)
//!        │    │         └─ 字段路径 → parse_condition()
//!        │    │                         ├─ 运算符
//!        │    │                         └─ 字面值 (字符串 / 数字 / null)
//!        │    │
//!        │    └─ 遇到 and 时，继续解析右侧 NOT 表达式
//!        │
//!        └─ 遇到 or 时，继续解析右侧 AND 表达式
//! ```
//!
//! ## 语法优先级（从高到低）
//!
//! 1. **括号分组** `(expression)`
//! 2. **NOT操作** `not expression`，翻转条件或逻辑节点的取反标记
//! 3. **AND操作** `expr1 and expr2`
//! 4. **OR操作** `expr1 or expr2`
//!
//! ## 条件与节点类型的对应关系
//!
//! | 运算符 | 字符串 | 数字 | null |
//! |---|---|---|---|
//! | `==` / `!=` | 字符串 EQ | 数值 EQ | 空值检查 |
//! | `~` / `!~` | 字符串 MATCH | 错误 | 错误 |
//! | `>` `>=` `<` `<=` | 错误 | 数值比较 | 错误 |
//!
//! `!=` 与 `!~` 产生取反的条件。
//!
//! ## 解析示例
//!
//! ```text
//! name == "a" and not age > 5 or owner.city == "X"
//! deleted_at != null and (title ~ "^Release" or priority >= 3)
//! ```

use crate::ast::{FieldPath, Filter, NullCondition, NumberCondition, NumberOp, StringCondition, StringOp};
use crate::token::{Span, Token, TokenKind};
use thiserror::Error;

/// 括号和 not 的最大嵌套层数，与 serde_json 的递归上限一致
pub const MAX_NESTING_DEPTH: usize = 128;

pub struct Parser<'a> {
    tokens: &'a [Token<'a>],
    position: usize,
    depth: usize,
}

#[derive(Debug, Clone, PartialEq, Error)]
#[error("{message}")]
pub struct ParseError {
    pub message: String,
    pub span: Option<Span>,
}

impl ParseError {
    fn new(message: String, span: Option<Span>) -> Self {
        Self { message, span }
    }

    fn at_position(message: String, span: Span) -> Self {
        Self { message, span: Some(span) }
    }
}

/// 条件中的运算符
#[derive(Debug, Clone, Copy, PartialEq)]
enum Operator {
    Eq,
    NotEq,
    Match,
    NotMatch,
    Ordering(NumberOp),
}

/// 条件右侧的字面值
enum Value {
    String(String),
    Number(f64),
    Null,
}

impl<'a> Parser<'a> {
    pub fn new(tokens: &'a [Token<'a>]) -> Self {
        Self {
            tokens,
            position: 0,
            depth: 0,
        }
    }

    /// 返回当前 token，不推进位置
    fn peek(&self) -> Option<&'a Token<'a>> {
        self.tokens.get(self.position)
    }

    /// 返回当前 token 并推进位置
    fn advance(&mut self) -> Option<&'a Token<'a>> {
        let token = self.tokens.get(self.position)?;
        self.position += 1;
        Some(token)
    }

    /// 期望特定类型的 token 并推进，否则返回错误
    fn expect(&mut self, expected: TokenKind) -> Result<&'a Token<'a>, ParseError> {
        match self.peek() {
            Some(token) if std::mem::discriminant(&token.kind) == std::mem::discriminant(&expected) => {
                self.position += 1;
                Ok(token)
            }
            Some(token) => Err(ParseError::at_position(
                format!("Expected {:?}, found {:?}", expected, token.kind),
                token.span,
            )),
            None => Err(ParseError::new(
                format!("Expected {:?}, but reached end of input", expected),
                None,
            )),
        }
    }

    /// 进入一层括号或 not，超过上限时报错
    fn enter(&mut self, span: Span) -> Result<(), ParseError> {
        if self.depth >= MAX_NESTING_DEPTH {
            return Err(ParseError::at_position("filter nesting too deep".to_string(), span));
        }
        self.depth += 1;
        Ok(())
    }

    /// 检查当前 token 是否匹配给定类型
    fn match_token(&self, kind: &TokenKind) -> bool {
        self.peek()
            .is_some_and(|token| std::mem::discriminant(&token.kind) == std::mem::discriminant(kind))
    }

    /// 解析完整的过滤表达式，要求消费全部 token
    pub fn parse(&mut self) -> Result<Filter, ParseError> {
        let filter = self.parse_or_expression()?;

        if let Some(token) = self.peek() {
            return Err(ParseError::at_position(
                format!("Unexpected token: {:?}", token.kind),
                token.span,
            ));
        }

        Ok(filter)
    }

    /// 解析OR表达式 (最低优先级)
    ///
    /// 语法: `and_expr (or and_expr)*`
    fn parse_or_expression(&mut self) -> Result<Filter, ParseError> {
        let mut left = self.parse_and_expression()?;

        while self.match_token(&TokenKind::Or) {
            self.advance(); // 消费 or
            let right = self.parse_and_expression()?;
            left = Filter::or(left, right);
        }

        Ok(left)
    }

    /// 解析AND表达式 (中等优先级)
    ///
    /// 语法: `not_expr (and not_expr)*`
    fn parse_and_expression(&mut self) -> Result<Filter, ParseError> {
        let mut left = self.parse_not_expression()?;

        while self.match_token(&TokenKind::And) {
            self.advance(); // 消费 and
            let right = self.parse_not_expression()?;
            left = Filter::and(left, right);
        }

        Ok(left)
    }

    /// 解析NOT表达式 (较高优先级)
    ///
    /// 语法: `not* primary_expr`
    fn parse_not_expression(&mut self) -> Result<Filter, ParseError> {
        if let Some(token) = self.peek().filter(|t| t.kind == TokenKind::Not) {
            self.advance(); // 消费 not
            self.enter(token.span)?;
            let expr = self.parse_not_expression()?; // 允许 not 链式调用
            self.depth -= 1;
            Ok(expr.negate())
        } else {
            self.parse_primary_expression()
        }
    }

    /// 解析基础表达式 (最高优先级)
    fn parse_primary_expression(&mut self) -> Result<Filter, ParseError> {
        let Some(token) = self.peek() else {
            return Err(ParseError::new("Unexpected end of input".to_string(), None));
        };

        match &token.kind {
            TokenKind::LParen => {
                self.advance(); // 消费 (
                self.enter(token.span)?;
                let expr = self.parse_or_expression()?;
                self.expect(TokenKind::RParen)?;
                self.depth -= 1;
                Ok(expr)
            }
            TokenKind::Identifier(path) => {
                self.advance(); // 消费字段路径
                self.parse_condition(FieldPath::parse(path), token.span)
            }
            _ => Err(ParseError::at_position(
                format!("Expected field path or '(', found {:?}", token.kind),
                token.span,
            )),
        }
    }

    /// 解析字段路径之后的 `运算符 字面值`
    fn parse_condition(&mut self, field_path: FieldPath, path_span: Span) -> Result<Filter, ParseError> {
        let (op, op_span) = self.parse_operator()?;
        let (value, value_span) = self.parse_literal()?;
        let span = Span::new(path_span.start, value_span.end);

        let filter = match (op, value) {
            (Operator::Eq | Operator::NotEq, Value::Null) => Filter::Null(NullCondition {
                field_path,
                negated: op == Operator::NotEq,
            }),
            (Operator::Eq | Operator::NotEq, Value::String(value)) => Filter::String(StringCondition {
                field_path,
                op: StringOp::Eq,
                value,
                negated: op == Operator::NotEq,
            }),
            (Operator::Eq | Operator::NotEq, Value::Number(value)) => Filter::Number(NumberCondition {
                field_path,
                op: NumberOp::Eq,
                value,
                negated: op == Operator::NotEq,
            }),
            (Operator::Match | Operator::NotMatch, Value::String(value)) => Filter::String(StringCondition {
                field_path,
                op: StringOp::Match,
                value,
                negated: op == Operator::NotMatch,
            }),
            (Operator::Match | Operator::NotMatch, _) => {
                return Err(ParseError::at_position(
                    format!("Match operator on '{}' requires a string value", field_path),
                    op_span,
                ));
            }
            (Operator::Ordering(op), Value::Number(value)) => Filter::Number(NumberCondition {
                field_path,
                op,
                value,
                negated: false,
            }),
            (Operator::Ordering(_), _) => {
                return Err(ParseError::at_position(
                    format!("Comparison on '{}' requires a number value", field_path),
                    span,
                ));
            }
        };

        Ok(filter)
    }

    fn parse_operator(&mut self) -> Result<(Operator, Span), ParseError> {
        let Some(token) = self.advance() else {
            return Err(ParseError::new("Expected comparison operator".to_string(), None));
        };

        let op = match &token.kind {
            TokenKind::Eq => Operator::Eq,
            TokenKind::NotEq => Operator::NotEq,
            TokenKind::Match => Operator::Match,
            TokenKind::NotMatch => Operator::NotMatch,
            TokenKind::Gt => Operator::Ordering(NumberOp::Gt),
            TokenKind::Gte => Operator::Ordering(NumberOp::Ge),
            TokenKind::Lt => Operator::Ordering(NumberOp::Lt),
            TokenKind::Lte => Operator::Ordering(NumberOp::Le),
            _ => {
                return Err(ParseError::at_position(
                    format!("Expected comparison operator, found {:?}", token.kind),
                    token.span,
                ));
            }
        };
        Ok((op, token.span))
    }

    fn parse_literal(&mut self) -> Result<(Value, Span), ParseError> {
        let Some(token) = self.advance() else {
            return Err(ParseError::new("Expected literal value".to_string(), None));
        };

        let value = match &token.kind {
            TokenKind::String(s) => Value::String(s.clone()),
            TokenKind::Number(n) => Value::Number(*n),
            TokenKind::Null => Value::Null,
            _ => {
                return Err(ParseError::at_position(
                    format!("Expected literal value, found {:?}", token.kind),
                    token.span,
                ));
            }
        };
        Ok((value, token.span))
    }
}

/// 对过滤字符串进行分词和解析
pub fn parse_filter(input: &str) -> Result<Filter, ParseError> {
    let tokens: Vec<_> = crate::lexer::Lexer::new(input).collect();
    Parser::new(&tokens).parse()
}
