//! Structured predicate form produced by the filter compiler.
//!
//! Nodes hold resolved columns, fixed operator tokens and parameter values. Rendering to
//! text happens in one walk that writes `?` and pushes the matching parameter together,
//! so the placeholder count and order always agree with the parameter list.

use sea_query::Value;

use crate::ast::Combinator;
use crate::resolver::QualifiedColumn;

/// A value bound to a `?` placeholder.
#[derive(Debug, Clone, PartialEq)]
pub enum Param {
    Text(String),
    Number(f64),
}

impl From<Param> for Value {
    fn from(param: Param) -> Self {
        match param {
            Param::Text(s) => Value::from(s),
            Param::Number(n) => Value::from(n),
        }
    }
}

impl From<&str> for Param {
    fn from(s: &str) -> Self {
        Param::Text(s.to_string())
    }
}

impl From<f64> for Param {
    fn from(n: f64) -> Self {
        Param::Number(n)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Match,
    Gt,
    Ge,
    Lt,
    Le,
}

impl CompareOp {
    pub fn token(self) -> &'static str {
        match self {
            CompareOp::Eq => "=",
            CompareOp::Match => "~",
            CompareOp::Gt => ">",
            CompareOp::Ge => ">=",
            CompareOp::Lt => "<",
            CompareOp::Le => "<=",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    Compare {
        column: QualifiedColumn,
        op: CompareOp,
        param: Param,
        negated: bool,
    },
    IsNull {
        column: QualifiedColumn,
        negated: bool,
    },
    Logical {
        combinator: Combinator,
        left: Box<Predicate>,
        right: Box<Predicate>,
        negated: bool,
    },
}

impl Predicate {
    /// Renders the predicate text and its positional parameters.
    pub fn render(&self) -> (String, Vec<Param>) {
        let mut sql = String::new();
        let mut params = Vec::new();
        self.write(&mut sql, &mut params);
        (sql, params)
    }

    fn write(&self, sql: &mut String, params: &mut Vec<Param>) {
        match self {
            Predicate::Compare { column, op, param, negated } => {
                write_negation(sql, *negated);
                sql.push('(');
                sql.push_str(&column.to_string());
                sql.push(' ');
                sql.push_str(op.token());
                sql.push_str(" ?)");
                params.push(param.clone());
            }
            Predicate::IsNull { column, negated } => {
                write_negation(sql, *negated);
                sql.push('(');
                sql.push_str(&column.to_string());
                sql.push_str(" IS NULL)");
            }
            Predicate::Logical { combinator, left, right, negated } => {
                write_negation(sql, *negated);
                sql.push('(');
                left.write(sql, params);
                sql.push(' ');
                sql.push_str(combinator.keyword());
                sql.push(' ');
                right.write(sql, params);
                sql.push(')');
            }
        }
    }

    /// Number of parameter slots in the tree.
    pub fn param_count(&self) -> usize {
        match self {
            Predicate::Compare { .. } => 1,
            Predicate::IsNull { .. } => 0,
            Predicate::Logical { left, right, .. } => left.param_count() + right.param_count(),
        }
    }
}

fn write_negation(sql: &mut String, negated: bool) {
    if negated {
        sql.push_str("NOT");
    }
}
