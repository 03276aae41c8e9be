//! 集合操作符的请求对象模型：过滤表达式树、排序条件、分页窗口和字段选择

use serde::{Deserialize, Serialize};
use std::fmt;

/// 过滤表达式树的节点
///
/// 叶子节点是条件，内部节点是逻辑组合。JSON 中以 `kind` 字段区分节点类型。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Filter {
    Logical(LogicalNode),
    String(StringCondition),
    Number(NumberCondition),
    Null(NullCondition),
    /// 反序列化时遇到的未知节点类型，编译时会被拒绝
    #[serde(other)]
    Unsupported,
}

/// 逻辑组合节点 (AND / OR)，可整体取反
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogicalNode {
    pub combinator: Combinator,
    #[serde(default)]
    pub negated: bool,
    pub left: Box<Filter>,
    pub right: Box<Filter>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Combinator {
    And,
    Or,
}

impl Combinator {
    pub fn keyword(self) -> &'static str {
        match self {
            Combinator::And => "AND",
            Combinator::Or => "OR",
        }
    }
}

/// 字符串条件, 例如：`name == "a"`, `title ~ "^v1"`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StringCondition {
    pub field_path: FieldPath,
    pub op: StringOp,
    pub value: String,
    #[serde(default)]
    pub negated: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StringOp {
    Eq,    // =
    Match, // ~
}

/// 数值条件, 例如：`age > 5`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NumberCondition {
    pub field_path: FieldPath,
    pub op: NumberOp,
    pub value: f64,
    #[serde(default)]
    pub negated: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NumberOp {
    Eq, // =
    Gt, // >
    Ge, // >=
    Lt, // <
    Le, // <=
}

/// 空值检查, 例如：`deleted_at == null`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NullCondition {
    pub field_path: FieldPath,
    #[serde(default)]
    pub negated: bool,
}

impl Filter {
    /// 对节点取反，条件节点翻转自身的 `negated` 标记
    pub fn negate(self) -> Filter {
        match self {
            Filter::Logical(mut node) => {
                node.negated = !node.negated;
                Filter::Logical(node)
            }
            Filter::String(mut c) => {
                c.negated = !c.negated;
                Filter::String(c)
            }
            Filter::Number(mut c) => {
                c.negated = !c.negated;
                Filter::Number(c)
            }
            Filter::Null(mut c) => {
                c.negated = !c.negated;
                Filter::Null(c)
            }
            Filter::Unsupported => Filter::Unsupported,
        }
    }

    pub fn and(left: Filter, right: Filter) -> Filter {
        Filter::logical(Combinator::And, left, right)
    }

    pub fn or(left: Filter, right: Filter) -> Filter {
        Filter::logical(Combinator::Or, left, right)
    }

    fn logical(combinator: Combinator, left: Filter, right: Filter) -> Filter {
        Filter::Logical(LogicalNode {
            combinator,
            negated: false,
            left: Box::new(left),
            right: Box::new(right),
        })
    }

    pub fn string(path: &str, op: StringOp, value: impl Into<String>) -> Filter {
        Filter::String(StringCondition {
            field_path: FieldPath::parse(path),
            op,
            value: value.into(),
            negated: false,
        })
    }

    pub fn number(path: &str, op: NumberOp, value: f64) -> Filter {
        Filter::Number(NumberCondition {
            field_path: FieldPath::parse(path),
            op,
            value,
            negated: false,
        })
    }

    pub fn null(path: &str) -> Filter {
        Filter::Null(NullCondition {
            field_path: FieldPath::parse(path),
            negated: false,
        })
    }
}

/// 字段路径，例如 `["owner", "name"]`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldPath(pub Vec<String>);

impl FieldPath {
    /// 按 `.` 拆分点号路径
    pub fn parse(dotted: &str) -> Self {
        FieldPath(dotted.split('.').map(str::to_string).collect())
    }

    pub fn segments(&self) -> &[String] {
        &self.0
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.join("."))
    }
}

/// 单个排序条件，`tag` 为点号分隔的字段路径
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortCriterion {
    pub tag: String,
    #[serde(default)]
    pub desc: bool,
}

impl SortCriterion {
    pub fn asc(tag: impl Into<String>) -> Self {
        Self { tag: tag.into(), desc: false }
    }

    pub fn desc(tag: impl Into<String>) -> Self {
        Self { tag: tag.into(), desc: true }
    }
}

/// 排序条件列表，顺序即 ORDER BY 的优先级
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sorting {
    pub criteria: Vec<SortCriterion>,
}

/// 分页窗口，`limit == 0` 表示未设置
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    #[serde(default)]
    pub offset: u64,
    #[serde(default)]
    pub limit: u64,
}

/// 实际应用到查询上的 OFFSET / LIMIT
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    pub offset: u64,
    pub limit: u64,
}

impl Pagination {
    /// 未设置 limit 时使用 `default_limit`
    pub fn window(&self, default_limit: u64) -> PageWindow {
        let limit = if self.limit == 0 { default_limit } else { self.limit };
        PageWindow { offset: self.offset, limit }
    }
}

/// 字段选择，`inverted` 为 true 时表示“除这些字段以外的全部字段”
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSelection {
    pub fields: Vec<String>,
    #[serde(default)]
    pub inverted: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_negate_toggles_flag() {
        let filter = Filter::number("age", NumberOp::Gt, 5.0).negate();
        match &filter {
            Filter::Number(c) => assert!(c.negated),
            _ => panic!("Expected number condition"),
        }

        match filter.negate() {
            Filter::Number(c) => assert!(!c.negated),
            _ => panic!("Expected number condition"),
        }
    }

    #[test]
    fn test_field_path_parse_and_display() {
        let path = FieldPath::parse("owner.name");
        assert_eq!(path.segments(), ["owner".to_string(), "name".to_string()]);
        assert_eq!(path.to_string(), "owner.name");
    }

    #[test]
    fn test_pagination_default_limit() {
        let p = Pagination { offset: 10, limit: 0 };
        assert_eq!(p.window(1000), PageWindow { offset: 10, limit: 1000 });

        let p = Pagination { offset: 0, limit: 25 };
        assert_eq!(p.window(1000), PageWindow { offset: 0, limit: 25 });
    }

    #[test]
    fn test_filter_json_round_trip_shape() {
        let json = r#"{
            "kind": "logical",
            "combinator": "and",
            "left": { "kind": "string", "field_path": ["name"], "op": "eq", "value": "a" },
            "right": { "kind": "null", "field_path": ["deleted_at"], "negated": true }
        }"#;
        let filter: Filter = serde_json::from_str(json).unwrap();
        assert_eq!(
            filter,
            Filter::and(
                Filter::string("name", StringOp::Eq, "a"),
                Filter::null("deleted_at").negate(),
            )
        );
    }

    #[test]
    fn test_unknown_node_kind_deserializes_as_unsupported() {
        let json = r#"{ "kind": "geo_within", "field_path": ["location"] }"#;
        let filter: Filter = serde_json::from_str(json).unwrap();
        assert_eq!(filter, Filter::Unsupported);
    }
}
