//! Request-context accessors for the four collection operators.
//!
//! [`RequestContext`] is the seam to whatever transport carries the request. [`QueryParams`]
//! implements it over the usual query-string parameters:
//!
//! ```text
//! filter=name == "a" and owner.city != null
//! order_by=created_at desc, name
//! fields=name,owner.name        (or exclude_fields=owner)
//! offset=20&limit=10
//! ```

use serde::Deserialize;
use thiserror::Error;

use crate::ast::{FieldSelection, Filter, Pagination, SortCriterion, Sorting};
use crate::parser::{parse_filter, ParseError};

#[derive(Debug, Error)]
pub enum RequestError {
    #[error("invalid filter: {0}")]
    Filter(#[from] ParseError),

    #[error("invalid sort criterion `{0}`")]
    Sorting(String),

    #[error("invalid {name} `{value}`: expected a non-negative integer")]
    Pagination { name: &'static str, value: String },

    #[error("invalid field selection: {0}")]
    FieldSelection(String),

    #[error("malformed request payload: {0}")]
    Payload(#[from] serde_json::Error),
}

/// Yields each collection operator of the current request. `Ok(None)` means the operator
/// was not supplied; malformed input is an error.
pub trait RequestContext {
    fn filtering(&self) -> Result<Option<Filter>, RequestError>;
    fn sorting(&self) -> Result<Option<Sorting>, RequestError>;
    fn pagination(&self) -> Result<Option<Pagination>, RequestError>;
    fn field_selection(&self) -> Result<Option<FieldSelection>, RequestError>;
}

/// Raw query-string parameters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct QueryParams {
    pub filter: Option<String>,
    pub order_by: Option<String>,
    pub fields: Option<String>,
    pub exclude_fields: Option<String>,
    pub offset: Option<String>,
    pub limit: Option<String>,
}

impl QueryParams {
    /// Parses a JSON object of parameters, e.g. a decoded query string.
    pub fn from_json(json: &str) -> Result<Self, RequestError> {
        Ok(serde_json::from_str(json)?)
    }
}

impl RequestContext for QueryParams {
    fn filtering(&self) -> Result<Option<Filter>, RequestError> {
        match non_blank(&self.filter) {
            Some(filter) => Ok(Some(parse_filter(filter)?)),
            None => Ok(None),
        }
    }

    fn sorting(&self) -> Result<Option<Sorting>, RequestError> {
        non_blank(&self.order_by).map(parse_sorting).transpose()
    }

    fn pagination(&self) -> Result<Option<Pagination>, RequestError> {
        let offset = non_blank(&self.offset).map(|v| parse_count("offset", v)).transpose()?;
        let limit = non_blank(&self.limit).map(|v| parse_count("limit", v)).transpose()?;
        if offset.is_none() && limit.is_none() {
            return Ok(None);
        }
        Ok(Some(Pagination {
            offset: offset.unwrap_or(0),
            limit: limit.unwrap_or(0),
        }))
    }

    fn field_selection(&self) -> Result<Option<FieldSelection>, RequestError> {
        match (non_blank(&self.fields), non_blank(&self.exclude_fields)) {
            (Some(_), Some(_)) => Err(RequestError::FieldSelection(
                "`fields` and `exclude_fields` are mutually exclusive".to_string(),
            )),
            (Some(fields), None) => Ok(Some(parse_field_list(fields, false)?)),
            (None, Some(fields)) => Ok(Some(parse_field_list(fields, true)?)),
            (None, None) => Ok(None),
        }
    }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

/// `"name desc, owner.city, age asc"`
pub fn parse_sorting(input: &str) -> Result<Sorting, RequestError> {
    let mut criteria = Vec::new();
    for item in input.split(',') {
        let mut words = item.split_whitespace();
        let Some(tag) = words.next() else {
            return Err(RequestError::Sorting(item.to_string()));
        };
        let desc = match words.next().map(str::to_ascii_lowercase).as_deref() {
            None | Some("asc") => false,
            Some("desc") => true,
            Some(_) => return Err(RequestError::Sorting(item.trim().to_string())),
        };
        if words.next().is_some() || !is_field_path(tag) {
            return Err(RequestError::Sorting(item.trim().to_string()));
        }
        criteria.push(SortCriterion { tag: tag.to_string(), desc });
    }
    Ok(Sorting { criteria })
}

fn parse_field_list(input: &str, inverted: bool) -> Result<FieldSelection, RequestError> {
    let mut fields = Vec::new();
    for item in input.split(',').map(str::trim) {
        if !is_field_path(item) {
            return Err(RequestError::FieldSelection(format!("`{item}` is not a field path")));
        }
        fields.push(item.to_string());
    }
    Ok(FieldSelection { fields, inverted })
}

fn parse_count(name: &'static str, value: &str) -> Result<u64, RequestError> {
    value.parse::<u64>().map_err(|_| RequestError::Pagination {
        name,
        value: value.to_string(),
    })
}

fn is_field_path(s: &str) -> bool {
    !s.is_empty()
        && s.split('.').all(|segment| {
            !segment.is_empty() && segment.chars().all(|c| c.is_alphanumeric() || c == '_')
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::StringOp;

    fn params(pairs: &[(&str, &str)]) -> QueryParams {
        let mut p = QueryParams::default();
        for (key, value) in pairs {
            let value = Some(value.to_string());
            match *key {
                "filter" => p.filter = value,
                "order_by" => p.order_by = value,
                "fields" => p.fields = value,
                "exclude_fields" => p.exclude_fields = value,
                "offset" => p.offset = value,
                "limit" => p.limit = value,
                _ => panic!("unknown key {key}"),
            }
        }
        p
    }

    #[test]
    fn test_absent_operators() {
        let p = QueryParams::default();
        assert_eq!(p.filtering().unwrap(), None);
        assert_eq!(p.sorting().unwrap(), None);
        assert_eq!(p.pagination().unwrap(), None);
        assert_eq!(p.field_selection().unwrap(), None);

        let p = params(&[("filter", "  "), ("order_by", "")]);
        assert_eq!(p.filtering().unwrap(), None);
        assert_eq!(p.sorting().unwrap(), None);
    }

    #[test]
    fn test_filter_parsed() {
        let p = params(&[("filter", r#"name == "a""#)]);
        assert_eq!(p.filtering().unwrap(), Some(Filter::string("name", StringOp::Eq, "a")));

        let p = params(&[("filter", "name ==")]);
        assert!(matches!(p.filtering(), Err(RequestError::Filter(_))));
    }

    #[test]
    fn test_deeply_nested_filter_is_an_extraction_error() {
        let deep = format!("{}name == \"a\"{}", "(".repeat(5_000), ")".repeat(5_000));
        let p = params(&[("filter", deep.as_str())]);
        assert!(matches!(
            p.filtering(),
            Err(RequestError::Filter(e)) if e.message == "filter nesting too deep"
        ));
    }

    #[test]
    fn test_sorting_parsed() {
        let sorting = parse_sorting("created_at desc, name,owner.city ASC").unwrap();
        assert_eq!(
            sorting.criteria,
            vec![
                SortCriterion::desc("created_at"),
                SortCriterion::asc("name"),
                SortCriterion::asc("owner.city"),
            ]
        );

        assert!(parse_sorting("name sideways").is_err());
        assert!(parse_sorting("name,,age").is_err());
        assert!(parse_sorting("name desc extra").is_err());
        assert!(parse_sorting("na;me").is_err());
    }

    #[test]
    fn test_pagination_parsed() {
        let p = params(&[("offset", "10")]);
        assert_eq!(p.pagination().unwrap(), Some(Pagination { offset: 10, limit: 0 }));

        let p = params(&[("offset", "5"), ("limit", "20")]);
        assert_eq!(p.pagination().unwrap(), Some(Pagination { offset: 5, limit: 20 }));

        let p = params(&[("limit", "-1")]);
        assert!(matches!(p.pagination(), Err(RequestError::Pagination { name: "limit", .. })));
    }

    #[test]
    fn test_field_selection_parsed() {
        let p = params(&[("fields", "name, owner.name")]);
        assert_eq!(
            p.field_selection().unwrap(),
            Some(FieldSelection {
                fields: vec!["name".to_string(), "owner.name".to_string()],
                inverted: false,
            })
        );

        let p = params(&[("exclude_fields", "owner")]);
        assert!(p.field_selection().unwrap().unwrap().inverted);

        let p = params(&[("fields", "name"), ("exclude_fields", "owner")]);
        assert!(p.field_selection().is_err());

        let p = params(&[("fields", "name,")]);
        assert!(p.field_selection().is_err());
    }

    #[test]
    fn test_from_json() {
        let p = QueryParams::from_json(r#"{ "order_by": "name", "limit": "5" }"#).unwrap();
        assert_eq!(p.order_by.as_deref(), Some("name"));
        assert!(QueryParams::from_json("not json").is_err());
    }
}
