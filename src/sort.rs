//! ORDER BY term generation.

use std::fmt;

use tracing::debug;

use crate::ast::Sorting;
use crate::error::CollectionResult;
use crate::joins::AssociationSet;
use crate::resolver::{FieldPathResolver, QualifiedColumn};

/// One ORDER BY term, rendered as `<column>` or `<column> desc`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderTerm {
    pub column: QualifiedColumn,
    pub desc: bool,
}

impl fmt::Display for OrderTerm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.desc {
            write!(f, "{} desc", self.column)
        } else {
            write!(f, "{}", self.column)
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompiledSort {
    /// In criteria order; duplicates are kept as given.
    pub terms: Vec<OrderTerm>,
    pub associations: AssociationSet,
}

impl CompiledSort {
    pub fn order_terms(&self) -> Vec<String> {
        self.terms.iter().map(ToString::to_string).collect()
    }
}

pub fn compile_sort(sorting: Option<&Sorting>, resolver: &FieldPathResolver<'_>) -> CollectionResult<CompiledSort> {
    let mut compiled = CompiledSort::default();
    let Some(sorting) = sorting else {
        return Ok(compiled);
    };

    for criterion in &sorting.criteria {
        let resolved = resolver.resolve_dotted(&criterion.tag)?;
        compiled.associations.extend(resolved.association);
        compiled.terms.push(OrderTerm {
            column: resolved.column,
            desc: criterion.desc,
        });
    }

    debug!(
        entity = resolver.entity_name(),
        terms = ?compiled.order_terms(),
        "compiled sort"
    );
    Ok(compiled)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::SortCriterion;
    use crate::error::CollectionError;
    use crate::test_fixtures::item_schema;

    fn sorting(criteria: Vec<SortCriterion>) -> Sorting {
        Sorting { criteria }
    }

    #[test]
    fn test_preserves_order_and_direction() {
        let schema = item_schema();
        let resolver = FieldPathResolver::new(&schema, "Item").unwrap();
        let s = sorting(vec![
            SortCriterion::asc("name"),
            SortCriterion::desc("created_at"),
            SortCriterion::desc("owner.city"),
        ]);

        let compiled = compile_sort(Some(&s), &resolver).unwrap();
        assert_eq!(
            compiled.order_terms(),
            vec!["items.name", "items.created_at desc", "owners.city desc"]
        );
        assert_eq!(compiled.associations.iter().collect::<Vec<_>>(), vec!["owner"]);
    }

    #[test]
    fn test_duplicate_keys_pass_through() {
        let schema = item_schema();
        let resolver = FieldPathResolver::new(&schema, "Item").unwrap();
        let s = sorting(vec![SortCriterion::asc("name"), SortCriterion::desc("name")]);

        let compiled = compile_sort(Some(&s), &resolver).unwrap();
        assert_eq!(compiled.order_terms(), vec!["items.name", "items.name desc"]);
    }

    #[test]
    fn test_empty_and_absent() {
        let schema = item_schema();
        let resolver = FieldPathResolver::new(&schema, "Item").unwrap();

        assert_eq!(compile_sort(None, &resolver).unwrap(), CompiledSort::default());
        assert_eq!(
            compile_sort(Some(&Sorting::default()), &resolver).unwrap(),
            CompiledSort::default()
        );
    }

    #[test]
    fn test_unknown_tag() {
        let schema = item_schema();
        let resolver = FieldPathResolver::new(&schema, "Item").unwrap();
        let s = sorting(vec![SortCriterion::asc("name"), SortCriterion::asc("bogus")]);

        assert!(matches!(
            compile_sort(Some(&s), &resolver),
            Err(CollectionError::UnknownField { .. })
        ));
    }
}
