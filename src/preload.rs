//! Eager-load directives derived from a field selection.

use tracing::debug;

use crate::ast::FieldSelection;
use crate::error::CollectionResult;
use crate::resolver::FieldPathResolver;

/// Returns the associations to preload, deduplicated, in first-appearance order.
///
/// A plain selection preloads every association its paths touch. An inverted selection
/// preloads every association of the entity, sorted by association name, except the ones
/// excluded outright by a single-segment path; `owner.name` excludes a column of `owner`,
/// not `owner` itself.
pub fn resolve_preloads(
    selection: Option<&FieldSelection>,
    resolver: &FieldPathResolver<'_>,
) -> CollectionResult<Vec<String>> {
    let Some(selection) = selection else {
        return Ok(Vec::new());
    };

    let mut touched = Vec::new();
    let mut excluded = Vec::new();
    for path in &selection.fields {
        if let Some(assoc) = resolver.resolve_selection(path)? {
            if !path.contains('.') {
                excluded.push(assoc.clone());
            }
            if !touched.contains(&assoc) {
                touched.push(assoc);
            }
        }
    }

    let preloads = if selection.inverted {
        resolver
            .entity()
            .associations
            .keys()
            .filter(|name| !excluded.contains(*name))
            .cloned()
            .collect()
    } else {
        touched
    };

    debug!(entity = resolver.entity_name(), ?preloads, "resolved preloads");
    Ok(preloads)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CollectionError;
    use crate::test_fixtures::item_schema;

    fn selection(fields: &[&str], inverted: bool) -> FieldSelection {
        FieldSelection {
            fields: fields.iter().map(|f| f.to_string()).collect(),
            inverted,
        }
    }

    #[test]
    fn test_selected_paths_imply_preloads_once() {
        let schema = item_schema();
        let resolver = FieldPathResolver::new(&schema, "Item").unwrap();
        let s = selection(&["name", "owner.name", "owner", "category.title", "owner.city"], false);

        assert_eq!(resolve_preloads(Some(&s), &resolver).unwrap(), vec!["owner", "category"]);
    }

    #[test]
    fn test_plain_fields_preload_nothing() {
        let schema = item_schema();
        let resolver = FieldPathResolver::new(&schema, "Item").unwrap();
        let s = selection(&["name", "age"], false);

        assert!(resolve_preloads(Some(&s), &resolver).unwrap().is_empty());
        assert!(resolve_preloads(None, &resolver).unwrap().is_empty());
    }

    #[test]
    fn test_inverted_selection() {
        let schema = item_schema();
        let resolver = FieldPathResolver::new(&schema, "Item").unwrap();

        let s = selection(&["owner"], true);
        assert_eq!(resolve_preloads(Some(&s), &resolver).unwrap(), vec!["category"]);

        // owner 先于 category 声明，结果按名称排序
        let s = selection(&["owner.city", "name"], true);
        assert_eq!(resolve_preloads(Some(&s), &resolver).unwrap(), vec!["category", "owner"]);
    }

    #[test]
    fn test_unknown_path_fails() {
        let schema = item_schema();
        let resolver = FieldPathResolver::new(&schema, "Item").unwrap();

        let s = selection(&["owner.ghost"], false);
        assert!(matches!(
            resolve_preloads(Some(&s), &resolver),
            Err(CollectionError::UnknownField { .. })
        ));

        let s = selection(&["ghost"], true);
        assert!(resolve_preloads(Some(&s), &resolver).is_err());
    }
}
