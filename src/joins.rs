//! Association join sets and LEFT JOIN assembly.

use std::collections::btree_set;
use std::collections::BTreeSet;
use std::fmt;

use tracing::debug;

use crate::error::{CollectionError, CollectionResult};
use crate::resolver::{FieldPathResolver, QualifiedColumn};

/// Association names that need a join. Inserting the same name twice is a no-op and
/// iteration is sorted by name, so the emitted join order is deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssociationSet(BTreeSet<String>);

impl AssociationSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, association: impl Into<String>) -> bool {
        self.0.insert(association.into())
    }

    pub fn union(mut self, other: &AssociationSet) -> AssociationSet {
        self.0.extend(other.0.iter().cloned());
        self
    }

    pub fn contains(&self, association: &str) -> bool {
        self.0.contains(association)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

impl Extend<String> for AssociationSet {
    fn extend<I: IntoIterator<Item = String>>(&mut self, iter: I) {
        self.0.extend(iter);
    }
}

impl FromIterator<String> for AssociationSet {
    fn from_iter<I: IntoIterator<Item = String>>(iter: I) -> Self {
        AssociationSet(iter.into_iter().collect())
    }
}

impl IntoIterator for AssociationSet {
    type Item = String;
    type IntoIter = btree_set::IntoIter<String>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

/// `LEFT JOIN <table> ON <src> = <tgt> [AND ...]`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinClause {
    pub association: String,
    pub table: String,
    /// (associated table column, owning table column), in schema key order.
    pub key_pairs: Vec<(QualifiedColumn, QualifiedColumn)>,
}

impl JoinClause {
    pub fn on_condition(&self) -> String {
        self.key_pairs
            .iter()
            .map(|(source, target)| format!("{source} = {target}"))
            .collect::<Vec<_>>()
            .join(" AND ")
    }
}

impl fmt::Display for JoinClause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LEFT JOIN {} ON {}", self.table, self.on_condition())
    }
}

/// Emits one join per association of the resolver's root entity.
pub fn assemble_joins(
    associations: &AssociationSet,
    resolver: &FieldPathResolver<'_>,
) -> CollectionResult<Vec<JoinClause>> {
    let root = resolver.entity();
    let mut joins = Vec::with_capacity(associations.len());

    for name in associations.iter() {
        let unknown = || CollectionError::UnknownAssociation {
            entity: resolver.entity_name().to_string(),
            association: name.to_string(),
        };
        let assoc = root.association_of(name).ok_or_else(unknown)?;
        let target = resolver.schema().entity(&assoc.entity).ok_or_else(unknown)?;

        let key_pairs = assoc
            .source_keys
            .iter()
            .zip(&assoc.target_keys)
            .map(|(source, target_key)| {
                (
                    QualifiedColumn::new(&target.table, source),
                    QualifiedColumn::new(&root.table, target_key),
                )
            })
            .collect();

        joins.push(JoinClause {
            association: name.to_string(),
            table: target.table.clone(),
            key_pairs,
        });
    }

    debug!(entity = resolver.entity_name(), joins = joins.len(), "assembled joins");
    Ok(joins)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_fixtures::item_schema;

    fn set(names: &[&str]) -> AssociationSet {
        names.iter().map(|n| n.to_string()).collect()
    }

    #[test]
    fn test_set_membership_is_idempotent() {
        let mut assocs = AssociationSet::new();
        assert!(assocs.insert("owner"));
        assert!(!assocs.insert("owner"));
        let merged = assocs.union(&set(&["owner", "category"]));
        assert_eq!(merged.iter().collect::<Vec<_>>(), vec!["category", "owner"]);
    }

    #[test]
    fn test_single_key_join() {
        let schema = item_schema();
        let resolver = FieldPathResolver::new(&schema, "Item").unwrap();
        let joins = assemble_joins(&set(&["owner"]), &resolver).unwrap();

        assert_eq!(joins.len(), 1);
        assert_eq!(joins[0].to_string(), "LEFT JOIN owners ON owners.id = items.owner_id");
    }

    #[test]
    fn test_composite_key_join_keeps_key_order() {
        let schema = item_schema();
        let resolver = FieldPathResolver::new(&schema, "Item").unwrap();
        let joins = assemble_joins(&set(&["category"]), &resolver).unwrap();

        assert_eq!(
            joins[0].to_string(),
            "LEFT JOIN categories ON categories.id = items.category_id AND categories.tenant_id = items.tenant_id"
        );
    }

    #[test]
    fn test_joins_sorted_by_association_name() {
        let schema = item_schema();
        let resolver = FieldPathResolver::new(&schema, "Item").unwrap();
        let joins = assemble_joins(&set(&["owner", "category"]), &resolver).unwrap();

        let names: Vec<_> = joins.iter().map(|j| j.association.as_str()).collect();
        assert_eq!(names, vec!["category", "owner"]);
    }

    #[test]
    fn test_unknown_association() {
        let schema = item_schema();
        let resolver = FieldPathResolver::new(&schema, "Item").unwrap();

        assert!(matches!(
            assemble_joins(&set(&["ghost"]), &resolver),
            Err(CollectionError::UnknownAssociation { association, .. }) if association == "ghost"
        ));
    }

    #[test]
    fn test_empty_set_emits_nothing() {
        let schema = item_schema();
        let resolver = FieldPathResolver::new(&schema, "Item").unwrap();
        assert!(assemble_joins(&AssociationSet::new(), &resolver).unwrap().is_empty());
    }
}
