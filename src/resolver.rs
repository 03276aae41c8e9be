//! Field path resolution against the schema, shared by filtering, sorting and preloading.

use std::fmt;

use crate::error::{CollectionError, CollectionResult};
use crate::schema::{EntitySchema, SchemaProvider};

/// A column taken from schema metadata, rendered as `<table>.<column>`.
///
/// There is no public constructor: values only come out of [`FieldPathResolver`] and the
/// join assembler, both of which read names from a validated schema.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QualifiedColumn {
    table: String,
    column: String,
}

impl QualifiedColumn {
    pub(crate) fn new(table: &str, column: &str) -> Self {
        Self {
            table: table.to_string(),
            column: column.to_string(),
        }
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn column(&self) -> &str {
        &self.column
    }
}

impl fmt::Display for QualifiedColumn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.table, self.column)
    }
}

/// Result of resolving a field path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedField {
    pub column: QualifiedColumn,
    /// Set iff the path crossed an association; names the association to join.
    pub association: Option<String>,
}

/// Resolves field paths relative to one root entity.
pub struct FieldPathResolver<'s> {
    schema: &'s dyn SchemaProvider,
    entity_name: &'s str,
    entity: &'s EntitySchema,
}

impl<'s> FieldPathResolver<'s> {
    pub fn new(schema: &'s dyn SchemaProvider, entity_name: &'s str) -> CollectionResult<Self> {
        let entity = schema
            .entity(entity_name)
            .ok_or_else(|| CollectionError::UnknownEntity(entity_name.to_string()))?;
        Ok(Self {
            schema,
            entity_name,
            entity,
        })
    }

    pub fn entity_name(&self) -> &str {
        self.entity_name
    }

    pub fn entity(&self) -> &EntitySchema {
        self.entity
    }

    pub fn schema(&self) -> &dyn SchemaProvider {
        self.schema
    }

    /// Resolves the last segment to a column; the segments before it are association hops.
    ///
    /// Every hop is checked before depth is, so a misspelled hop is reported as an unknown
    /// field rather than as an unsupported path.
    pub fn resolve(&self, path: &[String]) -> CollectionResult<ResolvedField> {
        let Some((last, hops)) = path.split_last() else {
            return Err(CollectionError::unknown_field(self.entity_name, ""));
        };

        let (owner_name, owner) = self.walk(hops)?;
        if hops.len() > 1 {
            return Err(CollectionError::UnsupportedPath { path: path.join(".") });
        }

        let column = owner
            .column_of(last)
            .ok_or_else(|| CollectionError::unknown_field(owner_name, last))?;

        Ok(ResolvedField {
            column: QualifiedColumn::new(&owner.table, column),
            association: hops.first().cloned(),
        })
    }

    pub fn resolve_dotted(&self, dotted: &str) -> CollectionResult<ResolvedField> {
        let path: Vec<String> = dotted.split('.').map(str::to_string).collect();
        self.resolve(&path)
    }

    /// Resolves a field-selection path to the association it implies, if any.
    ///
    /// A single segment may name either a field (no association) or an association itself.
    pub fn resolve_selection(&self, dotted: &str) -> CollectionResult<Option<String>> {
        if !dotted.contains('.') {
            if self.entity.association_of(dotted).is_some() {
                return Ok(Some(dotted.to_string()));
            }
            if self.entity.column_of(dotted).is_some() {
                return Ok(None);
            }
            return Err(CollectionError::unknown_field(self.entity_name, dotted));
        }
        Ok(self.resolve_dotted(dotted)?.association)
    }

    /// Follows association hops from the root, returning the entity reached.
    fn walk(&self, hops: &[String]) -> CollectionResult<(&'s str, &'s EntitySchema)> {
        let mut current_name = self.entity_name;
        let mut current = self.entity;
        for hop in hops {
            let assoc = current
                .association_of(hop)
                .ok_or_else(|| CollectionError::unknown_field(current_name, hop))?;
            let next = self
                .schema
                .entity(&assoc.entity)
                .ok_or_else(|| CollectionError::UnknownEntity(assoc.entity.clone()))?;
            current_name = assoc.entity.as_str();
            current = next;
        }
        Ok((current_name, current))
    }
}
