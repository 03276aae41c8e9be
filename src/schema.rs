//! Entity schema metadata: logical field names, storage columns and associations.
//!
//! A [`Schema`] can only be obtained through validation, so every table and column
//! name it hands out is a plain SQL identifier. Those names are the only text besides
//! fixed keywords that the compilers ever interpolate into SQL.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SchemaError {
    #[error("`{0}` is not a valid SQL identifier")]
    InvalidIdentifier(String),

    #[error("association `{association}` on `{entity}` targets unknown entity `{target}`")]
    UnknownTarget {
        entity: String,
        association: String,
        target: String,
    },

    #[error("association `{association}` on `{entity}` must declare the same non-zero number of source and target keys")]
    KeyMismatch { entity: String, association: String },

    #[error("`{name}` on `{entity}` is declared both as a field and as an association")]
    AmbiguousName { entity: String, name: String },
}

/// Read-only access to entity metadata. Implementations must be safe to share across
/// concurrent compilations.
pub trait SchemaProvider: Send + Sync {
    fn entity(&self, name: &str) -> Option<&EntitySchema>;
}

/// One entity type: its table, its fields and its associations.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EntitySchema {
    pub table: String,
    /// Logical field name to storage column name.
    #[serde(default)]
    pub fields: BTreeMap<String, String>,
    #[serde(default)]
    pub associations: BTreeMap<String, AssociationSchema>,
}

/// A foreign-key relationship to another entity.
///
/// `source_keys` are columns of the associated entity's table, `target_keys` the matching
/// columns of the owning entity's table, pairwise in declaration order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssociationSchema {
    pub entity: String,
    pub source_keys: Vec<String>,
    pub target_keys: Vec<String>,
}

impl AssociationSchema {
    pub fn new<S, T>(entity: &str, source_keys: S, target_keys: T) -> Self
    where
        S: IntoIterator,
        S::Item: Into<String>,
        T: IntoIterator,
        T::Item: Into<String>,
    {
        Self {
            entity: entity.to_string(),
            source_keys: source_keys.into_iter().map(Into::into).collect(),
            target_keys: target_keys.into_iter().map(Into::into).collect(),
        }
    }
}

impl EntitySchema {
    pub fn new(table: &str) -> Self {
        Self {
            table: table.to_string(),
            ..Default::default()
        }
    }

    /// Adds a field whose column has the same name.
    pub fn field(self, name: &str) -> Self {
        self.column(name, name)
    }

    pub fn column(mut self, name: &str, column: &str) -> Self {
        self.fields.insert(name.to_string(), column.to_string());
        self
    }

    pub fn association(mut self, name: &str, association: AssociationSchema) -> Self {
        self.associations.insert(name.to_string(), association);
        self
    }

    pub fn column_of(&self, field: &str) -> Option<&str> {
        self.fields.get(field).map(String::as_str)
    }

    pub fn association_of(&self, name: &str) -> Option<&AssociationSchema> {
        self.associations.get(name)
    }
}

/// Validated collection of entity schemas keyed by entity name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "BTreeMap<String, EntitySchema>", into = "BTreeMap<String, EntitySchema>")]
pub struct Schema {
    entities: BTreeMap<String, EntitySchema>,
}

impl Schema {
    pub fn new(entities: BTreeMap<String, EntitySchema>) -> Result<Self, SchemaError> {
        for (name, entity) in &entities {
            validate_entity(name, entity, &entities)?;
        }
        Ok(Self { entities })
    }

    pub fn from_entities<I>(entities: I) -> Result<Self, SchemaError>
    where
        I: IntoIterator<Item = (String, EntitySchema)>,
    {
        Self::new(entities.into_iter().collect())
    }

    pub fn entity_names(&self) -> impl Iterator<Item = &str> {
        self.entities.keys().map(String::as_str)
    }
}

impl SchemaProvider for Schema {
    fn entity(&self, name: &str) -> Option<&EntitySchema> {
        self.entities.get(name)
    }
}

impl TryFrom<BTreeMap<String, EntitySchema>> for Schema {
    type Error = SchemaError;

    fn try_from(entities: BTreeMap<String, EntitySchema>) -> Result<Self, Self::Error> {
        Schema::new(entities)
    }
}

impl From<Schema> for BTreeMap<String, EntitySchema> {
    fn from(schema: Schema) -> Self {
        schema.entities
    }
}

fn validate_entity(
    name: &str,
    entity: &EntitySchema,
    entities: &BTreeMap<String, EntitySchema>,
) -> Result<(), SchemaError> {
    check_identifier(&entity.table)?;
    for column in entity.fields.values() {
        check_identifier(column)?;
    }

    let field_names: HashSet<&str> = entity.fields.keys().map(String::as_str).collect();
    for (assoc_name, assoc) in &entity.associations {
        if field_names.contains(assoc_name.as_str()) {
            return Err(SchemaError::AmbiguousName {
                entity: name.to_string(),
                name: assoc_name.clone(),
            });
        }
        if !entities.contains_key(&assoc.entity) {
            return Err(SchemaError::UnknownTarget {
                entity: name.to_string(),
                association: assoc_name.clone(),
                target: assoc.entity.clone(),
            });
        }
        if assoc.source_keys.is_empty() || assoc.source_keys.len() != assoc.target_keys.len() {
            return Err(SchemaError::KeyMismatch {
                entity: name.to_string(),
                association: assoc_name.clone(),
            });
        }
        for key in assoc.source_keys.iter().chain(&assoc.target_keys) {
            check_identifier(key)?;
        }
    }
    Ok(())
}

/// Accepts `[A-Za-z_][A-Za-z0-9_]*`.
fn check_identifier(ident: &str) -> Result<(), SchemaError> {
    let mut chars = ident.chars();
    let valid = match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    };
    if valid {
        Ok(())
    } else {
        Err(SchemaError::InvalidIdentifier(ident.to_string()))
    }
}
