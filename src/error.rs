//! Errors raised while compiling collection operators.

use thiserror::Error;

use crate::request::RequestError;

/// Failure of a compile-and-apply call. Every variant is terminal for the call.
#[derive(Debug, Error)]
pub enum CollectionError {
    #[error("unknown entity `{0}`")]
    UnknownEntity(String),

    /// A path segment matched no field or association of the entity it was looked up on.
    #[error("unknown field `{field}` on entity `{entity}`")]
    UnknownField { entity: String, field: String },

    /// The path is valid but crosses more than one association.
    #[error("field path `{path}` crosses more than one association, only single-hop paths are supported")]
    UnsupportedPath { path: String },

    #[error("association `{association}` is not defined on entity `{entity}`")]
    UnknownAssociation { entity: String, association: String },

    #[error("filter node `{0}` is not supported")]
    UnsupportedNode(String),

    #[error("request extraction failed: {0}")]
    RequestExtraction(#[from] RequestError),
}

impl CollectionError {
    pub(crate) fn unknown_field(entity: &str, field: &str) -> Self {
        CollectionError::UnknownField {
            entity: entity.to_string(),
            field: field.to_string(),
        }
    }
}

pub type CollectionResult<T> = Result<T, CollectionError>;
