//! Compiles collection operators (filtering, sorting, pagination, field selection) of a
//! request into query fragments and applies them to a relational query builder.
//!
//! ```no_run
//! use collection_operators::{AppConfig, CollectionCompiler, QueryParams, SelectQuery};
//!
//! let config = AppConfig::demo().unwrap();
//! let compiler = CollectionCompiler::from_config(&config.schema, config.compiler.clone());
//! let params = QueryParams {
//!     filter: Some(r#"name == "a" and owner.city != null"#.to_string()),
//!     order_by: Some("created_at desc".to_string()),
//!     ..Default::default()
//! };
//! let query = compiler
//!     .apply_collection_operators(SelectQuery::new("items"), &params, "Item")
//!     .unwrap();
//! let (sql, values) = query.build();
//! ```

pub mod ast;
pub mod builder;
pub mod config;
pub mod error;
pub mod filter;
pub mod joins;
pub mod lexer;
pub mod pagination;
pub mod parser;
pub mod predicate;
pub mod preload;
pub mod request;
pub mod resolver;
pub mod schema;
pub mod sort;
pub mod sql_compiler;
pub mod token;

#[cfg(test)]
mod test_fixtures;

pub use ast::{FieldPath, FieldSelection, Filter, Pagination, SortCriterion, Sorting};
pub use builder::{QueryBuilder, QueryFragments, SelectQuery};
pub use config::{AppConfig, CompilerConfig};
pub use error::{CollectionError, CollectionResult};
pub use request::{QueryParams, RequestContext, RequestError};
pub use schema::{AssociationSchema, EntitySchema, Schema, SchemaProvider};
pub use sql_compiler::{CollectionCompiler, CollectionOperators, CompiledOperators};
