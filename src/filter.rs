//! Filter expression compilation.

use tracing::debug;

use crate::ast::{Filter, LogicalNode, NullCondition, NumberCondition, NumberOp, StringCondition, StringOp};
use crate::error::{CollectionError, CollectionResult};
use crate::joins::AssociationSet;
use crate::parser::parse_filter;
use crate::predicate::{CompareOp, Param, Predicate};
use crate::request::RequestError;
use crate::resolver::{FieldPathResolver, ResolvedField};
use crate::schema::SchemaProvider;

/// Output of filter compilation. An absent filter compiles to no predicate.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompiledFilter {
    pub predicate: Option<Predicate>,
    pub associations: AssociationSet,
}

impl CompiledFilter {
    pub fn is_empty(&self) -> bool {
        self.predicate.is_none()
    }

    /// Predicate text and parameters; `("", [])` when there is nothing to apply.
    pub fn to_sql(&self) -> (String, Vec<Param>) {
        self.predicate
            .as_ref()
            .map(Predicate::render)
            .unwrap_or_default()
    }
}

pub fn compile_filter(filter: Option<&Filter>, resolver: &FieldPathResolver<'_>) -> CollectionResult<CompiledFilter> {
    let Some(filter) = filter else {
        return Ok(CompiledFilter::default());
    };

    let mut associations = AssociationSet::new();
    let predicate = compile_node(filter, resolver, &mut associations)?;
    debug!(
        entity = resolver.entity_name(),
        params = predicate.param_count(),
        joins = associations.len(),
        "compiled filter"
    );
    Ok(CompiledFilter {
        predicate: Some(predicate),
        associations,
    })
}

/// Parses a filter string and compiles it for `entity`.
pub fn compile_filter_str(
    filter: &str,
    schema: &dyn SchemaProvider,
    entity: &str,
) -> CollectionResult<CompiledFilter> {
    let parsed = parse_filter(filter).map_err(RequestError::from)?;
    let resolver = FieldPathResolver::new(schema, entity)?;
    compile_filter(Some(&parsed), &resolver)
}

fn compile_node(
    node: &Filter,
    resolver: &FieldPathResolver<'_>,
    associations: &mut AssociationSet,
) -> CollectionResult<Predicate> {
    match node {
        Filter::Logical(logical) => compile_logical(logical, resolver, associations),
        Filter::String(c) => compile_string(c, resolver, associations),
        Filter::Number(c) => compile_number(c, resolver, associations),
        Filter::Null(c) => compile_null(c, resolver, associations),
        Filter::Unsupported => Err(CollectionError::UnsupportedNode("unrecognized node kind".to_string())),
    }
}

fn compile_logical(
    node: &LogicalNode,
    resolver: &FieldPathResolver<'_>,
    associations: &mut AssociationSet,
) -> CollectionResult<Predicate> {
    let left = compile_node(&node.left, resolver, associations)?;
    let right = compile_node(&node.right, resolver, associations)?;
    Ok(Predicate::Logical {
        combinator: node.combinator,
        left: Box::new(left),
        right: Box::new(right),
        negated: node.negated,
    })
}

fn compile_string(
    c: &StringCondition,
    resolver: &FieldPathResolver<'_>,
    associations: &mut AssociationSet,
) -> CollectionResult<Predicate> {
    let ResolvedField { column, association } = resolver.resolve(c.field_path.segments())?;
    associations.extend(association);
    let op = match c.op {
        StringOp::Eq => CompareOp::Eq,
        StringOp::Match => CompareOp::Match,
    };
    Ok(Predicate::Compare {
        column,
        op,
        param: Param::Text(c.value.clone()),
        negated: c.negated,
    })
}

fn compile_number(
    c: &NumberCondition,
    resolver: &FieldPathResolver<'_>,
    associations: &mut AssociationSet,
) -> CollectionResult<Predicate> {
    let ResolvedField { column, association } = resolver.resolve(c.field_path.segments())?;
    associations.extend(association);
    let op = match c.op {
        NumberOp::Eq => CompareOp::Eq,
        NumberOp::Gt => CompareOp::Gt,
        NumberOp::Ge => CompareOp::Ge,
        NumberOp::Lt => CompareOp::Lt,
        NumberOp::Le => CompareOp::Le,
    };
    Ok(Predicate::Compare {
        column,
        op,
        param: Param::Number(c.value),
        negated: c.negated,
    })
}

fn compile_null(
    c: &NullCondition,
    resolver: &FieldPathResolver<'_>,
    associations: &mut AssociationSet,
) -> CollectionResult<Predicate> {
    let ResolvedField { column, association } = resolver.resolve(c.field_path.segments())?;
    associations.extend(association);
    Ok(Predicate::IsNull {
        column,
        negated: c.negated,
    })
}
