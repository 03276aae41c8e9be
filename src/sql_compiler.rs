//! Compiles the collection operators of a request and applies them to a query builder.
//!
//! Stages run in a fixed order: filter, sort, joins over the union of the filter and sort
//! associations, pagination, preloads. Every stage is computed before the builder is
//! touched, so a failing stage hands back only the error and the builder is dropped.

use tracing::{debug, instrument, warn};

use crate::ast::{FieldSelection, Filter, PageWindow, Pagination, Sorting};
use crate::builder::QueryBuilder;
use crate::config::CompilerConfig;
use crate::error::{CollectionError, CollectionResult};
use crate::filter::{compile_filter, CompiledFilter};
use crate::joins::{assemble_joins, JoinClause};
use crate::pagination::{apply_pagination, page_window};
use crate::preload::resolve_preloads;
use crate::request::{RequestContext, RequestError};
use crate::resolver::FieldPathResolver;
use crate::schema::SchemaProvider;
use crate::sort::{compile_sort, CompiledSort};

/// The four operators of one request, each optional.
#[derive(Debug, Clone, Default)]
pub struct CollectionOperators {
    pub filter: Option<Filter>,
    pub sorting: Option<Sorting>,
    pub pagination: Option<Pagination>,
    pub field_selection: Option<FieldSelection>,
}

impl RequestContext for CollectionOperators {
    fn filtering(&self) -> Result<Option<Filter>, RequestError> {
        Ok(self.filter.clone())
    }

    fn sorting(&self) -> Result<Option<Sorting>, RequestError> {
        Ok(self.sorting.clone())
    }

    fn pagination(&self) -> Result<Option<Pagination>, RequestError> {
        Ok(self.pagination)
    }

    fn field_selection(&self) -> Result<Option<FieldSelection>, RequestError> {
        Ok(self.field_selection.clone())
    }
}

/// Every fragment a request contributes, ready to apply.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompiledOperators {
    pub filter: CompiledFilter,
    pub sort: CompiledSort,
    pub joins: Vec<JoinClause>,
    pub window: Option<PageWindow>,
    pub preloads: Vec<String>,
}

impl CompiledOperators {
    pub fn apply_to<B: QueryBuilder>(self, builder: B) -> B {
        let mut builder = builder;

        if let Some(predicate) = &self.filter.predicate {
            let (sql, params) = predicate.render();
            builder = builder.filter(&sql, params);
        }
        for term in &self.sort.terms {
            builder = builder.order_by(term);
        }
        for join in &self.joins {
            builder = builder.join(join);
        }
        builder = apply_pagination(builder, self.window);
        for association in &self.preloads {
            builder = builder.preload(association);
        }
        builder
    }
}

pub struct CollectionCompiler<'s> {
    schema: &'s dyn SchemaProvider,
    config: CompilerConfig,
}

impl<'s> CollectionCompiler<'s> {
    pub fn new(schema: &'s dyn SchemaProvider) -> Self {
        Self::from_config(schema, CompilerConfig::default())
    }

    pub fn from_config(schema: &'s dyn SchemaProvider, config: CompilerConfig) -> Self {
        Self { schema, config }
    }

    pub fn config(&self) -> &CompilerConfig {
        &self.config
    }

    /// Compiles already-extracted operators for `entity`.
    pub fn compile(&self, entity: &str, operators: &CollectionOperators) -> CollectionResult<CompiledOperators> {
        self.compile_request(operators, entity)
    }

    /// Extracts the operators from `ctx`, compiles them for `entity` and applies them to
    /// `builder`. Returns the first error of any stage, extraction included.
    #[instrument(skip_all, fields(entity = entity))]
    pub fn apply_collection_operators<B, C>(&self, builder: B, ctx: &C, entity: &str) -> CollectionResult<B>
    where
        B: QueryBuilder,
        C: RequestContext + ?Sized,
    {
        match self.compile_request(ctx, entity) {
            Ok(compiled) => {
                debug!(
                    joins = compiled.joins.len(),
                    order_terms = compiled.sort.terms.len(),
                    preloads = compiled.preloads.len(),
                    "applying collection operators"
                );
                Ok(compiled.apply_to(builder))
            }
            Err(err) => {
                warn!(error = %err, "collection operators rejected");
                Err(err)
            }
        }
    }

    /// Runs the stages in order, pulling each operator from `ctx` just before its stage.
    fn compile_request<C>(&self, ctx: &C, entity: &str) -> CollectionResult<CompiledOperators>
    where
        C: RequestContext + ?Sized,
    {
        let resolver = FieldPathResolver::new(self.schema, entity)?;

        let filter = compile_filter(ctx.filtering()?.as_ref(), &resolver)?;
        let sort = compile_sort(ctx.sorting()?.as_ref(), &resolver)?;
        let joins = self.join_union(&filter, &sort, &resolver)?;
        let window = page_window(ctx.pagination()?.as_ref(), self.config.default_limit);
        let preloads = resolve_preloads(ctx.field_selection()?.as_ref(), &resolver)?;

        Ok(CompiledOperators {
            filter,
            sort,
            joins,
            window,
            preloads,
        })
    }

    fn join_union(
        &self,
        filter: &CompiledFilter,
        sort: &CompiledSort,
        resolver: &FieldPathResolver<'_>,
    ) -> Result<Vec<JoinClause>, CollectionError> {
        let associations = filter.associations.clone().union(&sort.associations);
        assemble_joins(&associations, resolver)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{NumberOp, SortCriterion, StringOp};
    use crate::builder::{QueryFragments, SelectQuery};
    use crate::predicate::Param;
    use crate::request::QueryParams;
    use crate::test_fixtures::item_schema;

    fn params(filter: &str, order_by: &str) -> QueryParams {
        QueryParams {
            filter: Some(filter.to_string()),
            order_by: Some(order_by.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_full_request_applied_in_order() {
        let schema = item_schema();
        let compiler = CollectionCompiler::new(&schema);
        let ctx = QueryParams {
            filter: Some(r#"name == "a" and not age > 5 or owner.city == "X""#.to_string()),
            order_by: Some("owner.name desc, created_at".to_string()),
            fields: Some("name,owner.name".to_string()),
            offset: Some("10".to_string()),
            limit: Some("0".to_string()),
            ..Default::default()
        };

        let fragments = compiler
            .apply_collection_operators(QueryFragments::default(), &ctx, "Item")
            .unwrap();

        assert_eq!(fragments.predicates.len(), 1);
        let (predicate, values) = &fragments.predicates[0];
        assert_eq!(predicate.matches('?').count(), 3);
        assert_eq!(values, &vec![Param::from("a"), Param::Number(5.0), Param::from("X")]);
        assert_eq!(fragments.order, vec!["owners.name desc", "items.created_at"]);
        assert_eq!(fragments.joins, vec!["LEFT JOIN owners ON owners.id = items.owner_id"]);
        assert_eq!(fragments.window, Some(PageWindow { offset: 10, limit: 1000 }));
        assert_eq!(fragments.preloads, vec!["owner"]);
    }

    #[test]
    fn test_filter_and_sort_share_one_join() {
        let schema = item_schema();
        let compiler = CollectionCompiler::new(&schema);
        let ops = CollectionOperators {
            filter: Some(Filter::and(
                Filter::string("owner.name", StringOp::Eq, "n"),
                Filter::string("category.title", StringOp::Match, "t"),
            )),
            sorting: Some(Sorting {
                criteria: vec![SortCriterion::asc("owner.city"), SortCriterion::desc("owner.name")],
            }),
            ..Default::default()
        };

        let compiled = compiler.compile("Item", &ops).unwrap();
        let tables: Vec<_> = compiled.joins.iter().map(|j| j.table.as_str()).collect();
        assert_eq!(tables, vec!["categories", "owners"]);
    }

    #[test]
    fn test_empty_request_leaves_builder_unchanged() {
        let schema = item_schema();
        let compiler = CollectionCompiler::new(&schema);

        let fragments = compiler
            .apply_collection_operators(QueryFragments::default(), &QueryParams::default(), "Item")
            .unwrap();
        assert_eq!(fragments, QueryFragments::default());
    }

    #[test]
    fn test_configured_default_limit() {
        let schema = item_schema();
        let compiler = CollectionCompiler::from_config(&schema, CompilerConfig { default_limit: 25 });
        let ops = CollectionOperators {
            pagination: Some(Pagination { offset: 0, limit: 0 }),
            ..Default::default()
        };

        let compiled = compiler.compile("Item", &ops).unwrap();
        assert_eq!(compiled.window, Some(PageWindow { offset: 0, limit: 25 }));
    }

    #[test]
    fn test_unknown_field_in_sort_returns_no_query() {
        let schema = item_schema();
        let compiler = CollectionCompiler::new(&schema);

        let result = compiler.apply_collection_operators(
            QueryFragments::default(),
            &params("age > 1", "bogus.field"),
            "Item",
        );
        assert!(matches!(result, Err(CollectionError::UnknownField { field, .. }) if field == "bogus"));
    }

    #[test]
    fn test_extraction_error_surfaces_unchanged() {
        let schema = item_schema();
        let compiler = CollectionCompiler::new(&schema);
        let ctx = QueryParams {
            limit: Some("many".to_string()),
            ..Default::default()
        };

        let result = compiler.apply_collection_operators(QueryFragments::default(), &ctx, "Item");
        assert!(matches!(
            result,
            Err(CollectionError::RequestExtraction(RequestError::Pagination { name: "limit", .. }))
        ));
    }

    #[test]
    fn test_later_stage_failure_discards_earlier_stages() {
        let schema = item_schema();
        let compiler = CollectionCompiler::new(&schema);
        let ops = CollectionOperators {
            filter: Some(Filter::number("age", NumberOp::Gt, 1.0)),
            field_selection: Some(FieldSelection {
                fields: vec!["owner.company.name".to_string()],
                inverted: false,
            }),
            ..Default::default()
        };

        assert!(matches!(
            compiler.compile("Item", &ops),
            Err(CollectionError::UnsupportedPath { .. })
        ));
    }

    #[test]
    fn test_unknown_entity() {
        let schema = item_schema();
        let compiler = CollectionCompiler::new(&schema);
        assert!(matches!(
            compiler.compile("Ghost", &CollectionOperators::default()),
            Err(CollectionError::UnknownEntity(_))
        ));
    }

    #[test]
    fn test_applies_to_sea_query_select() {
        let schema = item_schema();
        let compiler = CollectionCompiler::new(&schema);
        let ctx = QueryParams {
            filter: Some(r#"owner.city == "Oslo""#.to_string()),
            order_by: Some("name desc".to_string()),
            fields: Some("owner".to_string()),
            limit: Some("5".to_string()),
            ..Default::default()
        };

        let query = compiler
            .apply_collection_operators(SelectQuery::new("items"), &ctx, "Item")
            .unwrap();
        let (sql, values) = query.build();

        assert!(sql.contains("LEFT JOIN"));
        assert!(sql.contains("owners.city = $1"));
        assert!(sql.contains(r#"ORDER BY "items"."name" DESC"#));
        assert!(sql.contains("LIMIT"));
        assert!(!sql.contains("Oslo"));
        assert_eq!(values.0[0], sea_query::Value::from("Oslo".to_string()));
        assert_eq!(query.preloads(), ["owner".to_string()]);
    }
}
