//! Query builders the compiled operators are applied to.

use sea_query::{
    Alias, Asterisk, Cond, Expr, Order, PostgresQueryBuilder, Query, SelectStatement, Values,
};

use crate::ast::PageWindow;
use crate::joins::JoinClause;
use crate::predicate::Param;
use crate::sort::OrderTerm;

/// The operations the compiler needs from a relational query builder. Each call consumes
/// the builder and returns the updated one.
pub trait QueryBuilder: Sized {
    /// Adds a predicate whose `?` placeholders bind `params` positionally.
    fn filter(self, predicate: &str, params: Vec<Param>) -> Self;
    fn order_by(self, term: &OrderTerm) -> Self;
    fn join(self, clause: &JoinClause) -> Self;
    fn paginate(self, offset: u64, limit: u64) -> Self;
    fn preload(self, association: &str) -> Self;
}

/// A `SELECT <table>.* FROM <table>` statement built with sea-query, plus the
/// associations to eager-load after it runs.
#[derive(Debug, Clone)]
pub struct SelectQuery {
    select: SelectStatement,
    preloads: Vec<String>,
}

impl SelectQuery {
    pub fn new(table: &str) -> Self {
        let mut select = Query::select();
        select
            .column((Alias::new(table), Asterisk))
            .from(Alias::new(table));
        Self {
            select,
            preloads: Vec::new(),
        }
    }

    pub fn statement(&self) -> &SelectStatement {
        &self.select
    }

    pub fn preloads(&self) -> &[String] {
        &self.preloads
    }

    /// Postgres SQL with numbered placeholders and the bound values.
    pub fn build(&self) -> (String, Values) {
        self.select.build(PostgresQueryBuilder)
    }

    /// Postgres SQL with values inlined, for display only.
    pub fn to_sql_string(&self) -> String {
        self.select.to_string(PostgresQueryBuilder)
    }
}

impl QueryBuilder for SelectQuery {
    fn filter(mut self, predicate: &str, params: Vec<Param>) -> Self {
        self.select
            .and_where(Expr::cust_with_values(numbered_placeholders(predicate), params));
        self
    }

    fn order_by(mut self, term: &OrderTerm) -> Self {
        let order = if term.desc { Order::Desc } else { Order::Asc };
        self.select.order_by(
            (Alias::new(term.column.table()), Alias::new(term.column.column())),
            order,
        );
        self
    }

    fn join(mut self, clause: &JoinClause) -> Self {
        let on = clause.key_pairs.iter().fold(Cond::all(), |cond, (source, target)| {
            cond.add(
                Expr::col((Alias::new(source.table()), Alias::new(source.column())))
                    .equals((Alias::new(target.table()), Alias::new(target.column()))),
            )
        });
        self.select
            .join(sea_query::JoinType::LeftJoin, Alias::new(&clause.table), on);
        self
    }

    fn paginate(mut self, offset: u64, limit: u64) -> Self {
        self.select.offset(offset).limit(limit);
        self
    }

    fn preload(mut self, association: &str) -> Self {
        if !self.preloads.iter().any(|p| p == association) {
            self.preloads.push(association.to_string());
        }
        self
    }
}

/// Rewrites positional `?` placeholders as `$1, $2, ...`, the form sea-query binds for
/// Postgres. Predicate text carries no other `?`: it holds only schema identifiers and
/// fixed tokens.
fn numbered_placeholders(predicate: &str) -> String {
    let mut out = String::with_capacity(predicate.len() + 8);
    let mut n = 0;
    for c in predicate.chars() {
        if c == '?' {
            n += 1;
            out.push('$');
            out.push_str(&n.to_string());
        } else {
            out.push(c);
        }
    }
    out
}

/// Records every fragment in its text form, in application order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryFragments {
    pub predicates: Vec<(String, Vec<Param>)>,
    pub order: Vec<String>,
    pub joins: Vec<String>,
    pub window: Option<PageWindow>,
    pub preloads: Vec<String>,
}

impl QueryBuilder for QueryFragments {
    fn filter(mut self, predicate: &str, params: Vec<Param>) -> Self {
        self.predicates.push((predicate.to_string(), params));
        self
    }

    fn order_by(mut self, term: &OrderTerm) -> Self {
        self.order.push(term.to_string());
        self
    }

    fn join(mut self, clause: &JoinClause) -> Self {
        self.joins.push(clause.to_string());
        self
    }

    fn paginate(mut self, offset: u64, limit: u64) -> Self {
        self.window = Some(PageWindow { offset, limit });
        self
    }

    fn preload(mut self, association: &str) -> Self {
        self.preloads.push(association.to_string());
        self
    }
}
