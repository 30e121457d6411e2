//! The query representation that tenant constraints are applied to.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::predicate::Predicate;
use super::sql::SqlFragment;
use crate::scope::{ConstraintTag, TenantConstraint};

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    /// Ascending.
    #[default]
    Asc,
    /// Descending.
    Desc,
}

impl fmt::Display for SortDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SortDirection::Asc => write!(f, "ASC"),
            SortDirection::Desc => write!(f, "DESC"),
        }
    }
}

/// One `WHERE` clause entry.
#[derive(Debug, Clone, PartialEq)]
pub enum Clause {
    /// A predicate added by the caller. Never touched by tenant scoping.
    Filter(Predicate),
    /// A tagged predicate injected by the constraint builder.
    Tenant(TenantConstraint),
}

impl Clause {
    fn to_sql(&self) -> SqlFragment {
        match self {
            Clause::Filter(predicate) => predicate.to_sql(),
            Clause::Tenant(constraint) => constraint.to_sql(),
        }
    }
}

/// The primitives tenant scoping needs from a query.
pub trait TenantScopedQuery {
    /// Adds a constraint, replacing any constraint carrying the same tag.
    fn add_tenant_constraint(&mut self, constraint: TenantConstraint);

    /// Lists the tagged constraints in application order.
    fn tenant_constraints(&self) -> Vec<&TenantConstraint>;

    /// Removes the first constraint carrying `tag`.
    fn remove_tenant_constraint(&mut self, tag: &ConstraintTag) -> Option<TenantConstraint>;
}

/// A `SELECT` over one table.
///
/// # Examples
///
/// ```
/// use helios_tenancy::query::{Predicate, Query, SortDirection};
///
/// let query = Query::new("invoices")
///     .filter(Predicate::eq("status", "open"))
///     .order_by("id", SortDirection::Desc)
///     .limit(10);
///
/// let sql = query.to_sql();
/// assert_eq!(
///     sql.sql,
///     "SELECT * FROM invoices WHERE (status = ?) ORDER BY id DESC LIMIT 10"
/// );
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    table: String,
    clauses: Vec<Clause>,
    order_by: Vec<(String, SortDirection)>,
    limit: Option<usize>,
    offset: Option<usize>,
}

impl Query {
    /// Creates an unconstrained query over `table`.
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            clauses: Vec::new(),
            order_by: Vec::new(),
            limit: None,
            offset: None,
        }
    }

    /// Returns the table.
    pub fn table(&self) -> &str {
        &self.table
    }

    /// Adds a caller predicate, builder style.
    pub fn filter(mut self, predicate: Predicate) -> Self {
        self.push_filter(predicate);
        self
    }

    /// Adds a caller predicate.
    pub fn push_filter(&mut self, predicate: Predicate) {
        self.clauses.push(Clause::Filter(predicate));
    }

    /// Adds an ordering term.
    pub fn order_by(mut self, column: impl Into<String>, direction: SortDirection) -> Self {
        self.order_by.push((column.into(), direction));
        self
    }

    /// Limits the number of rows.
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Skips rows.
    pub fn offset(mut self, offset: usize) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Returns all clauses in order.
    pub fn clauses(&self) -> &[Clause] {
        &self.clauses
    }

    /// Returns the caller predicates.
    pub fn filters(&self) -> impl Iterator<Item = &Predicate> {
        self.clauses.iter().filter_map(|c| match c {
            Clause::Filter(p) => Some(p),
            Clause::Tenant(_) => None,
        })
    }

    /// Renders the `WHERE` condition, or an empty fragment when unconstrained.
    pub fn where_sql(&self) -> SqlFragment {
        let mut out = SqlFragment::default();
        let mut parts = Vec::with_capacity(self.clauses.len());
        for clause in &self.clauses {
            let fragment = clause.to_sql();
            parts.push(format!("({})", fragment.sql));
            out.params.extend(fragment.params);
        }
        out.sql = parts.join(" AND ");
        out
    }

    /// Renders the full `SELECT` statement.
    pub fn to_sql(&self) -> SqlFragment {
        let mut out = SqlFragment::new(format!("SELECT * FROM {}", self.table));

        let condition = self.where_sql();
        if !condition.sql.is_empty() {
            out.sql.push_str(" WHERE ");
            out.sql.push_str(&condition.sql);
            out.params.extend(condition.params);
        }

        if !self.order_by.is_empty() {
            let terms: Vec<String> = self
                .order_by
                .iter()
                .map(|(column, direction)| format!("{} {}", column, direction))
                .collect();
            out.sql.push_str(" ORDER BY ");
            out.sql.push_str(&terms.join(", "));
        }

        match (self.limit, self.offset) {
            (Some(limit), Some(offset)) => {
                out.sql.push_str(&format!(" LIMIT {} OFFSET {}", limit, offset))
            }
            (Some(limit), None) => out.sql.push_str(&format!(" LIMIT {}", limit)),
            // SQLite only accepts OFFSET after a LIMIT
            (None, Some(offset)) => out.sql.push_str(&format!(" LIMIT -1 OFFSET {}", offset)),
            (None, None) => {}
        }

        out
    }
}

impl TenantScopedQuery for Query {
    fn add_tenant_constraint(&mut self, constraint: TenantConstraint) {
        let existing = self.clauses.iter_mut().find(|c| match c {
            Clause::Tenant(t) => t.tag() == constraint.tag(),
            Clause::Filter(_) => false,
        });

        match existing {
            Some(slot) => *slot = Clause::Tenant(constraint),
            None => self.clauses.push(Clause::Tenant(constraint)),
        }
    }

    fn tenant_constraints(&self) -> Vec<&TenantConstraint> {
        self.clauses
            .iter()
            .filter_map(|c| match c {
                Clause::Tenant(t) => Some(t),
                Clause::Filter(_) => None,
            })
            .collect()
    }

    fn remove_tenant_constraint(&mut self, tag: &ConstraintTag) -> Option<TenantConstraint> {
        let position = self.clauses.iter().position(|c| match c {
            Clause::Tenant(t) => t.tag() == tag,
            Clause::Filter(_) => false,
        })?;

        match self.clauses.remove(position) {
            Clause::Tenant(constraint) => Some(constraint),
            Clause::Filter(_) => None,
        }
    }
}
