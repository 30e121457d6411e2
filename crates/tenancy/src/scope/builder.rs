//! The constraint builder.

use std::sync::Arc;

use tracing::debug;

use super::strategy::RelationshipStrategy;
use crate::config::TenancyConfig;
use crate::error::TenantError;
use crate::model::EntityScope;
use crate::query::{Query, TenantScopedQuery};
use crate::tenant::{TenantContext, TenantMap};

/// Computes, applies and removes tenant constraints.
///
/// The builder holds no per-request state. The [`TenantContext`] is passed to
/// every call, and constraints are copied into the query when applied, so a
/// query never observes later changes to the context.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
///
/// use helios_tenancy::config::TenancyConfig;
/// use helios_tenancy::model::EntityDeclaration;
/// use helios_tenancy::scope::ConstraintBuilder;
/// use helios_tenancy::tenant::TenantContext;
///
/// let config = Arc::new(TenancyConfig::default());
/// let builder = ConstraintBuilder::new(config.clone());
/// let invoices = EntityDeclaration::new("invoices").resolve(&config).unwrap();
///
/// let mut ctx = TenantContext::new();
/// ctx.add_tenant("company_id", 1).unwrap();
///
/// let query = builder.scoped_query(&ctx, &invoices).unwrap();
/// assert_eq!(
///     query.to_sql().sql,
///     "SELECT * FROM invoices WHERE (invoices.company_id = ?)"
/// );
///
/// let all = builder.query_without_tenants(&invoices);
/// assert_eq!(all.to_sql().sql, "SELECT * FROM invoices");
/// ```
#[derive(Debug, Clone)]
pub struct ConstraintBuilder {
    config: Arc<TenancyConfig>,
}

impl ConstraintBuilder {
    /// Creates a builder over a resolved configuration.
    pub fn new(config: Arc<TenancyConfig>) -> Self {
        Self { config }
    }

    /// Returns the configuration.
    pub fn config(&self) -> &TenancyConfig {
        &self.config
    }

    /// Returns the active tenants for the entity's declared keys.
    ///
    /// Empty when scoping is disabled. A declared key missing from the context
    /// is skipped, or rejected with [`TenantError::ColumnUnknown`] under
    /// [`MissingTenantPolicy::Reject`](crate::config::MissingTenantPolicy::Reject).
    pub fn constraints_for(
        &self,
        ctx: &TenantContext,
        entity: &EntityScope,
    ) -> Result<TenantMap, TenantError> {
        let mut active = TenantMap::new();
        if !ctx.is_enabled() {
            return Ok(active);
        }

        for key in entity.tenant_columns() {
            match ctx.tenants().get(key.as_str()) {
                Some(ids) => {
                    active.insert(key.clone(), ids.clone());
                }
                None if self.config.is_strict() => {
                    return Err(TenantError::ColumnUnknown {
                        column: key.clone(),
                        registered: ctx.describe(),
                    });
                }
                None => {}
            }
        }
        Ok(active)
    }

    /// Adds the entity's tenant constraints to `query`.
    ///
    /// Applying twice leaves one constraint per tag.
    pub fn apply<Q: TenantScopedQuery>(
        &self,
        ctx: &TenantContext,
        query: &mut Q,
        entity: &EntityScope,
    ) -> Result<(), TenantError> {
        self.apply_with(ctx, query, entity, false)
    }

    /// Like [`apply`](Self::apply), but single-tenant constraints also admit
    /// rows whose scope column is NULL, i.e. rows shared by all tenants.
    pub fn apply_including_null<Q: TenantScopedQuery>(
        &self,
        ctx: &TenantContext,
        query: &mut Q,
        entity: &EntityScope,
    ) -> Result<(), TenantError> {
        self.apply_with(ctx, query, entity, true)
    }

    fn apply_with<Q: TenantScopedQuery>(
        &self,
        ctx: &TenantContext,
        query: &mut Q,
        entity: &EntityScope,
        include_null: bool,
    ) -> Result<(), TenantError> {
        let tenants = self.constraints_for(ctx, entity)?;
        let constraints = entity
            .relation()
            .build_constraints(entity, &tenants, include_null);

        debug!(
            table = entity.table(),
            correlation_id = ctx.correlation_id(),
            constraints = constraints.len(),
            include_null,
            "Applying tenant constraints"
        );

        for constraint in constraints {
            query.add_tenant_constraint(constraint);
        }
        Ok(())
    }

    /// Strips the entity's tenant constraints from `query`.
    ///
    /// Removes at most the first constraint per tag; caller predicates are
    /// never touched. Returns the number of constraints removed.
    pub fn remove<Q: TenantScopedQuery>(&self, query: &mut Q, entity: &EntityScope) -> usize {
        let removed = entity
            .relation()
            .constraint_tags(entity)
            .iter()
            .filter(|tag| query.remove_tenant_constraint(tag).is_some())
            .count();

        debug!(table = entity.table(), removed, "Removed tenant constraints");
        removed
    }

    /// Returns a new query over the entity with its tenant constraints applied.
    pub fn scoped_query(
        &self,
        ctx: &TenantContext,
        entity: &EntityScope,
    ) -> Result<Query, TenantError> {
        let mut query = Query::new(entity.table());
        self.apply(ctx, &mut query, entity)?;
        Ok(query)
    }

    /// Returns a new query over the entity with no tenant constraints.
    pub fn query_without_tenants(&self, entity: &EntityScope) -> Query {
        Query::new(entity.table())
    }
}
