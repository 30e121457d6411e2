//! Scoped repository: the entity-operation boundary.
//!
//! A [`ScopedRepository`] ties one entity, one storage and one borrowed
//! [`TenantContext`] together. Reads are constrained to the context's tenants
//! unless an escape query is used; writes run the lifecycle hook.

use serde_json::Value;
use tracing::{debug, instrument, warn};

use crate::core::{AssociationStorage, RecordStorage};
use crate::engine::TenantScoping;
use crate::error::{LookupError, TenancyResult, TenantError};
use crate::model::{EntityScope, Record};
use crate::query::{Predicate, Query};
use crate::scope::entity_key;
use crate::tenant::{TenantContext, TenantIds, TenantKey, TenantMap, TenantValue};

/// Tenant-scoped access to one entity.
///
/// The repository borrows the context immutably, so the context cannot be
/// changed while the repository is alive.
#[derive(Debug)]
pub struct ScopedRepository<'a, S> {
    storage: &'a S,
    engine: &'a TenantScoping,
    entity: EntityScope,
    ctx: &'a TenantContext,
}

impl<'a, S> ScopedRepository<'a, S>
where
    S: RecordStorage + AssociationStorage,
{
    /// Creates a repository.
    pub fn new(
        storage: &'a S,
        engine: &'a TenantScoping,
        entity: EntityScope,
        ctx: &'a TenantContext,
    ) -> Self {
        Self {
            storage,
            engine,
            entity,
            ctx,
        }
    }

    /// The entity this repository serves.
    pub fn entity(&self) -> &EntityScope {
        &self.entity
    }

    /// The borrowed context.
    pub fn context(&self) -> &TenantContext {
        self.ctx
    }

    /// Returns a query constrained to the active tenants.
    pub fn query(&self) -> Result<Query, TenantError> {
        self.engine.builder().scoped_query(self.ctx, &self.entity)
    }

    /// Returns a query that also admits rows with no tenant.
    pub fn query_including_null(&self) -> Result<Query, TenantError> {
        let mut query = self.all_tenants();
        self.engine
            .builder()
            .apply_including_null(self.ctx, &mut query, &self.entity)?;
        Ok(query)
    }

    /// Returns an escape query across all tenants.
    pub fn all_tenants(&self) -> Query {
        self.engine.builder().query_without_tenants(&self.entity)
    }

    /// Strips this entity's tenant constraints from an existing query.
    pub fn without_tenants(&self, mut query: Query) -> Query {
        self.engine.builder().remove(&mut query, &self.entity);
        query
    }

    /// Returns all rows for the active tenants.
    pub async fn all(&self) -> TenancyResult<Vec<Record>> {
        let query = self.query()?;
        self.get(&query).await
    }

    /// Executes a query as built.
    pub async fn get(&self, query: &Query) -> TenancyResult<Vec<Record>> {
        self.storage.fetch(query).await
    }

    /// Looks a row up by primary key within the active tenants.
    pub async fn find(&self, id: impl Into<Value>) -> TenancyResult<Option<Record>> {
        let query = self.by_key(self.query()?, id.into());
        Ok(self.get(&query).await?.into_iter().next())
    }

    /// Looks a row up by primary key, telling a row of another tenant apart
    /// from a missing row.
    ///
    /// # Errors
    ///
    /// * `LookupError::ModelNotFoundForTenant` - the row exists outside the active tenants
    /// * `LookupError::TenantModelNotFound` - the row does not exist
    #[instrument(skip(self, id), fields(table = %self.entity.table()))]
    pub async fn find_or_fail(&self, id: impl Into<Value>) -> TenancyResult<Record> {
        let id = id.into();
        let scoped = self.by_key(self.query()?, id.clone());
        if let Some(record) = self.get(&scoped).await?.into_iter().next() {
            return Ok(record);
        }

        let unscoped = self.by_key(self.all_tenants(), id.clone());
        let exists = !self.get(&unscoped).await?.is_empty();
        debug!(exists, "Scoped lookup missed");

        let model = self.entity.table().to_string();
        let id = display_key(&id);
        let tenants = self.ctx.describe();
        Err(if exists {
            LookupError::ModelNotFoundForTenant { model, id, tenants }
        } else {
            LookupError::TenantModelNotFound { model, id, tenants }
        }
        .into())
    }

    /// Inserts a record, stamping or associating it with the active tenants.
    pub async fn create(&self, mut record: Record) -> TenancyResult<Record> {
        let hook = self.engine.hook();
        hook.creating(self.ctx, &self.entity, &mut record)?;

        let mut stored = self
            .storage
            .insert(self.entity.table(), self.entity.primary_key(), &record)
            .await?;
        if !record.is_tenant_scoped() {
            stored = stored.without_tenant_scope();
        }

        if let Err(err) = hook
            .created(self.ctx, &self.entity, &stored, self.storage)
            .await
        {
            warn!(
                table = self.entity.table(),
                correlation_id = self.ctx.correlation_id(),
                error = %err,
                "Tenant association failed, removing inserted row"
            );
            let id = entity_key(&self.entity, &stored)?;
            self.storage
                .delete(self.entity.table(), self.entity.primary_key(), id)
                .await?;
            return Err(err);
        }
        Ok(stored)
    }

    /// Updates a record and re-synchronises its tenant associations.
    pub async fn update(&self, record: Record) -> TenancyResult<Record> {
        entity_key(&self.entity, &record)?;

        let mut stored = self
            .storage
            .update(self.entity.table(), self.entity.primary_key(), &record)
            .await?;
        if !record.is_tenant_scoped() {
            stored = stored.without_tenant_scope();
        }

        self.engine
            .hook()
            .updated(self.ctx, &self.entity, &stored, self.storage)
            .await?;
        Ok(stored)
    }

    /// Returns the tenants a record belongs to, grouped by scope key.
    ///
    /// For many-tenant entities these are the live association rows, keyed by
    /// the association table's tenant column; for single-tenant entities, the
    /// record's non-null scope key fields.
    pub async fn tenants_of(&self, record: &Record) -> TenancyResult<TenantMap> {
        let mut tenants = TenantMap::new();

        if let Some(relation) = self.entity.relation().morph_relation() {
            let id = entity_key(&self.entity, record)?;
            let ids = self
                .storage
                .associated_tenants(relation, self.entity.morph_type(), id)
                .await?;
            if !ids.is_empty() {
                tenants.insert(TenantKey::new(relation.tenant_id_column.as_str()), ids);
            }
            return Ok(tenants);
        }

        for key in self.entity.tenant_columns() {
            match record.get(key.as_str()) {
                Some(value) if !value.is_null() => {
                    let id = TenantValue::from_json(key, value)?;
                    tenants.insert(key.clone(), TenantIds::from([id]));
                }
                _ => {}
            }
        }
        Ok(tenants)
    }

    fn by_key(&self, query: Query, id: Value) -> Query {
        query
            .filter(Predicate::eq(
                self.entity.column(self.entity.primary_key()),
                id,
            ))
            .limit(1)
    }
}

fn display_key(id: &Value) -> String {
    match id {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
