//! Record lifecycle hook.

use tracing::{debug, warn};

use super::builder::ConstraintBuilder;
use super::strategy::RelationshipStrategy;
use crate::core::{AssociationStorage, SyncChanges};
use crate::error::{TenancyResult, TenantError};
use crate::model::{EntityScope, Record};
use crate::tenant::TenantContext;

/// Stamps tenant fields and maintains tenant associations around writes.
///
/// The hook is skipped when scoping is disabled or when the record opted out
/// with [`Record::without_tenant_scope`]. Reading through an escape query has
/// no effect on it.
#[derive(Debug, Clone)]
pub struct LifecycleHook {
    builder: ConstraintBuilder,
}

impl LifecycleHook {
    /// Creates a hook that resolves tenants through `builder`.
    pub fn new(builder: ConstraintBuilder) -> Self {
        Self { builder }
    }

    fn applies(ctx: &TenantContext, record: &Record) -> bool {
        ctx.is_enabled() && record.is_tenant_scoped()
    }

    /// Runs once before a record is first persisted.
    pub fn creating(
        &self,
        ctx: &TenantContext,
        entity: &EntityScope,
        record: &mut Record,
    ) -> Result<(), TenantError> {
        if !Self::applies(ctx, record) {
            debug!(table = entity.table(), "Skipping tenant stamping");
            return Ok(());
        }

        let tenants = self.builder.constraints_for(ctx, entity)?;
        entity.relation().creating(entity, &tenants, record)
    }

    /// Runs after a record was inserted and carries its primary key.
    pub async fn created(
        &self,
        ctx: &TenantContext,
        entity: &EntityScope,
        record: &Record,
        associations: &dyn AssociationStorage,
    ) -> TenancyResult<Option<SyncChanges>> {
        if !Self::applies(ctx, record) {
            return Ok(None);
        }

        let tenants = self.builder.constraints_for(ctx, entity)?;
        entity
            .relation()
            .created(entity, &tenants, record, associations)
            .await
    }

    /// Runs after a record was updated.
    pub async fn updated(
        &self,
        ctx: &TenantContext,
        entity: &EntityScope,
        record: &Record,
        associations: &dyn AssociationStorage,
    ) -> TenancyResult<Option<SyncChanges>> {
        if !Self::applies(ctx, record) {
            return Ok(None);
        }

        if record.get(entity.primary_key()).is_none() {
            warn!(
                table = entity.table(),
                correlation_id = ctx.correlation_id(),
                "Update hook called for a record without a primary key"
            );
        }

        let tenants = self.builder.constraints_for(ctx, entity)?;
        entity
            .relation()
            .updated(entity, &tenants, record, associations)
            .await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;

    use super::*;
    use crate::config::TenancyConfig;
    use crate::model::EntityDeclaration;

    fn setup() -> (LifecycleHook, EntityScope) {
        let config = Arc::new(TenancyConfig::default());
        let entity = EntityDeclaration::new("invoices").resolve(&config).unwrap();
        (LifecycleHook::new(ConstraintBuilder::new(config)), entity)
    }

    fn company(id: i64) -> TenantContext {
        let mut ctx = TenantContext::new();
        ctx.add_tenant("company_id", id).unwrap();
        ctx
    }

    #[test]
    fn test_creating_stamps() {
        let (hook, entity) = setup();
        let mut record = Record::new();
        hook.creating(&company(5), &entity, &mut record).unwrap();
        assert_eq!(record.get("company_id"), Some(&json!(5)));
    }

    #[test]
    fn test_creating_never_overwrites() {
        let (hook, entity) = setup();
        let mut record = Record::new().with("company_id", 7);
        hook.creating(&company(5), &entity, &mut record).unwrap();
        assert_eq!(record.get("company_id"), Some(&json!(7)));
    }

    #[test]
    fn test_creating_skipped_when_disabled() {
        let (hook, entity) = setup();
        let mut ctx = company(5);
        ctx.disable();
        let mut record = Record::new();
        hook.creating(&ctx, &entity, &mut record).unwrap();
        assert!(record.get("company_id").is_none());
    }

    #[test]
    fn test_creating_skipped_for_opted_out_record() {
        let (hook, entity) = setup();
        let mut record = Record::new().without_tenant_scope();
        hook.creating(&company(5), &entity, &mut record).unwrap();
        assert!(record.get("company_id").is_none());
    }

    #[test]
    fn test_creating_without_tenants_is_noop() {
        let (hook, entity) = setup();
        let mut record = Record::new();
        hook.creating(&TenantContext::new(), &entity, &mut record)
            .unwrap();
        assert!(record.fields().is_empty());
    }
}
