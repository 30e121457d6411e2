//! Relationship strategies.
//!
//! An entity relates to its tenants in one of two ways:
//!
//! - [`BelongsToOneTenant`] - the entity's table has one column per scope key
//! - [`BelongsToManyTenants`] - an association table links rows to tenants
//!
//! Both implement [`RelationshipStrategy`]. The choice is made once, when an
//! entity is resolved, and stored as a [`TenantRelation`].

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use super::constraint::{ConstraintKind, ConstraintTag, TenantConstraint};
use crate::config::{MorphRelationConfig, RelationKind};
use crate::core::{AssociationStorage, SyncChanges};
use crate::error::{TenancyResult, TenantError};
use crate::model::{EntityScope, Record};
use crate::tenant::{TenantIds, TenantMap};

/// The shared contract of the relationship variants.
///
/// `tenants` is always the result of
/// [`ConstraintBuilder::constraints_for`](super::ConstraintBuilder::constraints_for):
/// the entity's declared keys that are active in the context, never empty
/// per key.
#[async_trait]
pub trait RelationshipStrategy: Send + Sync {
    /// The relationship kind.
    fn kind(&self) -> RelationKind;

    /// Builds the constraints restricting `entity` to `tenants`.
    fn build_constraints(
        &self,
        entity: &EntityScope,
        tenants: &TenantMap,
        include_null: bool,
    ) -> Vec<TenantConstraint>;

    /// Every tag this strategy can produce for `entity`.
    fn constraint_tags(&self, entity: &EntityScope) -> Vec<ConstraintTag>;

    /// Prepares a record before its first persistence.
    fn creating(
        &self,
        entity: &EntityScope,
        tenants: &TenantMap,
        record: &mut Record,
    ) -> Result<(), TenantError>;

    /// Runs after a record was inserted.
    async fn created(
        &self,
        entity: &EntityScope,
        tenants: &TenantMap,
        record: &Record,
        associations: &dyn AssociationStorage,
    ) -> TenancyResult<Option<SyncChanges>>;

    /// Runs after a record was updated.
    async fn updated(
        &self,
        entity: &EntityScope,
        tenants: &TenantMap,
        record: &Record,
        associations: &dyn AssociationStorage,
    ) -> TenancyResult<Option<SyncChanges>>;
}

/// One foreign-key column per scope key.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BelongsToOneTenant;

#[async_trait]
impl RelationshipStrategy for BelongsToOneTenant {
    fn kind(&self) -> RelationKind {
        RelationKind::One
    }

    fn build_constraints(
        &self,
        entity: &EntityScope,
        tenants: &TenantMap,
        include_null: bool,
    ) -> Vec<TenantConstraint> {
        tenants
            .iter()
            .map(|(key, ids)| {
                TenantConstraint::new(
                    ConstraintTag::column(entity.table(), key.clone()),
                    ConstraintKind::Column {
                        column: entity.column(key.as_str()),
                        values: ids.iter().cloned().collect(),
                        include_null,
                    },
                )
            })
            .collect()
    }

    fn constraint_tags(&self, entity: &EntityScope) -> Vec<ConstraintTag> {
        entity
            .tenant_columns()
            .iter()
            .map(|key| ConstraintTag::column(entity.table(), key.clone()))
            .collect()
    }

    fn creating(
        &self,
        entity: &EntityScope,
        tenants: &TenantMap,
        record: &mut Record,
    ) -> Result<(), TenantError> {
        for (key, ids) in tenants {
            // Explicit values win, including cross-tenant administrative inserts
            if record.is_set(key.as_str()) {
                continue;
            }

            let mut iter = ids.iter();
            match (iter.next(), iter.next()) {
                (Some(id), None) => {
                    debug!(table = entity.table(), column = %key, tenant = %id, "Stamping tenant column");
                    record.set(key.as_str(), id.to_json());
                }
                _ => {
                    return Err(TenantError::AmbiguousIdentifier {
                        column: key.clone(),
                        count: ids.len(),
                    });
                }
            }
        }
        Ok(())
    }

    async fn created(
        &self,
        _entity: &EntityScope,
        _tenants: &TenantMap,
        _record: &Record,
        _associations: &dyn AssociationStorage,
    ) -> TenancyResult<Option<SyncChanges>> {
        Ok(None)
    }

    async fn updated(
        &self,
        _entity: &EntityScope,
        _tenants: &TenantMap,
        _record: &Record,
        _associations: &dyn AssociationStorage,
    ) -> TenancyResult<Option<SyncChanges>> {
        Ok(None)
    }
}

/// Membership through an association table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BelongsToManyTenants {
    relation: MorphRelationConfig,
}

impl BelongsToManyTenants {
    /// Creates the strategy over a resolved association table layout.
    pub fn new(relation: MorphRelationConfig) -> Self {
        Self { relation }
    }

    /// The association table layout.
    pub fn relation(&self) -> &MorphRelationConfig {
        &self.relation
    }

    fn active_ids(tenants: &TenantMap) -> TenantIds {
        tenants.values().flatten().cloned().collect()
    }

    async fn sync(
        &self,
        entity: &EntityScope,
        tenants: &TenantMap,
        record: &Record,
        associations: &dyn AssociationStorage,
    ) -> TenancyResult<Option<SyncChanges>> {
        let ids = Self::active_ids(tenants);
        if ids.is_empty() {
            return Ok(None);
        }

        let entity_id = entity_key(entity, record)?;
        let changes = associations
            .sync_associations(&self.relation, entity.morph_type(), entity_id, &ids)
            .await?;

        debug!(
            table = entity.table(),
            attached = changes.attached.len(),
            detached = changes.detached.len(),
            "Synchronised tenant associations"
        );
        Ok(Some(changes))
    }
}

/// Returns the record's primary key value, which association rows refer to.
pub(crate) fn entity_key<'r>(entity: &EntityScope, record: &'r Record) -> Result<&'r Value, TenantError> {
    match record.get(entity.primary_key()) {
        Some(value @ (Value::Number(_) | Value::String(_))) => Ok(value),
        _ => Err(TenantError::MissingEntityKey {
            table: entity.table().to_string(),
            column: entity.primary_key().to_string(),
        }),
    }
}

#[async_trait]
impl RelationshipStrategy for BelongsToManyTenants {
    fn kind(&self) -> RelationKind {
        RelationKind::Many
    }

    fn build_constraints(
        &self,
        entity: &EntityScope,
        tenants: &TenantMap,
        _include_null: bool,
    ) -> Vec<TenantConstraint> {
        let ids = Self::active_ids(tenants);
        if ids.is_empty() {
            return Vec::new();
        }

        vec![TenantConstraint::new(
            ConstraintTag::membership(entity.table()),
            ConstraintKind::Membership {
                owner_key: entity.column(entity.primary_key()),
                relation: self.relation.clone(),
                morph_type: entity.morph_type().to_string(),
                tenants: ids.into_iter().collect(),
            },
        )]
    }

    fn constraint_tags(&self, entity: &EntityScope) -> Vec<ConstraintTag> {
        vec![ConstraintTag::membership(entity.table())]
    }

    fn creating(
        &self,
        _entity: &EntityScope,
        _tenants: &TenantMap,
        _record: &mut Record,
    ) -> Result<(), TenantError> {
        Ok(())
    }

    async fn created(
        &self,
        entity: &EntityScope,
        tenants: &TenantMap,
        record: &Record,
        associations: &dyn AssociationStorage,
    ) -> TenancyResult<Option<SyncChanges>> {
        self.sync(entity, tenants, record, associations).await
    }

    async fn updated(
        &self,
        entity: &EntityScope,
        tenants: &TenantMap,
        record: &Record,
        associations: &dyn AssociationStorage,
    ) -> TenancyResult<Option<SyncChanges>> {
        self.sync(entity, tenants, record, associations).await
    }
}

/// The relationship an entity was resolved with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TenantRelation {
    /// Scope key columns on the entity's table.
    One(BelongsToOneTenant),
    /// Association table membership.
    Many(BelongsToManyTenants),
}

impl TenantRelation {
    fn strategy(&self) -> &dyn RelationshipStrategy {
        match self {
            TenantRelation::One(s) => s,
            TenantRelation::Many(s) => s,
        }
    }

    /// Returns the association table layout for many-tenant entities.
    pub fn morph_relation(&self) -> Option<&MorphRelationConfig> {
        match self {
            TenantRelation::One(_) => None,
            TenantRelation::Many(s) => Some(s.relation()),
        }
    }
}

#[async_trait]
impl RelationshipStrategy for TenantRelation {
    fn kind(&self) -> RelationKind {
        self.strategy().kind()
    }

    fn build_constraints(
        &self,
        entity: &EntityScope,
        tenants: &TenantMap,
        include_null: bool,
    ) -> Vec<TenantConstraint> {
        self.strategy()
            .build_constraints(entity, tenants, include_null)
    }

    fn constraint_tags(&self, entity: &EntityScope) -> Vec<ConstraintTag> {
        self.strategy().constraint_tags(entity)
    }

    fn creating(
        &self,
        entity: &EntityScope,
        tenants: &TenantMap,
        record: &mut Record,
    ) -> Result<(), TenantError> {
        self.strategy().creating(entity, tenants, record)
    }

    async fn created(
        &self,
        entity: &EntityScope,
        tenants: &TenantMap,
        record: &Record,
        associations: &dyn AssociationStorage,
    ) -> TenancyResult<Option<SyncChanges>> {
        self.strategy()
            .created(entity, tenants, record, associations)
            .await
    }

    async fn updated(
        &self,
        entity: &EntityScope,
        tenants: &TenantMap,
        record: &Record,
        associations: &dyn AssociationStorage,
    ) -> TenancyResult<Option<SyncChanges>> {
        self.strategy()
            .updated(entity, tenants, record, associations)
            .await
    }
}
