//! Storage traits consumed by the scoping engine.
//!
//! The engine never talks to a database directly. It hands finished [`Query`]
//! values to a [`RecordStorage`] and, for many-tenant entities, asks an
//! [`AssociationStorage`] to reconcile association rows. Both traits are
//! `async` and object safe.

use async_trait::async_trait;
use serde_json::Value;

use crate::config::MorphRelationConfig;
use crate::error::TenancyResult;
use crate::model::Record;
use crate::query::Query;
use crate::tenant::{TenantIds, TenantValue};

/// Row storage for scoped entities.
///
/// # Example
///
/// ```ignore
/// use helios_tenancy::core::RecordStorage;
/// use helios_tenancy::query::{Predicate, Query};
///
/// async fn open_invoices<S: RecordStorage>(storage: &S) -> TenancyResult<usize> {
///     let query = Query::new("invoices").filter(Predicate::eq("status", "open"));
///     Ok(storage.fetch(&query).await?.len())
/// }
/// ```
#[async_trait]
pub trait RecordStorage: Send + Sync {
    /// Returns a human-readable name for this storage backend.
    fn backend_name(&self) -> &'static str;

    /// Executes a query and returns the matching rows.
    async fn fetch(&self, query: &Query) -> TenancyResult<Vec<Record>>;

    /// Inserts a record and returns it as stored, including a generated
    /// primary key when the record did not carry one.
    async fn insert(&self, table: &str, primary_key: &str, record: &Record)
    -> TenancyResult<Record>;

    /// Updates the row identified by the record's primary key and returns the
    /// stored row.
    ///
    /// # Errors
    ///
    /// * `TenantError::MissingEntityKey` - if the record has no primary key value
    async fn update(&self, table: &str, primary_key: &str, record: &Record)
    -> TenancyResult<Record>;

    /// Deletes the row with the given primary key value.
    ///
    /// Returns `false` if no row matched.
    async fn delete(&self, table: &str, primary_key: &str, id: &Value) -> TenancyResult<bool>;
}

/// Result of reconciling association rows with the active tenants.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncChanges {
    /// Tenants newly associated (inserted or restored from soft deletion).
    pub attached: Vec<TenantValue>,
    /// Tenants no longer associated (deleted or soft-deleted).
    pub detached: Vec<TenantValue>,
}

impl SyncChanges {
    /// Returns `true` if nothing changed.
    pub fn is_empty(&self) -> bool {
        self.attached.is_empty() && self.detached.is_empty()
    }
}

/// Association rows for many-tenant entities.
#[async_trait]
pub trait AssociationStorage: Send + Sync {
    /// Returns the tenants currently associated with a record, ignoring
    /// soft-deleted rows.
    async fn associated_tenants(
        &self,
        relation: &MorphRelationConfig,
        morph_type: &str,
        entity_id: &Value,
    ) -> TenancyResult<TenantIds>;

    /// Makes the live associations of a record exactly `tenants`.
    ///
    /// Missing associations are attached, stale ones detached. Associations
    /// already present are left alone, so repeated calls are idempotent.
    async fn sync_associations(
        &self,
        relation: &MorphRelationConfig,
        morph_type: &str,
        entity_id: &Value,
        tenants: &TenantIds,
    ) -> TenancyResult<SyncChanges>;
}
