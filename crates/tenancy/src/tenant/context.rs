//! Tenant context for scoped operations.
//!
//! This module defines [`TenantContext`], the registry of tenants currently in
//! scope for one unit of work (a request, a job, a task). A context is passed
//! explicitly to every scoped operation; there is no process-wide instance.
//! Mutation requires `&mut self`, so a context cannot be changed while a
//! repository or query builder is borrowing it.

use serde_json::Value;

use super::id::{TenantIds, TenantKey, TenantMap, TenantSource, TenantValue, describe_tenants};
use crate::error::TenantError;

/// The tenants currently in scope for one unit of work.
///
/// # State
///
/// - `tenants`: scope key to one or more identifiers. A key present in the map
///   always has at least one identifier.
/// - `enabled`: when false, no constraints are injected and no fields are
///   stamped, but the registered tenants are kept so that
///   [`enable`](Self::enable) restores the previous scoping.
///
/// # Examples
///
/// ```
/// use helios_tenancy::tenant::TenantContext;
///
/// let mut ctx = TenantContext::new();
/// ctx.add_tenant("company_id", 1).unwrap();
/// assert!(ctx.has_tenant("company_id"));
///
/// ctx.disable();
/// assert!(!ctx.is_enabled());
/// assert!(ctx.has_tenant("company_id"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TenantContext {
    tenants: TenantMap,
    enabled: bool,
    correlation_id: Option<String>,
}

impl TenantContext {
    /// Creates an empty, enabled context.
    pub fn new() -> Self {
        Self {
            tenants: TenantMap::new(),
            enabled: true,
            correlation_id: None,
        }
    }

    /// Returns a builder for constructing a context from known tenants.
    pub fn builder() -> TenantContextBuilder {
        TenantContextBuilder::new()
    }

    /// Creates a context with the specified correlation ID for tracing.
    pub fn with_correlation_id(mut self, correlation_id: impl Into<String>) -> Self {
        self.correlation_id = Some(correlation_id.into());
        self
    }

    /// Returns the correlation ID, if set.
    pub fn correlation_id(&self) -> Option<&str> {
        self.correlation_id.as_deref()
    }

    /// Scopes by `key = id`, replacing any identifiers already registered for
    /// the key, and enables scoping.
    ///
    /// Fails with [`TenantError::NullIdentifier`] for a null identifier; the
    /// context is left untouched in that case.
    pub fn add_tenant(
        &mut self,
        key: impl Into<TenantKey>,
        id: impl Into<Value>,
    ) -> Result<(), TenantError> {
        let key = key.into();
        let value = TenantValue::from_json(&key, &id.into())?;

        self.enabled = true;
        self.tenants.insert(key, TenantIds::from([value]));
        Ok(())
    }

    /// Adds `id` to the identifiers registered for `key`, and enables scoping.
    ///
    /// Used for many-tenant scoping where a key accumulates a set of tenants.
    pub fn push_tenant(
        &mut self,
        key: impl Into<TenantKey>,
        id: impl Into<Value>,
    ) -> Result<(), TenantError> {
        let key = key.into();
        let value = TenantValue::from_json(&key, &id.into())?;

        self.enabled = true;
        self.tenants.entry(key).or_default().insert(value);
        Ok(())
    }

    /// Scopes by a tenant record, keyed by its foreign key name.
    pub fn add_tenant_source(&mut self, source: &impl TenantSource) -> Result<(), TenantError> {
        self.add_tenant(source.foreign_key(), source.key_value())
    }

    /// Removes a scope key. Returns whether it was registered.
    pub fn remove_tenant(&mut self, key: &str) -> bool {
        self.tenants.remove(key).is_some()
    }

    /// Removes one identifier from a scope key, dropping the key when its last
    /// identifier goes. Returns whether the identifier was registered.
    pub fn remove_tenant_id(&mut self, key: &str, id: impl Into<TenantValue>) -> bool {
        let id = id.into();
        let Some(ids) = self.tenants.get_mut(key) else {
            return false;
        };

        let removed = ids.remove(&id);
        if ids.is_empty() {
            self.tenants.remove(key);
        }
        removed
    }

    /// Removes the scope key of a tenant record.
    pub fn remove_tenant_source(&mut self, source: &impl TenantSource) -> bool {
        self.remove_tenant(source.foreign_key().as_str())
    }

    /// Returns `true` if the scope key is registered.
    pub fn has_tenant(&self, key: &str) -> bool {
        self.tenants.contains_key(key)
    }

    /// Returns a read-only view of the registered tenants.
    pub fn tenants(&self) -> &TenantMap {
        &self.tenants
    }

    /// Returns an owned copy of the registered tenants.
    pub fn snapshot(&self) -> TenantMap {
        self.tenants.clone()
    }

    /// Returns the identifier registered for a scope key.
    ///
    /// When several identifiers are registered, the lowest one is returned;
    /// use [`tenant_ids`](Self::tenant_ids) to see all of them.
    pub fn tenant_id(&self, key: &str) -> Result<&TenantValue, TenantError> {
        self.tenant_ids(key)?
            .first()
            .ok_or_else(|| self.unknown_column(key))
    }

    /// Returns all identifiers registered for a scope key.
    pub fn tenant_ids(&self, key: &str) -> Result<&TenantIds, TenantError> {
        self.tenants
            .get(key)
            .ok_or_else(|| self.unknown_column(key))
    }

    /// Enables scoping by the registered tenants.
    pub fn enable(&mut self) {
        self.enabled = true;
    }

    /// Disables scoping without forgetting the registered tenants.
    pub fn disable(&mut self) {
        self.enabled = false;
    }

    /// Returns `true` if scoping is enabled.
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Returns `true` when scoping is enabled and at least one tenant is registered.
    pub fn is_scoping(&self) -> bool {
        self.enabled && !self.tenants.is_empty()
    }

    /// Renders the registered tenants for diagnostics.
    pub fn describe(&self) -> String {
        describe_tenants(&self.tenants)
    }

    fn unknown_column(&self, key: &str) -> TenantError {
        TenantError::ColumnUnknown {
            column: TenantKey::new(key),
            registered: self.describe(),
        }
    }
}

impl Default for TenantContext {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for creating tenant contexts with validation.
///
/// Useful when constructing contexts from external input (headers, claims).
/// Every identifier is validated at [`build`](Self::build) time.
///
/// ```
/// use helios_tenancy::tenant::TenantContext;
///
/// let ctx = TenantContext::builder()
///     .tenant("company_id", 1)
///     .tenant("tenant_id", 7)
///     .tenant("tenant_id", 8)
///     .correlation_id("req-1")
///     .build()
///     .unwrap();
///
/// assert_eq!(ctx.tenant_ids("tenant_id").unwrap().len(), 2);
/// ```
#[derive(Debug, Default)]
pub struct TenantContextBuilder {
    tenants: Vec<(TenantKey, Value)>,
    disabled: bool,
    correlation_id: Option<String>,
}

impl TenantContextBuilder {
    /// Creates a new builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an identifier for a scope key. Repeated keys accumulate.
    pub fn tenant(mut self, key: impl Into<TenantKey>, id: impl Into<Value>) -> Self {
        self.tenants.push((key.into(), id.into()));
        self
    }

    /// Builds the context in the disabled state.
    pub fn disabled(mut self) -> Self {
        self.disabled = true;
        self
    }

    /// Sets the correlation ID.
    pub fn correlation_id(mut self, correlation_id: impl Into<String>) -> Self {
        self.correlation_id = Some(correlation_id.into());
        self
    }

    /// Builds the context, rejecting null or non-scalar identifiers.
    pub fn build(self) -> Result<TenantContext, TenantError> {
        let mut ctx = TenantContext::new();
        for (key, id) in self.tenants {
            ctx.push_tenant(key, id)?;
        }
        if self.disabled {
            ctx.disable();
        }
        ctx.correlation_id = self.correlation_id;
        Ok(ctx)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn ids(values: &[i64]) -> TenantIds {
        values.iter().copied().map(TenantValue::Integer).collect()
    }

    #[test]
    fn test_tenants_with_strings() {
        let mut ctx = TenantContext::new();

        ctx.add_tenant("tenant_a_id", 1).unwrap();
        assert_eq!(ctx.tenants().len(), 1);
        assert_eq!(ctx.tenant_ids("tenant_a_id").unwrap(), &ids(&[1]));

        ctx.add_tenant("tenant_b_id", 2).unwrap();
        assert_eq!(ctx.tenants().len(), 2);

        assert!(ctx.remove_tenant("tenant_a_id"));
        assert_eq!(ctx.tenants().len(), 1);
        assert!(ctx.has_tenant("tenant_b_id"));
        assert!(!ctx.has_tenant("tenant_a_id"));
    }

    #[test]
    fn test_add_tenant_last_write_wins() {
        let mut ctx = TenantContext::new();
        ctx.add_tenant("company_id", 1).unwrap();
        ctx.add_tenant("company_id", 2).unwrap();
        assert_eq!(ctx.tenant_ids("company_id").unwrap(), &ids(&[2]));
    }

    #[test]
    fn test_push_tenant_accumulates() {
        let mut ctx = TenantContext::new();
        ctx.push_tenant("tenant_id", 1).unwrap();
        ctx.push_tenant("tenant_id", 2).unwrap();
        ctx.push_tenant("tenant_id", 2).unwrap();
        assert_eq!(ctx.tenant_ids("tenant_id").unwrap(), &ids(&[1, 2]));
    }

    #[test]
    fn test_remove_tenant_id_drops_empty_key() {
        let mut ctx = TenantContext::new();
        ctx.push_tenant("tenant_id", 1).unwrap();
        ctx.push_tenant("tenant_id", 2).unwrap();

        assert!(ctx.remove_tenant_id("tenant_id", 1));
        assert!(ctx.has_tenant("tenant_id"));
        assert!(!ctx.remove_tenant_id("tenant_id", 1));

        assert!(ctx.remove_tenant_id("tenant_id", 2));
        assert!(!ctx.has_tenant("tenant_id"));
        assert!(!ctx.remove_tenant_id("tenant_id", 2));
    }

    #[test]
    fn test_remove_missing_tenant() {
        let mut ctx = TenantContext::new();
        assert!(!ctx.remove_tenant("company_id"));
    }

    #[test]
    fn test_get_tenant_id() {
        let mut ctx = TenantContext::new();
        ctx.add_tenant("tenant_a_id", 1).unwrap();
        assert_eq!(ctx.tenant_id("tenant_a_id").unwrap(), &TenantValue::Integer(1));
    }

    #[test]
    fn test_get_tenant_id_unknown_column() {
        let ctx = TenantContext::new();
        let err = ctx.tenant_id("company_id").unwrap_err();
        assert!(matches!(err, TenantError::ColumnUnknown { .. }));
    }

    #[test]
    fn test_null_identifier_leaves_context_unchanged() {
        let mut ctx = TenantContext::new();
        ctx.add_tenant("company_id", 3).unwrap();
        ctx.disable();
        let before = ctx.clone();

        let err = ctx.add_tenant("company_id", None::<i64>).unwrap_err();
        assert!(matches!(err, TenantError::NullIdentifier { .. }));
        assert_eq!(ctx, before);

        let err = ctx.push_tenant("other_id", Value::Null).unwrap_err();
        assert!(matches!(err, TenantError::NullIdentifier { .. }));
        assert_eq!(ctx, before);
    }

    #[test]
    fn test_add_tenant_enables() {
        let mut ctx = TenantContext::new();
        ctx.disable();
        ctx.add_tenant("company_id", 1).unwrap();
        assert!(ctx.is_enabled());
    }

    #[test]
    fn test_disable_keeps_tenants() {
        let mut ctx = TenantContext::new();
        ctx.add_tenant("company_id", 1).unwrap();
        let before = ctx.snapshot();

        ctx.disable();
        assert!(!ctx.is_scoping());
        assert_eq!(ctx.tenants(), &before);

        ctx.enable();
        assert!(ctx.is_scoping());
        assert_eq!(ctx.tenants(), &before);
    }

    #[test]
    fn test_snapshot_is_detached() {
        let mut ctx = TenantContext::new();
        ctx.add_tenant("company_id", 1).unwrap();
        let snapshot = ctx.snapshot();
        ctx.remove_tenant("company_id");
        assert_eq!(snapshot.len(), 1);
        assert!(ctx.tenants().is_empty());
    }

    struct Company {
        id: i64,
    }

    impl TenantSource for Company {
        fn foreign_key(&self) -> TenantKey {
            TenantKey::new("company_id")
        }

        fn key_value(&self) -> Value {
            json!(self.id)
        }
    }

    #[test]
    fn test_tenants_with_sources() {
        let mut ctx = TenantContext::new();
        let company = Company { id: 1 };

        ctx.add_tenant_source(&company).unwrap();
        assert_eq!(ctx.tenant_id("company_id").unwrap(), &TenantValue::Integer(1));

        assert!(ctx.remove_tenant_source(&company));
        assert!(!ctx.has_tenant("company_id"));
    }

    #[test]
    fn test_builder() {
        let ctx = TenantContext::builder()
            .tenant("company_id", "acme")
            .correlation_id("corr-123")
            .disabled()
            .build()
            .unwrap();

        assert!(!ctx.is_enabled());
        assert_eq!(ctx.correlation_id(), Some("corr-123"));
        assert_eq!(
            ctx.tenant_id("company_id").unwrap(),
            &TenantValue::Text("acme".to_string())
        );
    }

    #[test]
    fn test_builder_rejects_null() {
        let result = TenantContext::builder()
            .tenant("company_id", Value::Null)
            .build();
        assert!(matches!(result, Err(TenantError::NullIdentifier { .. })));
    }

    #[test]
    fn test_describe() {
        let mut ctx = TenantContext::new();
        ctx.add_tenant("company_id", 1).unwrap();
        assert_eq!(ctx.describe(), "{company_id: [1]}");
    }
}
