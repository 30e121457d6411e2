//! The tenant scoping engine.

use std::sync::Arc;

use tracing::info;

use crate::config::TenancyConfig;
use crate::core::{AssociationStorage, RecordStorage};
use crate::error::ConfigError;
use crate::model::{EntityDeclaration, EntityScope, ScopedEntity};
use crate::repository::ScopedRepository;
use crate::scope::{ConstraintBuilder, LifecycleHook};
use crate::tenant::TenantContext;

/// Owns the resolved configuration and the stateless scoping components.
///
/// One engine is shared by the whole process; per-request state lives in the
/// [`TenantContext`] passed to each repository.
///
/// # Examples
///
/// ```
/// use helios_tenancy::{TenancyConfig, TenantScoping};
/// use helios_tenancy::model::{EntityDeclaration, ScopedEntity};
///
/// struct Invoice;
///
/// impl ScopedEntity for Invoice {
///     fn declaration() -> EntityDeclaration {
///         EntityDeclaration::new("invoices")
///     }
/// }
///
/// let engine = TenantScoping::new(TenancyConfig::default()).unwrap();
/// let invoices = engine.entity::<Invoice>().unwrap();
/// assert_eq!(invoices.table(), "invoices");
/// ```
#[derive(Debug, Clone)]
pub struct TenantScoping {
    config: Arc<TenancyConfig>,
    builder: ConstraintBuilder,
    hook: LifecycleHook,
}

impl TenantScoping {
    /// Validates the configuration and creates the engine.
    pub fn new(config: TenancyConfig) -> Result<Self, ConfigError> {
        config.validate()?;

        info!(
            default_relation = %config.default_relation,
            default_tenant_columns = ?config.default_tenant_columns,
            strict = config.is_strict(),
            "Initialized tenant scoping"
        );

        let config = Arc::new(config);
        let builder = ConstraintBuilder::new(Arc::clone(&config));
        let hook = LifecycleHook::new(builder.clone());
        Ok(Self {
            config,
            builder,
            hook,
        })
    }

    /// Returns the configuration.
    pub fn config(&self) -> &TenancyConfig {
        &self.config
    }

    /// Returns the constraint builder.
    pub fn builder(&self) -> &ConstraintBuilder {
        &self.builder
    }

    /// Returns the lifecycle hook.
    pub fn hook(&self) -> &LifecycleHook {
        &self.hook
    }

    /// Resolves an entity declaration against the configuration.
    pub fn resolve(&self, declaration: &EntityDeclaration) -> Result<EntityScope, ConfigError> {
        declaration.resolve(&self.config)
    }

    /// Resolves a statically declared entity.
    pub fn entity<E: ScopedEntity>(&self) -> Result<EntityScope, ConfigError> {
        self.resolve(&E::declaration())
    }

    /// Opens a repository for `entity` scoped by `ctx`.
    pub fn repository<'a, S>(
        &'a self,
        storage: &'a S,
        entity: EntityScope,
        ctx: &'a TenantContext,
    ) -> ScopedRepository<'a, S>
    where
        S: RecordStorage + AssociationStorage,
    {
        ScopedRepository::new(storage, self, entity, ctx)
    }
}
