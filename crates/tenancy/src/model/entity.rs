//! Scoped entity declarations.
//!
//! An entity author describes a table with an [`EntityDeclaration`]; the engine
//! merges it with the [`TenancyConfig`] exactly once into an [`EntityScope`],
//! which carries everything the constraint builder and lifecycle hook need.

use crate::config::{MorphRelationOverrides, RelationKind, TenancyConfig, validate_identifier};
use crate::error::ConfigError;
use crate::scope::{
    BelongsToManyTenants, BelongsToOneTenant, RelationshipStrategy, TenantRelation,
};
use crate::tenant::TenantKey;

/// How an entity participates in tenant scoping, before defaults are applied.
///
/// # Examples
///
/// ```
/// use helios_tenancy::config::{RelationKind, TenancyConfig};
/// use helios_tenancy::model::EntityDeclaration;
///
/// let config = TenancyConfig::default();
///
/// let invoices = EntityDeclaration::new("invoices").resolve(&config).unwrap();
/// assert_eq!(invoices.tenant_columns()[0].as_str(), "company_id");
/// assert_eq!(invoices.relation_kind(), RelationKind::One);
///
/// let posts = EntityDeclaration::new("posts")
///     .tenant_columns(["tenant_id"])
///     .belongs_to_many()
///     .resolve(&config)
///     .unwrap();
/// assert_eq!(posts.relation_kind(), RelationKind::Many);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntityDeclaration {
    table: String,
    primary_key: Option<String>,
    morph_type: Option<String>,
    tenant_columns: Option<Vec<String>>,
    relation: Option<RelationKind>,
    morph_relation: MorphRelationOverrides,
}

impl EntityDeclaration {
    /// Declares a scoped entity stored in `table`.
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            ..Default::default()
        }
    }

    /// Overrides the primary key column (default `id`).
    pub fn primary_key(mut self, column: impl Into<String>) -> Self {
        self.primary_key = Some(column.into());
        self
    }

    /// Overrides the type recorded in association rows (default: the table name).
    pub fn morph_type(mut self, morph_type: impl Into<String>) -> Self {
        self.morph_type = Some(morph_type.into());
        self
    }

    /// Declares the scope keys for this entity instead of the configured default.
    pub fn tenant_columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tenant_columns = Some(columns.into_iter().map(Into::into).collect());
        self
    }

    /// Relates records to tenants through scope key columns.
    pub fn belongs_to_one(mut self) -> Self {
        self.relation = Some(RelationKind::One);
        self
    }

    /// Relates records to tenants through the association table.
    pub fn belongs_to_many(mut self) -> Self {
        self.relation = Some(RelationKind::Many);
        self
    }

    /// Overrides parts of the association table layout.
    pub fn morph_relation(mut self, overrides: MorphRelationOverrides) -> Self {
        self.morph_relation = overrides;
        self
    }

    /// Returns the declared table.
    pub fn table(&self) -> &str {
        &self.table
    }

    /// Merges this declaration with the configuration.
    pub fn resolve(&self, config: &TenancyConfig) -> Result<EntityScope, ConfigError> {
        validate_identifier("table", &self.table)?;

        let primary_key = self.primary_key.clone().unwrap_or_else(|| "id".to_string());
        validate_identifier("primary_key", &primary_key)?;

        let tenant_columns = self
            .tenant_columns
            .as_ref()
            .unwrap_or(&config.default_tenant_columns);
        for column in tenant_columns {
            validate_identifier("tenant_columns", column)?;
        }

        let relation = match self.relation.unwrap_or(config.default_relation) {
            RelationKind::One => TenantRelation::One(BelongsToOneTenant),
            RelationKind::Many => {
                let morph = config.morph_relation.merged(&self.morph_relation);
                morph.validate()?;
                TenantRelation::Many(BelongsToManyTenants::new(morph))
            }
        };

        Ok(EntityScope {
            morph_type: self.morph_type.clone().unwrap_or_else(|| self.table.clone()),
            table: self.table.clone(),
            primary_key,
            tenant_columns: tenant_columns.iter().map(TenantKey::from).collect(),
            relation,
            qualify: config.query_with_table_name,
        })
    }
}

/// A statically declared scoped entity.
///
/// ```
/// use helios_tenancy::model::{EntityDeclaration, ScopedEntity};
///
/// struct Invoice;
///
/// impl ScopedEntity for Invoice {
///     fn declaration() -> EntityDeclaration {
///         EntityDeclaration::new("invoices").tenant_columns(["company_id"])
///     }
/// }
/// ```
pub trait ScopedEntity {
    /// Describes the entity's table and tenancy.
    fn declaration() -> EntityDeclaration;
}

/// A resolved entity: declaration merged with configuration.
#[derive(Debug, Clone)]
pub struct EntityScope {
    table: String,
    primary_key: String,
    morph_type: String,
    tenant_columns: Vec<TenantKey>,
    relation: TenantRelation,
    qualify: bool,
}

impl EntityScope {
    /// The entity's table.
    pub fn table(&self) -> &str {
        &self.table
    }

    /// The entity's primary key column.
    pub fn primary_key(&self) -> &str {
        &self.primary_key
    }

    /// The type recorded in association rows.
    pub fn morph_type(&self) -> &str {
        &self.morph_type
    }

    /// The scope keys this entity is constrained by.
    pub fn tenant_columns(&self) -> &[TenantKey] {
        &self.tenant_columns
    }

    /// The entity's relationship strategy.
    pub fn relation(&self) -> &TenantRelation {
        &self.relation
    }

    /// The entity's relationship kind.
    pub fn relation_kind(&self) -> RelationKind {
        self.relation.kind()
    }

    /// Returns `true` if `key` is one of the entity's scope keys.
    pub fn declares(&self, key: &str) -> bool {
        self.tenant_columns.iter().any(|c| c.as_str() == key)
    }

    /// Returns the column reference used in queries, qualified with the table
    /// name when configured.
    pub fn column(&self, column: &str) -> String {
        if self.qualify {
            format!("{}.{}", self.table, column)
        } else {
            column.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MorphRelationConfig;

    #[test]
    fn test_resolve_defaults() {
        let config = TenancyConfig::default();
        let entity = EntityDeclaration::new("invoices").resolve(&config).unwrap();

        assert_eq!(entity.table(), "invoices");
        assert_eq!(entity.primary_key(), "id");
        assert_eq!(entity.morph_type(), "invoices");
        assert_eq!(entity.tenant_columns(), &[TenantKey::new("company_id")]);
        assert_eq!(entity.relation_kind(), RelationKind::One);
        assert_eq!(entity.column("company_id"), "invoices.company_id");
    }

    #[test]
    fn test_resolve_overrides() {
        let config = TenancyConfig::default().with_relation(RelationKind::Many);
        let entity = EntityDeclaration::new("posts")
            .primary_key("post_id")
            .morph_type("App\\Post")
            .tenant_columns(["tenant_id"])
            .morph_relation(MorphRelationOverrides {
                table: Some("post_tenants".to_string()),
                ..Default::default()
            })
            .resolve(&config)
            .unwrap();

        assert_eq!(entity.primary_key(), "post_id");
        assert_eq!(entity.morph_type(), "App\\Post");
        assert!(entity.declares("tenant_id"));
        assert!(!entity.declares("company_id"));
        match entity.relation() {
            TenantRelation::Many(many) => assert_eq!(many.relation().table, "post_tenants"),
            TenantRelation::One(_) => panic!("expected many-tenant relation"),
        }
    }

    #[test]
    fn test_resolve_explicit_one_over_many_default() {
        let config = TenancyConfig::default().with_relation(RelationKind::Many);
        let entity = EntityDeclaration::new("invoices")
            .belongs_to_one()
            .resolve(&config)
            .unwrap();
        assert_eq!(entity.relation_kind(), RelationKind::One);
    }

    #[test]
    fn test_unqualified_columns() {
        let config = TenancyConfig::default().with_table_name(false);
        let entity = EntityDeclaration::new("invoices").resolve(&config).unwrap();
        assert_eq!(entity.column("company_id"), "company_id");
    }

    #[test]
    fn test_resolve_rejects_bad_names() {
        let config = TenancyConfig::default();
        assert!(EntityDeclaration::new("bad table").resolve(&config).is_err());
        assert!(
            EntityDeclaration::new("posts")
                .tenant_columns(["x--"])
                .resolve(&config)
                .is_err()
        );

        let config = TenancyConfig::default().with_morph_relation(MorphRelationConfig {
            table: "a.b".to_string(),
            ..Default::default()
        });
        assert!(
            EntityDeclaration::new("posts")
                .belongs_to_many()
                .resolve(&config)
                .is_err()
        );
    }
}
