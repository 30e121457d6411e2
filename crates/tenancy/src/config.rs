//! Tenancy configuration.
//!
//! [`TenancyConfig`] is resolved once and shared by the engine. Entity-level
//! overrides are merged into it when an entity is resolved, never looked up
//! per call.
//!
//! # Example
//!
//! ```
//! use helios_tenancy::config::{MissingTenantPolicy, RelationKind, TenancyConfig};
//!
//! let config = TenancyConfig::from_json_str(r#"{
//!     "default_tenant_columns": ["company_id"],
//!     "default_relation": "many",
//!     "missing_tenant": "reject",
//!     "morph_relation": { "table": "company_links" }
//! }"#).unwrap();
//!
//! assert_eq!(config.default_relation, RelationKind::Many);
//! assert_eq!(config.missing_tenant, MissingTenantPolicy::Reject);
//! assert_eq!(config.morph_relation.table, "company_links");
//! assert_eq!(config.morph_relation.tenant_id_column, "tenant_id");
//! ```

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

static IDENTIFIER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("identifier pattern is valid")
});

/// Returns `true` if `name` can be embedded in SQL as a bare identifier.
pub fn is_valid_identifier(name: &str) -> bool {
    name.len() <= 128 && IDENTIFIER.is_match(name)
}

/// Validates a table or column name.
pub(crate) fn validate_identifier(field: &str, value: &str) -> Result<(), ConfigError> {
    if is_valid_identifier(value) {
        Ok(())
    } else {
        Err(ConfigError::InvalidIdentifier {
            field: field.to_string(),
            value: value.to_string(),
        })
    }
}

/// How records relate to their tenants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RelationKind {
    /// Each record carries one foreign-key column per scope key.
    #[default]
    One,

    /// Records are linked to tenants through an association table.
    Many,
}

impl fmt::Display for RelationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RelationKind::One => write!(f, "one"),
            RelationKind::Many => write!(f, "many"),
        }
    }
}

/// What to do when an entity declares a scope key that the context lacks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum MissingTenantPolicy {
    /// Leave the key unconstrained.
    #[default]
    Skip,

    /// Fail with `TenantError::ColumnUnknown` while scoping is enabled.
    Reject,
}

/// Association table layout for many-tenant entities.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MorphRelationConfig {
    /// Association table name.
    #[serde(default = "default_morph_table")]
    pub table: String,

    /// Column holding the tenant identifier.
    #[serde(default = "default_tenant_id_column")]
    pub tenant_id_column: String,

    /// Column holding the owning record's key.
    #[serde(default = "default_entity_id_column")]
    pub entity_id_column: String,

    /// Column holding the owning record's type.
    #[serde(default = "default_entity_type_column")]
    pub entity_type_column: String,

    /// Soft-delete timestamp column. Rows with a value here are ignored.
    ///
    /// When `None`, detached associations are deleted outright.
    #[serde(default = "default_soft_delete_column")]
    pub soft_delete_column: Option<String>,

    /// Timestamp column set when an association is attached.
    ///
    /// When `None`, no timestamp is written.
    #[serde(default = "default_created_at_column")]
    pub created_at_column: Option<String>,
}

fn default_morph_table() -> String {
    "tenantables".to_string()
}

fn default_tenant_id_column() -> String {
    "tenant_id".to_string()
}

fn default_entity_id_column() -> String {
    "tenantable_id".to_string()
}

fn default_entity_type_column() -> String {
    "tenantable_type".to_string()
}

fn default_soft_delete_column() -> Option<String> {
    Some("deleted_at".to_string())
}

fn default_created_at_column() -> Option<String> {
    Some("created_at".to_string())
}

impl Default for MorphRelationConfig {
    fn default() -> Self {
        Self {
            table: default_morph_table(),
            tenant_id_column: default_tenant_id_column(),
            entity_id_column: default_entity_id_column(),
            entity_type_column: default_entity_type_column(),
            soft_delete_column: default_soft_delete_column(),
            created_at_column: default_created_at_column(),
        }
    }
}

impl MorphRelationConfig {
    /// Returns a copy with the non-empty overrides applied.
    pub fn merged(&self, overrides: &MorphRelationOverrides) -> Self {
        fn pick(base: &str, value: &Option<String>) -> String {
            match value {
                Some(v) if !v.is_empty() => v.clone(),
                _ => base.to_string(),
            }
        }

        // An empty override turns an optional column off
        fn pick_optional(base: &Option<String>, value: &Option<String>) -> Option<String> {
            match value {
                Some(v) if v.is_empty() => None,
                Some(v) => Some(v.clone()),
                None => base.clone(),
            }
        }

        Self {
            table: pick(&self.table, &overrides.table),
            tenant_id_column: pick(&self.tenant_id_column, &overrides.tenant_id_column),
            entity_id_column: pick(&self.entity_id_column, &overrides.entity_id_column),
            entity_type_column: pick(&self.entity_type_column, &overrides.entity_type_column),
            soft_delete_column: pick_optional(
                &self.soft_delete_column,
                &overrides.soft_delete_column,
            ),
            created_at_column: pick_optional(
                &self.created_at_column,
                &overrides.created_at_column,
            ),
        }
    }

    /// Validates every table and column name.
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_identifier("morph_relation.table", &self.table)?;
        validate_identifier("morph_relation.tenant_id_column", &self.tenant_id_column)?;
        validate_identifier("morph_relation.entity_id_column", &self.entity_id_column)?;
        validate_identifier("morph_relation.entity_type_column", &self.entity_type_column)?;
        if let Some(column) = &self.soft_delete_column {
            validate_identifier("morph_relation.soft_delete_column", column)?;
        }
        if let Some(column) = &self.created_at_column {
            validate_identifier("morph_relation.created_at_column", column)?;
        }
        Ok(())
    }
}

/// Per-entity overrides of [`MorphRelationConfig`].
///
/// Empty strings count as unset, except for `soft_delete_column` and
/// `created_at_column` where an empty string turns the column off.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MorphRelationOverrides {
    /// Association table name.
    #[serde(default)]
    pub table: Option<String>,
    /// Tenant identifier column.
    #[serde(default)]
    pub tenant_id_column: Option<String>,
    /// Owning record key column.
    #[serde(default)]
    pub entity_id_column: Option<String>,
    /// Owning record type column.
    #[serde(default)]
    pub entity_type_column: Option<String>,
    /// Soft-delete column.
    #[serde(default)]
    pub soft_delete_column: Option<String>,
    /// Attach timestamp column.
    #[serde(default)]
    pub created_at_column: Option<String>,
}

/// Configuration for tenant scoping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TenancyConfig {
    /// Scope keys applied to entities that do not declare their own.
    #[serde(default = "default_tenant_columns")]
    pub default_tenant_columns: Vec<String>,

    /// Relationship used by entities that do not declare one.
    #[serde(default)]
    pub default_relation: RelationKind,

    /// Whether constraint columns are qualified with the table name.
    ///
    /// Disable for stores without table-qualified column references.
    #[serde(default = "default_true")]
    pub query_with_table_name: bool,

    /// Handling of declared scope keys missing from the context.
    #[serde(default)]
    pub missing_tenant: MissingTenantPolicy,

    /// Default association table layout for many-tenant entities.
    #[serde(default)]
    pub morph_relation: MorphRelationConfig,
}

fn default_tenant_columns() -> Vec<String> {
    vec!["company_id".to_string()]
}

fn default_true() -> bool {
    true
}

impl Default for TenancyConfig {
    fn default() -> Self {
        Self {
            default_tenant_columns: default_tenant_columns(),
            default_relation: RelationKind::default(),
            query_with_table_name: true,
            missing_tenant: MissingTenantPolicy::default(),
            morph_relation: MorphRelationConfig::default(),
        }
    }
}

impl TenancyConfig {
    /// Creates a new configuration with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses and validates a JSON configuration document.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json).map_err(|e| ConfigError::Parse {
            message: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Sets the default scope keys.
    pub fn with_tenant_columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.default_tenant_columns = columns.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the default relationship.
    pub fn with_relation(mut self, relation: RelationKind) -> Self {
        self.default_relation = relation;
        self
    }

    /// Sets the missing-tenant policy.
    pub fn with_missing_tenant(mut self, policy: MissingTenantPolicy) -> Self {
        self.missing_tenant = policy;
        self
    }

    /// Enables or disables table-qualified constraint columns.
    pub fn with_table_name(mut self, qualify: bool) -> Self {
        self.query_with_table_name = qualify;
        self
    }

    /// Sets the default association table layout.
    pub fn with_morph_relation(mut self, relation: MorphRelationConfig) -> Self {
        self.morph_relation = relation;
        self
    }

    /// Returns `true` in strict mode.
    pub fn is_strict(&self) -> bool {
        self.missing_tenant == MissingTenantPolicy::Reject
    }

    /// Validates every identifier in the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for column in &self.default_tenant_columns {
            validate_identifier("default_tenant_columns", column)?;
        }
        self.morph_relation.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tenancy_config_default() {
        let config = TenancyConfig::default();
        assert_eq!(config.default_tenant_columns, vec!["company_id"]);
        assert_eq!(config.default_relation, RelationKind::One);
        assert!(config.query_with_table_name);
        assert!(!config.is_strict());
        assert_eq!(config.morph_relation.table, "tenantables");
        assert_eq!(
            config.morph_relation.soft_delete_column.as_deref(),
            Some("deleted_at")
        );
    }

    #[test]
    fn test_from_empty_json_uses_defaults() {
        let config = TenancyConfig::from_json_str("{}").unwrap();
        assert_eq!(config, TenancyConfig::default());
    }

    #[test]
    fn test_from_json_invalid_document() {
        let err = TenancyConfig::from_json_str("{").unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn test_from_json_rejects_bad_identifier() {
        let err =
            TenancyConfig::from_json_str(r#"{"default_tenant_columns": ["id; DROP TABLE x"]}"#)
                .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidIdentifier { .. }));
    }

    #[test]
    fn test_builder_methods() {
        let config = TenancyConfig::new()
            .with_tenant_columns(["account_id", "region_id"])
            .with_relation(RelationKind::Many)
            .with_missing_tenant(MissingTenantPolicy::Reject)
            .with_table_name(false);
        assert_eq!(config.default_tenant_columns.len(), 2);
        assert_eq!(config.default_relation, RelationKind::Many);
        assert!(config.is_strict());
        assert!(!config.query_with_table_name);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_morph_relation_merge() {
        let base = MorphRelationConfig::default();
        let overrides = MorphRelationOverrides {
            table: Some("post_tenants".to_string()),
            tenant_id_column: Some(String::new()),
            soft_delete_column: Some(String::new()),
            ..Default::default()
        };

        let merged = base.merged(&overrides);
        assert_eq!(merged.table, "post_tenants");
        assert_eq!(merged.tenant_id_column, "tenant_id");
        assert_eq!(merged.entity_id_column, "tenantable_id");
        assert_eq!(merged.soft_delete_column, None);
        assert_eq!(merged.created_at_column.as_deref(), Some("created_at"));
    }

    #[test]
    fn test_created_at_column_override() {
        let base = MorphRelationConfig::default();
        let off = base.merged(&MorphRelationOverrides {
            created_at_column: Some(String::new()),
            ..Default::default()
        });
        assert_eq!(off.created_at_column, None);

        let renamed = base.merged(&MorphRelationOverrides {
            created_at_column: Some("linked_at".to_string()),
            ..Default::default()
        });
        assert_eq!(renamed.created_at_column.as_deref(), Some("linked_at"));

        let invalid = MorphRelationConfig {
            created_at_column: Some("linked at".to_string()),
            ..Default::default()
        };
        assert!(invalid.validate().is_err());
    }

    #[test]
    fn test_identifier_validation() {
        assert!(is_valid_identifier("company_id"));
        assert!(is_valid_identifier("_x1"));
        assert!(!is_valid_identifier("1abc"));
        assert!(!is_valid_identifier("posts.company_id"));
        assert!(!is_valid_identifier(""));
        assert!(!is_valid_identifier("a b"));
    }

    #[test]
    fn test_relation_kind_display() {
        assert_eq!(RelationKind::One.to_string(), "one");
        assert_eq!(RelationKind::Many.to_string(), "many");
    }
}
