//! Tagged tenant constraints.

use std::fmt;

use crate::config::MorphRelationConfig;
use crate::query::{SqlFragment, SqlParam};
use crate::tenant::{TenantKey, TenantValue};

/// What a tenant constraint restricts.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TagScope {
    /// A scope key column on the entity's table.
    Column(TenantKey),
    /// The entity's association table membership.
    Membership,
}

/// Identifies a constraint injected by the constraint builder.
///
/// Tags are compared for equality only; at most one constraint per tag is
/// present on a query.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ConstraintTag {
    table: String,
    scope: TagScope,
}

impl ConstraintTag {
    /// Tag for a scope key column constraint.
    pub fn column(table: impl Into<String>, key: TenantKey) -> Self {
        Self {
            table: table.into(),
            scope: TagScope::Column(key),
        }
    }

    /// Tag for an association membership constraint.
    pub fn membership(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            scope: TagScope::Membership,
        }
    }

    /// The constrained table.
    pub fn table(&self) -> &str {
        &self.table
    }

    /// What the constraint restricts.
    pub fn scope(&self) -> &TagScope {
        &self.scope
    }
}

impl fmt::Display for ConstraintTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.scope {
            TagScope::Column(key) => write!(f, "{}:{}", self.table, key),
            TagScope::Membership => write!(f, "{}:membership", self.table),
        }
    }
}

/// The predicate a tenant constraint renders to.
#[derive(Debug, Clone, PartialEq)]
pub enum ConstraintKind {
    /// `column = id`, `column IN (ids)`, optionally `OR column IS NULL`.
    Column {
        /// Column reference, qualified when configured.
        column: String,
        /// Active identifiers for the key.
        values: Vec<TenantValue>,
        /// Also admit rows with no tenant.
        include_null: bool,
    },

    /// `owner_key IN (SELECT entity_id FROM associations WHERE ...)`.
    Membership {
        /// Owning record's key column reference.
        owner_key: String,
        /// Association table layout.
        relation: MorphRelationConfig,
        /// Value of the association type column.
        morph_type: String,
        /// Active identifiers across the entity's keys.
        tenants: Vec<TenantValue>,
    },
}

/// A tagged predicate restricting rows to the active tenants.
#[derive(Debug, Clone, PartialEq)]
pub struct TenantConstraint {
    tag: ConstraintTag,
    kind: ConstraintKind,
}

impl TenantConstraint {
    /// Creates a constraint.
    pub fn new(tag: ConstraintTag, kind: ConstraintKind) -> Self {
        Self { tag, kind }
    }

    /// The constraint's tag.
    pub fn tag(&self) -> &ConstraintTag {
        &self.tag
    }

    /// The constraint's predicate.
    pub fn kind(&self) -> &ConstraintKind {
        &self.kind
    }

    /// Renders the constraint.
    pub fn to_sql(&self) -> SqlFragment {
        match &self.kind {
            ConstraintKind::Column {
                column,
                values,
                include_null,
            } => {
                let matched = match values.as_slice() {
                    [single] => {
                        SqlFragment::with_params(format!("{} = ?", column), vec![single.into()])
                    }
                    many => SqlFragment::in_list(column, many.iter().map(SqlParam::from).collect()),
                };
                if *include_null {
                    matched.or(SqlFragment::new(format!("{} IS NULL", column)))
                } else {
                    matched
                }
            }
            ConstraintKind::Membership {
                owner_key,
                relation,
                morph_type,
                tenants,
            } => {
                let table = &relation.table;
                let tenant_column = format!("{}.{}", table, relation.tenant_id_column);
                let members =
                    SqlFragment::in_list(&tenant_column, tenants.iter().map(SqlParam::from).collect());

                let mut sql = format!(
                    "{} IN (SELECT {}.{} FROM {} WHERE {}.{} = ? AND {}",
                    owner_key,
                    table,
                    relation.entity_id_column,
                    table,
                    table,
                    relation.entity_type_column,
                    members.sql
                );
                if let Some(deleted) = &relation.soft_delete_column {
                    sql.push_str(&format!(" AND {}.{} IS NULL", table, deleted));
                }
                sql.push(')');

                let mut params = vec![SqlParam::string(morph_type.clone())];
                params.extend(members.params);
                SqlFragment::with_params(sql, params)
            }
        }
    }
}
