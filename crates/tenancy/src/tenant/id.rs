//! Scope keys and tenant identifiers.
//!
//! A [`TenantKey`] names a tenancy dimension (usually the foreign-key column,
//! e.g. `company_id`). A [`TenantValue`] is one concrete tenant identifier for
//! that dimension. Identifiers are validated on the way in: the engine never
//! scopes by a null identifier.

use std::borrow::Borrow;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::TenantError;

/// The logical name of a tenancy dimension.
///
/// # Examples
///
/// ```
/// use helios_tenancy::tenant::TenantKey;
///
/// let key = TenantKey::new("company_id");
/// assert_eq!(key.as_str(), "company_id");
/// ```
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TenantKey(String);

impl TenantKey {
    /// Creates a new scope key.
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Returns the key as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for TenantKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TenantKey({:?})", self.0)
    }
}

impl fmt::Display for TenantKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for TenantKey {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for TenantKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<&str> for TenantKey {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for TenantKey {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&String> for TenantKey {
    fn from(s: &String) -> Self {
        Self(s.clone())
    }
}

impl From<&TenantKey> for TenantKey {
    fn from(key: &TenantKey) -> Self {
        key.clone()
    }
}

/// A validated, non-null tenant identifier.
///
/// Identifiers are opaque scalars: integer primary keys or string keys.
/// Conversion from JSON rejects `null` with [`TenantError::NullIdentifier`].
///
/// # Examples
///
/// ```
/// use helios_tenancy::tenant::{TenantKey, TenantValue};
/// use serde_json::json;
///
/// let key = TenantKey::new("company_id");
/// assert_eq!(TenantValue::from_json(&key, &json!(5)).unwrap(), TenantValue::Integer(5));
/// assert!(TenantValue::from_json(&key, &json!(null)).is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TenantValue {
    /// Integer identifier.
    Integer(i64),
    /// String identifier.
    Text(String),
}

impl TenantValue {
    /// Validates a JSON value as an identifier for the given scope key.
    pub fn from_json(key: &TenantKey, value: &Value) -> Result<Self, TenantError> {
        match value {
            Value::Null => Err(TenantError::NullIdentifier {
                column: key.clone(),
            }),
            Value::Number(n) => n.as_i64().map(TenantValue::Integer).ok_or_else(|| {
                TenantError::UnsupportedIdentifier {
                    column: key.clone(),
                    kind: format!("number {}", n),
                }
            }),
            Value::String(s) => Ok(TenantValue::Text(s.clone())),
            Value::Bool(_) => Err(unsupported(key, "boolean")),
            Value::Array(_) => Err(unsupported(key, "array")),
            Value::Object(_) => Err(unsupported(key, "object")),
        }
    }

    /// Returns the identifier as a JSON value.
    pub fn to_json(&self) -> Value {
        match self {
            TenantValue::Integer(i) => Value::from(*i),
            TenantValue::Text(s) => Value::String(s.clone()),
        }
    }
}

fn unsupported(key: &TenantKey, kind: &str) -> TenantError {
    TenantError::UnsupportedIdentifier {
        column: key.clone(),
        kind: kind.to_string(),
    }
}

impl fmt::Display for TenantValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TenantValue::Integer(i) => write!(f, "{}", i),
            TenantValue::Text(s) => write!(f, "{:?}", s),
        }
    }
}

impl From<i64> for TenantValue {
    fn from(i: i64) -> Self {
        TenantValue::Integer(i)
    }
}

impl From<i32> for TenantValue {
    fn from(i: i32) -> Self {
        TenantValue::Integer(i64::from(i))
    }
}

impl From<u32> for TenantValue {
    fn from(i: u32) -> Self {
        TenantValue::Integer(i64::from(i))
    }
}

impl From<&str> for TenantValue {
    fn from(s: &str) -> Self {
        TenantValue::Text(s.to_string())
    }
}

impl From<String> for TenantValue {
    fn from(s: String) -> Self {
        TenantValue::Text(s)
    }
}

impl From<uuid::Uuid> for TenantValue {
    fn from(id: uuid::Uuid) -> Self {
        TenantValue::Text(id.to_string())
    }
}

/// The identifiers registered under one scope key. Never empty inside a context.
pub type TenantIds = BTreeSet<TenantValue>;

/// Scope key to identifiers mapping.
pub type TenantMap = BTreeMap<TenantKey, TenantIds>;

/// Renders a tenant map for error messages and log fields.
pub(crate) fn describe_tenants(tenants: &TenantMap) -> String {
    let entries: Vec<String> = tenants
        .iter()
        .map(|(key, ids)| {
            let ids: Vec<String> = ids.iter().map(ToString::to_string).collect();
            format!("{}: [{}]", key, ids.join(", "))
        })
        .collect();
    format!("{{{}}}", entries.join(", "))
}

/// A record that can itself act as a tenant.
///
/// Registering a tenant source uses its foreign key name as the scope key and
/// its primary key as the identifier, e.g. a company with id 3 registers
/// `company_id => 3`.
pub trait TenantSource {
    /// The scope key other tables use to reference this tenant.
    fn foreign_key(&self) -> TenantKey;

    /// The tenant's own key value.
    fn key_value(&self) -> Value;
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_tenant_key_display() {
        let key = TenantKey::new("company_id");
        assert_eq!(key.to_string(), "company_id");
        assert_eq!(TenantKey::from("company_id"), key);
    }

    #[test]
    fn test_from_json_integer_and_text() {
        let key = TenantKey::new("k");
        assert_eq!(
            TenantValue::from_json(&key, &json!(42)).unwrap(),
            TenantValue::Integer(42)
        );
        assert_eq!(
            TenantValue::from_json(&key, &json!("acme")).unwrap(),
            TenantValue::Text("acme".to_string())
        );
    }

    #[test]
    fn test_from_json_null_rejected() {
        let key = TenantKey::new("company_id");
        let err = TenantValue::from_json(&key, &Value::Null).unwrap_err();
        assert_eq!(err, TenantError::NullIdentifier { column: key });
    }

    #[test]
    fn test_from_json_unsupported() {
        let key = TenantKey::new("k");
        for value in [json!(true), json!(1.5), json!([1]), json!({"a": 1})] {
            assert!(matches!(
                TenantValue::from_json(&key, &value),
                Err(TenantError::UnsupportedIdentifier { .. })
            ));
        }
    }

    #[test]
    fn test_to_json() {
        assert_eq!(TenantValue::Integer(3).to_json(), json!(3));
        assert_eq!(TenantValue::from("x").to_json(), json!("x"));
    }

    #[test]
    fn test_describe_tenants() {
        let mut map = TenantMap::new();
        map.insert(
            TenantKey::new("tenant_id"),
            [TenantValue::Integer(2), TenantValue::Integer(1)]
                .into_iter()
                .collect(),
        );
        assert_eq!(describe_tenants(&map), "{tenant_id: [1, 2]}");
        assert_eq!(describe_tenants(&TenantMap::new()), "{}");
    }
}
