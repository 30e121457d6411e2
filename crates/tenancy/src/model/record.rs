//! Records read from or about to be written to storage.

use serde_json::{Map, Value};

/// A row as a map of column name to JSON value.
///
/// Records carry a `tenant_scoped` flag, on by default. Clearing it with
/// [`without_tenant_scope`](Record::without_tenant_scope) removes the creation
/// hook's effect for this one instance, e.g. for an administrative insert that
/// must not be stamped or associated with the current tenants.
///
/// # Examples
///
/// ```
/// use helios_tenancy::model::Record;
/// use serde_json::json;
///
/// let record = Record::new().with("title", "Hello").with("company_id", 7);
/// assert_eq!(record.get("company_id"), Some(&json!(7)));
/// assert!(record.is_set("title"));
/// assert!(!record.is_set("body"));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    fields: Map<String, Value>,
    tenant_scoped: bool,
}

impl Record {
    /// Creates an empty record.
    pub fn new() -> Self {
        Self {
            fields: Map::new(),
            tenant_scoped: true,
        }
    }

    /// Creates a record from a JSON object; other values yield an empty record.
    pub fn from_json(value: Value) -> Self {
        match value {
            Value::Object(fields) => Self::from(fields),
            _ => Self::new(),
        }
    }

    /// Sets a field, builder style.
    pub fn with(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(field, value);
        self
    }

    /// Sets a field.
    pub fn set(&mut self, field: impl Into<String>, value: impl Into<Value>) {
        self.fields.insert(field.into(), value.into());
    }

    /// Returns a field value.
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    /// Removes a field.
    pub fn remove(&mut self, field: &str) -> Option<Value> {
        self.fields.remove(field)
    }

    /// Returns `true` if the field is present and not null.
    pub fn is_set(&self, field: &str) -> bool {
        self.fields.get(field).is_some_and(|v| !v.is_null())
    }

    /// Returns the fields.
    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    /// Returns the record as a JSON object.
    pub fn to_json(&self) -> Value {
        Value::Object(self.fields.clone())
    }

    /// Opts this instance out of creation-time tenant stamping.
    pub fn without_tenant_scope(mut self) -> Self {
        self.tenant_scoped = false;
        self
    }

    /// Returns `true` if the lifecycle hook applies to this instance.
    pub fn is_tenant_scoped(&self) -> bool {
        self.tenant_scoped
    }
}

impl Default for Record {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Map<String, Value>> for Record {
    fn from(fields: Map<String, Value>) -> Self {
        Self {
            fields,
            tenant_scoped: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_set_and_get() {
        let mut record = Record::new();
        record.set("title", "Hello");
        assert_eq!(record.get("title"), Some(&json!("Hello")));
        assert_eq!(record.remove("title"), Some(json!("Hello")));
        assert!(record.get("title").is_none());
    }

    #[test]
    fn test_null_is_not_set() {
        let record = Record::new().with("company_id", Value::Null);
        assert!(record.get("company_id").is_some());
        assert!(!record.is_set("company_id"));
    }

    #[test]
    fn test_from_json() {
        let record = Record::from_json(json!({"id": 1, "title": "x"}));
        assert_eq!(record.fields().len(), 2);
        assert_eq!(record.to_json(), json!({"id": 1, "title": "x"}));
        assert!(Record::from_json(json!([1, 2])).fields().is_empty());
    }

    #[test]
    fn test_without_tenant_scope() {
        let record = Record::new();
        assert!(record.is_tenant_scoped());
        assert!(!record.without_tenant_scope().is_tenant_scoped());
    }
}
