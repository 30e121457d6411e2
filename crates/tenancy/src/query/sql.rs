//! SQL fragments with bound parameters.
//!
//! Placeholders are anonymous (`?`), so fragments can be concatenated in any
//! order as long as their parameter lists are concatenated the same way.

use serde_json::Value;

use crate::tenant::TenantValue;

/// A fragment of SQL with bound parameters.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SqlFragment {
    /// The SQL clause.
    pub sql: String,
    /// Bound parameter values.
    pub params: Vec<SqlParam>,
}

/// A bound SQL parameter.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlParam {
    /// String parameter.
    String(String),
    /// Integer parameter.
    Integer(i64),
    /// Float parameter.
    Float(f64),
    /// Null parameter.
    Null,
}

impl SqlParam {
    /// Creates a string parameter.
    pub fn string(s: impl Into<String>) -> Self {
        SqlParam::String(s.into())
    }

    /// Creates an integer parameter.
    pub fn integer(i: i64) -> Self {
        SqlParam::Integer(i)
    }

    /// Converts a JSON value. Booleans become 0/1; arrays and objects are
    /// stored as their JSON text.
    pub fn from_json(value: &Value) -> Self {
        match value {
            Value::Null => SqlParam::Null,
            Value::Bool(b) => SqlParam::Integer(i64::from(*b)),
            Value::Number(n) => match n.as_i64() {
                Some(i) => SqlParam::Integer(i),
                None => n.as_f64().map(SqlParam::Float).unwrap_or(SqlParam::Null),
            },
            Value::String(s) => SqlParam::String(s.clone()),
            other => SqlParam::String(other.to_string()),
        }
    }
}

impl From<&TenantValue> for SqlParam {
    fn from(value: &TenantValue) -> Self {
        match value {
            TenantValue::Integer(i) => SqlParam::Integer(*i),
            TenantValue::Text(s) => SqlParam::String(s.clone()),
        }
    }
}

impl SqlFragment {
    /// Creates a new SQL fragment.
    pub fn new(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            params: Vec::new(),
        }
    }

    /// Creates a fragment with parameters.
    pub fn with_params(sql: impl Into<String>, params: Vec<SqlParam>) -> Self {
        Self {
            sql: sql.into(),
            params,
        }
    }

    /// Combines with another fragment using OR.
    pub fn or(mut self, other: SqlFragment) -> Self {
        if !self.sql.is_empty() && !other.sql.is_empty() {
            self.sql = format!("({}) OR ({})", self.sql, other.sql);
        } else if !other.sql.is_empty() {
            self.sql = other.sql;
        }
        self.params.extend(other.params);
        self
    }

    /// Renders `column IN (?, ...)`. An empty list renders as a false
    /// condition rather than the invalid `IN ()`.
    pub fn in_list(column: &str, params: Vec<SqlParam>) -> Self {
        if params.is_empty() {
            return SqlFragment::new("0 = 1");
        }
        let placeholders = vec!["?"; params.len()].join(", ");
        SqlFragment::with_params(format!("{} IN ({})", column, placeholders), params)
    }
}
