//! User-authored query predicates.

use serde_json::Value;

use super::sql::{SqlFragment, SqlParam};

/// A predicate added by the caller.
///
/// Column names are embedded verbatim and must come from trusted code; only
/// values are bound as parameters.
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    /// `column = value`, or `column IS NULL` for a null value.
    Eq { column: String, value: Value },

    /// `column IN (values...)`.
    In { column: String, values: Vec<Value> },

    /// `column IS NULL`.
    IsNull { column: String },

    /// A raw SQL fragment.
    Raw(SqlFragment),
}

impl Predicate {
    /// Creates an equality predicate.
    pub fn eq(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Predicate::Eq {
            column: column.into(),
            value: value.into(),
        }
    }

    /// Creates a membership predicate.
    pub fn is_in<I, V>(column: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Predicate::In {
            column: column.into(),
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    /// Creates a null test.
    pub fn is_null(column: impl Into<String>) -> Self {
        Predicate::IsNull {
            column: column.into(),
        }
    }

    /// Renders the predicate.
    pub fn to_sql(&self) -> SqlFragment {
        match self {
            Predicate::Eq { column, value } if value.is_null() => {
                SqlFragment::new(format!("{} IS NULL", column))
            }
            Predicate::Eq { column, value } => SqlFragment::with_params(
                format!("{} = ?", column),
                vec![SqlParam::from_json(value)],
            ),
            Predicate::In { column, values } => {
                SqlFragment::in_list(column, values.iter().map(SqlParam::from_json).collect())
            }
            Predicate::IsNull { column } => SqlFragment::new(format!("{} IS NULL", column)),
            Predicate::Raw(fragment) => fragment.clone(),
        }
    }
}
