//! Error types for the tenancy layer.
//!
//! This module defines all error types used throughout the crate, following a
//! hierarchy that separates tenant context errors, lookup errors at the
//! entity-operation boundary, configuration errors, and backend errors.

// Error enum variant fields are self-documenting via their #[error(...)] messages
#![allow(missing_docs)]

use thiserror::Error;

use crate::tenant::TenantKey;

/// The primary error type for all tenancy operations.
#[derive(Error, Debug)]
pub enum TenancyError {
    /// Tenant context and scoping errors
    #[error(transparent)]
    Tenant(#[from] TenantError),

    /// Scoped lookup errors
    #[error(transparent)]
    Lookup(#[from] LookupError),

    /// Configuration errors
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Backend-specific errors
    #[error(transparent)]
    Backend(#[from] BackendError),
}

/// Errors raised by the tenant context and the constraint builder.
///
/// These indicate programmer or configuration mistakes and are never retried.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TenantError {
    /// A scope key was required but has no registered identifier.
    #[error("tenant column \"{column}\" not found in tenant scope {registered}")]
    ColumnUnknown {
        column: TenantKey,
        registered: String,
    },

    /// A null identifier was offered for a scope key.
    #[error("tenant identifier for \"{column}\" must not be null")]
    NullIdentifier { column: TenantKey },

    /// The identifier is not an integer or a string.
    #[error("tenant identifier for \"{column}\" must be an integer or a string, got {kind}")]
    UnsupportedIdentifier { column: TenantKey, kind: String },

    /// A single-tenant field cannot be stamped because several identifiers are active.
    #[error("cannot stamp \"{column}\": {count} tenant identifiers are active")]
    AmbiguousIdentifier { column: TenantKey, count: usize },

    /// A persisted record has no usable primary key for association rows.
    #[error("record in {table} has no usable value for key column \"{column}\"")]
    MissingEntityKey { table: String, column: String },
}

/// Errors raised by lookups at the entity-operation boundary.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LookupError {
    /// The record exists, but not for the tenants currently in scope.
    #[error("no query results for model [{model}] {id} when scoped by tenant {tenants}")]
    ModelNotFoundForTenant {
        model: String,
        id: String,
        tenants: String,
    },

    /// The record does not exist at all, even with tenant scope removed.
    #[error("no query results for model [{model}] {id} (tenant scope {tenants})")]
    TenantModelNotFound {
        model: String,
        id: String,
        tenants: String,
    },
}

/// Errors related to configuration and entity declarations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A table or column name is not a plain SQL identifier.
    #[error("invalid identifier for {field}: \"{value}\"")]
    InvalidIdentifier { field: String, value: String },

    /// The configuration document could not be parsed.
    #[error("failed to parse tenancy configuration: {message}")]
    Parse { message: String },
}

/// Errors originating from the storage backend.
#[derive(Error, Debug)]
pub enum BackendError {
    /// Connection to the backend failed.
    #[error("connection failed to {backend_name}: {message}")]
    ConnectionFailed {
        backend_name: String,
        message: String,
    },

    /// Connection pool exhausted.
    #[error("connection pool exhausted for {backend_name}")]
    PoolExhausted { backend_name: String },

    /// Internal backend error.
    #[error("internal error in {backend_name}: {message}")]
    Internal {
        backend_name: String,
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Query execution error.
    #[error("query execution failed: {message}")]
    QueryError { message: String },

    /// Serialization/deserialization error.
    #[error("serialization error: {message}")]
    SerializationError { message: String },
}

/// Result type alias for tenancy operations.
pub type TenancyResult<T> = Result<T, TenancyError>;

impl From<serde_json::Error> for TenancyError {
    fn from(err: serde_json::Error) -> Self {
        TenancyError::Backend(BackendError::SerializationError {
            message: err.to_string(),
        })
    }
}

#[cfg(feature = "sqlite")]
impl From<rusqlite::Error> for TenancyError {
    fn from(err: rusqlite::Error) -> Self {
        TenancyError::Backend(BackendError::Internal {
            backend_name: "sqlite".to_string(),
            message: err.to_string(),
            source: Some(Box::new(err)),
        })
    }
}

#[cfg(feature = "sqlite")]
impl From<r2d2::Error> for TenancyError {
    fn from(_err: r2d2::Error) -> Self {
        TenancyError::Backend(BackendError::PoolExhausted {
            backend_name: "sqlite".to_string(),
        })
    }
}
