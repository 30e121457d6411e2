//! SQLite backend implementation.

use std::fmt::Debug;
use std::path::Path;
use std::time::Duration;

use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::{MorphRelationConfig, TenancyConfig};
use crate::error::{BackendError, TenancyResult};

use super::schema;

pub(crate) const BACKEND_NAME: &str = "sqlite";

/// SQLite storage for scoped records and tenant associations.
pub struct SqliteBackend {
    pool: Pool<SqliteConnectionManager>,
    config: SqliteBackendConfig,
    is_memory: bool,
}

impl Debug for SqliteBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteBackend")
            .field("config", &self.config)
            .field("is_memory", &self.is_memory)
            .finish_non_exhaustive()
    }
}

/// Configuration for the SQLite backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SqliteBackendConfig {
    /// Maximum number of connections in the pool. Ignored for in-memory
    /// databases, which always use a single connection.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// Minimum number of idle connections.
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,

    /// Connection timeout in milliseconds.
    #[serde(default = "default_connection_timeout_ms")]
    pub connection_timeout_ms: u64,

    /// SQLite busy timeout in milliseconds.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u32,

    /// Enable WAL mode for file databases.
    #[serde(default = "default_true")]
    pub enable_wal: bool,

    /// Enable foreign key constraints.
    #[serde(default = "default_true")]
    pub enable_foreign_keys: bool,
}

fn default_max_connections() -> u32 {
    10
}

fn default_min_connections() -> u32 {
    1
}

fn default_connection_timeout_ms() -> u64 {
    30000
}

fn default_busy_timeout_ms() -> u32 {
    5000
}

fn default_true() -> bool {
    true
}

impl Default for SqliteBackendConfig {
    fn default() -> Self {
        Self {
            max_connections: default_max_connections(),
            min_connections: default_min_connections(),
            connection_timeout_ms: default_connection_timeout_ms(),
            busy_timeout_ms: default_busy_timeout_ms(),
            enable_wal: true,
            enable_foreign_keys: true,
        }
    }
}

impl SqliteBackend {
    /// Creates a new in-memory SQLite backend.
    pub fn in_memory() -> TenancyResult<Self> {
        Self::with_config(":memory:", SqliteBackendConfig::default())
    }

    /// Opens or creates a file-based SQLite database.
    pub fn open<P: AsRef<Path>>(path: P) -> TenancyResult<Self> {
        Self::with_config(path, SqliteBackendConfig::default())
    }

    /// Creates a backend with custom configuration.
    pub fn with_config<P: AsRef<Path>>(
        path: P,
        config: SqliteBackendConfig,
    ) -> TenancyResult<Self> {
        let path_str = path.as_ref().to_string_lossy();
        let is_memory = path_str == ":memory:";

        let busy_timeout = Duration::from_millis(u64::from(config.busy_timeout_ms));
        let foreign_keys = config.enable_foreign_keys;
        let wal = config.enable_wal && !is_memory;

        let manager = if is_memory {
            SqliteConnectionManager::memory()
        } else {
            SqliteConnectionManager::file(path.as_ref())
        }
        .with_init(move |conn| {
            conn.busy_timeout(busy_timeout)?;
            if foreign_keys {
                conn.execute_batch("PRAGMA foreign_keys = ON;")?;
            }
            if wal {
                conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| {
                    row.get::<_, String>(0)
                })?;
            }
            Ok(())
        });

        // Every in-memory connection is a separate database, so the pool must
        // hold exactly one connection and never recycle it.
        let builder = if is_memory {
            Pool::builder()
                .max_size(1)
                .min_idle(Some(1))
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            Pool::builder()
                .max_size(config.max_connections)
                .min_idle(Some(config.min_connections))
        };

        let pool = builder
            .connection_timeout(Duration::from_millis(config.connection_timeout_ms))
            .build(manager)
            .map_err(|e| BackendError::ConnectionFailed {
                backend_name: BACKEND_NAME.to_string(),
                message: e.to_string(),
            })?;

        info!(path = %path_str, is_memory, "Opened SQLite backend");

        Ok(Self {
            pool,
            config,
            is_memory,
        })
    }

    /// Creates the association table described by the tenancy configuration.
    pub fn init_schema(&self, config: &TenancyConfig) -> TenancyResult<()> {
        self.init_association_table(&config.morph_relation)
    }

    /// Creates an association table, e.g. one named by an entity override.
    pub fn init_association_table(&self, relation: &MorphRelationConfig) -> TenancyResult<()> {
        relation.validate()?;
        let conn = self.get_connection()?;
        schema::create_association_table(&conn, relation)
    }

    /// Executes a batch of SQL statements, such as the DDL produced by
    /// [`TenantTableBuilder`](super::TenantTableBuilder).
    pub fn execute_batch(&self, sql: &str) -> TenancyResult<()> {
        let conn = self.get_connection()?;
        conn.execute_batch(sql)?;
        Ok(())
    }

    /// Checks that a connection can be obtained and used.
    pub fn health_check(&self) -> TenancyResult<()> {
        let conn = self.get_connection()?;
        conn.query_row("SELECT 1", [], |_| Ok(()))
            .map_err(|e| BackendError::Internal {
                backend_name: BACKEND_NAME.to_string(),
                message: format!("Health check failed: {}", e),
                source: None,
            })?;
        Ok(())
    }

    /// Get a connection from the pool.
    pub(crate) fn get_connection(
        &self,
    ) -> TenancyResult<PooledConnection<SqliteConnectionManager>> {
        self.pool.get().map_err(|e| {
            BackendError::ConnectionFailed {
                backend_name: BACKEND_NAME.to_string(),
                message: e.to_string(),
            }
            .into()
        })
    }

    /// Returns whether this is an in-memory database.
    pub fn is_memory(&self) -> bool {
        self.is_memory
    }

    /// Returns the backend configuration.
    pub fn config(&self) -> &SqliteBackendConfig {
        &self.config
    }
}
