//! SQLite backend implementation.
//!
//! Implements [`RecordStorage`](crate::core::RecordStorage) and
//! [`AssociationStorage`](crate::core::AssociationStorage). Supports both
//! in-memory databases (great for testing) and file-based databases.
//!
//! # Example
//!
//! ```no_run
//! use helios_tenancy::backends::sqlite::{SqliteBackend, TenantTableBuilder};
//! use helios_tenancy::{TenancyConfig, TenantScoping};
//! use helios_tenancy::model::EntityDeclaration;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let engine = TenantScoping::new(TenancyConfig::default())?;
//! let backend = SqliteBackend::in_memory()?;
//!
//! // Association table for many-tenant entities
//! backend.init_schema(engine.config())?;
//!
//! // A single-tenant entity table with a company_id column
//! let invoices = engine.resolve(&EntityDeclaration::new("invoices"))?;
//! backend.execute_batch(
//!     &TenantTableBuilder::for_entity(&invoices)
//!         .column("number", "TEXT", false)
//!         .to_sqlite_ddl(),
//! )?;
//! # Ok(())
//! # }
//! ```
//!
//! # Schema
//!
//! The association table created by [`SqliteBackend::init_schema`], with the
//! default column names:
//!
//! ```sql
//! CREATE TABLE tenantables (
//!     id INTEGER PRIMARY KEY AUTOINCREMENT,
//!     tenant_id NOT NULL,
//!     tenantable_id NOT NULL,
//!     tenantable_type TEXT NOT NULL,
//!     created_at TEXT NOT NULL,
//!     deleted_at TEXT
//! );
//! CREATE UNIQUE INDEX idx_tenantables_tenant
//!     ON tenantables (tenant_id, tenantable_type, tenantable_id);
//! ```

mod backend;
mod schema;
mod storage;

pub use backend::{SqliteBackend, SqliteBackendConfig};
pub use schema::{TenantTableBuilder, association_table_ddl};
