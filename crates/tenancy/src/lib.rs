//! Helios Row-Level Tenancy
//!
//! This crate scopes database access to the tenants of the current unit of
//! work. Every read is constrained to the tenants in scope, every new record
//! is tagged with them, and callers can deliberately escape the constraint to
//! query across all tenants.
//!
//! # Features
//!
//! - **Explicit context**: a [`TenantContext`] per request or job, never a global
//! - **Two relationships**: a foreign-key column per scope key, or an
//!   association table linking a record to many tenants
//! - **Tagged constraints**: tenant predicates are identified by tag, so
//!   removing them never touches caller predicates
//! - **Lookup diagnostics**: "belongs to another tenant" is told apart from
//!   "does not exist"
//!
//! Available backend features:
//! - `sqlite` (default) - SQLite with in-memory and file modes
//!
//! # Architecture
//!
//! - [`tenant`] - Tenant context and identifiers
//! - [`config`] - Resolved tenancy configuration
//! - [`model`] - Entity declarations and records
//! - [`query`] - Query representation and SQL rendering
//! - [`scope`] - Constraint builder, relationship strategies, lifecycle hook
//! - [`core`] - Storage traits
//! - [`backends`] - Backend implementations
//! - [`error`] - Error types for all operations
//!
//! # Quick Start
//!
//! ```no_run
//! use helios_tenancy::backends::sqlite::{SqliteBackend, TenantTableBuilder};
//! use helios_tenancy::model::{EntityDeclaration, Record, ScopedEntity};
//! use helios_tenancy::{TenancyConfig, TenantContext, TenantScoping};
//!
//! struct Invoice;
//!
//! impl ScopedEntity for Invoice {
//!     fn declaration() -> EntityDeclaration {
//!         EntityDeclaration::new("invoices").tenant_columns(["company_id"])
//!     }
//! }
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let engine = TenantScoping::new(TenancyConfig::default())?;
//! let invoices = engine.entity::<Invoice>()?;
//!
//! let backend = SqliteBackend::in_memory()?;
//! backend.execute_batch(
//!     &TenantTableBuilder::for_entity(&invoices)
//!         .column("number", "TEXT", false)
//!         .to_sqlite_ddl(),
//! )?;
//!
//! let mut ctx = TenantContext::new();
//! ctx.add_tenant("company_id", 1)?;
//!
//! let repo = engine.repository(&backend, invoices, &ctx);
//! let created = repo.create(Record::new().with("number", "INV-1")).await?;
//! assert_eq!(created.get("company_id"), Some(&serde_json::json!(1)));
//!
//! // Only company 1's invoices
//! let mine = repo.all().await?;
//!
//! // Every company's invoices
//! let everything = repo.get(&repo.all_tenants()).await?;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod backends;
pub mod config;
pub mod core;
pub mod engine;
pub mod error;
pub mod model;
pub mod query;
pub mod repository;
pub mod scope;
pub mod tenant;

// Re-export commonly used types at crate root
pub use config::{MissingTenantPolicy, RelationKind, TenancyConfig};
pub use engine::TenantScoping;
pub use error::{TenancyError, TenancyResult};
pub use repository::ScopedRepository;
pub use tenant::{TenantContext, TenantKey, TenantValue};

// Re-export core traits
pub use core::{AssociationStorage, RecordStorage};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name.
pub const NAME: &str = env!("CARGO_PKG_NAME");
