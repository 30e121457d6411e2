//! Core storage abstractions.
//!
//! - [`RecordStorage`] - query execution and row writes
//! - [`AssociationStorage`] - association rows for many-tenant entities
//!
//! A backend usually implements both; see
//! [`SqliteBackend`](crate::backends::sqlite::SqliteBackend).

mod storage;

pub use storage::{AssociationStorage, RecordStorage, SyncChanges};
