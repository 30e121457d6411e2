//! Entity declarations and records.
//!
//! - [`EntityDeclaration`] / [`ScopedEntity`] - how an entity author describes a table
//! - [`EntityScope`] - the declaration merged with the configuration
//! - [`Record`] - a row as a JSON field map

mod entity;
mod record;

pub use entity::{EntityDeclaration, EntityScope, ScopedEntity};
pub use record::Record;
