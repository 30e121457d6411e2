//! Query representation.
//!
//! A [`Query`] keeps caller predicates and tenant constraints as separate
//! clause kinds, so tenant constraints can be found and removed by tag without
//! inspecting what the caller wrote. Queries render to [`SqlFragment`]s with
//! anonymous `?` placeholders.

mod builder;
mod predicate;
mod sql;

pub use builder::{Clause, Query, SortDirection, TenantScopedQuery};
pub use predicate::Predicate;
pub use sql::{SqlFragment, SqlParam};
