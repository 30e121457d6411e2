//! Tenant scoping.
//!
//! - [`ConstraintBuilder`] - decides which constraints apply to an entity and
//!   adds or strips them on a query
//! - [`RelationshipStrategy`] - how an entity relates to its tenants
//!   ([`BelongsToOneTenant`], [`BelongsToManyTenants`])
//! - [`LifecycleHook`] - stamps fields and syncs associations around writes
//! - [`TenantConstraint`] / [`ConstraintTag`] - tagged predicates
//!
//! # Scoping states
//!
//! An entity is *scoped* while the context is enabled and holds identifiers
//! for at least one of its declared keys. Otherwise queries pass through
//! unconstrained and creation stamps nothing.

mod builder;
mod constraint;
mod hooks;
mod strategy;

pub use builder::ConstraintBuilder;
pub use constraint::{ConstraintKind, ConstraintTag, TagScope, TenantConstraint};
pub use hooks::LifecycleHook;
pub(crate) use strategy::entity_key;
pub use strategy::{BelongsToManyTenants, BelongsToOneTenant, RelationshipStrategy, TenantRelation};
