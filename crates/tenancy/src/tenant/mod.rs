//! Tenant context and identifiers.
//!
//! This module provides the per-unit-of-work registry of tenants in scope.
//!
//! # Core Types
//!
//! - [`TenantKey`] - The name of a tenancy dimension (usually a column)
//! - [`TenantValue`] - A validated, non-null tenant identifier
//! - [`TenantContext`] - The tenants currently in scope, with an on/off switch
//! - [`TenantSource`] - A record that can register itself as a tenant
//!
//! # Examples
//!
//! ```
//! use helios_tenancy::tenant::{TenantContext, TenantValue};
//!
//! let mut ctx = TenantContext::new();
//! ctx.add_tenant("company_id", 1).unwrap();
//! ctx.push_tenant("tenant_id", 1).unwrap();
//! ctx.push_tenant("tenant_id", 2).unwrap();
//!
//! assert_eq!(ctx.tenant_id("company_id").unwrap(), &TenantValue::Integer(1));
//! assert_eq!(ctx.tenant_ids("tenant_id").unwrap().len(), 2);
//!
//! // A null identifier is rejected at registration time
//! assert!(ctx.add_tenant("company_id", None::<i64>).is_err());
//! ```

mod context;
mod id;

pub use context::{TenantContext, TenantContextBuilder};
pub use id::{TenantIds, TenantKey, TenantMap, TenantSource, TenantValue};
