//! Shared fixtures for tenancy integration tests.

#![allow(dead_code)]

use serde_json::Value;

use helios_tenancy::backends::sqlite::{SqliteBackend, TenantTableBuilder};
use helios_tenancy::model::{EntityDeclaration, EntityScope, Record, ScopedEntity};
use helios_tenancy::tenant::{TenantMap, TenantValue};
use helios_tenancy::{TenancyConfig, TenantContext, TenantScoping};

/// Invoices belong to one company through `company_id`.
pub struct Invoice;

impl ScopedEntity for Invoice {
    fn declaration() -> EntityDeclaration {
        EntityDeclaration::new("invoices").tenant_columns(["company_id"])
    }
}

/// Posts are shared by many tenants through the association table.
pub struct Post;

impl ScopedEntity for Post {
    fn declaration() -> EntityDeclaration {
        EntityDeclaration::new("posts")
            .tenant_columns(["tenant_id"])
            .belongs_to_many()
    }
}

pub fn create_engine() -> TenantScoping {
    create_engine_with(TenancyConfig::default())
}

pub fn create_engine_with(config: TenancyConfig) -> TenantScoping {
    TenantScoping::new(config).expect("Failed to create tenant scoping engine")
}

/// Creates an in-memory backend with the association table and the
/// `invoices` and `posts` tables.
pub fn create_backend(engine: &TenantScoping) -> SqliteBackend {
    let backend = SqliteBackend::in_memory().expect("Failed to create SQLite backend");
    init_backend(&backend, engine);
    backend
}

pub fn init_backend(backend: &SqliteBackend, engine: &TenantScoping) {
    backend
        .init_schema(engine.config())
        .expect("Failed to initialize schema");

    let invoices = invoices(engine);
    let posts = posts(engine);
    let ddl = TenantTableBuilder::for_entity(&invoices)
        .column("number", "TEXT", false)
        .index("idx_invoices_number", &["number"], false)
        .to_sqlite_ddl()
        + &TenantTableBuilder::for_entity(&posts)
            .column("title", "TEXT", false)
            .to_sqlite_ddl();
    backend.execute_batch(&ddl).expect("Failed to create tables");
}

pub fn invoices(engine: &TenantScoping) -> EntityScope {
    engine.entity::<Invoice>().expect("Invalid invoice declaration")
}

pub fn posts(engine: &TenantScoping) -> EntityScope {
    engine.entity::<Post>().expect("Invalid post declaration")
}

pub fn create_tenant(key: &str, id: impl Into<Value>) -> TenantContext {
    let mut ctx = TenantContext::new();
    ctx.add_tenant(key, id).expect("Failed to register tenant");
    ctx
}

pub fn company(id: i64) -> TenantContext {
    create_tenant("company_id", id)
}

pub fn invoice(number: &str) -> Record {
    Record::new().with("number", number)
}

pub fn post(title: &str) -> Record {
    Record::new().with("title", title)
}

/// Returns the `number` field of every record, sorted.
pub fn numbers(records: &[Record]) -> Vec<String> {
    let mut numbers: Vec<String> = records
        .iter()
        .filter_map(|r| r.get("number").and_then(Value::as_str).map(String::from))
        .collect();
    numbers.sort();
    numbers
}

/// Returns the `title` field of every record, sorted.
pub fn titles(records: &[Record]) -> Vec<String> {
    let mut titles: Vec<String> = records
        .iter()
        .filter_map(|r| r.get("title").and_then(Value::as_str).map(String::from))
        .collect();
    titles.sort();
    titles
}

/// Flattens the identifiers of every scope key, in key order.
pub fn tenant_ids(tenants: &TenantMap) -> Vec<TenantValue> {
    tenants.values().flatten().cloned().collect()
}
