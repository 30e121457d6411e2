//! SQLite schema definitions.

use rusqlite::Connection;
use tracing::info;

use crate::config::MorphRelationConfig;
use crate::error::TenancyResult;
use crate::model::EntityScope;

/// Renders the association table DDL.
///
/// The tenant and entity key columns carry no declared type, so integer and
/// text identifiers keep their storage class and compare exactly.
pub fn association_table_ddl(relation: &MorphRelationConfig) -> String {
    let table = &relation.table;
    let tenant = &relation.tenant_id_column;
    let entity_id = &relation.entity_id_column;
    let entity_type = &relation.entity_type_column;

    let mut ddl = format!(
        "CREATE TABLE IF NOT EXISTS {table} (\n    \
         id INTEGER PRIMARY KEY AUTOINCREMENT,\n    \
         {tenant} NOT NULL,\n    \
         {entity_id} NOT NULL,\n    \
         {entity_type} TEXT NOT NULL"
    );
    if let Some(created) = &relation.created_at_column {
        ddl.push_str(&format!(",\n    {created} TEXT NOT NULL"));
    }
    if let Some(deleted) = &relation.soft_delete_column {
        ddl.push_str(&format!(",\n    {deleted} TEXT"));
    }
    ddl.push_str("\n);\n");

    // Tenant first: membership lookups filter by tenant, then by type
    ddl.push_str(&format!(
        "CREATE UNIQUE INDEX IF NOT EXISTS idx_{table}_tenant ON {table} ({tenant}, {entity_type}, {entity_id});\n"
    ));
    ddl.push_str(&format!(
        "CREATE INDEX IF NOT EXISTS idx_{table}_entity ON {table} ({entity_type}, {entity_id});\n"
    ));
    ddl
}

/// Creates an association table if it does not exist.
pub fn create_association_table(
    conn: &Connection,
    relation: &MorphRelationConfig,
) -> TenancyResult<()> {
    conn.execute_batch(&association_table_ddl(relation))?;
    info!(table = %relation.table, "Initialized tenant association table");
    Ok(())
}

/// Builds DDL for a scoped entity table.
///
/// Single-tenant entities get one nullable column per scope key (NULL marks a
/// row shared by all tenants), and every index is prefixed with the scope key
/// columns. Many-tenant entities get no scope columns.
///
/// ```
/// use helios_tenancy::backends::sqlite::TenantTableBuilder;
/// use helios_tenancy::config::TenancyConfig;
/// use helios_tenancy::model::EntityDeclaration;
///
/// let invoices = EntityDeclaration::new("invoices")
///     .resolve(&TenancyConfig::default())
///     .unwrap();
///
/// let ddl = TenantTableBuilder::for_entity(&invoices)
///     .column("number", "TEXT", false)
///     .index("idx_invoices_number", &["number"], true)
///     .to_sqlite_ddl();
///
/// assert!(ddl.contains("company_id,"));
/// assert!(ddl.contains("(company_id, number)"));
/// ```
#[derive(Debug)]
pub struct TenantTableBuilder {
    table_name: String,
    primary_key: String,
    tenant_columns: Vec<String>,
    columns: Vec<ColumnDef>,
    indexes: Vec<IndexDef>,
}

#[derive(Debug)]
struct ColumnDef {
    name: String,
    data_type: String,
    nullable: bool,
}

#[derive(Debug)]
struct IndexDef {
    name: String,
    columns: Vec<String>,
    unique: bool,
}

impl TenantTableBuilder {
    /// Starts a table for a resolved entity.
    pub fn for_entity(entity: &EntityScope) -> Self {
        let tenant_columns = if entity.relation().morph_relation().is_some() {
            Vec::new()
        } else {
            entity
                .tenant_columns()
                .iter()
                .map(|key| key.as_str().to_string())
                .collect()
        };

        Self {
            table_name: entity.table().to_string(),
            primary_key: entity.primary_key().to_string(),
            tenant_columns,
            columns: Vec::new(),
            indexes: Vec::new(),
        }
    }

    /// Adds a column to the table.
    pub fn column(
        mut self,
        name: impl Into<String>,
        data_type: impl Into<String>,
        nullable: bool,
    ) -> Self {
        self.columns.push(ColumnDef {
            name: name.into(),
            data_type: data_type.into(),
            nullable,
        });
        self
    }

    /// Adds an index (scope key columns are prepended automatically).
    pub fn index(mut self, name: impl Into<String>, columns: &[&str], unique: bool) -> Self {
        self.indexes.push(IndexDef {
            name: name.into(),
            columns: columns.iter().map(|c| c.to_string()).collect(),
            unique,
        });
        self
    }

    /// Generates SQLite DDL for the table.
    pub fn to_sqlite_ddl(&self) -> String {
        let mut lines = vec![format!(
            "    {} INTEGER PRIMARY KEY AUTOINCREMENT",
            self.primary_key
        )];
        for tenant in &self.tenant_columns {
            lines.push(format!("    {}", tenant));
        }
        for col in &self.columns {
            let null_str = if col.nullable { "" } else { " NOT NULL" };
            lines.push(format!("    {} {}{}", col.name, col.data_type, null_str));
        }

        let mut ddl = format!(
            "CREATE TABLE IF NOT EXISTS {} (\n{}\n);\n",
            self.table_name,
            lines.join(",\n")
        );

        for tenant in &self.tenant_columns {
            ddl.push_str(&format!(
                "CREATE INDEX IF NOT EXISTS idx_{}_{} ON {} ({});\n",
                self.table_name, tenant, self.table_name, tenant
            ));
        }

        for idx in &self.indexes {
            let unique_str = if idx.unique { "UNIQUE " } else { "" };
            let columns: Vec<_> = self
                .tenant_columns
                .iter()
                .chain(idx.columns.iter())
                .map(|s| s.as_str())
                .collect();
            ddl.push_str(&format!(
                "CREATE {}INDEX IF NOT EXISTS {} ON {} ({});\n",
                unique_str,
                idx.name,
                self.table_name,
                columns.join(", ")
            ));
        }

        ddl
    }
}
