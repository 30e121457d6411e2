//! RecordStorage and AssociationStorage implementations for SQLite.

use async_trait::async_trait;
use chrono::Utc;
use rusqlite::types::{ToSqlOutput, ValueRef};
use rusqlite::{
    Connection, OptionalExtension, Row, ToSql, TransactionBehavior, params_from_iter,
};
use serde_json::Value;
use tracing::debug;

use crate::config::{MorphRelationConfig, validate_identifier};
use crate::core::{AssociationStorage, RecordStorage, SyncChanges};
use crate::error::{BackendError, TenancyResult, TenantError};
use crate::model::Record;
use crate::query::{Query, SqlParam};
use crate::tenant::{TenantIds, TenantValue};

use super::SqliteBackend;
use super::backend::BACKEND_NAME;

impl ToSql for SqlParam {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            SqlParam::String(s) => ToSqlOutput::from(s.as_str()),
            SqlParam::Integer(i) => ToSqlOutput::from(*i),
            SqlParam::Float(f) => ToSqlOutput::from(*f),
            SqlParam::Null => ToSqlOutput::from(rusqlite::types::Null),
        })
    }
}

fn column_value(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::from(i),
        ValueRef::Real(f) => Value::from(f),
        ValueRef::Text(t) => Value::String(String::from_utf8_lossy(t).into_owned()),
        ValueRef::Blob(b) => Value::Array(b.iter().map(|byte| Value::from(*byte)).collect()),
    }
}

fn row_to_record(row: &Row<'_>, columns: &[String]) -> rusqlite::Result<Record> {
    let mut record = Record::new();
    for (i, name) in columns.iter().enumerate() {
        record.set(name.clone(), column_value(row.get_ref(i)?));
    }
    Ok(record)
}

fn tenant_value(value: ValueRef<'_>) -> TenancyResult<TenantValue> {
    match value {
        ValueRef::Integer(i) => Ok(TenantValue::Integer(i)),
        ValueRef::Text(t) => Ok(TenantValue::Text(String::from_utf8_lossy(t).into_owned())),
        other => Err(BackendError::SerializationError {
            message: format!("unexpected tenant identifier type {:?}", other.data_type()),
        }
        .into()),
    }
}

fn select_by_key(
    conn: &Connection,
    table: &str,
    primary_key: &str,
    id: &SqlParam,
) -> TenancyResult<Option<Record>> {
    let sql = format!("SELECT * FROM {} WHERE {} = ?", table, primary_key);
    let mut stmt = conn.prepare(&sql)?;
    let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
    let record = stmt
        .query_row([id], |row| row_to_record(row, &columns))
        .optional()?;
    Ok(record)
}

fn live_tenants(
    conn: &Connection,
    relation: &MorphRelationConfig,
    morph_type: &str,
    entity_id: &SqlParam,
) -> TenancyResult<TenantIds> {
    let mut sql = format!(
        "SELECT {} FROM {} WHERE {} = ? AND {} = ?",
        relation.tenant_id_column,
        relation.table,
        relation.entity_type_column,
        relation.entity_id_column
    );
    if let Some(deleted) = &relation.soft_delete_column {
        sql.push_str(&format!(" AND {} IS NULL", deleted));
    }

    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt.query(rusqlite::params![morph_type, entity_id])?;
    let mut tenants = TenantIds::new();
    while let Some(row) = rows.next()? {
        tenants.insert(tenant_value(row.get_ref(0)?)?);
    }
    Ok(tenants)
}

fn attach(
    conn: &Connection,
    relation: &MorphRelationConfig,
    morph_type: &str,
    entity_id: &SqlParam,
    tenant: &SqlParam,
    now: &str,
) -> TenancyResult<()> {
    let stamp = SqlParam::string(now);

    if let Some(deleted) = &relation.soft_delete_column {
        let mut assignments = format!("{} = NULL", deleted);
        let mut params = Vec::with_capacity(4);
        if let Some(created) = &relation.created_at_column {
            assignments.push_str(&format!(", {} = ?", created));
            params.push(stamp.clone());
        }
        params.extend([SqlParam::string(morph_type), entity_id.clone(), tenant.clone()]);

        let restored = conn.execute(
            &format!(
                "UPDATE {} SET {} WHERE {} = ? AND {} = ? AND {} = ? AND {} IS NOT NULL",
                relation.table,
                assignments,
                relation.entity_type_column,
                relation.entity_id_column,
                relation.tenant_id_column,
                deleted
            ),
            params_from_iter(params.iter()),
        )?;
        if restored > 0 {
            return Ok(());
        }
    }

    let mut columns = vec![
        relation.tenant_id_column.as_str(),
        relation.entity_id_column.as_str(),
        relation.entity_type_column.as_str(),
    ];
    let mut params = vec![tenant.clone(), entity_id.clone(), SqlParam::string(morph_type)];
    if let Some(created) = &relation.created_at_column {
        columns.push(created.as_str());
        params.push(stamp);
    }

    conn.execute(
        &format!(
            "INSERT INTO {} ({}) VALUES ({})",
            relation.table,
            columns.join(", "),
            vec!["?"; columns.len()].join(", ")
        ),
        params_from_iter(params.iter()),
    )?;
    Ok(())
}

fn detach(
    conn: &Connection,
    relation: &MorphRelationConfig,
    morph_type: &str,
    entity_id: &SqlParam,
    tenant: &SqlParam,
    now: &str,
) -> TenancyResult<()> {
    let filter = format!(
        "{} = ? AND {} = ? AND {} = ?",
        relation.entity_type_column, relation.entity_id_column, relation.tenant_id_column
    );
    match &relation.soft_delete_column {
        Some(deleted) => conn.execute(
            &format!(
                "UPDATE {} SET {} = ? WHERE {} AND {} IS NULL",
                relation.table, deleted, filter, deleted
            ),
            rusqlite::params![now, morph_type, entity_id, tenant],
        )?,
        None => conn.execute(
            &format!("DELETE FROM {} WHERE {}", relation.table, filter),
            rusqlite::params![morph_type, entity_id, tenant],
        )?,
    };
    Ok(())
}

fn validate_record(table: &str, primary_key: &str, record: &Record) -> TenancyResult<()> {
    validate_identifier("table", table)?;
    validate_identifier("primary_key", primary_key)?;
    for field in record.fields().keys() {
        validate_identifier("field", field)?;
    }
    Ok(())
}

#[async_trait]
impl RecordStorage for SqliteBackend {
    fn backend_name(&self) -> &'static str {
        BACKEND_NAME
    }

    async fn fetch(&self, query: &Query) -> TenancyResult<Vec<Record>> {
        validate_identifier("table", query.table())?;
        let sql = query.to_sql();
        debug!(sql = %sql.sql, params = sql.params.len(), "Executing query");

        let conn = self.get_connection()?;
        let mut stmt = conn.prepare(&sql.sql)?;
        let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
        let records = stmt
            .query_map(params_from_iter(sql.params.iter()), |row| {
                row_to_record(row, &columns)
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(records)
    }

    async fn insert(
        &self,
        table: &str,
        primary_key: &str,
        record: &Record,
    ) -> TenancyResult<Record> {
        validate_record(table, primary_key, record)?;
        let conn = self.get_connection()?;

        let fields = record.fields();
        if fields.is_empty() {
            conn.execute(&format!("INSERT INTO {} DEFAULT VALUES", table), [])?;
        } else {
            let columns: Vec<&str> = fields.keys().map(String::as_str).collect();
            let placeholders = vec!["?"; columns.len()].join(", ");
            let params: Vec<SqlParam> = fields.values().map(SqlParam::from_json).collect();
            conn.execute(
                &format!(
                    "INSERT INTO {} ({}) VALUES ({})",
                    table,
                    columns.join(", "),
                    placeholders
                ),
                params_from_iter(params.iter()),
            )?;
        }

        let id = match record.get(primary_key) {
            Some(value) if !value.is_null() => SqlParam::from_json(value),
            _ => SqlParam::Integer(conn.last_insert_rowid()),
        };
        debug!(table, id = ?id, "Inserted record");

        select_by_key(&conn, table, primary_key, &id)?.ok_or_else(|| {
            BackendError::QueryError {
                message: format!("inserted row not found in {}", table),
            }
            .into()
        })
    }

    async fn update(
        &self,
        table: &str,
        primary_key: &str,
        record: &Record,
    ) -> TenancyResult<Record> {
        validate_record(table, primary_key, record)?;
        let id = match record.get(primary_key) {
            Some(value) if !value.is_null() => SqlParam::from_json(value),
            _ => {
                return Err(TenantError::MissingEntityKey {
                    table: table.to_string(),
                    column: primary_key.to_string(),
                }
                .into());
            }
        };

        let conn = self.get_connection()?;
        let assignments: Vec<(&String, &Value)> = record
            .fields()
            .iter()
            .filter(|(name, _)| name.as_str() != primary_key)
            .collect();

        if !assignments.is_empty() {
            let set: Vec<String> = assignments
                .iter()
                .map(|(name, _)| format!("{} = ?", name))
                .collect();
            let mut params: Vec<SqlParam> = assignments
                .iter()
                .map(|(_, value)| SqlParam::from_json(value))
                .collect();
            params.push(id.clone());

            conn.execute(
                &format!(
                    "UPDATE {} SET {} WHERE {} = ?",
                    table,
                    set.join(", "),
                    primary_key
                ),
                params_from_iter(params.iter()),
            )?;
        }

        select_by_key(&conn, table, primary_key, &id)?.ok_or_else(|| {
            BackendError::QueryError {
                message: format!("no row in {} with {} = {:?}", table, primary_key, id),
            }
            .into()
        })
    }

    async fn delete(&self, table: &str, primary_key: &str, id: &Value) -> TenancyResult<bool> {
        validate_identifier("table", table)?;
        validate_identifier("primary_key", primary_key)?;

        let conn = self.get_connection()?;
        let id = SqlParam::from_json(id);
        let removed = conn.execute(
            &format!("DELETE FROM {} WHERE {} = ?", table, primary_key),
            [&id],
        )?;
        debug!(table, id = ?id, removed, "Deleted record");
        Ok(removed > 0)
    }
}

#[async_trait]
impl AssociationStorage for SqliteBackend {
    async fn associated_tenants(
        &self,
        relation: &MorphRelationConfig,
        morph_type: &str,
        entity_id: &Value,
    ) -> TenancyResult<TenantIds> {
        let conn = self.get_connection()?;
        live_tenants(&conn, relation, morph_type, &SqlParam::from_json(entity_id))
    }

    async fn sync_associations(
        &self,
        relation: &MorphRelationConfig,
        morph_type: &str,
        entity_id: &Value,
        tenants: &TenantIds,
    ) -> TenancyResult<SyncChanges> {
        let entity_id = SqlParam::from_json(entity_id);
        let now = Utc::now().to_rfc3339();

        let mut conn = self.get_connection()?;
        // Hold the write lock before reading the current associations
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let current = live_tenants(&tx, relation, morph_type, &entity_id)?;
        let mut changes = SyncChanges::default();

        for tenant in tenants.difference(&current) {
            attach(&tx, relation, morph_type, &entity_id, &tenant.into(), &now)?;
            changes.attached.push(tenant.clone());
        }
        for tenant in current.difference(tenants) {
            detach(&tx, relation, morph_type, &entity_id, &tenant.into(), &now)?;
            changes.detached.push(tenant.clone());
        }

        tx.commit()?;
        Ok(changes)
    }
}
