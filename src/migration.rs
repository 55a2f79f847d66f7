//! Create tables for registered record types (CREATE TABLE IF NOT EXISTS).
//! Inherited fields are flattened into each entity's table; nothing is ever altered or dropped.

use crate::config::{FieldDescriptor, FieldType, Registry, TypeDescriptor};
use crate::error::StoreError;
use crate::sql::quoted;
use sqlx::PgPool;

fn column_def(c: &FieldDescriptor, primary_key: bool) -> String {
    let typ = match (c.generated && primary_key, c.field_type) {
        (true, FieldType::BigInt) => "BIGSERIAL".to_string(),
        (true, FieldType::Int) => "SERIAL".to_string(),
        (true, FieldType::Uuid) => "UUID DEFAULT gen_random_uuid()".to_string(),
        (_, t) => t.pg_type().to_uppercase(),
    };
    let mut def = format!("{} {}", quoted(&c.name), typ);
    if primary_key {
        def.push_str(" PRIMARY KEY");
    } else if !c.nullable {
        def.push_str(" NOT NULL");
    }
    def
}

/// DDL for one record type. Types without a single identifier get no primary key.
pub fn create_table_sql(ty: &TypeDescriptor) -> String {
    let id_name = ty.identifier_field().ok().map(|f| f.name.as_str());
    let col_defs: Vec<String> = ty
        .columns
        .iter()
        .map(|c| column_def(c, Some(c.name.as_str()) == id_name))
        .collect();
    format!(
        "CREATE TABLE IF NOT EXISTS {} (\n  {}\n)",
        quoted(&ty.table_name),
        col_defs.join(",\n  ")
    )
}

/// Create a table for every registered type. Idempotent.
pub async fn ensure_tables(pool: &PgPool, registry: &Registry) -> Result<(), StoreError> {
    for ty in &registry.types {
        if let Err(e) = ty.identifier_field() {
            tracing::warn!(table = %ty.table_name, error = %e, "creating table without primary key");
        }
        let sql = create_table_sql(ty);
        tracing::debug!(sql = %sql, "ddl");
        sqlx::query(&sql).execute(pool).await?;
    }
    tracing::info!(tables = registry.len(), "tables ensured");
    Ok(())
}
