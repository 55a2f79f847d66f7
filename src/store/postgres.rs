//! PostgreSQL storage: one transaction per session, committed by `flush`.

use crate::error::StoreError;
use crate::search::FilterExpression;
use crate::sql::{delete, insert, select_by_id, select_list, text_param, QueryBuf};
use crate::store::{id_text, EntityRef, Record, Session, Store};
use async_trait::async_trait;
use serde_json::Value;
use sqlx::postgres::{PgArguments, PgConnection, PgRow};
use sqlx::query::Query;
use sqlx::{ConnectOptions, Connection, PgPool, Postgres, Transaction};
use std::str::FromStr;

pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        PgStore { pool }
    }
}

#[async_trait]
impl Store for PgStore {
    async fn open_session(&self) -> Result<Box<dyn Session>, StoreError> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(PgSession { tx: Some(tx) }))
    }

    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").fetch_optional(&self.pool).await?;
        Ok(())
    }
}

/// Dropping an unflushed session rolls its transaction back and returns the connection to the pool.
pub struct PgSession {
    tx: Option<Transaction<'static, Postgres>>,
}

impl PgSession {
    fn conn(&mut self) -> Result<&mut PgConnection, StoreError> {
        self.tx.as_deref_mut().ok_or(StoreError::SessionClosed)
    }
}

fn bind_all(q: &QueryBuf) -> Query<'_, Postgres, PgArguments> {
    tracing::debug!(sql = %q.sql, params = ?q.params, "query");
    let mut query = sqlx::query(&q.sql);
    for p in &q.params {
        query = query.bind(text_param(p));
    }
    query
}

async fn insert_returning_id(
    conn: &mut PgConnection,
    entity: EntityRef<'_>,
    record: &Record,
) -> Result<Value, StoreError> {
    let q = insert(entity, record);
    tracing::debug!(sql = %q.sql, params = ?q.params, "query");
    let mut query = sqlx::query_scalar::<_, String>(&q.sql);
    for p in &q.params {
        query = query.bind(text_param(p));
    }
    let raw = query.fetch_one(&mut *conn).await?;
    entity.id.field_type.parse(&raw).map_err(StoreError::Other)
}

fn require_id(entity: EntityRef<'_>, record: &Record) -> Result<Value, StoreError> {
    entity.id_of(record).ok_or_else(|| {
        StoreError::Other(format!("{} record has no {}", entity.ty.type_name, entity.id.name))
    })
}

#[async_trait]
impl Session for PgSession {
    async fn list(
        &mut self,
        entity: EntityRef<'_>,
        filter: &FilterExpression,
    ) -> Result<Vec<Record>, StoreError> {
        let q = select_list(entity, filter);
        let rows = bind_all(&q).fetch_all(self.conn()?).await?;
        Ok(rows.iter().map(row_to_record).collect())
    }

    async fn get(&mut self, entity: EntityRef<'_>, id: &Value) -> Result<Option<Record>, StoreError> {
        let q = select_by_id(entity, id);
        let row = bind_all(&q).fetch_optional(self.conn()?).await?;
        Ok(row.map(|r| row_to_record(&r)))
    }

    async fn save(&mut self, entity: EntityRef<'_>, record: &Record) -> Result<Value, StoreError> {
        insert_returning_id(self.conn()?, entity, record).await
    }

    /// Runs inside a savepoint so a failed insert does not abort the session's transaction.
    async fn save_isolated(
        &mut self,
        entity: EntityRef<'_>,
        record: &Record,
    ) -> Result<Value, StoreError> {
        let mut savepoint = self.conn()?.begin().await?;
        let id = insert_returning_id(&mut savepoint, entity, record).await?;
        savepoint.commit().await?;
        Ok(id)
    }

    async fn update(&mut self, entity: EntityRef<'_>, record: &Record) -> Result<(), StoreError> {
        let id = require_id(entity, record)?;
        let q = crate::sql::update(entity, &id, record);
        let done = bind_all(&q).execute(self.conn()?).await?;
        if done.rows_affected() == 0 {
            return Err(StoreError::RowNotFound {
                table: entity.ty.table_name.clone(),
                id: id_text(&id),
            });
        }
        Ok(())
    }

    async fn delete(&mut self, entity: EntityRef<'_>, record: &Record) -> Result<(), StoreError> {
        let id = require_id(entity, record)?;
        let q = delete(entity, &id);
        let done = bind_all(&q).execute(self.conn()?).await?;
        if done.rows_affected() == 0 {
            return Err(StoreError::RowNotFound {
                table: entity.ty.table_name.clone(),
                id: id_text(&id),
            });
        }
        Ok(())
    }

    async fn flush(&mut self) -> Result<(), StoreError> {
        let tx = self.tx.take().ok_or(StoreError::SessionClosed)?;
        tx.commit().await?;
        Ok(())
    }
}

fn row_to_record(row: &PgRow) -> Record {
    use sqlx::Column;
    use sqlx::Row;
    let mut map = serde_json::Map::new();
    for col in row.columns() {
        let name = col.name();
        map.insert(name.to_string(), cell_to_value(row, name));
    }
    Record::new(map)
}

fn cell_to_value(row: &PgRow, name: &str) -> Value {
    use sqlx::Row;
    if let Ok(Some(n)) = row.try_get::<Option<i16>, _>(name) {
        return Value::Number(n.into());
    }
    if let Ok(Some(n)) = row.try_get::<Option<i32>, _>(name) {
        return Value::Number(n.into());
    }
    if let Ok(Some(n)) = row.try_get::<Option<i64>, _>(name) {
        return Value::Number(n.into());
    }
    if let Ok(Some(n)) = row.try_get::<Option<f64>, _>(name) {
        if let Some(n) = serde_json::Number::from_f64(n) {
            return Value::Number(n);
        }
    }
    if let Ok(Some(b)) = row.try_get::<Option<bool>, _>(name) {
        return Value::Bool(b);
    }
    if let Ok(Some(u)) = row.try_get::<Option<uuid::Uuid>, _>(name) {
        return Value::String(u.to_string());
    }
    if let Ok(Some(d)) = row.try_get::<Option<chrono::DateTime<chrono::Utc>>, _>(name) {
        return Value::String(d.to_rfc3339());
    }
    if let Ok(Some(s)) = row.try_get::<Option<String>, _>(name) {
        return Value::String(s);
    }
    Value::Null
}

/// Ensure the database in `database_url` exists; create it if not. Connects to the
/// default `postgres` database to run CREATE DATABASE. Call before creating the main pool.
pub async fn ensure_database_exists(database_url: &str) -> Result<(), StoreError> {
    let (admin_url, db_name) = parse_db_name_from_url(database_url)?;
    if db_name.is_empty() || db_name == "postgres" {
        return Ok(());
    }
    let opts = sqlx::postgres::PgConnectOptions::from_str(&admin_url)?;
    let mut conn: PgConnection = opts.connect().await?;
    let exists: (bool,) = sqlx::query_as("SELECT EXISTS(SELECT 1 FROM pg_database WHERE datname = $1)")
        .bind(&db_name)
        .fetch_one(&mut conn)
        .await?;
    if !exists.0 {
        tracing::info!(database = %db_name, "creating database");
        sqlx::query(&format!("CREATE DATABASE {}", crate::sql::quoted(&db_name)))
            .execute(&mut conn)
            .await?;
    }
    Ok(())
}

fn parse_db_name_from_url(url: &str) -> Result<(String, String), StoreError> {
    let path_start = url
        .rfind('/')
        .ok_or_else(|| StoreError::Other("DATABASE_URL: no path".into()))?
        + 1;
    let path_and_query = url.get(path_start..).unwrap_or("");
    let db_name = path_and_query.split('?').next().unwrap_or("").trim();
    let base = url.get(..path_start).unwrap_or(url);
    Ok((format!("{}postgres", base), db_name.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_database_name_from_url() {
        let (admin, db) = parse_db_name_from_url("postgres://u:p@localhost:5432/records?sslmode=disable").unwrap();
        assert_eq!(admin, "postgres://u:p@localhost:5432/postgres");
        assert_eq!(db, "records");
    }
}
