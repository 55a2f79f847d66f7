//! In-memory storage. Sessions buffer writes and apply them atomically on `flush`;
//! reads see flushed state only.

use crate::config::FieldType;
use crate::error::StoreError;
use crate::search::{FilterExpression, Operator, Predicate};
use crate::store::{id_text, EntityRef, Record, Session, Store};
use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{Number, Value};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};
use std::sync::Arc;

#[derive(Clone, Debug, Default)]
struct Tables {
    /// Table name -> rows in insertion order.
    rows: HashMap<String, Vec<Record>>,
    sequences: HashMap<String, i64>,
}

#[derive(Default)]
pub struct MemoryStore {
    tables: Arc<Mutex<Tables>>,
    sessions_opened: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of sessions acquired so far.
    pub fn sessions_opened(&self) -> usize {
        self.sessions_opened.load(AtomicOrdering::SeqCst)
    }

    /// Flushed rows of a table.
    pub fn rows(&self, table: &str) -> Vec<Record> {
        self.tables.lock().rows.get(table).cloned().unwrap_or_default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn open_session(&self) -> Result<Box<dyn Session>, StoreError> {
        self.sessions_opened.fetch_add(1, AtomicOrdering::SeqCst);
        Ok(Box::new(MemorySession {
            tables: Arc::clone(&self.tables),
            pending: Vec::new(),
        }))
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

#[derive(Debug)]
enum Write {
    Insert { table: String, id_field: String, record: Record },
    Update { table: String, id_field: String, id: Value, record: Record },
    Delete { table: String, id_field: String, id: Value },
}

pub struct MemorySession {
    tables: Arc<Mutex<Tables>>,
    pending: Vec<Write>,
}

fn same_id(record: &Record, id_field: &str, id: &Value) -> bool {
    record.get_field(id_field).map(|v| values_equal(v, id)).unwrap_or(false)
}

fn values_equal(a: &Value, b: &Value) -> bool {
    compare_values(a, b) == Some(Ordering::Equal)
}

fn compare_values(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => compare_numbers(x, y),
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        _ => None,
    }
}

/// Integers compare exactly; floats only when either side is one.
fn compare_numbers(x: &Number, y: &Number) -> Option<Ordering> {
    if let (Some(a), Some(b)) = (x.as_i64(), y.as_i64()) {
        return Some(a.cmp(&b));
    }
    if let (Some(a), Some(b)) = (x.as_u64(), y.as_u64()) {
        return Some(a.cmp(&b));
    }
    if x.is_f64() || y.is_f64() {
        return x.as_f64()?.partial_cmp(&y.as_f64()?);
    }
    // a negative integer against one above i64::MAX
    Some(if x.as_i64().is_some() { Ordering::Less } else { Ordering::Greater })
}

fn text_of(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn matches(record: &Record, predicate: &Predicate, field_type: FieldType) -> bool {
    let Some(value) = record.get_field(&predicate.column) else {
        return false;
    };
    if predicate.operator == Operator::Like {
        return text_of(value).contains(&predicate.value);
    }
    let Ok(operand) = field_type.parse(&predicate.value) else {
        return false;
    };
    let Some(ord) = compare_values(value, &operand) else {
        return false;
    };
    match predicate.operator {
        Operator::Equal => ord == Ordering::Equal,
        Operator::Greater => ord == Ordering::Greater,
        Operator::Less => ord == Ordering::Less,
        Operator::GreaterOrEqual => ord != Ordering::Less,
        Operator::LessOrEqual => ord != Ordering::Greater,
        Operator::Like => unreachable!("handled above"),
    }
}

impl MemorySession {
    fn generate_id(&self, entity: EntityRef<'_>) -> Result<Value, StoreError> {
        match entity.id.field_type {
            FieldType::BigInt | FieldType::Int => {
                let mut tables = self.tables.lock();
                let next = tables
                    .sequences
                    .entry(entity.ty.table_name.clone())
                    .or_insert(0);
                *next += 1;
                Ok(Value::Number((*next).into()))
            }
            FieldType::Uuid | FieldType::Text => Ok(Value::String(uuid::Uuid::new_v4().to_string())),
            other => Err(StoreError::Other(format!(
                "cannot generate {} identifier for {}",
                other.pg_type(),
                entity.ty.type_name
            ))),
        }
    }

    fn id_taken(&self, table: &str, id_field: &str, id: &Value) -> bool {
        let flushed = self
            .tables
            .lock()
            .rows
            .get(table)
            .map(|rows| rows.iter().any(|r| same_id(r, id_field, id)))
            .unwrap_or(false);
        flushed
            || self.pending.iter().any(|w| match w {
                Write::Insert { table: t, id_field, record } => t == table && same_id(record, id_field, id),
                _ => false,
            })
    }
}

fn apply(tables: &mut Tables, write: Write) -> Result<(), StoreError> {
    match write {
        Write::Insert { table, record, .. } => {
            tables.rows.entry(table).or_default().push(record);
        }
        Write::Update { table, id_field, id, record } => {
            let row = tables
                .rows
                .get_mut(&table)
                .and_then(|rows| rows.iter_mut().find(|r| same_id(r, &id_field, &id)))
                .ok_or_else(|| StoreError::RowNotFound { table: table.clone(), id: id_text(&id) })?;
            *row = record;
        }
        Write::Delete { table, id_field, id } => {
            let rows = tables.rows.entry(table.clone()).or_default();
            let before = rows.len();
            rows.retain(|r| !same_id(r, &id_field, &id));
            if rows.len() == before {
                return Err(StoreError::RowNotFound { table, id: id_text(&id) });
            }
        }
    }
    Ok(())
}

#[async_trait]
impl Session for MemorySession {
    async fn list(
        &mut self,
        entity: EntityRef<'_>,
        filter: &FilterExpression,
    ) -> Result<Vec<Record>, StoreError> {
        tracing::debug!(table = %entity.ty.table_name, filter = %filter, "memory list");
        let tables = self.tables.lock();
        let rows = tables.rows.get(&entity.ty.table_name).map(Vec::as_slice).unwrap_or(&[]);
        Ok(rows
            .iter()
            .filter(|r| {
                filter.iter().all(|p| {
                    entity
                        .ty
                        .column(&p.column)
                        .map(|c| matches(r, p, c.field_type))
                        .unwrap_or(false)
                })
            })
            .cloned()
            .collect())
    }

    async fn get(&mut self, entity: EntityRef<'_>, id: &Value) -> Result<Option<Record>, StoreError> {
        let tables = self.tables.lock();
        Ok(tables
            .rows
            .get(&entity.ty.table_name)
            .and_then(|rows| rows.iter().find(|r| same_id(r, &entity.id.name, id)))
            .cloned())
    }

    async fn save(&mut self, entity: EntityRef<'_>, record: &Record) -> Result<Value, StoreError> {
        let mut record = record.clone();
        let id = match entity.id_of(&record) {
            Some(id) => id,
            None if entity.id.generated => self.generate_id(entity)?,
            None => {
                return Err(StoreError::Other(format!(
                    "{} record has no {}",
                    entity.ty.type_name, entity.id.name
                )))
            }
        };
        let table = entity.ty.table_name.clone();
        if self.id_taken(&table, &entity.id.name, &id) {
            return Err(StoreError::DuplicateId { table, id: id_text(&id) });
        }
        for c in &entity.ty.columns {
            if !c.nullable && record.get_field(&c.name).is_none() && c.name != entity.id.name {
                return Err(StoreError::Other(format!(
                    "{}.{} must not be null",
                    entity.ty.table_name, c.name
                )));
            }
        }
        record.set_field(&entity.id.name, id.clone());
        self.pending.push(Write::Insert {
            table,
            id_field: entity.id.name.clone(),
            record,
        });
        Ok(id)
    }

    async fn update(&mut self, entity: EntityRef<'_>, record: &Record) -> Result<(), StoreError> {
        let id = entity.id_of(record).ok_or_else(|| {
            StoreError::Other(format!("{} record has no {}", entity.ty.type_name, entity.id.name))
        })?;
        self.pending.push(Write::Update {
            table: entity.ty.table_name.clone(),
            id_field: entity.id.name.clone(),
            id,
            record: record.clone(),
        });
        Ok(())
    }

    async fn delete(&mut self, entity: EntityRef<'_>, record: &Record) -> Result<(), StoreError> {
        let id = entity.id_of(record).ok_or_else(|| {
            StoreError::Other(format!("{} record has no {}", entity.ty.type_name, entity.id.name))
        })?;
        self.pending.push(Write::Delete {
            table: entity.ty.table_name.clone(),
            id_field: entity.id.name.clone(),
            id,
        });
        Ok(())
    }

    async fn flush(&mut self) -> Result<(), StoreError> {
        let mut tables = self.tables.lock();
        let mut staged = tables.clone();
        for write in self.pending.drain(..) {
            apply(&mut staged, write)?;
        }
        *tables = staged;
        Ok(())
    }
}
