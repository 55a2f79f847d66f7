//! Storage collaborator: the session interface the dispatcher works through,
//! plus PostgreSQL and in-memory implementations.

pub mod memory;
pub mod postgres;

use crate::config::{FieldDescriptor, TypeDescriptor};
use crate::error::{AppError, ConfigError, StoreError};
use crate::search::FilterExpression;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub use memory::MemoryStore;
pub use postgres::{ensure_database_exists, PgStore};

/// One record instance: a JSON object whose keys are field names.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record(Map<String, Value>);

impl Record {
    pub fn new(fields: Map<String, Value>) -> Self {
        Record(fields)
    }

    pub fn from_value(value: Value) -> Result<Self, AppError> {
        match value {
            Value::Object(m) => Ok(Record(m)),
            _ => Err(AppError::BadRequest("record must be a JSON object".into())),
        }
    }

    pub fn get_field(&self, name: &str) -> Option<&Value> {
        self.0.get(name).filter(|v| !v.is_null())
    }

    /// Returns the previous value.
    pub fn set_field(&mut self, name: &str, value: Value) -> Option<Value> {
        self.0.insert(name.to_string(), value)
    }

    pub fn into_inner(self) -> Map<String, Value> {
        self.0
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }
}

/// A record type together with its resolved identifier field.
#[derive(Clone, Copy, Debug)]
pub struct EntityRef<'a> {
    pub ty: &'a TypeDescriptor,
    pub id: &'a FieldDescriptor,
}

impl<'a> EntityRef<'a> {
    pub fn new(ty: &'a TypeDescriptor) -> Result<Self, ConfigError> {
        Ok(EntityRef {
            ty,
            id: ty.identifier_field()?,
        })
    }

    pub fn id_of(&self, record: &Record) -> Option<Value> {
        record.get_field(&self.id.name).cloned()
    }
}

/// Entry point of a storage backend. Shared by all requests.
#[async_trait]
pub trait Store: Send + Sync + 'static {
    /// Acquire the session for one request. Dropping the session releases it;
    /// writes not flushed by then are discarded.
    async fn open_session(&self) -> Result<Box<dyn Session>, StoreError>;

    /// Readiness probe.
    async fn ping(&self) -> Result<(), StoreError>;
}

#[async_trait]
pub trait Session: Send {
    /// All records of a type matching the filter (empty filter: all records).
    async fn list(
        &mut self,
        entity: EntityRef<'_>,
        filter: &FilterExpression,
    ) -> Result<Vec<Record>, StoreError>;

    async fn get(&mut self, entity: EntityRef<'_>, id: &Value) -> Result<Option<Record>, StoreError>;

    /// Insert a record. Returns its identifier, generated when the record has none.
    async fn save(&mut self, entity: EntityRef<'_>, record: &Record) -> Result<Value, StoreError>;

    /// Like `save`, but a failure leaves earlier writes of this session intact.
    async fn save_isolated(
        &mut self,
        entity: EntityRef<'_>,
        record: &Record,
    ) -> Result<Value, StoreError> {
        self.save(entity, record).await
    }

    /// Replace every field of the record with the same identifier.
    async fn update(&mut self, entity: EntityRef<'_>, record: &Record) -> Result<(), StoreError>;

    async fn delete(&mut self, entity: EntityRef<'_>, record: &Record) -> Result<(), StoreError>;

    /// Make pending writes durable.
    async fn flush(&mut self) -> Result<(), StoreError>;
}

/// Display form of an identifier for error messages.
pub(crate) fn id_text(id: &Value) -> String {
    match id {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
