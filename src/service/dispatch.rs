//! Request dispatch: resolve the record type, validate everything that can be
//! validated without storage, then run the action inside one session.

use crate::config::Registry;
use crate::error::{AppError, StoreError};
use crate::response::{success_many, success_one, Outcome};
use crate::search::{self, FilterExpression};
use crate::service::cascade;
use crate::store::{id_text, EntityRef, Record, Session, Store};
use serde_json::{Map, Value};

/// What a request asks for, before the record type is resolved.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Action {
    ReadAll,
    /// Carries the raw query parameters.
    Search(Vec<(String, String)>),
    ReadOne { id: String },
    Create,
    Update { id: String },
    Delete { id: String },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ApiRequest {
    /// Path form of the type name ("order-item").
    pub type_segment: String,
    pub action: Action,
}

/// Action with its inputs parsed against the resolved type.
#[derive(Debug)]
enum Operation {
    ReadAll,
    Search(FilterExpression),
    ReadOne(Value),
    /// Converted scalar fields, plus the full body for the child cascade.
    Create { record: Record, body: Map<String, Value> },
    Update(Record),
    Delete(Value),
}

pub struct Dispatcher<'a> {
    registry: &'a Registry,
    store: &'a dyn Store,
}

impl<'a> Dispatcher<'a> {
    pub fn new(registry: &'a Registry, store: &'a dyn Store) -> Self {
        Dispatcher { registry, store }
    }

    pub async fn dispatch(&self, request: ApiRequest, body: &[u8]) -> Result<Outcome, AppError> {
        let ty = self
            .registry
            .resolve(&request.type_segment)
            .ok_or_else(|| AppError::UnknownType(request.type_segment.clone()))?;
        let entity = EntityRef::new(ty)?;
        let op = prepare(entity, request.action, body)?;

        let mut session = self.store.open_session().await?;
        self.execute(entity, op, session.as_mut()).await
    }

    async fn execute(
        &self,
        entity: EntityRef<'_>,
        op: Operation,
        session: &mut dyn Session,
    ) -> Result<Outcome, AppError> {
        let ty = entity.ty;
        match op {
            Operation::ReadAll => {
                let rows = session.list(entity, &FilterExpression::default()).await?;
                Ok(success_many(rows.into_iter().map(|r| ty.render(r)).collect()))
            }
            Operation::Search(filter) => {
                tracing::debug!(type_name = %ty.type_name, filter = %filter, "search");
                let rows = session.list(entity, &filter).await?;
                Ok(success_many(rows.into_iter().map(|r| ty.render(r)).collect()))
            }
            Operation::ReadOne(id) => {
                let row = session.get(entity, &id).await?;
                Ok(success_one(row.map(|r| ty.render(r))))
            }
            Operation::Create { record, body } => {
                let id = session.save(entity, &record).await?;
                let report =
                    cascade::save_children(self.registry, entity, &id, &body, session).await;
                session.flush().await?;
                tracing::info!(
                    type_name = %ty.type_name,
                    id = %id_text(&id),
                    children = report.saved,
                    skipped = report.skipped,
                    "created"
                );
                Ok(Outcome::Empty)
            }
            Operation::Update(record) => {
                session.update(entity, &record).await?;
                session.flush().await?;
                Ok(Outcome::Empty)
            }
            Operation::Delete(id) => {
                let target = session
                    .get(entity, &id)
                    .await?
                    .ok_or_else(|| StoreError::RowNotFound {
                        table: ty.table_name.clone(),
                        id: id_text(&id),
                    })?;
                session.delete(entity, &target).await?;
                session.flush().await?;
                Ok(Outcome::Empty)
            }
        }
    }
}

fn prepare(entity: EntityRef<'_>, action: Action, body: &[u8]) -> Result<Operation, AppError> {
    Ok(match action {
        Action::ReadAll => Operation::ReadAll,
        Action::Search(params) => Operation::Search(search::parse(&params, entity.ty)?),
        Action::ReadOne { id } => Operation::ReadOne(parse_id(entity, &id)?),
        Action::Create => {
            let body = parse_body(body)?;
            let record = entity.ty.scalar_fields(&body).map_err(AppError::BadRequest)?;
            Operation::Create { record, body }
        }
        Action::Update { id } => {
            let id = parse_id(entity, &id)?;
            let mut record = entity
                .ty
                .scalar_fields(&parse_body(body)?)
                .map_err(AppError::BadRequest)?;
            // the path identifier wins over any identifier in the body
            record.set_field(&entity.id.name, id);
            Operation::Update(record)
        }
        Action::Delete { id } => Operation::Delete(parse_id(entity, &id)?),
    })
}

fn parse_id(entity: EntityRef<'_>, raw: &str) -> Result<Value, AppError> {
    entity
        .id
        .field_type
        .parse(raw)
        .map_err(|e| AppError::BadRequest(format!("{}: {e}", entity.ty.type_name)))
}

fn parse_body(body: &[u8]) -> Result<Map<String, Value>, AppError> {
    if body.is_empty() {
        return Err(AppError::BadRequest("request body required".into()));
    }
    let value: Value = serde_json::from_slice(body)
        .map_err(|e| AppError::BadRequest(format!("invalid JSON body: {e}")))?;
    Record::from_value(value).map(Record::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{resolve, SchemaConfig};
    use crate::store::MemoryStore;
    use serde_json::json;

    fn registry() -> Registry {
        let schema: SchemaConfig = serde_json::from_value(json!({"types": [
            {"name": "Parent", "fields": [
                {"name": "id", "type": "bigint", "id": true, "generated": true},
                {"name": "name", "type": "text"},
                {"name": "children", "association": {"kind": "one_to_many", "target": "Child", "mapped_by": "parent"}}
            ]},
            {"name": "Child", "fields": [
                {"name": "id", "type": "bigint", "id": true, "generated": true},
                {"name": "name", "type": "text"},
                {"name": "parent", "type": "bigint"}
            ]},
            {"name": "Loose", "fields": [{"name": "label", "type": "text"}]}
        ]}))
        .unwrap();
        resolve(&schema).unwrap()
    }

    fn request(type_segment: &str, action: Action) -> ApiRequest {
        ApiRequest { type_segment: type_segment.into(), action }
    }

    #[tokio::test]
    async fn create_then_read_one() {
        let registry = registry();
        let store = MemoryStore::new();
        let d = Dispatcher::new(&registry, &store);
        let body = br#"{"name":"p","children":[{"name":"c1"}]}"#;
        assert_eq!(d.dispatch(request("parent", Action::Create), body).await.unwrap(), Outcome::Empty);

        let out = d
            .dispatch(request("parent", Action::ReadOne { id: "1".into() }), b"")
            .await
            .unwrap();
        assert_eq!(out, Outcome::Body(json!({"id": 1, "name": "p"})));
        let children = store.rows("Child");
        assert_eq!(children.len(), 1);
        assert_eq!(children[0].get_field("parent"), Some(&json!(1)));
    }

    #[tokio::test]
    async fn invalid_id_fails_before_storage() {
        let registry = registry();
        let store = MemoryStore::new();
        let d = Dispatcher::new(&registry, &store);
        let err = d
            .dispatch(request("parent", Action::Delete { id: "abc".into() }), b"")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
        assert_eq!(store.sessions_opened(), 0);
    }

    #[tokio::test]
    async fn mistyped_body_field_fails_before_storage() {
        let registry = registry();
        let store = MemoryStore::new();
        let d = Dispatcher::new(&registry, &store);
        let err = d
            .dispatch(request("parent", Action::Create), br#"{"id":"abc"}"#)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
        let err = d
            .dispatch(request("parent", Action::Update { id: "1".into() }), br#"{"name":[1]}"#)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
        assert_eq!(store.sessions_opened(), 0);
    }

    #[tokio::test]
    async fn misconfigured_identifier_is_a_server_error() {
        let registry = registry();
        let store = MemoryStore::new();
        let err = Dispatcher::new(&registry, &store)
            .dispatch(request("loose", Action::ReadAll), b"")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Config(_)));
        assert_eq!(err.status().as_u16(), 500);
    }

    #[tokio::test]
    async fn delete_missing_row_fails() {
        let registry = registry();
        let store = MemoryStore::new();
        let err = Dispatcher::new(&registry, &store)
            .dispatch(request("child", Action::Delete { id: "9".into() }), b"")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Store(StoreError::RowNotFound { .. })));
    }

    #[test]
    fn body_must_be_an_object() {
        assert!(matches!(parse_body(b"[1]"), Err(AppError::BadRequest(_))));
        assert!(matches!(parse_body(b"{"), Err(AppError::BadRequest(_))));
        assert!(matches!(parse_body(b""), Err(AppError::BadRequest(_))));
        assert_eq!(parse_body(br#"{"a":1}"#).unwrap().len(), 1);
    }
}
