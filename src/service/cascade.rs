//! Save the elements of a created record's associations, pointing each one back
//! at its owner. A child that cannot be saved is logged and skipped; it never
//! fails the owner's create.

use crate::config::{AssociationDescriptor, Registry};
use crate::store::{EntityRef, Record, Session};
use serde_json::{Map, Value};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CascadeReport {
    pub saved: usize,
    pub skipped: usize,
}

/// Prepare one element: resolve its type and set the back-reference field.
/// Without `mapped_by` the element's identifier field receives the owner's id.
fn prepare_child<'r>(
    registry: &'r Registry,
    assoc: &AssociationDescriptor,
    element: &Value,
    parent_id: &Value,
) -> Result<(EntityRef<'r>, Record), String> {
    let ty = registry
        .resolve(&assoc.target_path)
        .ok_or_else(|| format!("unknown element type {}", assoc.target_path))?;
    let entity = EntityRef::new(ty).map_err(|e| e.to_string())?;
    let fields = element
        .as_object()
        .ok_or_else(|| "element is not a JSON object".to_string())?;
    let mut record = ty.scalar_fields(fields)?;

    let link = match assoc.mapped_by.as_deref() {
        Some(name) => ty
            .column(name)
            .ok_or_else(|| format!("{} has no field {name}", ty.type_name))?,
        None => entity.id,
    };
    let value = link.field_type.coerce(parent_id)?;
    record.set_field(&link.name, value);
    Ok((entity, record))
}

pub async fn save_children(
    registry: &Registry,
    parent: EntityRef<'_>,
    parent_id: &Value,
    body: &Map<String, Value>,
    session: &mut dyn Session,
) -> CascadeReport {
    let mut report = CascadeReport::default();
    for assoc in &parent.ty.associations {
        let Some(elements) = body.get(&assoc.name).and_then(Value::as_array) else {
            continue;
        };
        for element in elements {
            let outcome = match prepare_child(registry, assoc, element, parent_id) {
                Ok((child, record)) => session
                    .save_isolated(child, &record)
                    .await
                    .map_err(|e| e.to_string()),
                Err(reason) => Err(reason),
            };
            match outcome {
                Ok(_) => report.saved += 1,
                Err(reason) => {
                    tracing::warn!(
                        owner = %parent.ty.type_name,
                        association = %assoc.name,
                        reason = %reason,
                        "child not saved"
                    );
                    report.skipped += 1;
                }
            }
        }
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{resolve, SchemaConfig};
    use crate::store::{MemoryStore, Store};
    use serde_json::json;

    fn registry() -> Registry {
        let schema: SchemaConfig = serde_json::from_value(json!({"types": [
            {"name": "Parent", "fields": [
                {"name": "id", "type": "bigint", "id": true, "generated": true},
                {"name": "children", "association": {"kind": "one_to_many", "target": "Child", "mapped_by": "parent"}},
                {"name": "tags", "association": {"kind": "many_to_many", "target": "Tag"}}
            ]},
            {"name": "Child", "fields": [
                {"name": "id", "type": "bigint", "id": true, "generated": true},
                {"name": "name", "type": "text"},
                {"name": "parent", "type": "text"}
            ]},
            {"name": "Tag", "fields": [{"name": "label", "type": "text"}]}
        ]}))
        .unwrap();
        resolve(&schema).unwrap()
    }

    #[tokio::test]
    async fn saves_children_and_skips_misconfigured_ones() {
        let registry = registry();
        let store = MemoryStore::new();
        let parent = EntityRef::new(registry.resolve("parent").unwrap()).unwrap();
        let body = json!({
            "children": [{"name": "a"}, {"name": "b"}, 7, {"id": "x"}],
            "tags": [{"label": "x"}]
        });
        let mut session = store.open_session().await.unwrap();
        let report = save_children(
            &registry,
            parent,
            &json!(5),
            body.as_object().unwrap(),
            session.as_mut(),
        )
        .await;
        session.flush().await.unwrap();

        assert_eq!(report, CascadeReport { saved: 2, skipped: 3 });
        let children = store.rows("Child");
        assert_eq!(children.len(), 2);
        // back-reference is converted to the child's field type
        assert_eq!(children[0].get_field("parent"), Some(&json!("5")));
        assert!(store.rows("Tag").is_empty());
    }

    #[tokio::test]
    async fn missing_association_key_saves_nothing() {
        let registry = registry();
        let store = MemoryStore::new();
        let parent = EntityRef::new(registry.resolve("parent").unwrap()).unwrap();
        let mut session = store.open_session().await.unwrap();
        let report =
            save_children(&registry, parent, &json!(1), &Map::new(), session.as_mut()).await;
        assert_eq!(report, CascadeReport::default());
    }
}
