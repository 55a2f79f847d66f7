//! Resolved record types: schema metadata validated and flattened for runtime use.

use crate::config::FieldType;
use crate::error::ConfigError;
use crate::store::Record;
use serde_json::{Map, Value};
use std::collections::HashMap;

/// A scalar field, inherited fields included.
#[derive(Clone, Debug)]
pub struct FieldDescriptor {
    pub name: String,
    pub field_type: FieldType,
    pub id: bool,
    pub generated: bool,
    pub nullable: bool,
    pub json_ignore: bool,
}

/// A one-to-many or many-to-many field holding element records.
#[derive(Clone, Debug)]
pub struct AssociationDescriptor {
    pub name: String,
    /// Path name of the element type (key into the registry).
    pub target_path: String,
    pub mapped_by: Option<String>,
    pub json_ignore: bool,
}

#[derive(Clone, Debug)]
pub struct TypeDescriptor {
    /// Simple type name ("OrderItem").
    pub type_name: String,
    pub path_name: String,
    pub table_name: String,
    pub columns: Vec<FieldDescriptor>,
    pub associations: Vec<AssociationDescriptor>,
}

impl TypeDescriptor {
    /// The single identifier field across the type and its ancestors.
    /// Zero or several is a configuration error naming every candidate.
    pub fn identifier_field(&self) -> Result<&FieldDescriptor, ConfigError> {
        let ids: Vec<&FieldDescriptor> = self.columns.iter().filter(|c| c.id).collect();
        match ids.as_slice() {
            [only] => Ok(only),
            _ => Err(ConfigError::IdentifierFields {
                type_name: self.type_name.clone(),
                fields: ids.iter().map(|c| c.name.clone()).collect(),
            }),
        }
    }

    pub fn column(&self, name: &str) -> Option<&FieldDescriptor> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Keep only declared scalar fields of a request body, converted to their
    /// field types; associations and unknown keys are dropped.
    pub fn scalar_fields(&self, body: &Map<String, Value>) -> Result<Record, String> {
        let mut fields = Map::new();
        for (k, v) in body {
            let Some(c) = self.column(k) else {
                continue;
            };
            let value = c
                .field_type
                .coerce(v)
                .map_err(|e| format!("{}.{}: {e}", self.type_name, c.name))?;
            fields.insert(k.clone(), value);
        }
        Ok(Record::new(fields))
    }

    /// JSON for API responses: fields marked json_ignore are omitted.
    pub fn render(&self, record: Record) -> Value {
        let mut map = record.into_inner();
        for c in self.columns.iter().filter(|c| c.json_ignore) {
            map.remove(&c.name);
        }
        for a in self.associations.iter().filter(|a| a.json_ignore) {
            map.remove(&a.name);
        }
        Value::Object(map)
    }
}

/// Path name -> type descriptor. Built once at startup, read-only afterwards.
#[derive(Clone, Debug, Default)]
pub struct Registry {
    pub types: Vec<TypeDescriptor>,
    pub type_by_path: HashMap<String, TypeDescriptor>,
}

impl Registry {
    pub fn resolve(&self, path_name: &str) -> Option<&TypeDescriptor> {
        self.type_by_path.get(path_name)
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn column(name: &str, id: bool) -> FieldDescriptor {
        FieldDescriptor {
            name: name.into(),
            field_type: FieldType::BigInt,
            id,
            generated: id,
            nullable: true,
            json_ignore: false,
        }
    }

    fn descriptor(columns: Vec<FieldDescriptor>) -> TypeDescriptor {
        TypeDescriptor {
            type_name: "Thing".into(),
            path_name: "thing".into(),
            table_name: "Thing".into(),
            columns,
            associations: Vec::new(),
        }
    }

    #[test]
    fn single_identifier_resolves() {
        let d = descriptor(vec![column("id", true), column("size", false)]);
        assert_eq!(d.identifier_field().unwrap().name, "id");
    }

    #[test]
    fn zero_identifiers_is_a_config_error() {
        let d = descriptor(vec![column("size", false)]);
        let err = d.identifier_field().unwrap_err();
        assert_eq!(err.to_string(), "Thing's Id fields: []");
    }

    #[test]
    fn two_identifiers_name_both_fields() {
        let d = descriptor(vec![column("id", true), column("code", true)]);
        let err = d.identifier_field().unwrap_err();
        assert!(matches!(
            err,
            ConfigError::IdentifierFields { ref fields, .. } if fields == &vec!["id".to_string(), "code".to_string()]
        ));
    }

    #[test]
    fn render_omits_ignored_fields() {
        let mut secret = column("secret", false);
        secret.json_ignore = true;
        let d = descriptor(vec![column("id", true), secret]);
        let record = Record::from_value(json!({"id": 1, "secret": 2})).unwrap();
        assert_eq!(d.render(record), json!({"id": 1}));
    }

    #[test]
    fn scalar_fields_drop_unknown_keys() {
        let d = descriptor(vec![column("id", true), column("size", false)]);
        let body = json!({"size": 3, "children": [], "bogus": true});
        let record = d.scalar_fields(body.as_object().unwrap()).unwrap();
        assert_eq!(record.into_value(), json!({"size": 3}));
    }

    #[test]
    fn scalar_fields_convert_to_field_types() {
        let d = descriptor(vec![column("id", true), column("size", false)]);
        let body = json!({"id": "5", "size": null});
        let record = d.scalar_fields(body.as_object().unwrap()).unwrap();
        assert_eq!(record.into_value(), json!({"id": 5, "size": null}));

        let err = d.scalar_fields(json!({"id": "abc"}).as_object().unwrap()).unwrap_err();
        assert!(err.starts_with("Thing.id: "), "{err}");
    }
}
