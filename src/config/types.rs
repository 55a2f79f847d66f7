//! Raw schema metadata types matching the JSON schema file.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Storage type of a scalar field. Each type owns the canonical parser used to
/// turn path segments and query values into typed JSON values.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    BigInt,
    Int,
    Text,
    Uuid,
    Bool,
    Float,
    Timestamptz,
}

impl FieldType {
    /// PostgreSQL type name, used for DDL and parameter casts.
    pub fn pg_type(&self) -> &'static str {
        match self {
            FieldType::BigInt => "bigint",
            FieldType::Int => "integer",
            FieldType::Text => "text",
            FieldType::Uuid => "uuid",
            FieldType::Bool => "boolean",
            FieldType::Float => "double precision",
            FieldType::Timestamptz => "timestamptz",
        }
    }

    /// Parse a string (path segment, query value) into a value of this type.
    pub fn parse(&self, s: &str) -> Result<Value, String> {
        Ok(match self {
            FieldType::BigInt => {
                let n: i64 = s.parse().map_err(|_| format!("invalid bigint: {s}"))?;
                Value::Number(n.into())
            }
            FieldType::Int => {
                let n: i32 = s.parse().map_err(|_| format!("invalid int: {s}"))?;
                Value::Number(n.into())
            }
            FieldType::Text => Value::String(s.to_string()),
            FieldType::Uuid => {
                let u = uuid::Uuid::parse_str(s).map_err(|_| format!("invalid uuid: {s}"))?;
                Value::String(u.to_string())
            }
            FieldType::Bool => {
                if s.eq_ignore_ascii_case("true") {
                    Value::Bool(true)
                } else if s.eq_ignore_ascii_case("false") {
                    Value::Bool(false)
                } else {
                    return Err(format!("invalid bool: {s}"));
                }
            }
            FieldType::Float => {
                let f: f64 = s.parse().map_err(|_| format!("invalid float: {s}"))?;
                serde_json::Number::from_f64(f)
                    .map(Value::Number)
                    .ok_or_else(|| format!("invalid float: {s}"))?
            }
            FieldType::Timestamptz => {
                let t = chrono::DateTime::parse_from_rfc3339(s)
                    .map_err(|_| format!("invalid timestamp: {s}"))?;
                Value::String(t.with_timezone(&chrono::Utc).to_rfc3339())
            }
        })
    }

    /// Convert an already typed value (e.g. a generated id) to this type.
    pub fn coerce(&self, v: &Value) -> Result<Value, String> {
        match v {
            Value::Null => Ok(Value::Null),
            Value::String(s) => self.parse(s),
            Value::Number(n) => self.parse(&n.to_string()),
            Value::Bool(b) => self.parse(if *b { "true" } else { "false" }),
            Value::Array(_) | Value::Object(_) => {
                Err(format!("cannot convert {v} to {}", self.pg_type()))
            }
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssociationKind {
    OneToMany,
    ManyToMany,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AssociationConfig {
    pub kind: AssociationKind,
    /// Name of the element record type.
    pub target: String,
    /// Field of the element that refers back to the owner.
    #[serde(default)]
    pub mapped_by: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FieldConfig {
    pub name: String,
    /// Required for scalar fields, ignored for associations.
    #[serde(default, rename = "type")]
    pub type_: Option<FieldType>,
    #[serde(default)]
    pub id: bool,
    /// Value assigned by storage on insert.
    #[serde(default)]
    pub generated: bool,
    #[serde(default = "default_true")]
    pub nullable: bool,
    /// Never written to API responses.
    #[serde(default)]
    pub json_ignore: bool,
    #[serde(default)]
    pub association: Option<AssociationConfig>,
}

fn default_true() -> bool {
    true
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RecordTypeConfig {
    /// Type name, optionally package-qualified ("shop.OrderItem").
    pub name: String,
    #[serde(default)]
    pub extends: Option<String>,
    /// False for mapped superclasses: they contribute fields but get no route or table.
    #[serde(default = "default_true")]
    pub entity: bool,
    #[serde(default)]
    pub fields: Vec<FieldConfig>,
}

/// The whole schema file.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct SchemaConfig {
    pub types: Vec<RecordTypeConfig>,
}

impl SchemaConfig {
    pub fn type_by_name(&self, name: &str) -> Option<&RecordTypeConfig> {
        self.types.iter().find(|t| t.name == name)
    }
}
