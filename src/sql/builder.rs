//! Builds parameterized SELECT, INSERT, UPDATE, DELETE for a record type.
//! Identifiers come from schema metadata only; values are always parameters.

use crate::config::{FieldDescriptor, FieldType};
use crate::search::{FilterExpression, Operator};
use crate::store::{EntityRef, Record};
use serde_json::Value;

/// Quote identifier for PostgreSQL (safe: only from metadata).
pub fn quoted(s: &str) -> String {
    format!("\"{}\"", s.replace('"', "\"\""))
}

#[derive(Debug)]
pub struct QueryBuf {
    pub sql: String,
    pub params: Vec<Value>,
}

impl QueryBuf {
    fn new() -> Self {
        QueryBuf {
            sql: String::new(),
            params: Vec::new(),
        }
    }

    /// Push a parameter and return its placeholder with a cast to the column type.
    fn push_param(&mut self, v: Value, field_type: FieldType) -> String {
        self.params.push(v);
        format!("${}::{}", self.params.len(), field_type.pg_type())
    }
}

/// SELECT list: timestamps as text so they decode as RFC 3339 strings.
fn select_column_list(entity: EntityRef<'_>) -> String {
    entity
        .ty
        .columns
        .iter()
        .map(|c| {
            let q = quoted(&c.name);
            match c.field_type {
                FieldType::Timestamptz => format!("to_json({q}) #>> '{{}}' AS {q}"),
                FieldType::Uuid => format!("{q}::text AS {q}"),
                _ => q,
            }
        })
        .collect::<Vec<_>>()
        .join(", ")
}

fn table(entity: EntityRef<'_>) -> String {
    quoted(&entity.ty.table_name)
}

/// SELECT all rows matching the filter (predicates ANDed), ordered by identifier.
pub fn select_list(entity: EntityRef<'_>, filter: &FilterExpression) -> QueryBuf {
    let mut q = QueryBuf::new();
    let mut where_parts = Vec::new();
    for p in filter.iter() {
        let Some(column) = entity.ty.column(&p.column) else {
            continue;
        };
        let col = quoted(&column.name);
        let part = match p.operator {
            Operator::Like => {
                let ph = q.push_param(Value::String(p.operand()), FieldType::Text);
                format!("{col}::text LIKE {ph}")
            }
            op => {
                let ph = q.push_param(Value::String(p.value.clone()), column.field_type);
                format!("{col} {} {ph}", op.symbol())
            }
        };
        where_parts.push(part);
    }
    let where_clause = if where_parts.is_empty() {
        String::new()
    } else {
        format!(" WHERE {}", where_parts.join(" AND "))
    };
    q.sql = format!(
        "SELECT {} FROM {}{} ORDER BY {}",
        select_column_list(entity),
        table(entity),
        where_clause,
        quoted(&entity.id.name)
    );
    q
}

/// SELECT by identifier.
pub fn select_by_id(entity: EntityRef<'_>, id: &Value) -> QueryBuf {
    let mut q = QueryBuf::new();
    let ph = q.push_param(id.clone(), entity.id.field_type);
    q.sql = format!(
        "SELECT {} FROM {} WHERE {} = {}",
        select_column_list(entity),
        table(entity),
        quoted(&entity.id.name),
        ph
    );
    q
}

fn writes_column(c: &FieldDescriptor, record: &Record) -> bool {
    !(c.id && c.generated && record.get_field(&c.name).is_none())
}

/// INSERT every declared column (absent fields as NULL); a generated identifier
/// is left to the database when the record has none. Returns the identifier.
pub fn insert(entity: EntityRef<'_>, record: &Record) -> QueryBuf {
    let mut q = QueryBuf::new();
    let mut cols = Vec::new();
    let mut placeholders = Vec::new();
    for c in entity.ty.columns.iter().filter(|c| writes_column(c, record)) {
        let val = record.get_field(&c.name).cloned().unwrap_or(Value::Null);
        placeholders.push(q.push_param(val, c.field_type));
        cols.push(quoted(&c.name));
    }
    let id = quoted(&entity.id.name);
    q.sql = if cols.is_empty() {
        format!("INSERT INTO {} DEFAULT VALUES RETURNING {}::text", table(entity), id)
    } else {
        format!(
            "INSERT INTO {} ({}) VALUES ({}) RETURNING {}::text",
            table(entity),
            cols.join(", "),
            placeholders.join(", "),
            id
        )
    };
    q
}

/// UPDATE by identifier: every non-identifier column is overwritten.
pub fn update(entity: EntityRef<'_>, id: &Value, record: &Record) -> QueryBuf {
    let mut q = QueryBuf::new();
    let mut sets = Vec::new();
    for c in entity.ty.columns.iter().filter(|c| c.name != entity.id.name) {
        let val = record.get_field(&c.name).cloned().unwrap_or(Value::Null);
        let ph = q.push_param(val, c.field_type);
        sets.push(format!("{} = {}", quoted(&c.name), ph));
    }
    let id_ph = q.push_param(id.clone(), entity.id.field_type);
    let id_col = quoted(&entity.id.name);
    if sets.is_empty() {
        // nothing to overwrite; still report whether the row exists
        sets.push(format!("{id_col} = {id_col}"));
    }
    q.sql = format!(
        "UPDATE {} SET {} WHERE {} = {}",
        table(entity),
        sets.join(", "),
        id_col,
        id_ph
    );
    q
}

/// DELETE by identifier.
pub fn delete(entity: EntityRef<'_>, id: &Value) -> QueryBuf {
    let mut q = QueryBuf::new();
    let ph = q.push_param(id.clone(), entity.id.field_type);
    q.sql = format!(
        "DELETE FROM {} WHERE {} = {}",
        table(entity),
        quoted(&entity.id.name),
        ph
    );
    q
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TypeDescriptor;
    use crate::search::Predicate;
    use serde_json::json;

    fn field(name: &str, field_type: FieldType, id: bool) -> FieldDescriptor {
        FieldDescriptor {
            name: name.into(),
            field_type,
            id,
            generated: id,
            nullable: true,
            json_ignore: false,
        }
    }

    fn order_item() -> TypeDescriptor {
        TypeDescriptor {
            type_name: "OrderItem".into(),
            path_name: "order-item".into(),
            table_name: "OrderItem".into(),
            columns: vec![
                field("id", FieldType::BigInt, true),
                field("name", FieldType::Text, false),
                field("qty", FieldType::Int, false),
            ],
            associations: Vec::new(),
        }
    }

    #[test]
    fn select_list_binds_every_value() {
        let ty = order_item();
        let entity = EntityRef::new(&ty).unwrap();
        let mut like = Predicate::new("name", "o'k");
        like.operator = Operator::Like;
        let mut gt = Predicate::new("qty", "2");
        gt.operator = Operator::Greater;
        let q = select_list(entity, &FilterExpression { predicates: vec![like, gt] });
        assert_eq!(
            q.sql,
            "SELECT \"id\", \"name\", \"qty\" FROM \"OrderItem\" WHERE \"name\"::text LIKE $1::text AND \"qty\" > $2::integer ORDER BY \"id\""
        );
        assert_eq!(q.params, vec![json!("%o'k%"), json!("2")]);
    }

    #[test]
    fn select_list_without_filter() {
        let ty = order_item();
        let q = select_list(EntityRef::new(&ty).unwrap(), &FilterExpression::default());
        assert!(!q.sql.contains("WHERE"));
        assert!(q.params.is_empty());
    }

    #[test]
    fn insert_leaves_generated_id_to_database() {
        let ty = order_item();
        let record = Record::from_value(json!({"name": "bolt"})).unwrap();
        let q = insert(EntityRef::new(&ty).unwrap(), &record);
        assert_eq!(
            q.sql,
            "INSERT INTO \"OrderItem\" (\"name\", \"qty\") VALUES ($1::text, $2::integer) RETURNING \"id\"::text"
        );
        assert_eq!(q.params, vec![json!("bolt"), Value::Null]);
    }

    #[test]
    fn insert_keeps_supplied_id() {
        let ty = order_item();
        let record = Record::from_value(json!({"id": 9, "name": "bolt", "qty": 1})).unwrap();
        let q = insert(EntityRef::new(&ty).unwrap(), &record);
        assert!(q.sql.starts_with("INSERT INTO \"OrderItem\" (\"id\", \"name\", \"qty\")"));
        assert_eq!(q.params[0], json!(9));
    }

    #[test]
    fn update_and_delete_by_id() {
        let ty = order_item();
        let entity = EntityRef::new(&ty).unwrap();
        let record = Record::from_value(json!({"id": 3, "name": "nut"})).unwrap();
        let q = update(entity, &json!(3), &record);
        assert_eq!(
            q.sql,
            "UPDATE \"OrderItem\" SET \"name\" = $1::text, \"qty\" = $2::integer WHERE \"id\" = $3::bigint"
        );
        assert_eq!(q.params, vec![json!("nut"), Value::Null, json!(3)]);

        let q = delete(entity, &json!(3));
        assert_eq!(q.sql, "DELETE FROM \"OrderItem\" WHERE \"id\" = $1::bigint");
    }

    #[test]
    fn quotes_identifiers() {
        assert_eq!(quoted("we\"ird"), "\"we\"\"ird\"");
    }
}
