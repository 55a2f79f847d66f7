//! Convert serde_json::Value to a text parameter; the statement casts it to the column type.

use serde_json::Value;

/// Text form of a value for binding as `$n::<type>`. `None` binds SQL NULL.
pub fn text_param(v: &Value) -> Option<String> {
    match v {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Array(_) | Value::Object(_) => Some(v.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn converts_scalars_to_text() {
        assert_eq!(text_param(&json!(null)), None);
        assert_eq!(text_param(&json!("a'b")).as_deref(), Some("a'b"));
        assert_eq!(text_param(&json!(42)).as_deref(), Some("42"));
        assert_eq!(text_param(&json!(1.5)).as_deref(), Some("1.5"));
        assert_eq!(text_param(&json!(true)).as_deref(), Some("true"));
    }
}
