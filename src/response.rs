//! Successful dispatch outcomes.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::Value;

/// Result of a dispatched request that did not fail.
#[derive(Debug, PartialEq)]
pub enum Outcome {
    /// 200 with a JSON body (a record, a list of records, or `null`).
    Body(Value),
    /// 200 with no body.
    Empty,
}

impl IntoResponse for Outcome {
    fn into_response(self) -> Response {
        match self {
            Outcome::Body(v) => (StatusCode::OK, Json(v)).into_response(),
            Outcome::Empty => StatusCode::OK.into_response(),
        }
    }
}

pub fn success_many(rows: Vec<Value>) -> Outcome {
    Outcome::Body(Value::Array(rows))
}

/// A missing record is still a success: the body is `null`.
pub fn success_one(row: Option<Value>) -> Outcome {
    Outcome::Body(row.unwrap_or(Value::Null))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn missing_record_is_null_body() {
        assert_eq!(success_one(None), Outcome::Body(Value::Null));
    }

    #[test]
    fn status_is_ok_for_both_shapes() {
        assert_eq!(Outcome::Empty.into_response().status(), StatusCode::OK);
        assert_eq!(success_many(vec![json!({"id": 1})]).into_response().status(), StatusCode::OK);
    }
}
