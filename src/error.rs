//! Typed errors and HTTP mapping.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("missing reference: {kind} '{id}'")]
    MissingReference { kind: &'static str, id: String },
    #[error("duplicate path name: {0}")]
    DuplicatePathName(String),
    #[error("inheritance cycle through {0}")]
    InheritanceCycle(String),
    /// Zero or several identifier fields across a type's ancestor chain.
    #[error("{type_name}'s Id fields: [{}]", fields.join(", "))]
    IdentifierFields { type_name: String, fields: Vec<String> },
    #[error("config load: {0}")]
    Load(String),
    #[error("validation: {0}")]
    Validation(String),
}

/// Failures reported by the storage collaborator.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error(transparent)]
    Db(#[from] sqlx::Error),
    #[error("no {table} row with id {id}")]
    RowNotFound { table: String, id: String },
    #[error("duplicate id {id} in {table}")]
    DuplicateId { table: String, id: String },
    #[error("session already flushed")]
    SessionClosed,
    #[error("{0}")]
    Other(String),
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("unknown record type: {0}")]
    UnknownType(String),
    #[error("invalid search parameters: {0}")]
    InvalidSearch(String),
    #[error("bad request: {0}")]
    BadRequest(String),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Config(_) | AppError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::UnknownType(_) | AppError::InvalidSearch(_) | AppError::BadRequest(_) => {
                StatusCode::BAD_REQUEST
            }
        }
    }

    fn code(&self) -> &'static str {
        match self {
            AppError::Config(_) => "config_error",
            AppError::Store(_) => "storage_error",
            AppError::UnknownType(_) => "unknown_type",
            AppError::InvalidSearch(_) => "invalid_search",
            AppError::BadRequest(_) => "bad_request",
        }
    }
}

#[derive(Serialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

#[derive(Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        } else {
            tracing::debug!(error = %self, "request rejected");
        }
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code().to_string(),
                message: self.to_string(),
            },
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identifier_error_names_type_and_fields() {
        let err = ConfigError::IdentifierFields {
            type_name: "Broken".into(),
            fields: vec!["id".into(), "code".into()],
        };
        assert_eq!(err.to_string(), "Broken's Id fields: [id, code]");
    }

    #[test]
    fn status_mapping() {
        assert_eq!(AppError::UnknownType("x".into()).status(), StatusCode::BAD_REQUEST);
        assert_eq!(AppError::InvalidSearch("x".into()).status(), StatusCode::BAD_REQUEST);
        assert_eq!(AppError::BadRequest("x".into()).status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            AppError::Store(StoreError::Other("boom".into())).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            AppError::Config(ConfigError::Validation("x".into())).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn server_error_message_is_the_underlying_message() {
        let err = AppError::Store(StoreError::Other("disk full".into()));
        assert_eq!(err.to_string(), "disk full");
    }
}
