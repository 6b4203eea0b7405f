//! Engine-shaped error responses: `{"error": {"type", "reason", ...}, "status": n}`.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};

#[derive(Debug, Clone, PartialEq)]
pub struct EngineError {
    pub status: StatusCode,
    pub kind: &'static str,
    pub reason: String,
    pub index: Option<String>,
}

impl EngineError {
    fn new(status: StatusCode, kind: &'static str, reason: impl Into<String>) -> Self {
        Self {
            status,
            kind,
            reason: reason.into(),
            index: None,
        }
    }

    pub fn index_not_found(index: &str) -> Self {
        Self {
            index: Some(index.to_string()),
            ..Self::new(StatusCode::NOT_FOUND, "index_not_found_exception", "no such index")
        }
    }

    pub fn index_exists(index: &str) -> Self {
        Self {
            index: Some(index.to_string()),
            ..Self::new(
                StatusCode::BAD_REQUEST,
                "resource_already_exists_exception",
                format!("index [{index}] already exists"),
            )
        }
    }

    pub fn invalid_index_name(index: &str, why: &str) -> Self {
        Self {
            index: Some(index.to_string()),
            ..Self::new(
                StatusCode::BAD_REQUEST,
                "invalid_index_name_exception",
                format!("Invalid index name [{index}], {why}"),
            )
        }
    }

    pub fn parse(reason: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "parse_exception", reason)
    }

    pub fn parsing(reason: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "parsing_exception", reason)
    }

    pub fn validation(reason: impl Into<String>) -> Self {
        Self::new(
            StatusCode::BAD_REQUEST,
            "action_request_validation_exception",
            reason,
        )
    }

    pub fn illegal_argument(reason: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "illegal_argument_exception", reason)
    }

    pub fn not_found(kind: &'static str, reason: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, kind, reason)
    }

    pub fn conflict(reason: impl Into<String>) -> Self {
        Self::new(
            StatusCode::CONFLICT,
            "version_conflict_engine_exception",
            reason,
        )
    }

    /// The `error` object without the surrounding status, as used inside
    /// bulk items and multi-search responses.
    pub fn body(&self) -> Value {
        let mut error = json!({ "type": self.kind, "reason": self.reason });
        if let Some(index) = &self.index {
            error["index"] = json!(index);
        }
        error
    }

    pub fn to_json(&self) -> Value {
        json!({ "error": self.body(), "status": self.status.as_u16() })
    }
}

impl IntoResponse for EngineError {
    fn into_response(self) -> Response {
        (self.status, Json(self.to_json())).into_response()
    }
}
