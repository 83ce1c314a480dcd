use axum::Json;
use axum::http::StatusCode;
use serde::Serialize;

use crate::applications::FieldViolation;

/// Canonical JSON payload for every failed API call: `{ "success": false, "message": .. }`.
#[derive(Debug, Serialize, Clone)]
pub struct ApiFailure {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<FieldViolation>,
}

impl ApiFailure {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            errors: Vec::new(),
        }
    }

    pub fn with_errors(message: impl Into<String>, errors: Vec<FieldViolation>) -> Self {
        Self {
            errors,
            ..Self::new(message)
        }
    }
}

pub type ApiError = (StatusCode, Json<ApiFailure>);

/// Helper for controllers that need to return `(StatusCode, Json<ApiFailure>)`.
pub fn json_error(status: StatusCode, message: impl Into<String>) -> ApiError {
    (status, Json(ApiFailure::new(message)))
}

pub fn server_error() -> ApiError {
    json_error(
        StatusCode::INTERNAL_SERVER_ERROR,
        "Something went wrong. Please try again later.",
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failure_omits_empty_errors() {
        let json = serde_json::to_value(ApiFailure::new("nope")).unwrap();
        assert_eq!(json, serde_json::json!({ "success": false, "message": "nope" }));
    }
}
