//! HTTP-facing error taxonomy.
//!
//! Handlers translate collaborator errors into one of these variants; each
//! renders as a failure envelope with a fixed status code.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::Value;
use thiserror::Error;

use crate::http::response::Envelope;
use crate::users::FieldError;

pub const UNEXPECTED_ERROR: &str = "An unexpected error occurred";

#[derive(Debug, Error)]
pub enum ApiError {
    /// Malformed body or identifier.
    #[error("{message}: {detail}")]
    BadRequest { message: String, detail: String },

    /// Field-level constraint failures.
    #[error("Validation failed")]
    Validation(Vec<FieldError>),

    #[error("{0}")]
    NotFound(String),

    /// Duplicate unique field. Reported as a bad request.
    #[error("{message}: {detail}")]
    Conflict { message: String, detail: String },

    /// Store or database unreachable.
    #[error("{0}")]
    Dependency(String),

    #[error("Request timed out")]
    Timeout,

    #[error("Method not allowed")]
    MethodNotAllowed,

    /// Programming error. Never carries internal detail to the client.
    #[error("An unexpected error occurred")]
    Internal,
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>, detail: impl ToString) -> Self {
        ApiError::BadRequest {
            message: message.into(),
            detail: detail.to_string(),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest { .. } | ApiError::Validation(_) | ApiError::Conflict { .. } => {
                StatusCode::BAD_REQUEST
            }
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Timeout => StatusCode::REQUEST_TIMEOUT,
            ApiError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            ApiError::Dependency(_) | ApiError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn envelope(self) -> Envelope<Value> {
        match self {
            ApiError::BadRequest { message, detail } | ApiError::Conflict { message, detail } => {
                Envelope::failure(message, detail)
            }
            ApiError::Validation(errors) => Envelope::failure(
                "Validation failed",
                serde_json::to_value(errors).unwrap_or(Value::Null),
            ),
            ApiError::NotFound(message) => Envelope::failure(message, "Resource not found"),
            ApiError::Dependency(message) => Envelope::failure(message, "Internal server error"),
            ApiError::Timeout => Envelope::failure("Request timed out", "Request timeout"),
            ApiError::MethodNotAllowed => {
                Envelope::failure("Method not allowed", "Method not allowed")
            }
            ApiError::Internal => Envelope::failure(UNEXPECTED_ERROR, "Internal server error"),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        (status, Json(self.envelope())).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn statuses_follow_taxonomy() {
        assert_eq!(
            ApiError::bad_request("Invalid user ID", "bad uuid").status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(ApiError::Validation(vec![]).status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            ApiError::Conflict {
                message: "Failed to create user".into(),
                detail: "exists".into()
            }
            .status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::NotFound("User not found".into()).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::Dependency("Failed to get user".into()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(ApiError::Internal.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn validation_errors_are_itemized() {
        let envelope = ApiError::Validation(vec![FieldError {
            field: "email".into(),
            message: "is required".into(),
        }])
        .envelope();

        assert_eq!(
            serde_json::to_value(envelope).unwrap(),
            json!({
                "success": false,
                "message": "Validation failed",
                "error": [{"field": "email", "message": "is required"}]
            })
        );
    }

    #[test]
    fn internal_error_hides_detail() {
        let envelope = ApiError::Internal.envelope();
        assert_eq!(envelope.message.as_deref(), Some(UNEXPECTED_ERROR));
        assert_eq!(envelope.error, Some(json!("Internal server error")));
    }
}
