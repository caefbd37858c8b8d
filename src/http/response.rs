//! Uniform JSON response envelope.
//!
//! Every response except `/metrics` has the shape
//! `{success, message?, data?, error?}`. Successful responses carry `data`,
//! failed ones carry `error`; `message` is always set on both paths.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The JSON body shared by every handler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope<T = Value> {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<Value>,
}

impl<T> Envelope<T> {
    pub fn success(message: impl Into<String>, data: Option<T>) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
            data,
            error: None,
        }
    }
}

impl Envelope<Value> {
    pub fn failure(message: impl Into<String>, error: impl Into<Value>) -> Self {
        Self {
            success: false,
            message: Some(message.into()),
            data: None,
            error: Some(error.into()),
        }
    }
}

/// A successful envelope paired with its status code.
#[derive(Debug)]
pub struct ApiResponse<T> {
    status: StatusCode,
    envelope: Envelope<T>,
}

impl<T> ApiResponse<T> {
    pub fn new(status: StatusCode, message: impl Into<String>, data: Option<T>) -> Self {
        Self {
            status,
            envelope: Envelope::success(message, data),
        }
    }

    pub fn ok(message: impl Into<String>, data: T) -> Self {
        Self::new(StatusCode::OK, message, Some(data))
    }

    pub fn created(message: impl Into<String>, data: T) -> Self {
        Self::new(StatusCode::CREATED, message, Some(data))
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl ApiResponse<Value> {
    /// Success without a payload (`data` omitted).
    pub fn empty(message: impl Into<String>) -> Self {
        Self::new(StatusCode::OK, message, None)
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        (self.status, Json(self.envelope)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn success_omits_error() {
        let envelope = Envelope::success("ok", Some(json!({"id": 1})));
        assert_eq!(
            serde_json::to_value(&envelope).unwrap(),
            json!({"success": true, "message": "ok", "data": {"id": 1}})
        );
    }

    #[test]
    fn empty_success_omits_data() {
        let envelope: Envelope<Value> = Envelope::success("User deleted successfully", None);
        assert_eq!(
            serde_json::to_value(&envelope).unwrap(),
            json!({"success": true, "message": "User deleted successfully"})
        );
    }

    #[test]
    fn failure_omits_data() {
        let envelope = Envelope::failure("User not found", "Resource not found");
        assert_eq!(
            serde_json::to_value(&envelope).unwrap(),
            json!({"success": false, "message": "User not found", "error": "Resource not found"})
        );
    }
}
