//! Response envelope shared by every handler
//!
//! Errors are always rendered as `{"error": "<message>"}`. Successful payloads
//! are either returned as-is or nested under a configured field name:
//!
//! | field     | success                | error                  |
//! |-----------|------------------------|------------------------|
//! | none      | `<data>`               | `{"error": "<msg>"}`   |
//! | `"data"`  | `{"data": <data>}`     | `{"error": "<msg>"}`   |
//!
//! # Example
//!
//! ```rust
//! use mongo_rest::response::ResponseFormat;
//! use serde_json::json;
//!
//! let wrapped = ResponseFormat::new(Some("data".to_string()));
//! assert_eq!(wrapped.success(json!(3)), json!({"data": 3}));
//!
//! let bare = ResponseFormat::default();
//! assert_eq!(bare.success(json!([1, 2])), json!([1, 2]));
//!
//! assert_eq!(ResponseFormat::error("not found"), json!({"error": "not found"}));
//! ```

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{Map, Value};

/// Key used for error envelopes
pub const ERROR_FIELD: &str = "error";

/// Envelope rules for one router instance
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResponseFormat {
    field: Option<String>,
}

impl ResponseFormat {
    /// Create a format that nests successful payloads under `field`
    ///
    /// An empty field name behaves like no field at all.
    #[must_use]
    pub fn new(field: Option<String>) -> Self {
        Self {
            field: field.filter(|f| !f.is_empty()),
        }
    }

    /// The configured response field, if any
    #[must_use]
    pub fn field(&self) -> Option<&str> {
        self.field.as_deref()
    }

    /// Build the envelope for a handler outcome
    pub fn envelope(&self, outcome: Result<Value, &str>) -> Value {
        match outcome {
            Ok(data) => self.success(data),
            Err(message) => Self::error(message),
        }
    }

    /// Envelope for a successful payload
    #[must_use]
    pub fn success(&self, data: Value) -> Value {
        match &self.field {
            Some(field) => {
                let mut map = Map::with_capacity(1);
                map.insert(field.clone(), data);
                Value::Object(map)
            }
            None => data,
        }
    }

    /// Envelope for an error message; the response field is never applied
    #[must_use]
    pub fn error(message: &str) -> Value {
        let mut map = Map::with_capacity(1);
        map.insert(ERROR_FIELD.to_string(), Value::String(message.to_string()));
        Value::Object(map)
    }

    /// Render a successful payload as an HTTP response
    pub fn respond(&self, status: StatusCode, data: Value) -> Response {
        (status, Json(self.success(data))).into_response()
    }
}
