//! API error type for the collection handlers
//!
//! Every failure a handler can produce ends up as an [`ApiError`], which
//! renders as `{"error": "<message>"}`. Only [`ApiErrorKind::NotFound`] maps to
//! 404; everything else, backend failures included, is a 400.
//!
//! # Example
//!
//! ```rust
//! use axum::http::StatusCode;
//! use mongo_rest::handlers::{ApiError, ApiErrorKind, ApiOperation};
//!
//! let error = ApiError::not_found(ApiOperation::Get);
//! assert!(matches!(error.kind, ApiErrorKind::NotFound));
//! assert_eq!(error.status_code(), StatusCode::NOT_FOUND);
//! assert_eq!(error.message, "not found");
//! ```

use std::fmt;

use axum::{
    extract::rejection::{BytesRejection, PathRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

use crate::document::DocumentError;
use crate::id::InvalidIdentifier;
use crate::response::ResponseFormat;
use crate::store::{StoreError, StoreErrorKind};

/// Handler that produced the error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ApiOperation {
    /// Listing or counting a collection
    List,
    /// Getting a single document by id
    Get,
    /// Creating a document
    Create,
    /// Replacing a document's fields
    Replace,
    /// Deleting a document
    Delete,
}

impl fmt::Display for ApiOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::List => write!(f, "list"),
            Self::Get => write!(f, "get"),
            Self::Create => write!(f, "create"),
            Self::Replace => write!(f, "replace"),
            Self::Delete => write!(f, "delete"),
        }
    }
}

/// Category of API error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ApiErrorKind {
    /// A path segment could not be extracted
    InvalidPath,
    /// The path segment could not be used as an `_id`
    InvalidIdentifier,
    /// The request body could not be read or is not a JSON object
    MalformedBody,
    /// No document matched
    NotFound,
    /// The store rejected or failed the operation
    Store,
}

impl fmt::Display for ApiErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidPath => write!(f, "invalid_path"),
            Self::InvalidIdentifier => write!(f, "invalid_identifier"),
            Self::MalformedBody => write!(f, "malformed_body"),
            Self::NotFound => write!(f, "not_found"),
            Self::Store => write!(f, "store"),
        }
    }
}

impl ApiErrorKind {
    /// Get the HTTP status code for this error kind
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::InvalidPath
            | Self::InvalidIdentifier
            | Self::MalformedBody
            | Self::Store => StatusCode::BAD_REQUEST,
        }
    }
}

/// Structured API error with operation context
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    /// The handler that failed
    pub operation: ApiOperation,
    /// The category of error
    pub kind: ApiErrorKind,
    /// Message sent to the client
    pub message: String,
}

impl ApiError {
    /// Create a new API error
    pub fn new(operation: ApiOperation, kind: ApiErrorKind, message: impl Into<String>) -> Self {
        Self {
            operation,
            kind,
            message: message.into(),
        }
    }

    /// Create a "not found" error
    pub fn not_found(operation: ApiOperation) -> Self {
        Self::new(operation, ApiErrorKind::NotFound, "not found")
    }

    /// Create an invalid identifier error
    pub fn invalid_identifier(operation: ApiOperation) -> Self {
        Self::new(
            operation,
            ApiErrorKind::InvalidIdentifier,
            InvalidIdentifier.to_string(),
        )
    }

    /// Create a malformed body error
    pub fn malformed_body(operation: ApiOperation, message: impl Into<String>) -> Self {
        Self::new(operation, ApiErrorKind::MalformedBody, message)
    }

    /// Set the operation that caused the error
    #[must_use]
    pub fn with_operation(mut self, operation: ApiOperation) -> Self {
        self.operation = operation;
        self
    }

    /// HTTP status for this error
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        self.kind.status_code()
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "API {} error during {}: {}",
            self.kind, self.operation, self.message
        )
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        if self.kind == ApiErrorKind::NotFound {
            tracing::debug!(
                operation = %self.operation,
                kind = %self.kind,
                status = status.as_u16(),
                "{}", self.message
            );
        } else {
            tracing::warn!(
                operation = %self.operation,
                kind = %self.kind,
                status = status.as_u16(),
                "{}", self.message
            );
        }

        (status, Json(ResponseFormat::error(&self.message))).into_response()
    }
}

// Conversions set a placeholder operation; handlers fix it with `with_operation`.

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        let kind = match err.kind {
            StoreErrorKind::NotFound => ApiErrorKind::NotFound,
            _ => ApiErrorKind::Store,
        };
        Self::new(ApiOperation::List, kind, err.message)
    }
}

impl From<InvalidIdentifier> for ApiError {
    fn from(_: InvalidIdentifier) -> Self {
        Self::invalid_identifier(ApiOperation::Get)
    }
}

impl From<DocumentError> for ApiError {
    fn from(err: DocumentError) -> Self {
        Self::malformed_body(ApiOperation::Create, err.to_string())
    }
}

impl From<BytesRejection> for ApiError {
    fn from(err: BytesRejection) -> Self {
        Self::malformed_body(ApiOperation::Create, err.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(err: PathRejection) -> Self {
        Self::new(ApiOperation::Get, ApiErrorKind::InvalidPath, err.body_text())
    }
}

/// Result type for handlers
pub type ApiResult<T> = std::result::Result<T, ApiError>;
