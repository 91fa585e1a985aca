//! Store error types
//!
//! Backends report failures as [`StoreError`], which records the operation
//! that failed and a coarse category. Handlers only distinguish
//! [`StoreErrorKind::NotFound`] from everything else.
//!
//! # Example
//!
//! ```rust
//! use mongo_rest::store::{StoreError, StoreErrorKind, StoreOperation};
//!
//! let error = StoreError::not_found(StoreOperation::FindById);
//! assert!(matches!(error.kind, StoreErrorKind::NotFound));
//! assert_eq!(error.message, "not found");
//! ```

use std::fmt;

/// Operation being performed when the store error occurred
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOperation {
    /// Connecting to the backend
    Connect,
    /// Querying a collection
    FindAll,
    /// Counting documents
    Count,
    /// Looking up a single document by id
    FindById,
    /// Inserting a document
    Create,
    /// Replacing a document's fields
    Replace,
    /// Removing a document
    Delete,
    /// Incrementing a sequence counter
    NextSequence,
}

impl fmt::Display for StoreOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Connect => write!(f, "connect"),
            Self::FindAll => write!(f, "find_all"),
            Self::Count => write!(f, "count"),
            Self::FindById => write!(f, "find_by_id"),
            Self::Create => write!(f, "create"),
            Self::Replace => write!(f, "replace"),
            Self::Delete => write!(f, "delete"),
            Self::NextSequence => write!(f, "next_sequence"),
        }
    }
}

/// Category of store error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreErrorKind {
    /// No document matched
    NotFound,
    /// A document with the same `_id` already exists
    DuplicateKey,
    /// The backend could not be reached
    ConnectionFailed,
    /// The backend rejected the operation
    Database,
    /// A value could not be encoded or decoded
    Serialization,
}

impl fmt::Display for StoreErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound => write!(f, "not_found"),
            Self::DuplicateKey => write!(f, "duplicate_key"),
            Self::ConnectionFailed => write!(f, "connection_failed"),
            Self::Database => write!(f, "database"),
            Self::Serialization => write!(f, "serialization"),
        }
    }
}

/// Structured store error with operation context
///
/// `Display` yields only the message, because that text is what reaches
/// clients in the `{"error": ...}` envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreError {
    /// The operation being performed when the error occurred
    pub operation: StoreOperation,
    /// The category of error
    pub kind: StoreErrorKind,
    /// Human-readable error message
    pub message: String,
}

impl StoreError {
    /// Create a new store error
    pub fn new(operation: StoreOperation, kind: StoreErrorKind, message: impl Into<String>) -> Self {
        Self {
            operation,
            kind,
            message: message.into(),
        }
    }

    /// Create a "not found" error
    pub fn not_found(operation: StoreOperation) -> Self {
        Self::new(operation, StoreErrorKind::NotFound, "not found")
    }

    /// Create a duplicate key error
    pub fn duplicate_key(collection: &str, id: impl fmt::Display) -> Self {
        Self::new(
            StoreOperation::Create,
            StoreErrorKind::DuplicateKey,
            format!(
                "E11000 duplicate key error collection: {} index: _id_ dup key: {{ _id: {} }}",
                collection, id
            ),
        )
    }

    /// Create a database error
    pub fn database(operation: StoreOperation, message: impl Into<String>) -> Self {
        Self::new(operation, StoreErrorKind::Database, message)
    }

    /// Create a connection failed error
    pub fn connection_failed(operation: StoreOperation, message: impl Into<String>) -> Self {
        Self::new(operation, StoreErrorKind::ConnectionFailed, message)
    }

    /// Create a serialization error
    pub fn serialization(operation: StoreOperation, message: impl Into<String>) -> Self {
        Self::new(operation, StoreErrorKind::Serialization, message)
    }

    /// Set the operation that caused the error
    #[must_use]
    pub fn with_operation(mut self, operation: StoreOperation) -> Self {
        self.operation = operation;
        self
    }

    /// Check if this is a not-found error
    pub fn is_not_found(&self) -> bool {
        self.kind == StoreErrorKind::NotFound
    }
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for StoreError {}

impl From<mongodb::error::Error> for StoreError {
    fn from(err: mongodb::error::Error) -> Self {
        use mongodb::error::ErrorKind;

        let kind = match err.kind.as_ref() {
            ErrorKind::Io(_)
            | ErrorKind::ServerSelection { .. }
            | ErrorKind::ConnectionPoolCleared { .. }
            | ErrorKind::DnsResolve { .. } => StoreErrorKind::ConnectionFailed,
            ErrorKind::BsonDeserialization(_) | ErrorKind::BsonSerialization(_) => {
                StoreErrorKind::Serialization
            }
            ErrorKind::Write(mongodb::error::WriteFailure::WriteError(e)) if e.code == 11000 => {
                StoreErrorKind::DuplicateKey
            }
            _ => StoreErrorKind::Database,
        };

        // Operation is filled in by the caller via `with_operation`
        Self::new(StoreOperation::FindAll, kind, err.to_string())
    }
}

/// Result type for store operations
pub type StoreResult<T> = std::result::Result<T, StoreError>;
