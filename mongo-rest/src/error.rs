//! Crate-level error type for startup and server paths
//!
//! Request handling uses [`ApiError`](crate::handlers::ApiError) and storage
//! uses [`StoreError`](crate::store::StoreError); this type covers loading
//! configuration, connecting to MongoDB and running the server.

use thiserror::Error;

use crate::store::StoreError;

/// Error type for startup and server operations
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(Box<figment::Error>),

    /// MongoDB driver error
    #[error("MongoDB error: {0}")]
    Mongo(Box<mongodb::error::Error>),

    /// Storage backend error
    #[error("Store error ({}): {}", .0.operation, .0.message)]
    Store(#[from] StoreError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias using the crate's error type
pub type Result<T> = std::result::Result<T, Error>;

// Manual From implementations for boxed errors
impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Error::Config(Box::new(err))
    }
}

impl From<mongodb::error::Error> for Error {
    fn from(err: mongodb::error::Error) -> Self {
        Error::Mongo(Box::new(err))
    }
}
