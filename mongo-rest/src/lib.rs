//! # mongo-rest
//!
//! Generic REST endpoints over MongoDB collections, as an axum router.
//!
//! URL path segments map directly onto collections and documents, so any
//! collection gets list, get, create, replace and delete endpoints without
//! per-resource code:
//!
//! | method   | path                 | result                                  |
//! |----------|----------------------|-----------------------------------------|
//! | `GET`    | `/{collection}`      | matching documents, or a count          |
//! | `POST`   | `/{collection}`      | `201` and the stored document           |
//! | `GET`    | `/{collection}/{id}` | the document, or `404`                  |
//! | `PUT`    | `/{collection}/{id}` | `{"updated": n}`, or `404`              |
//! | `DELETE` | `/{collection}/{id}` | `{"removed": 1}`, or `404`              |
//!
//! List requests understand the `query`, `limit`, `skip`, `sort`, `select`
//! and `count` parameters (see [`query`]). Ids in paths are read as object
//! ids, integers or strings (see [`id`]).
//!
//! ## Features
//!
//! - **Storage**: [`store::MongoStore`] for MongoDB, [`store::MemoryStore`] for tests
//! - **Envelope**: optional response field wrapping successful payloads
//! - **Autoincrement**: sequential integer ids from an atomic counter
//! - **Server**: configuration, tracing and a graceful-shutdown HTTP server
//!
//! ## Example
//!
//! ```rust,no_run
//! use mongo_rest::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     // Load configuration
//!     let config = Config::load()?;
//!
//!     // Initialize tracing
//!     init_tracing(&config)?;
//!
//!     // Connect and mount the collection routes
//!     let store = MongoStore::connect(&config.mongo).await?;
//!     let rest = RestConfig::from_settings(store, &config.rest);
//!     let app = rest_router(rest, &config.rest.prefix);
//!
//!     // Run server
//!     Server::new(config).serve(app).await?;
//!
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod document;
pub mod error;
pub mod handlers;
pub mod id;
pub mod observability;
pub mod query;
pub mod response;
pub mod router;
pub mod server;
pub mod store;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::config::{Config, MongoConfig, RestSettings, ServiceConfig};
    pub use crate::error::{Error, Result};
    pub use crate::handlers::{ApiError, ApiErrorKind, ApiOperation};
    pub use crate::id::{DocumentId, InvalidIdentifier};
    pub use crate::observability::init_tracing;
    pub use crate::query::{ListParams, ListPlan};
    pub use crate::response::ResponseFormat;
    pub use crate::router::{rest_router, RestConfig};
    pub use crate::server::Server;
    pub use crate::store::{
        DocumentStore, FindQuery, MemoryStore, MongoStore, SortKey, SortOrder, StoreError,
        StoreErrorKind, StoreOperation,
    };

    // Re-export commonly used external types
    pub use axum::{
        extract::{Path, Query, State},
        routing::{delete, get, post, put},
        Json, Router,
    };
    pub use mongodb::bson::{doc, Bson, Document};
    pub use serde_json::{json, Value};
    pub use tokio;
    pub use tracing::{debug, error, info, instrument, trace, warn};
}
