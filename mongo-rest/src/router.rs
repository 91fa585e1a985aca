//! Router registration
//!
//! [`rest_router`] turns a [`RestConfig`] into an axum [`Router`] carrying the
//! five collection routes. The result is a plain `Router<()>`, so the host
//! application can merge, nest or layer it like any other router.
//!
//! # Example
//!
//! ```rust
//! use axum::Router;
//! use mongo_rest::router::{rest_router, RestConfig};
//! use mongo_rest::store::MemoryStore;
//!
//! let config = RestConfig::new(MemoryStore::new())
//!     .with_response_field("data")
//!     .with_autoincrement(true);
//!
//! let app: Router = Router::new().merge(rest_router(config, "/api/v1"));
//! # let _ = app;
//! ```

use std::sync::Arc;

use axum::{routing::get, Router};

use crate::config::RestSettings;
use crate::handlers::collection;
use crate::response::ResponseFormat;
use crate::store::DocumentStore;

/// Default name of the collection holding sequence counters
pub const DEFAULT_COUNTERS_COLLECTION: &str = "counters";

/// Configuration shared by every handler of one router
#[derive(Debug, Clone)]
pub struct RestConfig<S> {
    /// Storage backend
    pub store: S,
    /// Success envelope
    pub format: ResponseFormat,
    /// Assign sequential integer ids on create
    pub autoincrement: bool,
    /// Collection holding the sequence counters
    pub counters_collection: String,
}

impl<S: DocumentStore> RestConfig<S> {
    /// Configuration with unwrapped responses and object-id assignment
    pub fn new(store: S) -> Self {
        Self {
            store,
            format: ResponseFormat::default(),
            autoincrement: false,
            counters_collection: DEFAULT_COUNTERS_COLLECTION.to_string(),
        }
    }

    /// Build from the `[rest]` section of the service configuration
    pub fn from_settings(store: S, settings: &RestSettings) -> Self {
        Self {
            store,
            format: ResponseFormat::new(settings.response_field.clone()),
            autoincrement: settings.autoincrement,
            counters_collection: settings.counters_collection.clone(),
        }
    }

    /// Nest successful payloads under `field`; an empty name disables nesting
    #[must_use]
    pub fn with_response_field(mut self, field: impl Into<String>) -> Self {
        self.format = ResponseFormat::new(Some(field.into()));
        self
    }

    #[must_use]
    pub fn with_autoincrement(mut self, autoincrement: bool) -> Self {
        self.autoincrement = autoincrement;
        self
    }

    #[must_use]
    pub fn with_counters_collection(mut self, collection: impl Into<String>) -> Self {
        self.counters_collection = collection.into();
        self
    }
}

/// Build the collection router, mounted under `prefix`
///
/// An empty prefix or `/` mounts the routes at the root. Requests outside the
/// five route shapes fall through to the host router's fallback.
pub fn rest_router<S: DocumentStore>(config: RestConfig<S>, prefix: &str) -> Router {
    let state = Arc::new(config);

    let routes = Router::new()
        .route(
            "/{collection}",
            get(collection::list::<S>).post(collection::create::<S>),
        )
        .route(
            "/{collection}/{id}",
            get(collection::get::<S>)
                .put(collection::replace::<S>)
                .delete(collection::delete::<S>),
        )
        .with_state(state);

    let prefix = prefix.trim_end_matches('/');
    if prefix.is_empty() {
        routes
    } else if prefix.starts_with('/') {
        Router::new().nest(prefix, routes)
    } else {
        Router::new().nest(&format!("/{}", prefix), routes)
    }
}
