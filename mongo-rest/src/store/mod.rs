//! Document store abstraction
//!
//! Handlers talk to the database only through [`DocumentStore`]. Two backends
//! ship with the crate:
//!
//! - [`MongoStore`]: MongoDB via the official `mongodb` driver
//! - [`MemoryStore`]: an in-process store for tests and local development
//!
//! # Example
//!
//! ```rust
//! use mongo_rest::store::{DocumentStore, FindQuery, MemoryStore, SortKey};
//! use mongodb::bson::doc;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let store = MemoryStore::new();
//! store.create("widgets", doc! {"_id": 1, "foo": "bar"}).await.unwrap();
//!
//! let query = FindQuery::new()
//!     .with_filter(doc! {"foo": "bar"})
//!     .with_sort(vec![SortKey::parse("-_id").unwrap()]);
//! let docs = store.find_all("widgets", &query).await.unwrap();
//! assert_eq!(docs.len(), 1);
//! # }
//! ```

mod error;
mod matcher;
mod memory;
mod mongo;

use std::fmt;
use std::future::Future;

use mongodb::bson::Document;

use crate::id::DocumentId;

pub use error::{StoreError, StoreErrorKind, StoreOperation, StoreResult};
pub use memory::MemoryStore;
pub use mongo::MongoStore;

/// Name of the identifier field every stored document carries
pub const ID_FIELD: &str = "_id";

/// Sort direction for a single key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    /// Ascending (A-Z, 0-9)
    #[default]
    Asc,
    /// Descending (Z-A, 9-0)
    Desc,
}

impl SortOrder {
    /// Direction value understood by MongoDB (`1` or `-1`)
    #[must_use]
    pub const fn as_i32(&self) -> i32 {
        match self {
            Self::Asc => 1,
            Self::Desc => -1,
        }
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Asc => write!(f, "asc"),
            Self::Desc => write!(f, "desc"),
        }
    }
}

/// One sort key, parsed from the `-field` / `+field` / `field` convention
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortKey {
    /// Field name (dotted paths allowed)
    pub field: String,
    /// Direction
    pub order: SortOrder,
}

impl SortKey {
    /// Create an ascending key
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            order: SortOrder::Asc,
        }
    }

    /// Create a descending key
    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            order: SortOrder::Desc,
        }
    }

    /// Parse a key; returns `None` for an empty field name
    ///
    /// ```rust
    /// use mongo_rest::store::{SortKey, SortOrder};
    ///
    /// assert_eq!(SortKey::parse("-age").unwrap().order, SortOrder::Desc);
    /// assert_eq!(SortKey::parse("+age").unwrap().order, SortOrder::Asc);
    /// assert_eq!(SortKey::parse("age").unwrap().field, "age");
    /// assert!(SortKey::parse("-").is_none());
    /// ```
    pub fn parse(spec: &str) -> Option<Self> {
        let spec = spec.trim();
        let key = match spec.as_bytes().first() {
            Some(b'-') => Self::desc(&spec[1..]),
            Some(b'+') => Self::asc(&spec[1..]),
            _ => Self::asc(spec),
        };
        (!key.field.is_empty()).then_some(key)
    }
}

/// A query against a single collection
///
/// `limit` follows MongoDB semantics: `0` means no limit and a negative value
/// is treated as its absolute value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FindQuery {
    /// Filter document; empty matches everything
    pub filter: Document,
    /// Maximum number of documents
    pub limit: Option<i64>,
    /// Number of documents to skip
    pub skip: Option<u64>,
    /// Sort keys, applied in order
    pub sort: Vec<SortKey>,
    /// Projection document
    pub projection: Option<Document>,
}

impl FindQuery {
    /// Query that matches every document
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Query that matches the document with the given id
    #[must_use]
    pub fn by_id(id: &DocumentId) -> Self {
        let mut filter = Document::new();
        filter.insert(ID_FIELD, id.to_bson());
        Self::new().with_filter(filter)
    }

    #[must_use]
    pub fn with_filter(mut self, filter: Document) -> Self {
        self.filter = filter;
        self
    }

    #[must_use]
    pub fn with_limit(mut self, limit: i64) -> Self {
        self.limit = Some(limit);
        self
    }

    #[must_use]
    pub fn with_skip(mut self, skip: u64) -> Self {
        self.skip = Some(skip);
        self
    }

    #[must_use]
    pub fn with_sort(mut self, sort: Vec<SortKey>) -> Self {
        self.sort = sort;
        self
    }

    #[must_use]
    pub fn with_projection(mut self, projection: Document) -> Self {
        self.projection = Some(projection);
        self
    }

    /// Effective limit as a count, `None` when unlimited
    #[must_use]
    pub fn effective_limit(&self) -> Option<u64> {
        self.limit
            .map(i64::unsigned_abs)
            .filter(|limit| *limit > 0)
    }

    /// Sort keys rendered as a MongoDB sort document
    #[must_use]
    pub fn sort_document(&self) -> Option<Document> {
        if self.sort.is_empty() {
            return None;
        }
        Some(
            self.sort
                .iter()
                .map(|key| (key.field.clone(), key.order.as_i32().into()))
                .collect(),
        )
    }
}

/// Storage backend used by the REST handlers
///
/// All methods address a collection by name. Collections need not exist
/// beforehand; reading an unknown collection yields no documents.
///
/// Implementations must make [`next_sequence`](Self::next_sequence) atomic:
/// concurrent callers for the same name never receive the same value.
pub trait DocumentStore: Send + Sync + 'static {
    /// Find documents matching the query
    fn find_all(
        &self,
        collection: &str,
        query: &FindQuery,
    ) -> impl Future<Output = StoreResult<Vec<Document>>> + Send;

    /// Count documents matching the query's filter, honouring limit and skip
    fn count(
        &self,
        collection: &str,
        query: &FindQuery,
    ) -> impl Future<Output = StoreResult<u64>> + Send;

    /// Find a single document by id
    fn find_by_id(
        &self,
        collection: &str,
        id: &DocumentId,
    ) -> impl Future<Output = StoreResult<Option<Document>>> + Send;

    /// Insert a document; it must already carry an `_id`
    fn create(
        &self,
        collection: &str,
        document: Document,
    ) -> impl Future<Output = StoreResult<()>> + Send;

    /// Replace every non-id field of a document, returning the matched count
    fn replace(
        &self,
        collection: &str,
        id: &DocumentId,
        document: Document,
    ) -> impl Future<Output = StoreResult<u64>> + Send;

    /// Delete a document by id, returning whether one was removed
    fn delete(
        &self,
        collection: &str,
        id: &DocumentId,
    ) -> impl Future<Output = StoreResult<bool>> + Send;

    /// Increment and return the sequence counter `name` kept in `counters`
    ///
    /// The first call for a name returns `1`.
    fn next_sequence(
        &self,
        counters: &str,
        name: &str,
    ) -> impl Future<Output = StoreResult<i64>> + Send;
}
