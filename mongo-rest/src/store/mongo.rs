//! MongoDB backend
//!
//! Uses the official driver's fluent API. Sequence counters follow the usual
//! MongoDB pattern: one document per name in a counters collection, bumped
//! with an upserting `findOneAndUpdate`.

use std::time::Duration;

use futures::TryStreamExt;
use mongodb::{
    bson::{doc, Bson, Document},
    options::{CountOptions, FindOptions, ReturnDocument},
    Client, Collection, Database,
};

use super::{DocumentStore, FindQuery, StoreError, StoreOperation, StoreResult, ID_FIELD};
use crate::config::MongoConfig;
use crate::error::Result;
use crate::id::DocumentId;

/// Field holding the current value in a counter document
const SEQUENCE_FIELD: &str = "seq";

/// Document store backed by a MongoDB database
#[derive(Debug, Clone)]
pub struct MongoStore {
    database: Database,
}

impl MongoStore {
    /// Wrap an existing database handle
    #[must_use]
    pub fn new(database: Database) -> Self {
        Self { database }
    }

    /// Connect using the configured URL, retrying with exponential backoff
    ///
    /// A connection counts as established once the server answers `ping`.
    pub async fn connect(config: &MongoConfig) -> Result<Self> {
        let mut attempt = 0;
        let base_delay = Duration::from_secs(config.retry_delay_secs);

        loop {
            match try_connect(config).await {
                Ok(database) => {
                    if attempt > 0 {
                        tracing::info!(
                            "MongoDB connection established after {} attempt(s)",
                            attempt + 1
                        );
                    } else {
                        tracing::info!(
                            "MongoDB connected: url={}, db={}",
                            sanitize_url(&config.url),
                            config.database
                        );
                    }
                    return Ok(Self::new(database));
                }
                Err(e) => {
                    attempt += 1;

                    if attempt > config.max_retries {
                        tracing::error!(
                            "Failed to connect to MongoDB after {} attempts: {}",
                            config.max_retries + 1,
                            e
                        );
                        return Err(e);
                    }

                    let delay = backoff_delay(base_delay, attempt);
                    tracing::warn!(
                        "MongoDB connection attempt {} failed: {}. Retrying in {:?}...",
                        attempt,
                        e,
                        delay
                    );

                    tokio::time::sleep(delay).await;
                }
            }
        }
    }

    /// The underlying database handle
    #[must_use]
    pub fn database(&self) -> &Database {
        &self.database
    }

    fn collection(&self, name: &str) -> Collection<Document> {
        self.database.collection(name)
    }
}

async fn try_connect(config: &MongoConfig) -> Result<Database> {
    tracing::debug!("Connecting to MongoDB: {}", sanitize_url(&config.url));

    let client = Client::with_uri_str(&config.url).await?;
    let database = client.database(&config.database);
    database.run_command(doc! {"ping": 1}).await?;
    Ok(database)
}

/// Strip credentials from a connection URL before it is logged
pub fn sanitize_url(url: &str) -> String {
    if let (Some(at_pos), Some(scheme_end)) = (url.rfind('@'), url.find("://")) {
        if at_pos > scheme_end {
            return format!("{}***{}", &url[..scheme_end + 3], &url[at_pos..]);
        }
    }
    url.to_string()
}

fn id_filter(id: &DocumentId) -> Document {
    let mut filter = Document::new();
    filter.insert(ID_FIELD, id.to_bson());
    filter
}

fn store_error(operation: StoreOperation) -> impl FnOnce(mongodb::error::Error) -> StoreError {
    move |e| StoreError::from(e).with_operation(operation)
}

impl DocumentStore for MongoStore {
    async fn find_all(&self, collection: &str, query: &FindQuery) -> StoreResult<Vec<Document>> {
        let options = FindOptions::builder()
            .limit(query.limit.filter(|l| *l != 0))
            .skip(query.skip)
            .sort(query.sort_document())
            .projection(query.projection.clone())
            .build();

        let cursor = self
            .collection(collection)
            .find(query.filter.clone())
            .with_options(options)
            .await
            .map_err(store_error(StoreOperation::FindAll))?;

        cursor
            .try_collect()
            .await
            .map_err(store_error(StoreOperation::FindAll))
    }

    async fn count(&self, collection: &str, query: &FindQuery) -> StoreResult<u64> {
        let options = CountOptions::builder()
            .limit(query.effective_limit())
            .skip(query.skip)
            .build();

        self.collection(collection)
            .count_documents(query.filter.clone())
            .with_options(options)
            .await
            .map_err(store_error(StoreOperation::Count))
    }

    async fn find_by_id(&self, collection: &str, id: &DocumentId) -> StoreResult<Option<Document>> {
        self.collection(collection)
            .find_one(id_filter(id))
            .await
            .map_err(store_error(StoreOperation::FindById))
    }

    async fn create(&self, collection: &str, document: Document) -> StoreResult<()> {
        self.collection(collection)
            .insert_one(document)
            .await
            .map_err(store_error(StoreOperation::Create))?;
        Ok(())
    }

    async fn replace(&self, collection: &str, id: &DocumentId, document: Document) -> StoreResult<u64> {
        let result = self
            .collection(collection)
            .replace_one(id_filter(id), document)
            .await
            .map_err(store_error(StoreOperation::Replace))?;
        Ok(result.matched_count)
    }

    async fn delete(&self, collection: &str, id: &DocumentId) -> StoreResult<bool> {
        let result = self
            .collection(collection)
            .delete_one(id_filter(id))
            .await
            .map_err(store_error(StoreOperation::Delete))?;
        Ok(result.deleted_count > 0)
    }

    async fn next_sequence(&self, counters: &str, name: &str) -> StoreResult<i64> {
        let counter = self
            .collection(counters)
            .find_one_and_update(doc! {"_id": name}, doc! {"$inc": {SEQUENCE_FIELD: 1_i64}})
            .upsert(true)
            .return_document(ReturnDocument::After)
            .await
            .map_err(store_error(StoreOperation::NextSequence))?
            .ok_or_else(|| {
                StoreError::database(
                    StoreOperation::NextSequence,
                    format!("counter '{}' was not returned after upsert", name),
                )
            })?;

        match counter.get(SEQUENCE_FIELD) {
            Some(Bson::Int32(n)) => Ok(i64::from(*n)),
            Some(Bson::Int64(n)) => Ok(*n),
            Some(Bson::Double(f)) => Ok(*f as i64),
            _ => Err(StoreError::serialization(
                StoreOperation::NextSequence,
                format!("counter '{}' has no numeric '{}' field", name, SEQUENCE_FIELD),
            )),
        }
    }
}

/// Delay before retry `attempt` (1-based): `base * 2^(attempt - 1)`, saturating
fn backoff_delay(base: Duration, attempt: u32) -> Duration {
    base.saturating_mul(2_u32.saturating_pow(attempt.saturating_sub(1)))
}
