//! Collection handlers
//!
//! One generic handler per endpoint shape. The collection name comes from the
//! first path segment and the document id from the second.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{
        rejection::{BytesRejection, PathRejection},
        Path, Query, State,
    },
    http::StatusCode,
    response::Response,
};
use mongodb::bson::{oid::ObjectId, Bson, Document};
use serde_json::{json, Value};
use tracing::{field, instrument, Span};

use super::error::{ApiError, ApiOperation, ApiResult};
use crate::document::{decode_document, document_to_json};
use crate::id::DocumentId;
use crate::query::{ListParams, ListPlan};
use crate::router::RestConfig;
use crate::store::{DocumentStore, FindQuery, ID_FIELD};

fn parse_id(segment: &str, operation: ApiOperation) -> ApiResult<DocumentId> {
    DocumentId::parse(segment).map_err(|e| ApiError::from(e).with_operation(operation))
}

/// Unwrap path parameters, turning a rejected segment into an [`ApiError`]
fn path_params<T>(
    path: Result<Path<T>, PathRejection>,
    operation: ApiOperation,
) -> ApiResult<T> {
    path.map(|Path(params)| params)
        .map_err(|e| ApiError::from(e).with_operation(operation))
}

/// Collection name and parsed id of a `/{collection}/{id}` request
fn document_path(
    path: Result<Path<(String, String)>, PathRejection>,
    operation: ApiOperation,
) -> ApiResult<(String, DocumentId)> {
    let (collection, id) = path_params(path, operation)?;
    let span = Span::current();
    span.record("collection", collection.as_str());
    span.record("id", id.as_str());
    let id = parse_id(&id, operation)?;
    Ok((collection, id))
}

fn read_document(
    body: Result<Bytes, BytesRejection>,
    operation: ApiOperation,
) -> ApiResult<Document> {
    let body = body.map_err(|e| ApiError::from(e).with_operation(operation))?;
    decode_document(&body).map_err(|e| ApiError::from(e).with_operation(operation))
}

/// `GET /{collection}`: list or count documents
#[instrument(skip_all, fields(collection = field::Empty))]
pub async fn list<S: DocumentStore>(
    State(config): State<Arc<RestConfig<S>>>,
    path: Result<Path<String>, PathRejection>,
    Query(pairs): Query<Vec<(String, String)>>,
) -> ApiResult<Response> {
    let op = ApiOperation::List;
    let collection = path_params(path, op)?;
    Span::current().record("collection", collection.as_str());
    let plan = ListParams::from_pairs(pairs).into_plan();
    tracing::debug!(plan = ?plan, "Listing collection");

    let data = match plan {
        ListPlan::Count(query) => {
            let count = config
                .store
                .count(&collection, &query)
                .await
                .map_err(|e| ApiError::from(e).with_operation(op))?;
            json!(count)
        }
        ListPlan::Fetch(query) => {
            let documents = config
                .store
                .find_all(&collection, &query)
                .await
                .map_err(|e| ApiError::from(e).with_operation(op))?;
            Value::Array(documents.into_iter().map(document_to_json).collect())
        }
    };

    Ok(config.format.respond(StatusCode::OK, data))
}

/// `GET /{collection}/{id}`: fetch one document
#[instrument(skip_all, fields(collection = field::Empty, id = field::Empty))]
pub async fn get<S: DocumentStore>(
    State(config): State<Arc<RestConfig<S>>>,
    path: Result<Path<(String, String)>, PathRejection>,
) -> ApiResult<Response> {
    let op = ApiOperation::Get;
    let (collection, id) = document_path(path, op)?;

    let document = config
        .store
        .find_by_id(&collection, &id)
        .await
        .map_err(|e| ApiError::from(e).with_operation(op))?
        .ok_or_else(|| ApiError::not_found(op))?;

    Ok(config
        .format
        .respond(StatusCode::OK, document_to_json(document)))
}

/// `POST /{collection}`: insert a document, assigning `_id` when missing
#[instrument(skip_all, fields(collection = field::Empty))]
pub async fn create<S: DocumentStore>(
    State(config): State<Arc<RestConfig<S>>>,
    path: Result<Path<String>, PathRejection>,
    body: Result<Bytes, BytesRejection>,
) -> ApiResult<Response> {
    let op = ApiOperation::Create;
    let collection = path_params(path, op)?;
    Span::current().record("collection", collection.as_str());
    let mut document = read_document(body, op)?;

    if !document.contains_key(ID_FIELD) {
        let id = assign_id(&config, &collection).await?;
        document = with_leading_id(id, document);
    }

    config
        .store
        .create(&collection, document.clone())
        .await
        .map_err(|e| ApiError::from(e).with_operation(op))?;

    tracing::debug!(id = ?document.get(ID_FIELD), "Document created");
    Ok(config
        .format
        .respond(StatusCode::CREATED, document_to_json(document)))
}

/// `PUT /{collection}/{id}`: replace every non-id field of a document
#[instrument(skip_all, fields(collection = field::Empty, id = field::Empty))]
pub async fn replace<S: DocumentStore>(
    State(config): State<Arc<RestConfig<S>>>,
    path: Result<Path<(String, String)>, PathRejection>,
    body: Result<Bytes, BytesRejection>,
) -> ApiResult<Response> {
    let op = ApiOperation::Replace;
    let (collection, id) = document_path(path, op)?;

    let existing = config
        .store
        .count(&collection, &FindQuery::by_id(&id))
        .await
        .map_err(|e| ApiError::from(e).with_operation(op))?;
    if existing == 0 {
        return Err(ApiError::not_found(op));
    }

    let mut document = read_document(body, op)?;
    document.remove(ID_FIELD);

    let updated = config
        .store
        .replace(&collection, &id, document)
        .await
        .map_err(|e| ApiError::from(e).with_operation(op))?;

    Ok(config
        .format
        .respond(StatusCode::OK, json!({ "updated": updated })))
}

/// `DELETE /{collection}/{id}`: remove a document
#[instrument(skip_all, fields(collection = field::Empty, id = field::Empty))]
pub async fn delete<S: DocumentStore>(
    State(config): State<Arc<RestConfig<S>>>,
    path: Result<Path<(String, String)>, PathRejection>,
) -> ApiResult<Response> {
    let op = ApiOperation::Delete;
    let (collection, id) = document_path(path, op)?;

    let removed = config
        .store
        .delete(&collection, &id)
        .await
        .map_err(|e| ApiError::from(e).with_operation(op))?;
    if !removed {
        return Err(ApiError::not_found(op));
    }

    Ok(config
        .format
        .respond(StatusCode::OK, json!({ "removed": 1 })))
}

/// Pick an `_id` for a document created without one
async fn assign_id<S: DocumentStore>(config: &RestConfig<S>, collection: &str) -> ApiResult<Bson> {
    if !config.autoincrement {
        return Ok(Bson::ObjectId(ObjectId::new()));
    }

    let seq = config
        .store
        .next_sequence(&config.counters_collection, collection)
        .await
        .map_err(|e| ApiError::from(e).with_operation(ApiOperation::Create))?;

    Ok(match i32::try_from(seq) {
        Ok(small) => Bson::Int32(small),
        Err(_) => Bson::Int64(seq),
    })
}

fn with_leading_id(id: Bson, document: Document) -> Document {
    let mut ordered = Document::new();
    ordered.insert(ID_FIELD, id);
    for (key, value) in document {
        ordered.insert(key, value);
    }
    ordered
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MemoryStore, StoreResult};
    use mongodb::bson::doc;
    use std::sync::Mutex;

    /// Delegates to a `MemoryStore`, keeping the last document passed to `replace`
    #[derive(Default)]
    struct RecordingStore {
        inner: MemoryStore,
        replaced: Mutex<Option<Document>>,
    }

    impl DocumentStore for RecordingStore {
        async fn find_all(&self, collection: &str, query: &FindQuery) -> StoreResult<Vec<Document>> {
            self.inner.find_all(collection, query).await
        }

        async fn count(&self, collection: &str, query: &FindQuery) -> StoreResult<u64> {
            self.inner.count(collection, query).await
        }

        async fn find_by_id(
            &self,
            collection: &str,
            id: &DocumentId,
        ) -> StoreResult<Option<Document>> {
            self.inner.find_by_id(collection, id).await
        }

        async fn create(&self, collection: &str, document: Document) -> StoreResult<()> {
            self.inner.create(collection, document).await
        }

        async fn replace(
            &self,
            collection: &str,
            id: &DocumentId,
            document: Document,
        ) -> StoreResult<u64> {
            *self.replaced.lock().unwrap() = Some(document.clone());
            self.inner.replace(collection, id, document).await
        }

        async fn delete(&self, collection: &str, id: &DocumentId) -> StoreResult<bool> {
            self.inner.delete(collection, id).await
        }

        async fn next_sequence(&self, counters: &str, name: &str) -> StoreResult<i64> {
            self.inner.next_sequence(counters, name).await
        }
    }

    fn document_path_of(
        collection: &str,
        id: &str,
    ) -> Result<Path<(String, String)>, PathRejection> {
        Ok(Path((collection.to_string(), id.to_string())))
    }

    #[tokio::test]
    async fn test_replace_never_hands_body_id_to_store() {
        let config = Arc::new(RestConfig::new(RecordingStore::default()));
        config
            .store
            .create("w", doc! {"_id": 1, "a": 1})
            .await
            .unwrap();

        let response = replace(
            State(config.clone()),
            document_path_of("w", "1"),
            Ok(Bytes::from_static(br#"{"_id":99,"b":2}"#)),
        )
        .await
        .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let recorded = config.store.replaced.lock().unwrap().clone().unwrap();
        assert_eq!(recorded, doc! {"b": 2});
    }

    #[tokio::test]
    async fn test_replace_missing_document_skips_store() {
        let config = Arc::new(RestConfig::new(RecordingStore::default()));

        let err = replace(
            State(config.clone()),
            document_path_of("w", "1"),
            Ok(Bytes::from_static(br#"{"b":2}"#)),
        )
        .await
        .unwrap_err();
        assert_eq!(err.kind, crate::handlers::ApiErrorKind::NotFound);
        assert!(config.store.replaced.lock().unwrap().is_none());
    }

    #[test]
    fn test_with_leading_id() {
        let doc = with_leading_id(Bson::Int32(1), doc! {"foo": "bar", "n": 2});
        let keys: Vec<&str> = doc.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["_id", "foo", "n"]);
    }

    #[test]
    fn test_parse_id_sets_operation() {
        let err = parse_id("", ApiOperation::Delete).unwrap_err();
        assert_eq!(err.operation, ApiOperation::Delete);
        assert_eq!(err.message, "invalid _id");
    }

    #[test]
    fn test_read_document_rejects_non_object() {
        let err = read_document(Ok(Bytes::from_static(b"42")), ApiOperation::Create).unwrap_err();
        assert_eq!(err.kind, crate::handlers::ApiErrorKind::MalformedBody);
    }
}
