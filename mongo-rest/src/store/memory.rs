//! In-process document store
//!
//! Collections live in a `HashMap` behind a tokio `RwLock`; sequence counters
//! live in a `DashMap` so increments are atomic per counter without taking the
//! collection lock.

use std::collections::HashMap;
use std::sync::Arc;

use dashmap::DashMap;
use mongodb::bson::{oid::ObjectId, Bson, Document};
use tokio::sync::RwLock;

use super::matcher;
use super::{DocumentStore, FindQuery, StoreError, StoreResult, ID_FIELD};
use crate::id::DocumentId;

/// Document store kept entirely in memory
///
/// Cloning is cheap and clones share the same data, so a test can keep a
/// handle while the router owns another.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    collections: Arc<RwLock<HashMap<String, Vec<Document>>>>,
    counters: Arc<DashMap<(String, String), i64>>,
}

impl MemoryStore {
    /// Create an empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of documents in a collection
    pub async fn len(&self, collection: &str) -> usize {
        self.collections
            .read()
            .await
            .get(collection)
            .map_or(0, Vec::len)
    }

    /// Whether a collection holds no documents
    pub async fn is_empty(&self, collection: &str) -> bool {
        self.len(collection).await == 0
    }

    /// Drop every collection and counter
    pub async fn clear(&self) {
        self.collections.write().await.clear();
        self.counters.clear();
    }
}

fn has_id(doc: &Document, id: &Bson) -> bool {
    doc.get(ID_FIELD)
        .is_some_and(|existing| matcher::values_equal(existing, id))
}

fn matching<'a>(docs: &'a [Document], query: &'a FindQuery) -> impl Iterator<Item = &'a Document> {
    docs.iter().filter(|doc| matcher::matches(doc, &query.filter))
}

impl DocumentStore for MemoryStore {
    async fn find_all(&self, collection: &str, query: &FindQuery) -> StoreResult<Vec<Document>> {
        let collections = self.collections.read().await;
        let Some(docs) = collections.get(collection) else {
            return Ok(Vec::new());
        };

        let mut found: Vec<Document> = matching(docs, query).cloned().collect();
        drop(collections);

        if !query.sort.is_empty() {
            found.sort_by(|a, b| matcher::compare_by_keys(a, b, &query.sort));
        }

        let skip = query.skip.map_or(0, |s| usize::try_from(s).unwrap_or(usize::MAX));
        let limit = query
            .effective_limit()
            .map_or(usize::MAX, |l| usize::try_from(l).unwrap_or(usize::MAX));

        Ok(found
            .into_iter()
            .skip(skip)
            .take(limit)
            .map(|doc| match &query.projection {
                Some(projection) => matcher::project(doc, projection),
                None => doc,
            })
            .collect())
    }

    async fn count(&self, collection: &str, query: &FindQuery) -> StoreResult<u64> {
        let collections = self.collections.read().await;
        let total = collections
            .get(collection)
            .map_or(0, |docs| matching(docs, query).count()) as u64;

        let counted = total.saturating_sub(query.skip.unwrap_or(0));
        Ok(match query.effective_limit() {
            Some(limit) => counted.min(limit),
            None => counted,
        })
    }

    async fn find_by_id(&self, collection: &str, id: &DocumentId) -> StoreResult<Option<Document>> {
        let wanted = id.to_bson();
        let collections = self.collections.read().await;
        Ok(collections
            .get(collection)
            .and_then(|docs| docs.iter().find(|doc| has_id(doc, &wanted)))
            .cloned())
    }

    async fn create(&self, collection: &str, mut document: Document) -> StoreResult<()> {
        if !document.contains_key(ID_FIELD) {
            let mut with_id = Document::new();
            with_id.insert(ID_FIELD, ObjectId::new());
            for (key, value) in document {
                with_id.insert(key, value);
            }
            document = with_id;
        }

        let mut collections = self.collections.write().await;
        let docs = collections.entry(collection.to_string()).or_default();

        if let Some(id) = document.get(ID_FIELD) {
            if docs.iter().any(|doc| has_id(doc, id)) {
                return Err(StoreError::duplicate_key(collection, id));
            }
        }

        docs.push(document);
        Ok(())
    }

    async fn replace(&self, collection: &str, id: &DocumentId, document: Document) -> StoreResult<u64> {
        let wanted = id.to_bson();
        let mut collections = self.collections.write().await;
        let Some(existing) = collections
            .get_mut(collection)
            .and_then(|docs| docs.iter_mut().find(|doc| has_id(doc, &wanted)))
        else {
            return Ok(0);
        };

        let mut replacement = Document::new();
        if let Some(current_id) = existing.get(ID_FIELD) {
            replacement.insert(ID_FIELD, current_id.clone());
        }
        for (key, value) in document {
            if key != ID_FIELD {
                replacement.insert(key, value);
            }
        }
        *existing = replacement;
        Ok(1)
    }

    async fn delete(&self, collection: &str, id: &DocumentId) -> StoreResult<bool> {
        let wanted = id.to_bson();
        let mut collections = self.collections.write().await;
        let Some(docs) = collections.get_mut(collection) else {
            return Ok(false);
        };

        match docs.iter().position(|doc| has_id(doc, &wanted)) {
            Some(index) => {
                docs.remove(index);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn next_sequence(&self, counters: &str, name: &str) -> StoreResult<i64> {
        let mut counter = self
            .counters
            .entry((counters.to_string(), name.to_string()))
            .or_insert(0);
        *counter += 1;
        Ok(*counter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{SortKey, StoreErrorKind};
    use mongodb::bson::doc;

    async fn seeded() -> MemoryStore {
        let store = MemoryStore::new();
        for i in 1..=10 {
            store
                .create("items", doc! {"_id": i, "foo": format!("bar-{}", i), "even": i % 2 == 0})
                .await
                .unwrap();
        }
        store
    }

    #[tokio::test]
    async fn test_unknown_collection_is_empty() {
        let store = MemoryStore::new();
        let docs = store.find_all("nothing", &FindQuery::new()).await.unwrap();
        assert!(docs.is_empty());
        assert_eq!(store.count("nothing", &FindQuery::new()).await.unwrap(), 0);
        assert!(store.is_empty("nothing").await);
    }

    #[tokio::test]
    async fn test_find_all_preserves_insertion_order() {
        let store = seeded().await;
        let docs = store.find_all("items", &FindQuery::new()).await.unwrap();
        assert_eq!(docs.len(), 10);
        assert_eq!(docs[0].get_i32("_id").unwrap(), 1);
        assert_eq!(docs[9].get_i32("_id").unwrap(), 10);
    }

    #[tokio::test]
    async fn test_filter_sort_skip_limit() {
        let store = seeded().await;
        let query = FindQuery::new()
            .with_filter(doc! {"even": true})
            .with_sort(vec![SortKey::desc("_id")])
            .with_skip(1)
            .with_limit(2);
        let docs = store.find_all("items", &query).await.unwrap();
        let ids: Vec<i32> = docs.iter().map(|d| d.get_i32("_id").unwrap()).collect();
        assert_eq!(ids, vec![8, 6]);
    }

    #[tokio::test]
    async fn test_negative_limit_is_absolute() {
        let store = seeded().await;
        let docs = store
            .find_all("items", &FindQuery::new().with_limit(-3))
            .await
            .unwrap();
        assert_eq!(docs.len(), 3);
    }

    #[tokio::test]
    async fn test_projection_applied() {
        let store = seeded().await;
        let query = FindQuery::new()
            .with_filter(doc! {"_id": 4})
            .with_projection(doc! {"_id": 0, "foo": 1});
        let docs = store.find_all("items", &query).await.unwrap();
        assert_eq!(docs, vec![doc! {"foo": "bar-4"}]);
    }

    #[tokio::test]
    async fn test_count_honours_skip_and_limit() {
        let store = seeded().await;
        assert_eq!(store.count("items", &FindQuery::new()).await.unwrap(), 10);
        let query = FindQuery::new().with_skip(8).with_limit(5);
        assert_eq!(store.count("items", &query).await.unwrap(), 2);
        let query = FindQuery::new().with_limit(3);
        assert_eq!(store.count("items", &query).await.unwrap(), 3);
        let query = FindQuery::new().with_skip(20);
        assert_eq!(store.count("items", &query).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_find_by_id_numeric_types() {
        let store = seeded().await;
        let found = store
            .find_by_id("items", &DocumentId::Int(3))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.get_str("foo").unwrap(), "bar-3");
        assert!(store
            .find_by_id("items", &DocumentId::Str("3".into()))
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_create_assigns_object_id() {
        let store = MemoryStore::new();
        store.create("items", doc! {"foo": "bar"}).await.unwrap();
        let docs = store.find_all("items", &FindQuery::new()).await.unwrap();
        assert!(matches!(docs[0].get("_id"), Some(Bson::ObjectId(_))));
        assert_eq!(docs[0].keys().next().map(String::as_str), Some("_id"));
    }

    #[tokio::test]
    async fn test_create_duplicate_rejected() {
        let store = seeded().await;
        let err = store
            .create("items", doc! {"_id": 1_i64, "foo": "again"})
            .await
            .unwrap_err();
        assert_eq!(err.kind, StoreErrorKind::DuplicateKey);
        assert_eq!(store.len("items").await, 10);
    }

    #[tokio::test]
    async fn test_replace_keeps_id_first() {
        let store = seeded().await;
        let matched = store
            .replace("items", &DocumentId::Int(2), doc! {"baz": "qux", "_id": 99})
            .await
            .unwrap();
        assert_eq!(matched, 1);
        let doc = store
            .find_by_id("items", &DocumentId::Int(2))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(doc, doc! {"_id": 2, "baz": "qux"});
    }

    #[tokio::test]
    async fn test_replace_missing_matches_nothing() {
        let store = seeded().await;
        let matched = store
            .replace("items", &DocumentId::Int(42), doc! {"a": 1})
            .await
            .unwrap();
        assert_eq!(matched, 0);
    }

    #[tokio::test]
    async fn test_delete() {
        let store = seeded().await;
        assert!(store.delete("items", &DocumentId::Int(5)).await.unwrap());
        assert!(!store.delete("items", &DocumentId::Int(5)).await.unwrap());
        assert!(!store.delete("other", &DocumentId::Int(5)).await.unwrap());
        assert_eq!(store.len("items").await, 9);
    }

    #[tokio::test]
    async fn test_next_sequence_per_name() {
        let store = MemoryStore::new();
        assert_eq!(store.next_sequence("counters", "a").await.unwrap(), 1);
        assert_eq!(store.next_sequence("counters", "a").await.unwrap(), 2);
        assert_eq!(store.next_sequence("counters", "b").await.unwrap(), 1);
        assert_eq!(store.next_sequence("other", "a").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_next_sequence_concurrent() {
        let store = MemoryStore::new();
        let handles: Vec<_> = (0..32)
            .map(|_| {
                let store = store.clone();
                tokio::spawn(async move { store.next_sequence("counters", "items").await.unwrap() })
            })
            .collect();

        let mut values = Vec::new();
        for handle in handles {
            values.push(handle.await.unwrap());
        }
        values.sort_unstable();
        assert_eq!(values, (1..=32).collect::<Vec<i64>>());
    }

    #[tokio::test]
    async fn test_clear() {
        let store = seeded().await;
        store.next_sequence("counters", "items").await.unwrap();
        store.clear().await;
        assert!(store.is_empty("items").await);
        assert_eq!(store.next_sequence("counters", "items").await.unwrap(), 1);
    }
}
