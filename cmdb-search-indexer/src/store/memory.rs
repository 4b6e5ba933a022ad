//! In-memory configuration store for testing/development.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{PoisonError, RwLock};

use async_trait::async_trait;
use serde_json::Value;

use super::{ConfigStore, Filter};
use crate::errors::StoreError;
use crate::identity::SourceDocument;

/// Configuration store backed by process memory.
///
/// Records are kept per `(database, collection)` in insertion order.
#[derive(Default)]
pub struct InMemoryStore {
    collections: RwLock<HashMap<(String, String), Vec<SourceDocument>>>,
    unavailable: AtomicBool,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a record. Non-object values are ignored.
    pub fn insert(&self, database: &str, collection: &str, record: Value) {
        let Value::Object(record) = record else {
            return;
        };
        self.collections
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry((database.to_string(), collection.to_string()))
            .or_default()
            .push(record);
    }

    /// Remove every record of `collection` matching `filter`.
    pub fn remove(&self, database: &str, collection: &str, filter: &Filter) {
        if let Some(records) = self
            .collections
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .get_mut(&(database.to_string(), collection.to_string()))
        {
            records.retain(|record| !matches(record, filter));
        }
    }

    /// Make every query fail with `StoreError::Unavailable` while set.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }
}

fn matches(record: &SourceDocument, filter: &Filter) -> bool {
    filter
        .iter()
        .all(|(field, expected)| record.get(field) == Some(expected))
}

#[async_trait]
impl ConfigStore for InMemoryStore {
    async fn find(
        &self,
        database: &str,
        collection: &str,
        filter: &Filter,
    ) -> Result<Vec<SourceDocument>, StoreError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable(format!(
                "{}.{} is unavailable",
                database, collection
            )));
        }

        let collections = self
            .collections
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        Ok(collections
            .get(&(database.to_string(), collection.to_string()))
            .map(|records| {
                records
                    .iter()
                    .filter(|record| matches(record, filter))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::filter_eq;
    use serde_json::json;

    #[tokio::test]
    async fn test_find_by_equality() {
        let store = InMemoryStore::new();
        store.insert("cmdb", "cc_ApplicationBase", json!({"bk_biz_id": 1, "default": 1}));
        store.insert("cmdb", "cc_ApplicationBase", json!({"bk_biz_id": 2, "default": 0}));

        let found = store
            .find("cmdb", "cc_ApplicationBase", &filter_eq("default", 1))
            .await
            .unwrap();

        assert_eq!(found.len(), 1);
        assert_eq!(found[0]["bk_biz_id"], 1);
    }

    #[tokio::test]
    async fn test_databases_are_separate() {
        let store = InMemoryStore::new();
        store.insert("cmdb", "cc_ObjDes", json!({"bk_obj_id": "host"}));

        let found = store
            .find_one("other", "cc_ObjDes", &filter_eq("bk_obj_id", "host"))
            .await
            .unwrap();

        assert!(found.is_none());
    }

    #[tokio::test]
    async fn test_unavailable() {
        let store = InMemoryStore::new();
        store.set_unavailable(true);

        let result = store.find("cmdb", "cc_ObjDes", &Filter::new()).await;
        assert!(matches!(result, Err(StoreError::Unavailable(_))));
    }

    #[tokio::test]
    async fn test_remove() {
        let store = InMemoryStore::new();
        store.insert("cmdb", "cc_ObjDes", json!({"bk_obj_id": "host"}));
        store.insert("cmdb", "cc_ObjDes", json!({"bk_obj_id": "switch"}));

        store.remove("cmdb", "cc_ObjDes", &filter_eq("bk_obj_id", "host"));

        let found = store.find("cmdb", "cc_ObjDes", &Filter::new()).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0]["bk_obj_id"], "switch");
    }
}
