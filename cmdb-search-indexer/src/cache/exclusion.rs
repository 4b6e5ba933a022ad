//! Resource-pool exclusion cache.
//!
//! Resource-pool businesses (`default == 1` in the business collection)
//! are internal and must not reach the public index. Their ids are kept in
//! a snapshot that the dispatcher checks for business and set events.

use std::collections::HashSet;
use std::sync::Arc;

use serde_json::Value;
use tracing::{info, warn};

use super::Snapshot;
use crate::collections::{fields, BIZ_COLLECTION};
use crate::errors::CacheError;
use crate::identity::as_i64;
use crate::store::{filter_eq, ConfigStore};

/// One immutable snapshot of excluded business ids.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ExclusionSet {
    biz_ids: HashSet<i64>,
}

impl ExclusionSet {
    pub fn contains(&self, biz_id: i64) -> bool {
        self.biz_ids.contains(&biz_id)
    }

    pub fn len(&self) -> usize {
        self.biz_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.biz_ids.is_empty()
    }
}

impl FromIterator<i64> for ExclusionSet {
    fn from_iter<I: IntoIterator<Item = i64>>(iter: I) -> Self {
        Self {
            biz_ids: iter.into_iter().collect(),
        }
    }
}

/// Shared exclusion cache.
#[derive(Debug, Default)]
pub struct ExclusionCache {
    snapshot: Snapshot<ExclusionSet>,
}

impl ExclusionCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> Arc<ExclusionSet> {
        self.snapshot.load()
    }

    pub fn replace(&self, set: ExclusionSet) {
        self.snapshot.store(set);
    }

    /// Whether `biz_id` is a resource-pool business.
    pub fn is_excluded(&self, biz_id: i64) -> bool {
        self.snapshot().contains(biz_id)
    }

    /// Rebuild the snapshot from the primary store.
    ///
    /// A query that yields no usable resource-pool business id is an error
    /// and leaves the previous snapshot in place.
    pub async fn rebuild(
        &self,
        store: &dyn ConfigStore,
        database: &str,
    ) -> Result<usize, CacheError> {
        let businesses = store
            .find(database, BIZ_COLLECTION, &filter_eq(fields::DEFAULT, 1))
            .await?;
        if businesses.is_empty() {
            return Err(CacheError::EmptyExclusionSet);
        }

        let set: ExclusionSet = businesses
            .iter()
            .filter_map(|business| {
                let biz_id = business.get(fields::BIZ_ID).unwrap_or(&Value::Null);
                let parsed = as_i64(biz_id);
                if parsed.is_none() {
                    warn!(bk_biz_id = %biz_id, "Skipping resource pool with invalid business id");
                }
                parsed
            })
            .collect();
        if set.is_empty() {
            return Err(CacheError::EmptyExclusionSet);
        }

        let count = set.len();
        info!(biz_ids = ?set.biz_ids, "Resource pool exclusion cache rebuilt");
        self.replace(set);
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryStore;
    use serde_json::json;

    #[tokio::test]
    async fn test_rebuild_collects_default_businesses() {
        let store = InMemoryStore::new();
        store.insert("cmdb", BIZ_COLLECTION, json!({"bk_biz_id": 1, "default": 1}));
        store.insert("cmdb", BIZ_COLLECTION, json!({"bk_biz_id": 2, "default": 0}));
        store.insert("cmdb", BIZ_COLLECTION, json!({"bk_biz_id": 3, "default": 1}));
        let cache = ExclusionCache::new();

        assert_eq!(cache.rebuild(&store, "cmdb").await.unwrap(), 2);

        assert!(cache.is_excluded(1));
        assert!(!cache.is_excluded(2));
        assert!(cache.is_excluded(3));
    }

    #[tokio::test]
    async fn test_empty_result_is_an_error() {
        let store = InMemoryStore::new();
        store.insert("cmdb", BIZ_COLLECTION, json!({"bk_biz_id": 2, "default": 0}));
        let cache = ExclusionCache::new();
        cache.replace([7].into_iter().collect());

        let result = cache.rebuild(&store, "cmdb").await;

        assert!(matches!(result, Err(CacheError::EmptyExclusionSet)));
        assert!(cache.is_excluded(7));
    }

    #[tokio::test]
    async fn test_only_invalid_ids_keep_previous_snapshot() {
        let store = InMemoryStore::new();
        store.insert("cmdb", BIZ_COLLECTION, json!({"bk_biz_id": "x", "default": 1}));
        let cache = ExclusionCache::new();
        cache.replace([7].into_iter().collect());

        let result = cache.rebuild(&store, "cmdb").await;

        assert!(matches!(result, Err(CacheError::EmptyExclusionSet)));
        assert!(cache.is_excluded(7));
    }

    #[tokio::test]
    async fn test_store_failure_is_an_error() {
        let store = InMemoryStore::new();
        store.set_unavailable(true);
        let cache = ExclusionCache::new();

        let result = cache.rebuild(&store, "cmdb").await;
        assert!(matches!(result, Err(CacheError::Store(_))));
    }
}
