//! In-memory search index provider.
//!
//! Keeps indices, aliases and documents in process memory. Used for testing
//! and for dry runs where no search engine is available.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use cmdb_search_shared::properties::{META_ID, TABLES};
use serde_json::{Map, Value};

use crate::errors::SearchIndexError;
use crate::interfaces::SearchIndexProvider;
use crate::types::{
    DeleteDocumentRequest, TableRowDeleteRequest, TableRowUpdateRequest, UpsertDocumentRequest,
};

#[derive(Default)]
struct State {
    /// Concrete index name -> schema it was created with.
    indices: HashMap<String, Value>,
    /// Alias -> concrete indices.
    aliases: HashMap<String, Vec<String>>,
    /// Concrete index name -> document id -> body.
    documents: HashMap<String, HashMap<String, Value>>,
    create_calls: usize,
    alias_updates: usize,
}

impl State {
    /// Resolve an alias to its single target, or treat the name as a concrete index.
    fn resolve(&self, name: &str) -> Result<String, SearchIndexError> {
        match self.aliases.get(name).map(Vec::as_slice) {
            Some([index]) => Ok(index.clone()),
            Some(targets) if !targets.is_empty() => Err(SearchIndexError::alias(format!(
                "alias {} points at {} indices",
                name,
                targets.len()
            ))),
            _ => Ok(name.to_string()),
        }
    }
}

/// In-memory backend for testing/development.
#[derive(Default)]
pub struct InMemoryProvider {
    state: RwLock<State>,
}

impl InMemoryProvider {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, State> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, State> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Pre-create a concrete index, as if a previous release had created it.
    pub fn seed_index(&self, index: &str, schema: Value) {
        self.write().indices.insert(index.to_string(), schema);
    }

    /// Pre-bind an alias, as if a previous release had bound it.
    pub fn seed_alias(&self, alias: &str, index: &str) {
        self.write()
            .aliases
            .entry(alias.to_string())
            .or_default()
            .push(index.to_string());
    }

    /// Concrete indices an alias resolves to.
    pub fn aliased_indices(&self, alias: &str) -> Vec<String> {
        self.read().aliases.get(alias).cloned().unwrap_or_default()
    }

    /// Schema a concrete index was created with.
    pub fn index_schema(&self, index: &str) -> Option<Value> {
        self.read().indices.get(index).cloned()
    }

    /// Fetch a document through an alias or concrete index name.
    pub fn document(&self, index: &str, id: &str) -> Option<Value> {
        let state = self.read();
        let index = state.resolve(index).ok()?;
        state.documents.get(&index)?.get(id).cloned()
    }

    /// Number of documents stored in an alias or concrete index.
    pub fn document_count(&self, index: &str) -> usize {
        let state = self.read();
        state
            .resolve(index)
            .ok()
            .and_then(|index| state.documents.get(&index).map(HashMap::len))
            .unwrap_or(0)
    }

    /// Number of `create_index` calls that actually created an index.
    pub fn create_calls(&self) -> usize {
        self.read().create_calls
    }

    /// Number of `point_alias` calls.
    pub fn alias_updates(&self) -> usize {
        self.read().alias_updates
    }
}

#[async_trait]
impl SearchIndexProvider for InMemoryProvider {
    async fn index_exists(&self, index: &str) -> Result<bool, SearchIndexError> {
        Ok(self.read().indices.contains_key(index))
    }

    async fn create_index(&self, index: &str, schema: &Value) -> Result<(), SearchIndexError> {
        let mut state = self.write();
        if state.indices.contains_key(index) {
            return Err(SearchIndexError::index_creation(format!(
                "index {} already exists",
                index
            )));
        }
        state.indices.insert(index.to_string(), schema.clone());
        state.create_calls += 1;
        Ok(())
    }

    async fn alias_targets(&self, alias: &str) -> Result<Vec<String>, SearchIndexError> {
        Ok(self.aliased_indices(alias))
    }

    async fn point_alias(
        &self,
        alias: &str,
        index: &str,
        detach_from: &[String],
    ) -> Result<(), SearchIndexError> {
        let mut state = self.write();
        if !state.indices.contains_key(index) {
            return Err(SearchIndexError::alias(format!("index {} not found", index)));
        }
        if state.indices.contains_key(alias) {
            return Err(SearchIndexError::alias(format!(
                "{} is a concrete index and cannot be used as an alias",
                alias
            )));
        }

        let targets = state.aliases.entry(alias.to_string()).or_default();
        targets.retain(|target| !detach_from.contains(target));
        if !targets.iter().any(|target| target == index) {
            targets.push(index.to_string());
        }
        state.alias_updates += 1;
        Ok(())
    }

    async fn mapping_has_property(
        &self,
        index: &str,
        property: &str,
    ) -> Result<bool, SearchIndexError> {
        let state = self.read();
        let schema = state
            .indices
            .get(index)
            .ok_or_else(|| SearchIndexError::mapping(format!("index {} not found", index)))?;
        Ok(schema["mappings"]["properties"].get(property).is_some())
    }

    async fn put_mapping(&self, index: &str, properties: &Value) -> Result<(), SearchIndexError> {
        let mut state = self.write();
        let schema = state
            .indices
            .get_mut(index)
            .ok_or_else(|| SearchIndexError::mapping(format!("index {} not found", index)))?;

        let additions = properties["properties"].as_object().cloned().unwrap_or_default();
        let mappings = schema
            .as_object_mut()
            .ok_or_else(|| SearchIndexError::mapping("schema is not an object"))?
            .entry("mappings")
            .or_insert_with(|| Value::Object(Map::new()));
        let existing = mappings
            .as_object_mut()
            .ok_or_else(|| SearchIndexError::mapping("mappings is not an object"))?
            .entry("properties")
            .or_insert_with(|| Value::Object(Map::new()));
        if let Some(existing) = existing.as_object_mut() {
            existing.extend(additions);
        }
        Ok(())
    }

    async fn upsert_document(
        &self,
        request: &UpsertDocumentRequest,
    ) -> Result<(), SearchIndexError> {
        let mut state = self.write();
        let index = state.resolve(&request.index)?;
        let documents = state.documents.entry(index).or_default();

        // Partial document semantics: fields in the request overwrite, others stay.
        match (documents.get_mut(&request.id), request.document.as_object()) {
            (Some(Value::Object(existing)), Some(update)) => {
                for (key, value) in update {
                    existing.insert(key.clone(), value.clone());
                }
            }
            _ => {
                documents.insert(request.id.clone(), request.document.clone());
            }
        }
        Ok(())
    }

    async fn delete_document(
        &self,
        request: &DeleteDocumentRequest,
    ) -> Result<(), SearchIndexError> {
        let mut state = self.write();
        let index = state.resolve(&request.index)?;
        if let Some(documents) = state.documents.get_mut(&index) {
            documents.remove(&request.id);
        }
        Ok(())
    }

    async fn update_table_row(
        &self,
        request: &TableRowUpdateRequest,
    ) -> Result<bool, SearchIndexError> {
        let mut state = self.write();
        let index = state.resolve(&request.index)?;
        let Some(documents) = state.documents.get_mut(&index) else {
            return Ok(false);
        };

        let mut owners: Vec<&mut Value> = documents
            .values_mut()
            .filter(|doc| doc[META_ID].as_str() == Some(request.instance_id.as_str()))
            .collect();
        if owners.len() != 1 {
            return Ok(false);
        }

        let Some(owner) = owners.pop().and_then(Value::as_object_mut) else {
            return Ok(false);
        };
        let tables = owner
            .entry(TABLES)
            .or_insert_with(|| Value::Object(Map::new()));
        if let Some(tables) = tables.as_object_mut() {
            let rows = tables
                .entry(request.property_id.clone())
                .or_insert_with(|| Value::Object(Map::new()));
            if let Some(rows) = rows.as_object_mut() {
                rows.insert(request.row_id.clone(), Value::from(request.keywords.clone()));
            }
        }
        Ok(true)
    }

    async fn delete_table_row(
        &self,
        request: &TableRowDeleteRequest,
    ) -> Result<(), SearchIndexError> {
        let mut state = self.write();
        let index = state.resolve(&request.index)?;
        let Some(documents) = state.documents.get_mut(&index) else {
            return Ok(());
        };

        for doc in documents.values_mut() {
            let Some(tables) = doc.get_mut(TABLES).and_then(Value::as_object_mut) else {
                continue;
            };
            let now_empty = match tables
                .get_mut(&request.property_id)
                .and_then(Value::as_object_mut)
            {
                Some(rows) => {
                    rows.remove(&request.row_id);
                    rows.is_empty()
                }
                None => false,
            };
            if now_empty {
                tables.remove(&request.property_id);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_writes_resolve_through_alias() {
        let provider = InMemoryProvider::new();
        provider.seed_index("bk_cmdb.host-1", json!({}));
        provider.seed_alias("bk_cmdb.host", "bk_cmdb.host-1");

        provider
            .upsert_document(&UpsertDocumentRequest {
                index: "bk_cmdb.host".to_string(),
                id: "a:host".to_string(),
                document: json!({"meta_id": "1"}),
            })
            .await
            .unwrap();

        assert!(provider.document("bk_cmdb.host-1", "a:host").is_some());
        assert_eq!(provider.document_count("bk_cmdb.host"), 1);
    }

    #[tokio::test]
    async fn test_table_row_update_and_delete() {
        let provider = InMemoryProvider::new();
        provider.seed_index("inst-1", json!({}));
        provider
            .upsert_document(&UpsertDocumentRequest {
                index: "inst-1".to_string(),
                id: "a:common".to_string(),
                document: json!({"meta_id": "9"}),
            })
            .await
            .unwrap();

        let updated = provider
            .update_table_row(&TableRowUpdateRequest {
                index: "inst-1".to_string(),
                instance_id: "9".to_string(),
                property_id: "disk".to_string(),
                row_id: "r1".to_string(),
                keywords: vec!["ssd".to_string()],
            })
            .await
            .unwrap();
        assert!(updated);
        assert_eq!(
            provider.document("inst-1", "a:common").unwrap()["tables"]["disk"]["r1"],
            json!(["ssd"])
        );

        provider
            .delete_table_row(&TableRowDeleteRequest {
                index: "inst-1".to_string(),
                property_id: "disk".to_string(),
                row_id: "r1".to_string(),
            })
            .await
            .unwrap();
        assert!(provider.document("inst-1", "a:common").unwrap()["tables"]
            .get("disk")
            .is_none());
    }

    #[tokio::test]
    async fn test_table_row_update_without_owner() {
        let provider = InMemoryProvider::new();
        let updated = provider
            .update_table_row(&TableRowUpdateRequest {
                index: "inst-1".to_string(),
                instance_id: "9".to_string(),
                property_id: "disk".to_string(),
                row_id: "r1".to_string(),
                keywords: vec![],
            })
            .await
            .unwrap();
        assert!(!updated);
    }
}
