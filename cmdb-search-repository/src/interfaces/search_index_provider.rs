//! Search index provider trait definition.
//!
//! This module defines the abstract interface for search index operations,
//! allowing for different backend implementations (OpenSearch, Elasticsearch, etc.).

use async_trait::async_trait;
use serde_json::Value;

use crate::errors::SearchIndexError;
use crate::types::{
    DeleteDocumentRequest, TableRowDeleteRequest, TableRowUpdateRequest, UpsertDocumentRequest,
};

/// Abstracts the underlying search index implementation (OpenSearch, Elasticsearch, etc.).
///
/// The index-management methods are primitives used by `IndexCatalog::ensure`;
/// the catalog owns the idempotency and alias rules, the provider only talks to
/// the backend. The document methods are used by the loader to apply the
/// outcome of a change event.
///
/// All methods return `Result<T, SearchIndexError>` for consistent error handling across
/// different backend implementations.
#[async_trait]
pub trait SearchIndexProvider: Send + Sync {
    /// Check whether a concrete index exists.
    async fn index_exists(&self, index: &str) -> Result<bool, SearchIndexError>;

    /// Create a concrete index with the given settings and mappings.
    async fn create_index(&self, index: &str, schema: &Value) -> Result<(), SearchIndexError>;

    /// List the concrete indices an alias currently points at.
    ///
    /// An alias that does not exist yields an empty list, not an error.
    async fn alias_targets(&self, alias: &str) -> Result<Vec<String>, SearchIndexError>;

    /// Atomically bind `alias` to `index` and detach it from every index in `detach_from`.
    async fn point_alias(
        &self,
        alias: &str,
        index: &str,
        detach_from: &[String],
    ) -> Result<(), SearchIndexError>;

    /// Check whether the mapping of `index` declares a top-level `property`.
    async fn mapping_has_property(
        &self,
        index: &str,
        property: &str,
    ) -> Result<bool, SearchIndexError>;

    /// Add mapping properties to an existing index.
    ///
    /// # Arguments
    ///
    /// * `index` - The concrete index name
    /// * `properties` - A `{"properties": {...}}` mapping fragment
    async fn put_mapping(&self, index: &str, properties: &Value) -> Result<(), SearchIndexError>;

    /// Create a document or merge the request's fields into the stored one (upsert).
    ///
    /// Fields absent from the request keep their stored value.
    async fn upsert_document(&self, request: &UpsertDocumentRequest)
        -> Result<(), SearchIndexError>;

    /// Delete a document. A document that does not exist is not an error.
    async fn delete_document(&self, request: &DeleteDocumentRequest)
        -> Result<(), SearchIndexError>;

    /// Set the keywords of a table row on the owning instance document.
    ///
    /// # Returns
    ///
    /// * `Ok(true)` - Exactly one owning document was updated
    /// * `Ok(false)` - No (or more than one) document matched the instance id
    /// * `Err(SearchIndexError)` - If the update request fails
    async fn update_table_row(
        &self,
        request: &TableRowUpdateRequest,
    ) -> Result<bool, SearchIndexError>;

    /// Remove a table row from every document that holds it.
    async fn delete_table_row(&self, request: &TableRowDeleteRequest)
        -> Result<(), SearchIndexError>;
}
