//! OpenSearch provider implementation.
//!
//! This module provides the concrete implementation of `SearchIndexProvider`
//! using the OpenSearch Rust crate.

use async_trait::async_trait;
use opensearch::{
    http::response::Response,
    http::transport::{SingleNodeConnectionPool, TransportBuilder},
    indices::{
        IndicesCreateParts, IndicesExistsParts, IndicesGetAliasParts, IndicesGetMappingParts,
        IndicesPutMappingParts,
    },
    params::Conflicts,
    DeleteParts, OpenSearch, UpdateByQueryParts, UpdateParts,
};
use serde_json::{json, Value};
use tracing::{debug, error, info};
use url::Url;

use crate::errors::SearchIndexError;
use crate::interfaces::SearchIndexProvider;
use crate::types::{
    DeleteDocumentRequest, TableRowDeleteRequest, TableRowUpdateRequest, UpsertDocumentRequest,
};
use crate::utils;

/// Number of times a document update is retried on version conflicts.
const RETRY_ON_CONFLICT: i64 = 10;

/// OpenSearch provider implementation.
///
/// # Example
///
/// ```ignore
/// use cmdb_search_repository::{IndexCatalog, IndexSettings, OpenSearchProvider};
///
/// let provider = OpenSearchProvider::new("http://localhost:9200").await?;
/// let catalog = IndexCatalog::new(IndexSettings::new(1, 1));
/// catalog.ensure_all(&provider).await?;
/// ```
pub struct OpenSearchProvider {
    client: OpenSearch,
}

impl OpenSearchProvider {
    /// Create a new OpenSearch provider connected to the specified URL.
    ///
    /// # Arguments
    ///
    /// * `url` - The OpenSearch server URL (e.g., "http://localhost:9200")
    ///
    /// # Returns
    ///
    /// * `Ok(OpenSearchProvider)` - A new provider instance
    /// * `Err(SearchIndexError)` - If connection setup fails
    pub async fn new(url: &str) -> Result<Self, SearchIndexError> {
        let parsed_url =
            Url::parse(url).map_err(|e| SearchIndexError::connection(e.to_string()))?;

        let conn_pool = SingleNodeConnectionPool::new(parsed_url);
        let transport = TransportBuilder::new(conn_pool)
            .disable_proxy()
            .build()
            .map_err(|e| SearchIndexError::connection(e.to_string()))?;

        let client = OpenSearch::new(transport);

        info!(url = %url, "Created OpenSearch provider");

        Ok(Self { client })
    }

    /// Turn a non-success response into an error built by `make`.
    async fn check(
        response: Response,
        operation: &str,
        make: fn(String) -> SearchIndexError,
    ) -> Result<Response, SearchIndexError> {
        let status = response.status_code();
        if status.is_success() {
            return Ok(response);
        }

        let error_body = response.text().await.unwrap_or_default();
        error!(status = %status, body = %error_body, "{} request failed", operation);
        Err(make(format!(
            "{} failed with status {}: {}",
            operation, status, error_body
        )))
    }

    async fn json_body(response: Response) -> Result<Value, SearchIndexError> {
        response
            .json::<Value>()
            .await
            .map_err(|e| SearchIndexError::parse(e.to_string()))
    }

    /// Run an update-by-query and return the number of updated documents.
    async fn update_by_query(&self, index: &str, body: Value) -> Result<u64, SearchIndexError> {
        let response = self
            .client
            .update_by_query(UpdateByQueryParts::Index(&[index]))
            .conflicts(Conflicts::Proceed)
            .refresh(true)
            .body(body)
            .send()
            .await
            .map_err(|e| SearchIndexError::update(e.to_string()))?;

        let response = Self::check(response, "Update by query", SearchIndexError::UpdateError).await?;
        let body = Self::json_body(response).await?;
        Ok(body["updated"].as_u64().unwrap_or(0))
    }
}

#[async_trait]
impl SearchIndexProvider for OpenSearchProvider {
    async fn index_exists(&self, index: &str) -> Result<bool, SearchIndexError> {
        let response = self
            .client
            .indices()
            .exists(IndicesExistsParts::Index(&[index]))
            .send()
            .await
            .map_err(|e| SearchIndexError::connection(e.to_string()))?;

        match response.status_code().as_u16() {
            200 => Ok(true),
            404 => Ok(false),
            status => Err(SearchIndexError::unknown(format!(
                "Index exists check for {} returned status {}",
                index, status
            ))),
        }
    }

    async fn create_index(&self, index: &str, schema: &Value) -> Result<(), SearchIndexError> {
        let response = self
            .client
            .indices()
            .create(IndicesCreateParts::Index(index))
            .body(schema.clone())
            .send()
            .await
            .map_err(|e| SearchIndexError::index_creation(e.to_string()))?;

        Self::check(response, "Create index", SearchIndexError::IndexCreationError).await?;
        info!(index = %index, "Index created");
        Ok(())
    }

    /// The `_alias` API answers `{"<index>": {"aliases": {"<alias>": {}}}}`,
    /// or 404 when the alias does not exist.
    async fn alias_targets(&self, alias: &str) -> Result<Vec<String>, SearchIndexError> {
        let response = self
            .client
            .indices()
            .get_alias(IndicesGetAliasParts::Name(&[alias]))
            .send()
            .await
            .map_err(|e| SearchIndexError::alias(e.to_string()))?;

        if response.status_code().as_u16() == 404 {
            return Ok(Vec::new());
        }

        let response = Self::check(response, "Get alias", SearchIndexError::AliasError).await?;
        let body = Self::json_body(response).await?;
        let indices = body
            .as_object()
            .map(|indices| indices.keys().cloned().collect())
            .unwrap_or_default();
        Ok(indices)
    }

    async fn point_alias(
        &self,
        alias: &str,
        index: &str,
        detach_from: &[String],
    ) -> Result<(), SearchIndexError> {
        let mut actions: Vec<Value> = detach_from
            .iter()
            .map(|stale| json!({ "remove": { "index": stale, "alias": alias } }))
            .collect();
        actions.push(json!({ "add": { "index": index, "alias": alias } }));

        // A single `_aliases` request applies all actions atomically.
        let response = self
            .client
            .indices()
            .update_aliases()
            .body(json!({ "actions": actions }))
            .send()
            .await
            .map_err(|e| SearchIndexError::alias(e.to_string()))?;

        Self::check(response, "Update aliases", SearchIndexError::AliasError).await?;
        info!(alias = %alias, index = %index, detached = ?detach_from, "Alias updated");
        Ok(())
    }

    async fn mapping_has_property(
        &self,
        index: &str,
        property: &str,
    ) -> Result<bool, SearchIndexError> {
        let response = self
            .client
            .indices()
            .get_mapping(IndicesGetMappingParts::Index(&[index]))
            .send()
            .await
            .map_err(|e| SearchIndexError::mapping(e.to_string()))?;

        let response = Self::check(response, "Get mapping", SearchIndexError::MappingError).await?;
        let body = Self::json_body(response).await?;
        Ok(body[index]["mappings"]["properties"].get(property).is_some())
    }

    async fn put_mapping(&self, index: &str, properties: &Value) -> Result<(), SearchIndexError> {
        let response = self
            .client
            .indices()
            .put_mapping(IndicesPutMappingParts::Index(&[index]))
            .body(properties.clone())
            .send()
            .await
            .map_err(|e| SearchIndexError::mapping(e.to_string()))?;

        Self::check(response, "Put mapping", SearchIndexError::MappingError).await?;
        info!(index = %index, "Mapping updated");
        Ok(())
    }

    /// Merge the document into the stored one, creating it if it doesn't exist.
    ///
    /// Fields the request does not carry (such as `tables` on instance
    /// documents) are left untouched.
    async fn upsert_document(
        &self,
        request: &UpsertDocumentRequest,
    ) -> Result<(), SearchIndexError> {
        // API reference: https://docs.opensearch.org/latest/api-reference/document-apis/update-document/#using-the-upsert-operation
        let response = self
            .client
            .update(UpdateParts::IndexId(&request.index, &request.id))
            .retry_on_conflict(RETRY_ON_CONFLICT)
            .body(json!({
                "doc": request.document,
                "doc_as_upsert": true
            }))
            .send()
            .await
            .map_err(|e| SearchIndexError::update(e.to_string()))?;

        Self::check(response, "Update", SearchIndexError::UpdateError).await?;
        debug!(index = %request.index, doc_id = %request.id, "Document updated/created");
        Ok(())
    }

    async fn delete_document(
        &self,
        request: &DeleteDocumentRequest,
    ) -> Result<(), SearchIndexError> {
        let response = self
            .client
            .delete(DeleteParts::IndexId(&request.index, &request.id))
            .send()
            .await
            .map_err(|e| SearchIndexError::delete(e.to_string()))?;

        // 404 is acceptable - document may not exist
        if response.status_code().as_u16() != 404 {
            Self::check(response, "Delete", SearchIndexError::DeleteError).await?;
        }

        debug!(index = %request.index, doc_id = %request.id, "Document deleted");
        Ok(())
    }

    async fn update_table_row(
        &self,
        request: &TableRowUpdateRequest,
    ) -> Result<bool, SearchIndexError> {
        let body = utils::table_row_update_body(request)?;
        let updated = self.update_by_query(&request.index, body).await?;

        debug!(
            index = %request.index,
            instance_id = %request.instance_id,
            property_id = %request.property_id,
            row_id = %request.row_id,
            updated,
            "Table row update by query"
        );
        Ok(updated == 1)
    }

    async fn delete_table_row(
        &self,
        request: &TableRowDeleteRequest,
    ) -> Result<(), SearchIndexError> {
        let body = utils::table_row_delete_body(request)?;
        let updated = self.update_by_query(&request.index, body).await?;

        debug!(
            index = %request.index,
            property_id = %request.property_id,
            row_id = %request.row_id,
            updated,
            "Table row removed"
        );
        Ok(())
    }
}
