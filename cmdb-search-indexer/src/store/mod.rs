//! Primary-store access.
//!
//! The configuration database is owned by the host runtime. The indexer
//! only needs to read a few collections on demand (models, attributes,
//! resource-pool businesses and the owners of table rows), so access goes
//! through the narrow `ConfigStore` trait.

mod memory;

pub use memory::InMemoryStore;

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::errors::StoreError;
use crate::identity::SourceDocument;

/// Equality filter: every field must match its value exactly.
pub type Filter = Map<String, Value>;

/// Read access to the configuration database.
#[async_trait]
pub trait ConfigStore: Send + Sync {
    /// Find every record of `collection` matching `filter`.
    async fn find(
        &self,
        database: &str,
        collection: &str,
        filter: &Filter,
    ) -> Result<Vec<SourceDocument>, StoreError>;

    /// Find the first record of `collection` matching `filter`.
    async fn find_one(
        &self,
        database: &str,
        collection: &str,
        filter: &Filter,
    ) -> Result<Option<SourceDocument>, StoreError> {
        Ok(self
            .find(database, collection, filter)
            .await?
            .into_iter()
            .next())
    }
}

/// Build a single-field equality filter.
pub fn filter_eq(field: &str, value: impl Into<Value>) -> Filter {
    let mut filter = Map::new();
    filter.insert(field.to_string(), value.into());
    filter
}
