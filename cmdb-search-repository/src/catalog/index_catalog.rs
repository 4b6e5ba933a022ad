//! Index catalog.
//!
//! Holds the definitions of every managed index and reconciles the search
//! engine with them: create the versioned index when missing, make the alias
//! resolve to exactly that index, and add the table-property mapping to
//! indices created before it existed.

use cmdb_search_shared::properties::TABLES;
use tracing::{info, instrument};

use crate::catalog::index_definition::{
    table_properties_mapping, IndexDefinition, IndexKind, IndexSettings,
};
use crate::errors::SearchIndexError;
use crate::interfaces::SearchIndexProvider;

/// The set of managed index definitions.
#[derive(Debug, Clone)]
pub struct IndexCatalog {
    definitions: Vec<IndexDefinition>,
}

impl IndexCatalog {
    /// Build a catalog covering every [`IndexKind`], sized with `settings`.
    pub fn new(settings: IndexSettings) -> Self {
        let definitions = IndexKind::ALL
            .iter()
            .map(|kind| IndexDefinition::new(*kind, settings))
            .collect();
        Self { definitions }
    }

    pub fn definitions(&self) -> &[IndexDefinition] {
        &self.definitions
    }

    pub fn get(&self, kind: IndexKind) -> &IndexDefinition {
        // The catalog is built from `IndexKind::ALL` in order.
        &self.definitions[kind as usize]
    }

    /// Alias used for reads and writes of `kind`.
    pub fn alias(&self, kind: IndexKind) -> &str {
        self.get(kind).alias()
    }

    /// Concrete, versioned index name of `kind`.
    pub fn index_name(&self, kind: IndexKind) -> &str {
        self.get(kind).name()
    }

    /// Reconcile one index with its definition.
    ///
    /// Running this any number of times leaves the engine in the same state:
    /// the versioned index exists, the alias points at it and only at it, and
    /// its mapping declares the `tables` object property.
    #[instrument(skip_all, fields(index = %definition.name(), alias = %definition.alias()))]
    pub async fn ensure(
        &self,
        definition: &IndexDefinition,
        provider: &dyn SearchIndexProvider,
    ) -> Result<(), SearchIndexError> {
        let name = definition.name();
        let alias = definition.alias();

        if !provider.index_exists(name).await? {
            info!("Creating index");
            provider.create_index(name, definition.schema()).await?;
        }

        let targets = provider.alias_targets(alias).await?;
        if targets.len() != 1 || targets[0] != name {
            let stale: Vec<String> = targets.into_iter().filter(|t| t != name).collect();
            info!(detached = ?stale, "Pointing alias at index");
            provider.point_alias(alias, name, &stale).await?;
        }

        if !provider.mapping_has_property(name, TABLES).await? {
            info!("Adding table properties mapping");
            provider
                .put_mapping(name, &table_properties_mapping())
                .await?;
        }

        Ok(())
    }

    /// Reconcile every managed index, stopping at the first failure.
    pub async fn ensure_all(&self, provider: &dyn SearchIndexProvider) -> Result<(), SearchIndexError> {
        for definition in &self.definitions {
            self.ensure(definition, provider).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryProvider;
    use serde_json::json;

    fn catalog() -> IndexCatalog {
        IndexCatalog::new(IndexSettings::new(1, 1))
    }

    #[test]
    fn test_lookup_by_kind() {
        let catalog = catalog();
        for kind in IndexKind::ALL {
            assert_eq!(catalog.get(kind).kind(), kind);
        }
        assert_eq!(catalog.alias(IndexKind::Host), "bk_cmdb.host");
        assert_eq!(catalog.index_name(IndexKind::Model), "bk_cmdb.model-20210710");
    }

    #[tokio::test]
    async fn test_ensure_creates_index_and_alias() {
        let catalog = catalog();
        let provider = InMemoryProvider::new();

        catalog.ensure_all(&provider).await.unwrap();

        assert_eq!(provider.create_calls(), IndexKind::ALL.len());
        for definition in catalog.definitions() {
            assert_eq!(
                provider.aliased_indices(definition.alias()),
                vec![definition.name().to_string()]
            );
        }
    }

    #[tokio::test]
    async fn test_ensure_is_idempotent() {
        let catalog = catalog();
        let provider = InMemoryProvider::new();

        catalog.ensure_all(&provider).await.unwrap();
        let creates = provider.create_calls();
        let alias_updates = provider.alias_updates();

        catalog.ensure_all(&provider).await.unwrap();

        assert_eq!(provider.create_calls(), creates);
        assert_eq!(provider.alias_updates(), alias_updates);
    }

    #[tokio::test]
    async fn test_ensure_detaches_previous_version() {
        let catalog = catalog();
        let provider = InMemoryProvider::new();
        provider.seed_index("bk_cmdb.biz-20200101", json!({}));
        provider.seed_alias("bk_cmdb.biz", "bk_cmdb.biz-20200101");

        let definition = catalog.get(IndexKind::Biz);
        catalog.ensure(definition, &provider).await.unwrap();

        assert_eq!(
            provider.aliased_indices("bk_cmdb.biz"),
            vec!["bk_cmdb.biz-20210710".to_string()]
        );
    }

    #[tokio::test]
    async fn test_ensure_adds_missing_tables_mapping() {
        let catalog = catalog();
        let provider = InMemoryProvider::new();
        let definition = catalog.get(IndexKind::ObjectInstance);
        provider.seed_index(
            definition.name(),
            json!({"mappings": {"properties": {"keywords": {"type": "text"}}}}),
        );

        catalog.ensure(definition, &provider).await.unwrap();

        let schema = provider.index_schema(definition.name()).unwrap();
        assert_eq!(schema["mappings"]["properties"]["tables"]["type"], "object");
        assert_eq!(schema["mappings"]["properties"]["keywords"]["type"], "text");
        assert_eq!(provider.create_calls(), 0);
    }
}
