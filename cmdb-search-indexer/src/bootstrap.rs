//! Startup of the indexing layer.
//!
//! Reconciles every managed index, fills both caches, starts their refresh
//! loops and hands back the dispatcher the host runtime calls for each
//! change event.

use std::sync::Arc;

use cmdb_search_repository::{IndexCatalog, SearchIndexProvider};
use tracing::{info, instrument, warn};

use crate::cache::{spawn_refresh_loops, EnumLabelCache, ExclusionCache, RefreshTasks};
use crate::config::Settings;
use crate::dispatcher::Dispatcher;
use crate::loader::SearchLoader;
use crate::store::ConfigStore;
use crate::IndexingError;

/// Inputs of [`init`].
pub struct InitContext {
    /// Primary-store handle.
    pub store: Arc<dyn ConfigStore>,
    /// Search-engine handle.
    pub provider: Arc<dyn SearchIndexProvider>,
    pub config: Settings,
}

/// A started indexing layer.
pub struct Bootstrapped {
    pub dispatcher: Arc<Dispatcher>,
    pub catalog: Arc<IndexCatalog>,
    /// Writes dispatcher outcomes through the same provider.
    pub loader: SearchLoader,
    pub refresh: RefreshTasks,
}

/// Start the indexing layer.
///
/// Fails when an index cannot be reconciled or when the first exclusion
/// rebuild fails. A failed first enum rebuild is only logged.
#[instrument(skip_all, fields(database = %ctx.config.database))]
pub async fn init(ctx: InitContext) -> Result<Bootstrapped, IndexingError> {
    let InitContext {
        store,
        provider,
        config,
    } = ctx;

    let catalog = Arc::new(IndexCatalog::new(config.index_settings()));
    catalog.ensure_all(provider.as_ref()).await?;
    info!(
        indices = catalog.definitions().len(),
        shards = config.shards,
        replicas = config.replicas,
        "Search indices ready"
    );

    let exclusion = Arc::new(ExclusionCache::new());
    let excluded = exclusion.rebuild(store.as_ref(), &config.database).await?;
    info!(excluded_businesses = excluded, "Resource pool exclusion cache loaded");

    let enum_labels = Arc::new(EnumLabelCache::new());
    match enum_labels.rebuild(store.as_ref(), &config.database).await {
        Ok(objects) => info!(objects = objects, "Enum label cache loaded"),
        Err(e) => warn!(error = %e, "Failed to load enum label cache, starting empty"),
    }

    let refresh = spawn_refresh_loops(
        enum_labels.clone(),
        exclusion.clone(),
        store.clone(),
        config.database.clone(),
        config.refresh_interval,
    );

    let dispatcher = Arc::new(Dispatcher::new(
        catalog.clone(),
        store.clone(),
        enum_labels,
        exclusion,
    ));
    let loader = SearchLoader::new(provider, store);

    info!("Indexing layer initialized");
    Ok(Bootstrapped {
        dispatcher,
        catalog,
        loader,
        refresh,
    })
}
