//! CMDB Search Indexer Main Entry Point
//!
//! Connects to OpenSearch, starts the indexing layer and indexes the change
//! events piped to stdin as newline-delimited JSON. The configuration store
//! is seeded from the snapshot named by `CMDB_STORE_SNAPSHOT`.

use dotenv::dotenv;
use cmdb_search_indexer::runner::{self, EventRunner};
use cmdb_search_indexer::{init, Dependencies, InMemoryStore, IndexingError, InitContext};
use std::env;
use std::sync::Arc;
use tokio::fs::File;
use tokio::io::{self, BufReader};
use tokio::signal;
use tokio::sync::broadcast;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize tracing/logging.
fn init_tracing() -> Result<(), IndexingError> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("cmdb_search_indexer=info,cmdb_search_repository=info"));

    let json_output = env::var("LOG_FORMAT")
        .map(|format| format.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    if json_output {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_target(true)
                    .with_thread_ids(true),
            )
            .init();

        info!(
            service_name = "cmdb-search-indexer",
            service_version = env!("CARGO_PKG_VERSION"),
            "Tracing initialized with JSON format"
        );
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_target(true).pretty())
            .init();

        info!(
            service_name = "cmdb-search-indexer",
            service_version = env!("CARGO_PKG_VERSION"),
            "Tracing initialized with console output"
        );
    }

    Ok(())
}

/// Seed the configuration store from `CMDB_STORE_SNAPSHOT`, if set.
async fn seed_from_snapshot(store: &InMemoryStore) -> Result<(), IndexingError> {
    let Ok(path) = env::var("CMDB_STORE_SNAPSHOT") else {
        warn!("CMDB_STORE_SNAPSHOT not set, starting with an empty configuration store");
        return Ok(());
    };

    let file = File::open(&path).await.map_err(|e| {
        IndexingError::config(format!("Failed to open store snapshot {}: {}", path, e))
    })?;
    runner::seed_store(store, BufReader::new(file)).await?;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), IndexingError> {
    // Load environment variables from .env file
    dotenv().ok();

    init_tracing()?;

    info!("Starting CMDB Search Indexer");

    let deps = match Dependencies::new().await {
        Ok(deps) => {
            info!("Dependencies initialized successfully");
            deps
        }
        Err(e) => {
            error!(error = %e, "Failed to initialize dependencies");
            return Err(e);
        }
    };

    let store = Arc::new(InMemoryStore::new());
    seed_from_snapshot(&store).await?;

    let indexer = match init(InitContext {
        store: store.clone(),
        provider: deps.provider,
        config: deps.settings,
    })
    .await
    {
        Ok(indexer) => indexer,
        Err(e) => {
            error!(error = %e, "Failed to initialize indexing layer");
            return Err(e);
        }
    };

    for definition in indexer.catalog.definitions() {
        info!(
            index = %definition.name(),
            alias = %definition.alias(),
            "Index ready"
        );
    }

    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
    tokio::spawn(async move {
        if signal::ctrl_c().await.is_ok() {
            let _ = shutdown_tx.send(());
        }
    });

    let runner = EventRunner::new(indexer.dispatcher.clone(), indexer.loader, store);
    let result = runner.run(BufReader::new(io::stdin()), shutdown_rx).await;
    indexer.refresh.abort();

    match result {
        Ok(stats) => {
            info!(events = stats.events, failed = stats.failed, "Search indexer completed successfully");
            Ok(())
        }
        Err(e) => {
            error!(error = %e, "Search indexer failed");
            Err(e.into())
        }
    }
}
