//! Background refresh of the caches.
//!
//! Each cache is rebuilt by its own task on a fixed period for the lifetime
//! of the process. The first rebuild is done by the bootstrapper, so the
//! loops wait one period before their first run.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{error, warn};

use super::{EnumLabelCache, ExclusionCache};
use crate::errors::CacheError;
use crate::store::ConfigStore;

/// Handles of the spawned refresh tasks.
pub struct RefreshTasks {
    pub enum_labels: JoinHandle<()>,
    pub exclusion: JoinHandle<()>,
}

impl RefreshTasks {
    /// Stop both loops.
    pub fn abort(&self) {
        self.enum_labels.abort();
        self.exclusion.abort();
    }
}

/// Rebuild the enum label cache every `period`, forever.
///
/// A failed rebuild is logged and the previous snapshot stays in use.
pub async fn enum_refresh_loop(
    cache: Arc<EnumLabelCache>,
    store: Arc<dyn ConfigStore>,
    database: String,
    period: Duration,
) {
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    ticker.tick().await;

    loop {
        ticker.tick().await;
        if let Err(e) = cache.rebuild(store.as_ref(), &database).await {
            warn!(error = %e, "Failed to rebuild enum label cache, keeping previous snapshot");
        }
    }
}

/// Rebuild the exclusion cache every `period` until a rebuild fails.
///
/// Returns the error of the failed rebuild.
pub async fn exclusion_refresh_loop(
    cache: Arc<ExclusionCache>,
    store: Arc<dyn ConfigStore>,
    database: String,
    period: Duration,
) -> CacheError {
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    ticker.tick().await;

    loop {
        ticker.tick().await;
        if let Err(e) = cache.rebuild(store.as_ref(), &database).await {
            return e;
        }
    }
}

/// Spawn both refresh loops.
///
/// A failed exclusion rebuild terminates the process: indexing without the
/// exclusion set would publish resource-pool records.
pub fn spawn_refresh_loops(
    enum_labels: Arc<EnumLabelCache>,
    exclusion: Arc<ExclusionCache>,
    store: Arc<dyn ConfigStore>,
    database: String,
    period: Duration,
) -> RefreshTasks {
    let enum_task = tokio::spawn(enum_refresh_loop(
        enum_labels,
        store.clone(),
        database.clone(),
        period,
    ));

    let exclusion_task = tokio::spawn(async move {
        let e = exclusion_refresh_loop(exclusion, store, database, period).await;
        error!(error = %e, "Failed to rebuild resource pool exclusion cache, exiting");
        std::process::exit(1);
    });

    RefreshTasks {
        enum_labels: enum_task,
        exclusion: exclusion_task,
    }
}
