//! Event runner for the standalone binary.
//!
//! Reads change events as newline-delimited JSON, keeps the in-memory
//! configuration store in step with them, and pushes every event through
//! the dispatcher and the loader.

use std::sync::Arc;

use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::sync::broadcast;
use tokio::time::{interval, Duration, MissedTickBehavior};
use tracing::{debug, info, instrument, warn};

use crate::collections::fields;
use crate::dispatcher::{ChangeEvent, Dispatcher};
use crate::errors::IngestError;
use crate::loader::SearchLoader;
use crate::outcome::MapOutcome;
use crate::store::{filter_eq, InMemoryStore};

/// Counters of one run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RunStats {
    pub events: u64,
    pub loaded: u64,
    pub dropped: u64,
    pub failed: u64,
    pub malformed: u64,
}

/// Copy `event` into `store`: writes replace the record with the same `_id`,
/// deletes remove it.
pub fn mirror(store: &InMemoryStore, event: &ChangeEvent) {
    let Some(id) = event.document.get(fields::PRIMARY_ID) else {
        if !event.operation.is_delete() {
            store.insert(
                &event.database,
                &event.collection,
                event.document.clone().into(),
            );
        }
        return;
    };

    store.remove(
        &event.database,
        &event.collection,
        &filter_eq(fields::PRIMARY_ID, id.clone()),
    );
    if !event.operation.is_delete() {
        store.insert(
            &event.database,
            &event.collection,
            event.document.clone().into(),
        );
    }
}

/// Load a snapshot of the configuration database into `store`.
///
/// The snapshot uses the event stream format. Returns the number of events
/// applied; a malformed line is an error.
pub async fn seed_store<R>(store: &InMemoryStore, reader: R) -> Result<usize, IngestError>
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = reader.lines();
    let mut line_number = 0;
    let mut applied = 0;

    while let Some(line) = lines.next_line().await? {
        line_number += 1;
        if line.trim().is_empty() {
            continue;
        }
        let event: ChangeEvent =
            serde_json::from_str(&line).map_err(|source| IngestError::Decode {
                line: line_number,
                source,
            })?;
        mirror(store, &event);
        applied += 1;
    }

    info!(records = applied, "Configuration store seeded");
    Ok(applied)
}

/// Runs change events through the dispatcher and the loader.
pub struct EventRunner {
    dispatcher: Arc<Dispatcher>,
    loader: SearchLoader,
    store: Arc<InMemoryStore>,
}

impl EventRunner {
    pub fn new(dispatcher: Arc<Dispatcher>, loader: SearchLoader, store: Arc<InMemoryStore>) -> Self {
        Self {
            dispatcher,
            loader,
            store,
        }
    }

    /// Consume `reader` until it ends or a shutdown signal arrives.
    ///
    /// Malformed lines and failing events are logged and counted, and the
    /// run goes on. Only a failure to read the stream stops it.
    #[instrument(skip_all)]
    pub async fn run<R>(
        &self,
        reader: R,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<RunStats, IngestError>
    where
        R: AsyncBufRead + Unpin,
    {
        info!("Ready to process change events");

        let mut lines = reader.lines();
        let mut stats = RunStats::default();
        let mut line_number = 0;

        let mut progress_timer = interval(Duration::from_secs(10));
        progress_timer.set_missed_tick_behavior(MissedTickBehavior::Skip);
        progress_timer.tick().await;

        loop {
            tokio::select! {
                line = lines.next_line() => {
                    let Some(line) = line? else {
                        info!("Event stream ended");
                        break;
                    };
                    line_number += 1;
                    if line.trim().is_empty() {
                        continue;
                    }
                    match serde_json::from_str::<ChangeEvent>(&line) {
                        Ok(event) => self.process(&event, &mut stats).await,
                        Err(e) => {
                            warn!(line = line_number, error = %e, "Skipping malformed change event");
                            stats.malformed += 1;
                        }
                    }
                }
                _ = progress_timer.tick() => {
                    info!(
                        events = stats.events,
                        loaded = stats.loaded,
                        dropped = stats.dropped,
                        failed = stats.failed,
                        "Indexing progress"
                    );
                }
                Ok(()) = shutdown.recv() => {
                    info!("Received shutdown signal");
                    break;
                }
            }
        }

        info!(
            events = stats.events,
            loaded = stats.loaded,
            dropped = stats.dropped,
            failed = stats.failed,
            malformed = stats.malformed,
            "Event runner stopped"
        );
        Ok(stats)
    }

    async fn process(&self, event: &ChangeEvent, stats: &mut RunStats) {
        stats.events += 1;

        // Writes must be visible to model and owner lookups; deletes are
        // mapped from the event alone.
        if !event.operation.is_delete() {
            mirror(&self.store, event);
        }

        let result = self.dispatcher.handle(event).await;

        if event.operation.is_delete() {
            mirror(&self.store, event);
        }

        let outcome = match result {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!(collection = %event.collection, error = %e, "Failed to map change event");
                stats.failed += 1;
                return;
            }
        };

        if let MapOutcome::Drop(reason) = &outcome {
            debug!(collection = %event.collection, reason = ?reason, "Dropped change event");
            stats.dropped += 1;
            return;
        }

        match self.loader.apply(&outcome).await {
            Ok(()) => stats.loaded += 1,
            Err(e) => {
                warn!(collection = %event.collection, error = %e, "Failed to load change event");
                stats.failed += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::ConfigStore;
    use serde_json::{json, Value};

    fn event(value: Value) -> ChangeEvent {
        serde_json::from_value(value).unwrap()
    }

    async fn hosts(store: &InMemoryStore) -> Vec<Value> {
        store
            .find("cmdb", "cc_HostBase", &Default::default())
            .await
            .unwrap()
            .into_iter()
            .map(Value::Object)
            .collect()
    }

    #[tokio::test]
    async fn test_mirror_replaces_and_removes_by_primary_id() {
        let store = InMemoryStore::new();
        let write = |size: i64| {
            event(json!({
                "collection": "cc_HostBase",
                "database": "cmdb",
                "operation": "u",
                "document": {"_id": "651f0c1e9a7b2c0001a1b2c3", "bk_host_id": 10, "size": size}
            }))
        };

        mirror(&store, &write(1));
        mirror(&store, &write(2));
        assert_eq!(
            hosts(&store).await,
            vec![json!({"_id": "651f0c1e9a7b2c0001a1b2c3", "bk_host_id": 10, "size": 2})]
        );

        mirror(
            &store,
            &event(json!({
                "collection": "cc_HostBase",
                "database": "cmdb",
                "operation": "d",
                "document": {"_id": "651f0c1e9a7b2c0001a1b2c3"}
            })),
        );
        assert!(hosts(&store).await.is_empty());
    }

    #[tokio::test]
    async fn test_seed_store() {
        let store = InMemoryStore::new();
        let snapshot = concat!(
            r#"{"collection":"cc_HostBase","database":"cmdb","operation":"i","document":{"_id":"a","bk_host_id":1}}"#,
            "\n\n",
            r#"{"collection":"cc_HostBase","database":"cmdb","operation":"i","document":{"_id":"b","bk_host_id":2}}"#,
            "\n"
        );

        assert_eq!(seed_store(&store, snapshot.as_bytes()).await.unwrap(), 2);
        assert_eq!(hosts(&store).await.len(), 2);
    }

    #[tokio::test]
    async fn test_seed_store_rejects_malformed_line() {
        let store = InMemoryStore::new();
        let snapshot = concat!(
            r#"{"collection":"cc_HostBase","database":"cmdb","operation":"i","document":{"_id":"a"}}"#,
            "\n",
            "not an event\n"
        );

        let result = seed_store(&store, snapshot.as_bytes()).await;
        assert!(matches!(result, Err(IngestError::Decode { line: 2, .. })));
    }
}
