//! Loader module for the search indexer.
//!
//! Applies mapping outcomes to the search index. This is what the host
//! runtime would otherwise do with the outcomes returned by the dispatcher;
//! it is used by the binary and by the integration tests.

use std::sync::Arc;

use cmdb_search_repository::{DeleteDocumentRequest, SearchIndexProvider, UpsertDocumentRequest};
use tracing::{debug, instrument, warn};

use crate::collections::Collection;
use crate::errors::{IngestError, MapError};
use crate::identity::{document_id, primary_id};
use crate::outcome::{MapOutcome, TableRowUpdate};
use crate::store::{filter_eq, ConfigStore};

/// Loader that writes mapping outcomes into the search engine.
pub struct SearchLoader {
    provider: Arc<dyn SearchIndexProvider>,
    store: Arc<dyn ConfigStore>,
}

impl SearchLoader {
    /// Create a new search loader.
    ///
    /// `store` is used to find the owner of a table row whose document does
    /// not exist yet.
    pub fn new(provider: Arc<dyn SearchIndexProvider>, store: Arc<dyn ConfigStore>) -> Self {
        Self { provider, store }
    }

    /// Apply one outcome.
    #[instrument(skip_all)]
    pub async fn apply(&self, outcome: &MapOutcome) -> Result<(), IngestError> {
        match outcome {
            MapOutcome::Index { index, id, body } => {
                self.provider
                    .upsert_document(&UpsertDocumentRequest {
                        index: index.clone(),
                        id: id.clone(),
                        document: body.clone(),
                    })
                    .await?;
                debug!(index = %index, id = %id, "Indexed document");
            }
            MapOutcome::Delete { index, id } => {
                self.provider
                    .delete_document(&DeleteDocumentRequest {
                        index: index.clone(),
                        id: id.clone(),
                    })
                    .await?;
                debug!(index = %index, id = %id, "Deleted document");
            }
            MapOutcome::UpdateTableRow(update) => self.update_table_row(update).await?,
            MapOutcome::DeleteTableRow(request) => {
                self.provider.delete_table_row(request).await?;
                debug!(
                    index = %request.index,
                    property_id = %request.property_id,
                    row_id = %request.row_id,
                    "Deleted table row"
                );
            }
            MapOutcome::Drop(reason) => debug!(reason = ?reason, "Nothing to load"),
        }
        Ok(())
    }

    /// Apply a batch of outcomes in order.
    ///
    /// Failures are logged and counted; the rest of the batch still runs.
    #[instrument(skip_all, fields(outcome_count = outcomes.len()))]
    pub async fn apply_all(&self, outcomes: &[MapOutcome]) -> usize {
        let mut failed = 0;
        for outcome in outcomes {
            if let Err(e) = self.apply(outcome).await {
                warn!(error = %e, "Failed to apply outcome");
                failed += 1;
            }
        }
        failed
    }

    /// Set a table row on its owner, creating the owner's document from the
    /// primary store when the scripted update finds nothing.
    async fn update_table_row(&self, update: &TableRowUpdate) -> Result<(), IngestError> {
        let TableRowUpdate { request, owner } = update;

        if self.provider.update_table_row(request).await? {
            debug!(
                index = %request.index,
                instance_id = %request.instance_id,
                row_id = %request.row_id,
                "Updated table row"
            );
            return Ok(());
        }

        let record = self
            .store
            .find_one(
                &owner.database,
                &owner.collection,
                &filter_eq(owner.id_field, owner.instance_id),
            )
            .await?
            .ok_or_else(|| IngestError::OwnerNotFound {
                collection: owner.collection.clone(),
                id_field: owner.id_field,
                instance_id: owner.instance_id,
            })?;

        let marker = Collection::classify(&owner.collection)
            .marker()
            .ok_or_else(|| MapError::InvalidCollection(owner.collection.clone()))?;
        let id = document_id(&primary_id(&record)?, marker);

        debug!(
            index = %request.index,
            id = %id,
            row_id = %request.row_id,
            "Owner document missing, upserting table row"
        );
        self.provider
            .upsert_document(&UpsertDocumentRequest {
                index: request.index.clone(),
                id,
                document: owner.document.clone(),
            })
            .await?;
        Ok(())
    }
}
