//! Dispatcher.
//!
//! Entry point for every change event. Routes the event to the transformer
//! of its collection, drops resource-pool records and recovers panics raised
//! while mapping.

mod event;

pub use event::{ChangeEvent, Operation};

use std::any::Any;
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use cmdb_search_repository::{IndexCatalog, IndexKind, TableRowDeleteRequest};
use futures::FutureExt;
use tracing::{debug, error, instrument};

use crate::cache::{EnumLabelCache, ExclusionCache};
use crate::collections::{
    fields, index_kind_for_object, Collection, ATTRIBUTE_COLLECTION, BIZ_COLLECTION,
    BIZ_SET_COLLECTION, HOST_COLLECTION, MODEL_COLLECTION, MODULE_COLLECTION, SET_COLLECTION,
};
use crate::errors::MapError;
use crate::identity::{as_i64, document_id, primary_id, value_to_string, SourceDocument};
use crate::outcome::{DropReason, MapOutcome};
use crate::store::ConfigStore;
use crate::transformer::{
    InstanceFamily, InstanceTransformer, ModelTransformer, TableRowTransformer,
    TransformContext, Transformer,
};

/// Maps change events to outcomes.
pub struct Dispatcher {
    catalog: Arc<IndexCatalog>,
    enum_labels: Arc<EnumLabelCache>,
    exclusion: Arc<ExclusionCache>,
    /// Transformers of the named collections.
    routes: HashMap<&'static str, Arc<dyn Transformer>>,
    /// Transformer of the sharded object-instance collections.
    object_instances: Arc<dyn Transformer>,
    /// Transformer of the sharded table-property collections.
    table_rows: Arc<dyn Transformer>,
}

impl Dispatcher {
    pub fn new(
        catalog: Arc<IndexCatalog>,
        store: Arc<dyn ConfigStore>,
        enum_labels: Arc<EnumLabelCache>,
        exclusion: Arc<ExclusionCache>,
    ) -> Self {
        let instance = |family, kind| -> Arc<dyn Transformer> {
            Arc::new(InstanceTransformer::new(family, catalog.alias(kind)))
        };
        let model: Arc<dyn Transformer> =
            Arc::new(ModelTransformer::new(store, catalog.alias(IndexKind::Model)));

        let mut routes: HashMap<&'static str, Arc<dyn Transformer>> = HashMap::new();
        routes.insert(
            BIZ_SET_COLLECTION,
            instance(InstanceFamily::BizSet, IndexKind::BizSet),
        );
        routes.insert(
            BIZ_COLLECTION,
            instance(InstanceFamily::Business, IndexKind::Biz),
        );
        routes.insert(SET_COLLECTION, instance(InstanceFamily::Set, IndexKind::Set));
        routes.insert(
            MODULE_COLLECTION,
            instance(InstanceFamily::Module, IndexKind::Module),
        );
        routes.insert(HOST_COLLECTION, instance(InstanceFamily::Host, IndexKind::Host));
        routes.insert(MODEL_COLLECTION, model.clone());
        routes.insert(ATTRIBUTE_COLLECTION, model);

        let object_instances = instance(InstanceFamily::Object, IndexKind::ObjectInstance);
        let table_rows: Arc<dyn Transformer> =
            Arc::new(TableRowTransformer::new(catalog.clone()));

        Self {
            catalog,
            enum_labels,
            exclusion,
            routes,
            object_instances,
            table_rows,
        }
    }

    /// Route an event by its operation.
    pub async fn handle(&self, event: &ChangeEvent) -> Result<MapOutcome, MapError> {
        if event.operation.is_delete() {
            self.map_delete(event)
        } else {
            self.map(event).await
        }
    }

    /// Map an insert, update or replace event.
    ///
    /// A panic raised while mapping is logged and reported as dropped.
    #[instrument(skip_all, fields(collection = %event.collection, database = %event.database))]
    pub async fn map(&self, event: &ChangeEvent) -> Result<MapOutcome, MapError> {
        match AssertUnwindSafe(self.dispatch(event)).catch_unwind().await {
            Ok(result) => result,
            Err(panic) => {
                error!(
                    panic = %panic_message(panic.as_ref()),
                    "Recovered from panic while mapping event"
                );
                Ok(MapOutcome::Drop(DropReason::Panicked))
            }
        }
    }

    async fn dispatch(&self, event: &ChangeEvent) -> Result<MapOutcome, MapError> {
        let collection = Collection::classify(&event.collection);

        if collection.is_exclusion_checked() && self.is_excluded(&event.document)? {
            debug!("Dropping resource pool record");
            return Ok(MapOutcome::Drop(DropReason::Excluded));
        }

        let Some(transformer) = self.transformer(&event.collection, &collection) else {
            debug!("Dropping event of unindexed collection");
            return Ok(MapOutcome::Drop(DropReason::UnknownCollection));
        };

        let labels = self.enum_labels.snapshot();
        let ctx = TransformContext {
            collection: &collection,
            database: &event.database,
            labels: &labels,
        };
        transformer.transform(&event.document, &ctx).await
    }

    fn transformer(&self, name: &str, collection: &Collection) -> Option<&Arc<dyn Transformer>> {
        self.routes.get(name).or(match collection {
            Collection::ObjectInstance { .. } => Some(&self.object_instances),
            Collection::TableRow { .. } => Some(&self.table_rows),
            _ => None,
        })
    }

    /// Records without a business id are not checked.
    fn is_excluded(&self, document: &SourceDocument) -> Result<bool, MapError> {
        let Some(raw) = document.get(fields::BIZ_ID).filter(|value| !value.is_null()) else {
            return Ok(false);
        };
        let biz_id = as_i64(raw).ok_or_else(|| MapError::InvalidBizId(value_to_string(raw)))?;
        Ok(self.exclusion.is_excluded(biz_id))
    }

    /// Resolve what to remove for a delete event.
    ///
    /// Deletes address the concrete versioned index and use the same
    /// document id the upsert of the record used.
    #[instrument(skip_all, fields(collection = %event.collection))]
    pub fn map_delete(&self, event: &ChangeEvent) -> Result<MapOutcome, MapError> {
        let collection = Collection::classify(&event.collection);

        if let Collection::TableRow {
            object_id,
            property_id,
        } = &collection
        {
            let row_id = primary_id(&event.document)?;
            return Ok(MapOutcome::DeleteTableRow(TableRowDeleteRequest {
                index: self
                    .catalog
                    .index_name(index_kind_for_object(object_id))
                    .to_string(),
                property_id: property_id.clone(),
                row_id,
            }));
        }

        let (Some(kind), Some(marker)) = (collection.index_kind(), collection.marker()) else {
            debug!("Dropping delete of unindexed collection");
            return Ok(MapOutcome::Drop(DropReason::UnknownCollection));
        };

        let primary = primary_id(&event.document)?;
        Ok(MapOutcome::Delete {
            index: self.catalog.index_name(kind).to_string(),
            id: document_id(&primary, marker),
        })
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    panic
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| panic.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("unknown panic")
}
