//! Table-property rows.
//!
//! A row is not indexed on its own: its keywords are stored under
//! `tables.<property>.<row id>` of the document of the instance it belongs
//! to.

use std::sync::Arc;

use async_trait::async_trait;
use cmdb_search_repository::{IndexCatalog, TableRowUpdateRequest};
use cmdb_search_shared::properties::TABLES;
use serde_json::{json, Value};
use tracing::debug;

use super::{TransformContext, Transformer};
use crate::collections::{fields, index_kind_for_object, instance_collection, Collection};
use crate::errors::MapError;
use crate::identity::{as_i64, primary_id, tenant, value_to_string, SourceDocument};
use crate::keywords::{compress, extract};
use crate::outcome::{DropReason, MapOutcome, OwnerLookup, TableRowUpdate};
use crate::sanitizer::sanitize;

pub struct TableRowTransformer {
    catalog: Arc<IndexCatalog>,
}

impl TableRowTransformer {
    pub fn new(catalog: Arc<IndexCatalog>) -> Self {
        Self { catalog }
    }
}

#[async_trait]
impl Transformer for TableRowTransformer {
    async fn transform(
        &self,
        document: &SourceDocument,
        ctx: &TransformContext<'_>,
    ) -> Result<MapOutcome, MapError> {
        let Collection::TableRow {
            object_id,
            property_id,
        } = ctx.collection
        else {
            return Err(MapError::InvalidCollection(format!("{:?}", ctx.collection)));
        };

        let raw_instance_id = document
            .get(fields::INST_ID)
            .filter(|value| !value.is_null())
            .ok_or_else(|| MapError::missing(fields::INST_ID))?;
        let instance_id = match as_i64(raw_instance_id) {
            Some(id) if id != 0 => id,
            _ => {
                debug!(
                    object_id = %object_id,
                    property_id = %property_id,
                    instance_id = %raw_instance_id,
                    "Table row is not linked to an instance"
                );
                return Ok(MapOutcome::Drop(DropReason::UnlinkedTableRow));
            }
        };

        let row_id = primary_id(document)?;
        let tenant = tenant(document)
            .map(|value| value_to_string(&value))
            .ok_or_else(|| MapError::missing(fields::TENANT_ID))?;

        let keywords = compress(extract(&Value::Object(sanitize(document, ctx.collection))));

        let request = TableRowUpdateRequest {
            index: self
                .catalog
                .index_name(index_kind_for_object(object_id))
                .to_string(),
            instance_id: instance_id.to_string(),
            property_id: property_id.clone(),
            row_id,
            keywords,
        };

        let owner_collection = instance_collection(object_id, &tenant);
        let owner = OwnerLookup {
            database: ctx.database.to_string(),
            id_field: Collection::classify(&owner_collection).id_field(),
            collection: owner_collection,
            instance_id,
            document: json!({
                TABLES: { request.property_id.as_str(): { request.row_id.as_str(): &request.keywords } }
            }),
        };

        debug!(
            index = %request.index,
            instance_id = instance_id,
            property_id = %request.property_id,
            row_id = %request.row_id,
            "Mapped table row"
        );

        Ok(MapOutcome::UpdateTableRow(TableRowUpdate { request, owner }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::EnumLabels;
    use cmdb_search_repository::IndexSettings;

    fn record(value: Value) -> SourceDocument {
        value.as_object().cloned().unwrap()
    }

    async fn run(collection: &str, document: Value) -> Result<MapOutcome, MapError> {
        let collection = Collection::classify(collection);
        let labels = EnumLabels::default();
        let ctx = TransformContext {
            collection: &collection,
            database: "cmdb",
            labels: &labels,
        };
        let catalog = Arc::new(IndexCatalog::new(IndexSettings::new(1, 1)));
        TableRowTransformer::new(catalog)
            .transform(&record(document), &ctx)
            .await
    }

    #[tokio::test]
    async fn test_host_disk_row() {
        let outcome = run(
            "cc_ObjectBase_0_pub_bk_host#disk",
            json!({
                "_id": "651f0c1e9a7b2c0001a1b2e0",
                "id": 3,
                "bk_inst_id": 10,
                "tenant_id": "0",
                "mount": "/data",
                "size": 512
            }),
        )
        .await
        .unwrap();

        let MapOutcome::UpdateTableRow(TableRowUpdate { request, owner }) = outcome else {
            panic!("expected a table row update");
        };
        assert_eq!(request.index, "bk_cmdb.host-20210710");
        assert_eq!(request.instance_id, "10");
        assert_eq!(request.property_id, "disk");
        assert_eq!(request.row_id, "651f0c1e9a7b2c0001a1b2e0");
        assert_eq!(request.keywords, vec!["/data", "512"]);

        assert_eq!(owner.collection, "cc_HostBase");
        assert_eq!(owner.id_field, "bk_host_id");
        assert_eq!(owner.instance_id, 10);
        assert_eq!(
            owner.document,
            json!({"tables": {"disk": {"651f0c1e9a7b2c0001a1b2e0": ["/data", "512"]}}})
        );
    }

    #[tokio::test]
    async fn test_object_row_owner_collection() {
        let outcome = run(
            "cc_ObjectBase_t1_pub_bk_switch#port",
            json!({
                "_id": "651f0c1e9a7b2c0001a1b2e1",
                "bk_inst_id": "7",
                "tenant_id": "t1",
                "port_no": "ge-0/0/1"
            }),
        )
        .await
        .unwrap();

        let MapOutcome::UpdateTableRow(TableRowUpdate { request, owner }) = outcome else {
            panic!("expected a table row update");
        };
        assert_eq!(request.index, "bk_cmdb.object_instance-20210710");
        assert_eq!(owner.collection, "cc_ObjectBase_t1_pub_switch");
        assert_eq!(owner.id_field, "bk_inst_id");
        assert_eq!(owner.instance_id, 7);
    }

    #[tokio::test]
    async fn test_unlinked_rows_are_dropped() {
        for instance_id in [json!(0), json!("abc")] {
            let outcome = run(
                "cc_ObjectBase_0_pub_bk_host#disk",
                json!({"_id": "651f0c1e9a7b2c0001a1b2e0", "bk_inst_id": instance_id, "tenant_id": "0"}),
            )
            .await
            .unwrap();
            assert_eq!(outcome, MapOutcome::Drop(DropReason::UnlinkedTableRow));
        }
    }

    #[tokio::test]
    async fn test_missing_instance_id() {
        let result = run(
            "cc_ObjectBase_0_pub_bk_host#disk",
            json!({"_id": "651f0c1e9a7b2c0001a1b2e0", "tenant_id": "0"}),
        )
        .await;
        assert!(matches!(result, Err(MapError::MissingField(field)) if field == "bk_inst_id"));
    }

    #[tokio::test]
    async fn test_null_instance_id_is_an_error() {
        let result = run(
            "cc_ObjectBase_0_pub_bk_host#disk",
            json!({"_id": "651f0c1e9a7b2c0001a1b2e0", "bk_inst_id": null, "tenant_id": "0"}),
        )
        .await;
        assert!(matches!(result, Err(MapError::MissingField(field)) if field == "bk_inst_id"));
    }

    #[tokio::test]
    async fn test_missing_tenant() {
        let result = run(
            "cc_ObjectBase_0_pub_bk_host#disk",
            json!({"_id": "651f0c1e9a7b2c0001a1b2e0", "bk_inst_id": 10}),
        )
        .await;
        assert!(matches!(result, Err(MapError::MissingField(field)) if field == "tenant_id"));
    }
}
