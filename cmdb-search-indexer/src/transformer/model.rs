//! Model transformer.
//!
//! One search document represents a model together with all of its
//! attributes. Any model or attribute event therefore re-reads the model
//! row and every attribute row and rebuilds the whole document.

use std::sync::Arc;

use async_trait::async_trait;
use cmdb_search_shared::types::search_document::MODEL_META_ID;
use cmdb_search_shared::SearchDocument;
use serde_json::{json, Map, Value};
use tracing::{debug, warn};

use super::{TransformContext, Transformer};
use crate::collections::{
    fields, is_table_object, Collection, ATTRIBUTE_COLLECTION, MARKER_MODEL, MODEL_COLLECTION,
    PROPERTY_TYPE_TABLE,
};
use crate::errors::MapError;
use crate::identity::{document_id, linkage, primary_id, tenant, value_to_string, SourceDocument};
use crate::keywords::{compress, extract};
use crate::outcome::{DropReason, MapOutcome};
use crate::sanitizer::sanitize;
use crate::store::{filter_eq, ConfigStore};

/// Transformer for model and model-attribute events.
pub struct ModelTransformer {
    store: Arc<dyn ConfigStore>,
    index: String,
}

impl ModelTransformer {
    pub fn new(store: Arc<dyn ConfigStore>, index: impl Into<String>) -> Self {
        Self {
            store,
            index: index.into(),
        }
    }
}

/// Attribute rows with an empty or zero `id` are leftovers and not indexed.
fn validate_attribute(attribute: &SourceDocument) -> Result<(), String> {
    match attribute.get(fields::OPTION_ID) {
        None | Some(Value::Null) => Err("missing attribute id".to_string()),
        Some(id) => match value_to_string(id).as_str() {
            "" | "0" => Err(format!("invalid attribute id: {}", id)),
            _ => Ok(()),
        },
    }
}

/// Keywords of the header of a table attribute.
///
/// The option of an `innertable` attribute is `{"header": [{"bk_property_id":
/// ..., "bk_property_name": ...}, ...]}`.
fn table_header_keywords(object_id: &str, attribute: &SourceDocument) -> Option<(String, Vec<String>)> {
    let Some(property_id) = attribute.get(fields::PROPERTY_ID).and_then(Value::as_str) else {
        warn!(object_id = %object_id, "Table attribute without property id");
        return None;
    };

    let headers = attribute
        .get(fields::OPTION)
        .and_then(|option| option.get(fields::OPTION_HEADER))
        .and_then(Value::as_array)
        .filter(|headers| !headers.is_empty());
    let Some(headers) = headers else {
        warn!(object_id = %object_id, property_id = %property_id, "Table header is empty");
        return None;
    };

    let keywords = headers
        .iter()
        .flat_map(|header| {
            [fields::PROPERTY_ID, fields::PROPERTY_NAME]
                .iter()
                .filter_map(|field| header.get(*field))
                .flat_map(extract)
                .collect::<Vec<_>>()
        })
        .collect();
    Some((property_id.to_string(), compress(keywords)))
}

#[async_trait]
impl Transformer for ModelTransformer {
    async fn transform(
        &self,
        document: &SourceDocument,
        ctx: &TransformContext<'_>,
    ) -> Result<MapOutcome, MapError> {
        let object_id = document
            .get(fields::OBJ_ID)
            .and_then(Value::as_str)
            .ok_or_else(|| MapError::missing(fields::OBJ_ID))?;

        if is_table_object(object_id) {
            debug!(object_id = %object_id, "Skipping table object model");
            return Ok(MapOutcome::Drop(DropReason::TableObject));
        }

        let by_object = filter_eq(fields::OBJ_ID, object_id);
        let model = self
            .store
            .find_one(ctx.database, MODEL_COLLECTION, &by_object)
            .await?
            .ok_or_else(|| MapError::ModelNotFound(object_id.to_string()))?;
        let primary = primary_id(&model)?;

        let mut keywords = extract(&Value::Object(sanitize(&model, &Collection::Model)));

        let attributes = self
            .store
            .find(ctx.database, ATTRIBUTE_COLLECTION, &by_object)
            .await?;

        let mut tables = Map::new();
        for attribute in &attributes {
            if let Err(reason) = validate_attribute(attribute) {
                warn!(object_id = %object_id, reason = %reason, "Skipping model attribute");
                continue;
            }

            let Some(property_type) = attribute
                .get(fields::PROPERTY_TYPE)
                .filter(|value| !value.is_null())
            else {
                warn!(object_id = %object_id, "Skipping model attribute without property type");
                continue;
            };

            if value_to_string(property_type) == PROPERTY_TYPE_TABLE {
                if let Some((property_id, header)) = table_header_keywords(object_id, attribute) {
                    let mut rows = Map::new();
                    rows.insert(MODEL_META_ID.to_string(), json!(header));
                    tables.insert(property_id, Value::Object(rows));
                }
            }

            keywords.extend(extract(&Value::Object(sanitize(
                attribute,
                &Collection::ModelAttribute,
            ))));
        }

        let mut search_document = SearchDocument::model(object_id, compress(keywords))
            .with_tenant(tenant(&model))
            .with_biz_id(linkage(&model, fields::BIZ_ID));
        if !tables.is_empty() {
            search_document = search_document.with_tables(tables);
        }

        let doc_id = document_id(&primary, MARKER_MODEL);
        debug!(
            object_id = %object_id,
            attributes = attributes.len(),
            doc_id = %doc_id,
            "Mapped model document"
        );

        Ok(MapOutcome::Index {
            index: self.index.clone(),
            id: doc_id,
            body: search_document.to_body()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::EnumLabels;
    use crate::store::InMemoryStore;

    fn record(value: Value) -> SourceDocument {
        value.as_object().cloned().unwrap()
    }

    fn seeded_store() -> Arc<InMemoryStore> {
        let store = Arc::new(InMemoryStore::new());
        store.insert(
            "cmdb",
            MODEL_COLLECTION,
            json!({
                "_id": "651f0c1e9a7b2c0001a1b2d0",
                "bk_obj_id": "switch",
                "bk_obj_name": "Switch",
                "bk_obj_icon": "icon-cc-switch",
                "tenant_id": "t1"
            }),
        );
        store.insert(
            "cmdb",
            ATTRIBUTE_COLLECTION,
            json!({
                "id": 1,
                "bk_obj_id": "switch",
                "bk_property_id": "vendor",
                "bk_property_name": "Vendor",
                "bk_property_type": "enum"
            }),
        );
        store.insert(
            "cmdb",
            ATTRIBUTE_COLLECTION,
            json!({
                "id": 0,
                "bk_obj_id": "switch",
                "bk_property_id": "ghost",
                "bk_property_name": "Ghost",
                "bk_property_type": "singlechar"
            }),
        );
        store.insert(
            "cmdb",
            ATTRIBUTE_COLLECTION,
            json!({
                "id": 2,
                "bk_obj_id": "switch",
                "bk_property_id": "ports",
                "bk_property_name": "Ports",
                "bk_property_type": "innertable",
                "option": {"header": [
                    {"bk_property_id": "port_no", "bk_property_name": "Port"},
                    {"bk_property_id": "speed", "bk_property_name": "Speed"}
                ]}
            }),
        );
        store
    }

    async fn run(store: Arc<InMemoryStore>, collection: Collection, document: Value) -> Result<MapOutcome, MapError> {
        let labels = EnumLabels::default();
        let ctx = TransformContext {
            collection: &collection,
            database: "cmdb",
            labels: &labels,
        };
        ModelTransformer::new(store, "bk_cmdb.model")
            .transform(&record(document), &ctx)
            .await
    }

    #[tokio::test]
    async fn test_attribute_event_rebuilds_model_document() {
        let outcome = run(
            seeded_store(),
            Collection::ModelAttribute,
            json!({"bk_obj_id": "switch", "bk_property_id": "vendor"}),
        )
        .await
        .unwrap();

        let MapOutcome::Index { index, id, body } = outcome else {
            panic!("expected an index outcome");
        };
        assert_eq!(index, "bk_cmdb.model");
        assert_eq!(id, "651f0c1e9a7b2c0001a1b2d0:object");
        assert_eq!(body["meta_id"], "0");
        assert_eq!(body["meta_data_kind"], "model");
        assert_eq!(body["meta_bk_obj_id"], "switch");
        assert_eq!(body["meta_tenant_id"], "t1");
        assert_eq!(
            body["keywords"],
            json!(["switch", "Switch", "vendor", "Vendor", "ports", "Ports"])
        );
        assert_eq!(
            body["tables"],
            json!({"ports": {"0": ["port_no", "Port", "speed", "Speed"]}})
        );
    }

    #[tokio::test]
    async fn test_model_and_attribute_events_agree() {
        let store = seeded_store();
        let from_model = run(store.clone(), Collection::Model, json!({"bk_obj_id": "switch"}))
            .await
            .unwrap();
        let from_attribute = run(
            store,
            Collection::ModelAttribute,
            json!({"bk_obj_id": "switch", "bk_property_id": "ports"}),
        )
        .await
        .unwrap();

        assert_eq!(from_model, from_attribute);
    }

    #[tokio::test]
    async fn test_table_object_is_dropped() {
        let outcome = run(
            seeded_store(),
            Collection::ModelAttribute,
            json!({"bk_obj_id": "bk_switch#ports"}),
        )
        .await
        .unwrap();

        assert_eq!(outcome, MapOutcome::Drop(DropReason::TableObject));
    }

    #[tokio::test]
    async fn test_missing_model() {
        let result = run(seeded_store(), Collection::Model, json!({"bk_obj_id": "router"})).await;
        assert!(matches!(result, Err(MapError::ModelNotFound(obj)) if obj == "router"));
    }

    #[tokio::test]
    async fn test_store_failure() {
        let store = seeded_store();
        store.set_unavailable(true);
        let result = run(store, Collection::Model, json!({"bk_obj_id": "switch"})).await;
        assert!(matches!(result, Err(MapError::Store(_))));
    }

    #[test]
    fn test_validate_attribute() {
        assert!(validate_attribute(&record(json!({"id": 3}))).is_ok());
        assert!(validate_attribute(&record(json!({"id": 0}))).is_err());
        assert!(validate_attribute(&record(json!({"id": ""}))).is_err());
        assert!(validate_attribute(&record(json!({}))).is_err());
    }
}
