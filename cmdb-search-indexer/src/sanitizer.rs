//! Document sanitizer.
//!
//! Removes bookkeeping fields from a record before its keywords are
//! extracted, so that ids, timestamps and linkage never become searchable
//! text. Model and attribute records go the other way and keep only their
//! descriptive fields.

use serde_json::{Map, Value};

use crate::collections::{fields, Collection};

/// Fields never indexed as keywords, for every instance collection.
const BASE_DENY: &[&str] = &[
    fields::PRIMARY_ID,
    fields::CREATE_TIME,
    fields::LAST_TIME,
    fields::TENANT_ID,
    fields::SUPPLIER_ACCOUNT,
];

const BIZ_SET_DENY: &[&str] = &[fields::DEFAULT, fields::SCOPE];
const BIZ_DENY: &[&str] = &[fields::DEFAULT, fields::PARENT_ID];
const SET_DENY: &[&str] = &[
    fields::BIZ_ID,
    fields::PARENT_ID,
    fields::SET_TEMPLATE_ID,
    fields::DEFAULT,
];
const MODULE_DENY: &[&str] = &[
    fields::DEFAULT,
    fields::SET_TEMPLATE_ID,
    fields::BIZ_ID,
    fields::PARENT_ID,
    fields::SET_ID,
    fields::SERVICE_CATEGORY_ID,
];
const HOST_DENY: &[&str] = &[fields::OPERATION_TIME, fields::PARENT_ID];
const TABLE_ROW_DENY: &[&str] = &[fields::OPTION_ID, fields::INST_ID];
const INSTANCE_DENY: &[&str] = &[fields::OBJ_ID, fields::PARENT_ID];

const MODEL_ALLOW: &[&str] = &[fields::OBJ_ID, fields::OBJ_NAME];
const ATTRIBUTE_ALLOW: &[&str] = &[fields::PROPERTY_ID, fields::PROPERTY_NAME];

/// Return the indexable part of `document` for records of `collection`.
pub fn sanitize(document: &Map<String, Value>, collection: &Collection) -> Map<String, Value> {
    match collection {
        Collection::Model => allow(document, MODEL_ALLOW),
        Collection::ModelAttribute => allow(document, ATTRIBUTE_ALLOW),
        Collection::BizSet => deny(document, BIZ_SET_DENY),
        Collection::Business => deny(document, BIZ_DENY),
        Collection::Set => deny(document, SET_DENY),
        Collection::Module => deny(document, MODULE_DENY),
        Collection::Host => deny(document, HOST_DENY),
        Collection::TableRow { .. } => deny(document, TABLE_ROW_DENY),
        Collection::ObjectInstance { .. } | Collection::Unknown => {
            deny(document, INSTANCE_DENY)
        }
    }
}

fn allow(document: &Map<String, Value>, keep: &[&str]) -> Map<String, Value> {
    keep.iter()
        .filter_map(|field| {
            document
                .get(*field)
                .map(|value| (field.to_string(), value.clone()))
        })
        .collect()
}

fn deny(document: &Map<String, Value>, extra: &[&str]) -> Map<String, Value> {
    document
        .iter()
        .filter(|(key, _)| !BASE_DENY.contains(&key.as_str()) && !extra.contains(&key.as_str()))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    fn bookkeeping() -> Map<String, Value> {
        record(json!({
            "_id": "651f0c1e9a7b2c0001a1b2c3",
            "create_time": "2024-01-01T00:00:00Z",
            "last_time": "2024-01-02T00:00:00Z",
            "tenant_id": "acct1",
            "bk_supplier_account": "0",
            "default": 0,
            "bk_scope": {"match_all": true},
            "bk_parent_id": 1,
            "bk_biz_id": 2,
            "bk_set_id": 3,
            "set_template_id": 4,
            "service_category_id": 5,
            "operation_time": "2024-01-03T00:00:00Z",
            "bk_obj_id": "switch",
            "bk_inst_id": 6,
            "id": 7,
            "name": "kept"
        }))
    }

    fn assert_removed(collection: Collection, removed: &[&str]) {
        let cleaned = sanitize(&bookkeeping(), &collection);
        for field in BASE_DENY.iter().chain(removed) {
            assert!(
                !cleaned.contains_key(*field),
                "{:?} kept {}",
                collection,
                field
            );
        }
        assert_eq!(cleaned["name"], "kept");
    }

    #[test]
    fn test_deny_lists() {
        assert_removed(Collection::BizSet, BIZ_SET_DENY);
        assert_removed(Collection::Business, BIZ_DENY);
        assert_removed(Collection::Set, SET_DENY);
        assert_removed(Collection::Module, MODULE_DENY);
        assert_removed(Collection::Host, HOST_DENY);
        assert_removed(
            Collection::TableRow {
                object_id: "host".to_string(),
                property_id: "disk".to_string(),
            },
            TABLE_ROW_DENY,
        );
        assert_removed(
            Collection::ObjectInstance {
                object_id: "switch".to_string(),
            },
            INSTANCE_DENY,
        );
    }

    #[test]
    fn test_business_keeps_unlisted_linkage() {
        let cleaned = sanitize(&bookkeeping(), &Collection::Business);
        assert_eq!(cleaned["bk_biz_id"], 2);
        assert_eq!(cleaned["bk_obj_id"], "switch");
    }

    #[test]
    fn test_model_allow_list() {
        let model = record(json!({
            "_id": "651f0c1e9a7b2c0001a1b2c3",
            "bk_obj_id": "switch",
            "bk_obj_name": "Switch",
            "bk_obj_icon": "icon-cc-switch",
            "bk_classification_id": "bk_network",
            "tenant_id": "acct1"
        }));

        let cleaned = sanitize(&model, &Collection::Model);
        assert_eq!(cleaned.len(), 2);
        assert_eq!(cleaned["bk_obj_id"], "switch");
        assert_eq!(cleaned["bk_obj_name"], "Switch");
    }

    #[test]
    fn test_attribute_allow_list() {
        let attribute = record(json!({
            "id": 12,
            "bk_obj_id": "switch",
            "bk_property_id": "vendor",
            "bk_property_name": "Vendor",
            "bk_property_type": "enum",
            "option": [{"id": "1", "name": "Cisco"}]
        }));

        let cleaned = sanitize(&attribute, &Collection::ModelAttribute);
        assert_eq!(cleaned.len(), 2);
        assert_eq!(cleaned["bk_property_id"], "vendor");
        assert_eq!(cleaned["bk_property_name"], "Vendor");
    }

    #[test]
    fn test_allow_list_skips_missing_fields() {
        let cleaned = sanitize(&record(json!({"bk_obj_id": "switch"})), &Collection::Model);
        assert_eq!(cleaned.len(), 1);
    }
}
