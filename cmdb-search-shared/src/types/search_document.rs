//! Search document types for the CMDB search indices.
//!
//! This module defines the document body that is written into the search
//! engine for every indexed configuration record.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::types::properties::DataKind;

/// Document representation for the search index.
///
/// Identifier fields copied from the source record (`biz_id`, `cloud_id`, ...)
/// keep their raw JSON value so that numeric ids stay numeric in the index.
/// Fields that do not apply to a collection are `None` and are omitted from
/// the serialized body.
///
/// # Fields
///
/// - `id`: Identifying value of the source record, as a string
/// - `data_kind`: Instance data or model
/// - `object_id`: Object type of the source record
/// - `tenant_id`: Tenant marker of the source record
/// - `biz_id` / `biz_set_id` / `parent_id` / `cloud_id`: Family-specific linkage
/// - `keywords`: De-duplicated free-text tokens
/// - `tables`: Table-property keywords (models and table rows only)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchDocument {
    #[serde(rename = "meta_id")]
    pub id: String,
    #[serde(rename = "meta_data_kind")]
    pub data_kind: DataKind,
    #[serde(rename = "meta_bk_obj_id")]
    pub object_id: String,
    #[serde(rename = "meta_tenant_id", skip_serializing_if = "Option::is_none")]
    pub tenant_id: Option<Value>,
    #[serde(rename = "meta_bk_biz_id", skip_serializing_if = "Option::is_none")]
    pub biz_id: Option<Value>,
    #[serde(rename = "meta_bk_biz_set_id", skip_serializing_if = "Option::is_none")]
    pub biz_set_id: Option<Value>,
    #[serde(rename = "meta_bk_parent_id", skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<Value>,
    #[serde(rename = "meta_bk_cloud_id", skip_serializing_if = "Option::is_none")]
    pub cloud_id: Option<Value>,
    pub keywords: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tables: Option<Map<String, Value>>,
}

impl SearchDocument {
    /// Create an instance document with no linkage fields set.
    ///
    /// # Arguments
    ///
    /// * `id` - The identifying value of the source record
    /// * `object_id` - The object type of the source record
    /// * `keywords` - The compressed keyword list
    ///
    /// # Example
    ///
    /// ```
    /// use cmdb_search_shared::{DataKind, SearchDocument};
    ///
    /// let doc = SearchDocument::instance("5", "biz", vec!["blueking".to_string()]);
    /// assert_eq!(doc.data_kind, DataKind::Instance);
    /// ```
    pub fn instance(
        id: impl Into<String>,
        object_id: impl Into<String>,
        keywords: Vec<String>,
    ) -> Self {
        Self {
            id: id.into(),
            data_kind: DataKind::Instance,
            object_id: object_id.into(),
            tenant_id: None,
            biz_id: None,
            biz_set_id: None,
            parent_id: None,
            cloud_id: None,
            keywords,
            tables: None,
        }
    }

    /// Create a model document.
    ///
    /// Model documents are looked up by object type, so `meta_id` carries the
    /// fixed placeholder `"0"`.
    pub fn model(object_id: impl Into<String>, keywords: Vec<String>) -> Self {
        Self {
            id: MODEL_META_ID.to_string(),
            data_kind: DataKind::Model,
            ..Self::instance("", object_id, keywords)
        }
    }

    pub fn with_tenant(mut self, tenant_id: Option<Value>) -> Self {
        self.tenant_id = tenant_id;
        self
    }

    pub fn with_biz_id(mut self, biz_id: Option<Value>) -> Self {
        self.biz_id = biz_id;
        self
    }

    pub fn with_biz_set_id(mut self, biz_set_id: Option<Value>) -> Self {
        self.biz_set_id = biz_set_id;
        self
    }

    pub fn with_parent_id(mut self, parent_id: Option<Value>) -> Self {
        self.parent_id = parent_id;
        self
    }

    pub fn with_cloud_id(mut self, cloud_id: Option<Value>) -> Self {
        self.cloud_id = cloud_id;
        self
    }

    pub fn with_tables(mut self, tables: Map<String, Value>) -> Self {
        self.tables = Some(tables);
        self
    }

    /// Serialize the document into the JSON body sent to the search engine.
    pub fn to_body(&self) -> Result<Value, serde_json::Error> {
        serde_json::to_value(self)
    }
}

/// Placeholder `meta_id` used by model documents.
pub const MODEL_META_ID: &str = "0";

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::properties;
    use serde_json::json;

    #[test]
    fn test_instance_document_body() {
        let doc = SearchDocument::instance("5", "biz", vec!["blueking".to_string()])
            .with_tenant(Some(json!("acct1")))
            .with_biz_id(Some(json!(5)));

        let body = doc.to_body().unwrap();

        assert_eq!(body[properties::META_ID], "5");
        assert_eq!(body[properties::META_DATA_KIND], "data");
        assert_eq!(body[properties::META_OBJ_ID], "biz");
        assert_eq!(body[properties::META_TENANT_ID], "acct1");
        assert_eq!(body[properties::META_BIZ_ID], 5);
        assert_eq!(body[properties::KEYWORDS], json!(["blueking"]));
    }

    #[test]
    fn test_unset_linkage_is_omitted() {
        let body = SearchDocument::instance("7", "host", vec![])
            .with_cloud_id(Some(json!(0)))
            .to_body()
            .unwrap();

        let object = body.as_object().unwrap();
        assert!(!object.contains_key(properties::META_BIZ_ID));
        assert!(!object.contains_key(properties::META_PARENT_ID));
        assert!(!object.contains_key(properties::TABLES));
        assert_eq!(body[properties::META_CLOUD_ID], 0);
    }

    #[test]
    fn test_model_document() {
        let doc = SearchDocument::model("switch", vec!["switch".to_string()]);

        assert_eq!(doc.id, "0");
        assert_eq!(doc.data_kind, DataKind::Model);
        assert_eq!(doc.object_id, "switch");
    }

    #[test]
    fn test_serialization_roundtrip() {
        let mut tables = Map::new();
        tables.insert("disk".to_string(), json!({"0": ["size"]}));
        let doc = SearchDocument::model("host", vec!["host".to_string()]).with_tables(tables);

        let json = serde_json::to_string(&doc).unwrap();
        let deserialized: SearchDocument = serde_json::from_str(&json).unwrap();

        assert_eq!(doc, deserialized);
    }
}
