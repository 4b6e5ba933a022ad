//! Index property names and the data-kind marker written into every document.

use serde::{Deserialize, Serialize};

/// Source identifier of the indexed record (instance id, or `"0"` for models).
pub const META_ID: &str = "meta_id";
/// Whether the document describes instance data or a model.
pub const META_DATA_KIND: &str = "meta_data_kind";
/// Object type of the indexed record.
pub const META_OBJ_ID: &str = "meta_bk_obj_id";
/// Tenant that owns the record.
pub const META_TENANT_ID: &str = "meta_tenant_id";
pub const META_BIZ_ID: &str = "meta_bk_biz_id";
pub const META_BIZ_SET_ID: &str = "meta_bk_biz_set_id";
pub const META_PARENT_ID: &str = "meta_bk_parent_id";
pub const META_CLOUD_ID: &str = "meta_bk_cloud_id";
/// Flattened free-text tokens.
pub const KEYWORDS: &str = "keywords";
/// Table-property keywords, keyed by property id and then row id.
pub const TABLES: &str = "tables";

/// Mapping type for exact-match properties.
pub const TYPE_KEYWORD: &str = "keyword";
/// Mapping type for analysed free text.
pub const TYPE_TEXT: &str = "text";
/// Mapping type for nested objects.
pub const TYPE_OBJECT: &str = "object";

/// Kind of record a search document was built from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataKind {
    /// An instance row (business, host, custom object instance, ...).
    #[serde(rename = "data")]
    Instance,
    /// A model together with all of its attributes.
    #[serde(rename = "model")]
    Model,
}

impl DataKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DataKind::Instance => "data",
            DataKind::Model => "model",
        }
    }
}
