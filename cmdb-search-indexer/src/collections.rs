//! Primary-store collection names and their classification.
//!
//! Every change event names the collection it comes from. `Collection`
//! turns that name into the entity family it holds, which decides the
//! transformer, the target index and the document id marker.

use cmdb_search_repository::IndexKind;
use lazy_static::lazy_static;
use regex::Regex;

pub const BIZ_SET_COLLECTION: &str = "cc_BizSetBase";
pub const BIZ_COLLECTION: &str = "cc_ApplicationBase";
pub const SET_COLLECTION: &str = "cc_SetBase";
pub const MODULE_COLLECTION: &str = "cc_ModuleBase";
pub const HOST_COLLECTION: &str = "cc_HostBase";
pub const MODEL_COLLECTION: &str = "cc_ObjDes";
pub const ATTRIBUTE_COLLECTION: &str = "cc_ObjAttDes";

/// Prefix of the sharded object-instance collections.
pub const OBJECT_INSTANCE_PREFIX: &str = "cc_ObjectBase_";

/// Inner object ids of the built-in entity families.
pub const OBJ_BIZ_SET: &str = "bk_biz_set_obj";
pub const OBJ_BIZ: &str = "biz";
pub const OBJ_SET: &str = "set";
pub const OBJ_MODULE: &str = "module";
pub const OBJ_HOST: &str = "host";
/// Document id marker shared by model and attribute documents.
pub const MARKER_MODEL: &str = "object";
/// Document id marker of generic object instances.
pub const MARKER_INSTANCE: &str = "common";

/// Source record fields.
pub mod fields {
    pub const PRIMARY_ID: &str = "_id";
    pub const TENANT_ID: &str = "tenant_id";
    pub const SUPPLIER_ACCOUNT: &str = "bk_supplier_account";
    pub const BIZ_SET_ID: &str = "bk_biz_set_id";
    pub const BIZ_ID: &str = "bk_biz_id";
    pub const SET_ID: &str = "bk_set_id";
    pub const MODULE_ID: &str = "bk_module_id";
    pub const HOST_ID: &str = "bk_host_id";
    pub const INST_ID: &str = "bk_inst_id";
    pub const OBJ_ID: &str = "bk_obj_id";
    pub const OBJ_NAME: &str = "bk_obj_name";
    pub const PARENT_ID: &str = "bk_parent_id";
    pub const CLOUD_ID: &str = "bk_cloud_id";
    pub const PROPERTY_ID: &str = "bk_property_id";
    pub const PROPERTY_NAME: &str = "bk_property_name";
    pub const PROPERTY_TYPE: &str = "bk_property_type";
    pub const OPTION: &str = "option";
    pub const OPTION_ID: &str = "id";
    pub const OPTION_NAME: &str = "name";
    pub const OPTION_HEADER: &str = "header";
    pub const DEFAULT: &str = "default";
    pub const SCOPE: &str = "bk_scope";
    pub const SET_TEMPLATE_ID: &str = "set_template_id";
    pub const SERVICE_CATEGORY_ID: &str = "service_category_id";
    pub const OPERATION_TIME: &str = "operation_time";
    pub const CREATE_TIME: &str = "create_time";
    pub const LAST_TIME: &str = "last_time";
}

/// Attribute property types with special handling.
pub const PROPERTY_TYPE_ENUM: &str = "enum";
pub const PROPERTY_TYPE_TABLE: &str = "innertable";

lazy_static! {
    /// `cc_ObjectBase_<tenant>_pub_bk_<obj>#<property>`
    static ref TABLE_COLLECTION_REGEXP: Regex =
        Regex::new(r"^cc_ObjectBase_(.*)_pub_bk_(.*)#(.*)$").unwrap();
    /// `bk_<obj>#<property>`
    static ref TABLE_OBJECT_REGEXP: Regex = Regex::new(r"bk_(.*)#(.*)").unwrap();
}

/// The entity family a collection holds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Collection {
    BizSet,
    Business,
    Set,
    Module,
    Host,
    Model,
    ModelAttribute,
    /// A sharded object-instance collection.
    ObjectInstance { object_id: String },
    /// Rows of a table property, stored in their own sharded collection.
    TableRow {
        object_id: String,
        property_id: String,
    },
    Unknown,
}

impl Collection {
    /// Classify a collection by name.
    pub fn classify(name: &str) -> Self {
        match name {
            BIZ_SET_COLLECTION => Self::BizSet,
            BIZ_COLLECTION => Self::Business,
            SET_COLLECTION => Self::Set,
            MODULE_COLLECTION => Self::Module,
            HOST_COLLECTION => Self::Host,
            MODEL_COLLECTION => Self::Model,
            ATTRIBUTE_COLLECTION => Self::ModelAttribute,
            _ => Self::classify_sharded(name),
        }
    }

    fn classify_sharded(name: &str) -> Self {
        if let Some(captures) = TABLE_COLLECTION_REGEXP.captures(name) {
            return Self::TableRow {
                object_id: captures[2].to_string(),
                property_id: captures[3].to_string(),
            };
        }

        // cc_ObjectBase_<tenant>_pub_<obj>, where <obj> may itself contain '_'
        let Some(rest) = name.strip_prefix(OBJECT_INSTANCE_PREFIX) else {
            return Self::Unknown;
        };
        let parts: Vec<&str> = rest.split('_').collect();
        if parts.len() < 3 {
            return Self::Unknown;
        }
        Self::ObjectInstance {
            object_id: parts[2..].join("_"),
        }
    }

    /// Index the family is written to.
    pub fn index_kind(&self) -> Option<IndexKind> {
        match self {
            Self::BizSet => Some(IndexKind::BizSet),
            Self::Business => Some(IndexKind::Biz),
            Self::Set => Some(IndexKind::Set),
            Self::Module => Some(IndexKind::Module),
            Self::Host => Some(IndexKind::Host),
            Self::Model | Self::ModelAttribute => Some(IndexKind::Model),
            Self::ObjectInstance { .. } => Some(IndexKind::ObjectInstance),
            Self::TableRow { object_id, .. } => Some(index_kind_for_object(object_id)),
            Self::Unknown => None,
        }
    }

    /// Suffix of the search document id, `{primary-store id}:{marker}`.
    pub fn marker(&self) -> Option<&'static str> {
        match self {
            Self::BizSet => Some(OBJ_BIZ_SET),
            Self::Business => Some(OBJ_BIZ),
            Self::Set => Some(OBJ_SET),
            Self::Module => Some(OBJ_MODULE),
            Self::Host => Some(OBJ_HOST),
            Self::Model | Self::ModelAttribute => Some(MARKER_MODEL),
            Self::ObjectInstance { .. } => Some(MARKER_INSTANCE),
            Self::TableRow { .. } | Self::Unknown => None,
        }
    }

    /// Field holding the identifying value of a record.
    pub fn id_field(&self) -> &'static str {
        match self {
            Self::BizSet => fields::BIZ_SET_ID,
            Self::Business => fields::BIZ_ID,
            Self::Set => fields::SET_ID,
            Self::Module => fields::MODULE_ID,
            Self::Host => fields::HOST_ID,
            Self::Model | Self::ModelAttribute => fields::OBJ_ID,
            Self::ObjectInstance { .. } | Self::TableRow { .. } | Self::Unknown => {
                fields::INST_ID
            }
        }
    }

    /// Object type whose enum labels apply to records of this collection.
    pub fn enum_object_id(&self) -> Option<&str> {
        match self {
            Self::BizSet => Some(OBJ_BIZ_SET),
            Self::Business => Some(OBJ_BIZ),
            Self::Set => Some(OBJ_SET),
            Self::Module => Some(OBJ_MODULE),
            Self::Host => Some(OBJ_HOST),
            Self::ObjectInstance { object_id } => Some(object_id),
            _ => None,
        }
    }

    /// Business and set records are subject to resource-pool exclusion.
    pub fn is_exclusion_checked(&self) -> bool {
        matches!(self, Self::Business | Self::Set)
    }
}

/// Whether an object id names a table object (`bk_<obj>#<property>`).
pub fn is_table_object(object_id: &str) -> bool {
    TABLE_OBJECT_REGEXP.is_match(object_id)
}

/// Index holding the instances of `object_id`.
pub fn index_kind_for_object(object_id: &str) -> IndexKind {
    match object_id {
        OBJ_BIZ_SET => IndexKind::BizSet,
        OBJ_BIZ => IndexKind::Biz,
        OBJ_SET => IndexKind::Set,
        OBJ_MODULE => IndexKind::Module,
        OBJ_HOST => IndexKind::Host,
        _ => IndexKind::ObjectInstance,
    }
}

/// Collection holding the instances of `object_id` for `tenant`.
pub fn instance_collection(object_id: &str, tenant: &str) -> String {
    match object_id {
        OBJ_BIZ_SET => BIZ_SET_COLLECTION.to_string(),
        OBJ_BIZ => BIZ_COLLECTION.to_string(),
        OBJ_SET => SET_COLLECTION.to_string(),
        OBJ_MODULE => MODULE_COLLECTION.to_string(),
        OBJ_HOST => HOST_COLLECTION.to_string(),
        _ => format!("{}{}_pub_{}", OBJECT_INSTANCE_PREFIX, tenant, object_id),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_named_collections() {
        assert_eq!(Collection::classify("cc_BizSetBase"), Collection::BizSet);
        assert_eq!(Collection::classify("cc_ApplicationBase"), Collection::Business);
        assert_eq!(Collection::classify("cc_SetBase"), Collection::Set);
        assert_eq!(Collection::classify("cc_ModuleBase"), Collection::Module);
        assert_eq!(Collection::classify("cc_HostBase"), Collection::Host);
        assert_eq!(Collection::classify("cc_ObjDes"), Collection::Model);
        assert_eq!(Collection::classify("cc_ObjAttDes"), Collection::ModelAttribute);
    }

    #[test]
    fn test_classify_object_instance() {
        assert_eq!(
            Collection::classify("cc_ObjectBase_0_pub_switch"),
            Collection::ObjectInstance {
                object_id: "switch".to_string()
            }
        );
        assert_eq!(
            Collection::classify("cc_ObjectBase_0_pub_bk_router"),
            Collection::ObjectInstance {
                object_id: "bk_router".to_string()
            }
        );
    }

    #[test]
    fn test_classify_table_rows() {
        assert_eq!(
            Collection::classify("cc_ObjectBase_0_pub_bk_host#disk"),
            Collection::TableRow {
                object_id: "host".to_string(),
                property_id: "disk".to_string()
            }
        );
    }

    #[test]
    fn test_classify_unknown() {
        assert_eq!(Collection::classify("cc_AuditLog"), Collection::Unknown);
        assert_eq!(Collection::classify("cc_ObjectBase_0"), Collection::Unknown);
    }

    #[test]
    fn test_markers_and_indices() {
        assert_eq!(Collection::BizSet.marker(), Some("bk_biz_set_obj"));
        assert_eq!(Collection::ModelAttribute.marker(), Some("object"));
        assert_eq!(Collection::ModelAttribute.index_kind(), Some(IndexKind::Model));

        let table = Collection::classify("cc_ObjectBase_0_pub_bk_switch#port");
        assert_eq!(table.index_kind(), Some(IndexKind::ObjectInstance));
        assert_eq!(table.marker(), None);
    }

    #[test]
    fn test_is_table_object() {
        assert!(is_table_object("bk_host#disk"));
        assert!(!is_table_object("host"));
        assert!(!is_table_object("bk_switch"));
    }

    #[test]
    fn test_instance_collection() {
        assert_eq!(instance_collection("host", "0"), "cc_HostBase");
        assert_eq!(instance_collection("switch", "0"), "cc_ObjectBase_0_pub_switch");
    }
}
