//! Index definitions and mappings.
//!
//! This module defines the logical indices, their versions and the settings
//! and mappings each versioned index is created with.

use cmdb_search_shared::properties::{
    KEYWORDS, META_BIZ_ID, META_BIZ_SET_ID, META_CLOUD_ID, META_ID, META_OBJ_ID, META_PARENT_ID,
    META_TENANT_ID, TABLES, TYPE_KEYWORD, TYPE_OBJECT, TYPE_TEXT,
};
use serde_json::{json, Map, Value};

/// Sizing applied to every managed index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexSettings {
    /// Number of primary shards.
    pub shards: u32,
    /// Number of replicas per shard.
    pub replicas: u32,
}

impl IndexSettings {
    pub fn new(shards: u32, replicas: u32) -> Self {
        Self { shards, replicas }
    }
}

/// The logical indices managed by the indexer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndexKind {
    BizSet,
    Biz,
    Set,
    Module,
    Host,
    Model,
    ObjectInstance,
}

impl IndexKind {
    /// Every managed index, in bootstrap order.
    pub const ALL: [IndexKind; 7] = [
        IndexKind::BizSet,
        IndexKind::Biz,
        IndexKind::Set,
        IndexKind::Module,
        IndexKind::Host,
        IndexKind::Model,
        IndexKind::ObjectInstance,
    ];

    /// Unversioned base name, which is also the alias.
    pub fn base_name(&self) -> &'static str {
        match self {
            IndexKind::BizSet => "bk_cmdb.biz_set",
            IndexKind::Biz => "bk_cmdb.biz",
            IndexKind::Set => "bk_cmdb.set",
            IndexKind::Module => "bk_cmdb.module",
            IndexKind::Host => "bk_cmdb.host",
            IndexKind::Model => "bk_cmdb.model",
            IndexKind::ObjectInstance => "bk_cmdb.object_instance",
        }
    }

    /// Schema version of the index.
    ///
    /// NOTE: bump the version of an index whenever its mappings change.
    pub fn version(&self) -> &'static str {
        match self {
            IndexKind::BizSet
            | IndexKind::Biz
            | IndexKind::Set
            | IndexKind::Module
            | IndexKind::Host
            | IndexKind::Model
            | IndexKind::ObjectInstance => "20210710",
        }
    }
}

/// An immutable, versioned index definition.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexDefinition {
    kind: IndexKind,
    name: String,
    schema: Value,
}

impl IndexDefinition {
    /// Build the definition of `kind` sized with `settings`.
    pub fn new(kind: IndexKind, settings: IndexSettings) -> Self {
        Self {
            kind,
            name: versioned_index_name(kind.base_name(), kind.version()),
            schema: index_schema(kind, settings),
        }
    }

    pub fn kind(&self) -> IndexKind {
        self.kind
    }

    /// The concrete, versioned index name (e.g. `bk_cmdb.biz-20210710`).
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The alias all reads and writes go through (e.g. `bk_cmdb.biz`).
    pub fn alias(&self) -> &str {
        self.kind.base_name()
    }

    pub fn version(&self) -> &str {
        self.kind.version()
    }

    /// Settings and mappings the index is created with.
    pub fn schema(&self) -> &Value {
        &self.schema
    }
}

/// Get the versioned index name.
///
/// # Returns
///
/// The versioned index name (e.g., "bk_cmdb.host-20210710")
pub fn versioned_index_name(base_name: &str, version: &str) -> String {
    format!("{}-{}", base_name, version)
}

/// The `{"properties": {"tables": {"type": "object"}}}` mapping fragment.
///
/// Indices created before table properties existed get this fragment added
/// during bootstrap.
pub fn table_properties_mapping() -> Value {
    let mut properties = Map::new();
    properties.insert(TABLES.to_string(), json!({ "type": TYPE_OBJECT }));
    json!({ "properties": properties })
}

/// Get the index settings and mappings for a logical index.
///
/// All indices share the `meta_*` keyword fields and the analysed `keywords`
/// text field. Linkage fields differ per index:
/// - **biz set**: `meta_bk_biz_set_id` instead of `meta_bk_biz_id`
/// - **set**: adds `meta_bk_parent_id`
/// - **host**: `meta_bk_cloud_id` instead of `meta_bk_biz_id`
fn index_schema(kind: IndexKind, settings: IndexSettings) -> Value {
    let keyword = json!({ "type": TYPE_KEYWORD });

    let mut properties = Map::new();
    properties.insert(META_ID.to_string(), keyword.clone());
    properties.insert(META_OBJ_ID.to_string(), keyword.clone());
    properties.insert(META_TENANT_ID.to_string(), keyword.clone());
    properties.insert(KEYWORDS.to_string(), json!({ "type": TYPE_TEXT }));
    properties.insert(TABLES.to_string(), json!({ "type": TYPE_OBJECT }));

    match kind {
        IndexKind::BizSet => {
            properties.insert(META_BIZ_SET_ID.to_string(), keyword);
        }
        IndexKind::Set => {
            properties.insert(META_BIZ_ID.to_string(), keyword.clone());
            properties.insert(META_PARENT_ID.to_string(), keyword);
        }
        IndexKind::Host => {
            properties.insert(META_CLOUD_ID.to_string(), keyword);
        }
        IndexKind::Biz | IndexKind::Module | IndexKind::Model | IndexKind::ObjectInstance => {
            properties.insert(META_BIZ_ID.to_string(), keyword);
        }
    }

    json!({
        "settings": {
            "number_of_shards": settings.shards,
            "number_of_replicas": settings.replicas
        },
        "mappings": {
            "properties": properties
        }
    })
}
