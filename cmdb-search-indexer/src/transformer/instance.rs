//! Instance transformers: business set, business, set, module, host and
//! generic object instances.

use async_trait::async_trait;
use cmdb_search_shared::SearchDocument;
use serde_json::Value;
use tracing::debug;

use super::{TransformContext, Transformer};
use crate::collections::{
    fields, Collection, MARKER_INSTANCE, OBJ_BIZ, OBJ_BIZ_SET, OBJ_HOST, OBJ_MODULE, OBJ_SET,
};
use crate::errors::MapError;
use crate::identity::{document_id, identifier, linkage, primary_id, tenant, SourceDocument};
use crate::keywords::{compress, extract};
use crate::outcome::MapOutcome;
use crate::sanitizer::sanitize;

/// Instance-style entity families.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstanceFamily {
    BizSet,
    Business,
    Set,
    Module,
    Host,
    /// Instances of user-defined objects in sharded collections.
    Object,
}

impl InstanceFamily {
    fn id_field(&self) -> &'static str {
        match self {
            Self::BizSet => fields::BIZ_SET_ID,
            Self::Business => fields::BIZ_ID,
            Self::Set => fields::SET_ID,
            Self::Module => fields::MODULE_ID,
            Self::Host => fields::HOST_ID,
            Self::Object => fields::INST_ID,
        }
    }

    fn marker(&self) -> &'static str {
        match self {
            Self::BizSet => OBJ_BIZ_SET,
            Self::Business => OBJ_BIZ,
            Self::Set => OBJ_SET,
            Self::Module => OBJ_MODULE,
            Self::Host => OBJ_HOST,
            Self::Object => MARKER_INSTANCE,
        }
    }

    /// Object type written to `meta_bk_obj_id`.
    fn object_id(&self, document: &SourceDocument, collection: &Collection) -> String {
        match self {
            Self::Object => document
                .get(fields::OBJ_ID)
                .and_then(Value::as_str)
                .or(match collection {
                    Collection::ObjectInstance { object_id } => Some(object_id.as_str()),
                    _ => None,
                })
                .unwrap_or_default()
                .to_string(),
            family => family.marker().to_string(),
        }
    }

    /// Copy the family's linkage fields from the source record.
    fn link(&self, doc: SearchDocument, source: &SourceDocument) -> SearchDocument {
        match self {
            Self::BizSet => doc.with_biz_set_id(linkage(source, fields::BIZ_SET_ID)),
            Self::Business | Self::Module | Self::Object => {
                doc.with_biz_id(linkage(source, fields::BIZ_ID))
            }
            Self::Set => doc
                .with_biz_id(linkage(source, fields::BIZ_ID))
                .with_parent_id(linkage(source, fields::PARENT_ID)),
            Self::Host => doc.with_cloud_id(linkage(source, fields::CLOUD_ID)),
        }
    }
}

/// Transformer for one instance family, writing through `index`.
pub struct InstanceTransformer {
    family: InstanceFamily,
    index: String,
}

impl InstanceTransformer {
    pub fn new(family: InstanceFamily, index: impl Into<String>) -> Self {
        Self {
            family,
            index: index.into(),
        }
    }
}

#[async_trait]
impl Transformer for InstanceTransformer {
    async fn transform(
        &self,
        document: &SourceDocument,
        ctx: &TransformContext<'_>,
    ) -> Result<MapOutcome, MapError> {
        let id = identifier(document, self.family.id_field())?;
        let primary = primary_id(document)?;

        let mut labelled = document.clone();
        if let Some(object_id) = ctx.collection.enum_object_id() {
            ctx.labels.apply(object_id, &mut labelled);
        }
        let keywords = compress(extract(&Value::Object(sanitize(
            &labelled,
            ctx.collection,
        ))));

        let search_document = SearchDocument::instance(
            id,
            self.family.object_id(document, ctx.collection),
            keywords,
        )
        .with_tenant(tenant(document));
        let search_document = self.family.link(search_document, document);

        let doc_id = document_id(&primary, self.family.marker());
        debug!(index = %self.index, doc_id = %doc_id, "Mapped instance document");

        Ok(MapOutcome::Index {
            index: self.index.clone(),
            id: doc_id,
            body: search_document.to_body()?,
        })
    }
}
