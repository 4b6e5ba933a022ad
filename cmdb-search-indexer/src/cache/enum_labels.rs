//! Enum label cache.
//!
//! Enum attributes store an option id on the instance. The cache maps
//! (object type, property id, option id) to the option's label so that
//! instances are searchable by what users see rather than by the id.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, info};

use super::Snapshot;
use crate::collections::{fields, ATTRIBUTE_COLLECTION, MODEL_COLLECTION, PROPERTY_TYPE_ENUM};
use crate::errors::CacheError;
use crate::identity::SourceDocument;
use crate::store::{filter_eq, ConfigStore, Filter};

/// property id -> option id -> label
type PropertyLabels = HashMap<String, HashMap<String, String>>;

/// One immutable snapshot of every enum attribute's labels.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct EnumLabels {
    objects: HashMap<String, PropertyLabels>,
}

impl EnumLabels {
    /// Label of an option, if it is known and non-empty.
    pub fn label(&self, object_id: &str, property_id: &str, option_id: &str) -> Option<&str> {
        self.objects
            .get(object_id)?
            .get(property_id)?
            .get(option_id)
            .map(String::as_str)
            .filter(|label| !label.is_empty())
    }

    /// Replace the option ids stored on `document` with their labels.
    ///
    /// Only string values of enum properties of `object_id` are touched; an
    /// unknown option id or an empty label leaves the raw value in place.
    pub fn apply(&self, object_id: &str, document: &mut SourceDocument) {
        let Some(properties) = self.objects.get(object_id) else {
            return;
        };

        for (property_id, options) in properties {
            let Some(Value::String(option_id)) = document.get(property_id) else {
                continue;
            };
            if let Some(label) = options.get(option_id).filter(|label| !label.is_empty()) {
                document.insert(property_id.clone(), Value::String(label.clone()));
            }
        }
    }

    /// Number of object types with at least one enum attribute.
    pub fn object_count(&self) -> usize {
        self.objects.values().filter(|p| !p.is_empty()).count()
    }

    /// Build a snapshot from `(object, property, option, label)` rows.
    pub fn from_entries<'a>(entries: impl IntoIterator<Item = (&'a str, &'a str, &'a str, &'a str)>) -> Self {
        let mut labels = Self::default();
        for (object_id, property_id, option_id, label) in entries {
            labels
                .objects
                .entry(object_id.to_string())
                .or_default()
                .entry(property_id.to_string())
                .or_default()
                .insert(option_id.to_string(), label.to_string());
        }
        labels
    }
}

/// Option id -> label of one enum attribute.
///
/// Options are `[{"id": "1", "name": "Linux"}, ...]`; entries without a
/// string label are skipped.
fn option_labels(attribute: &SourceDocument) -> HashMap<String, String> {
    let Some(Value::Array(options)) = attribute.get(fields::OPTION) else {
        return HashMap::new();
    };

    options
        .iter()
        .filter_map(|option| {
            let id = match option.get(fields::OPTION_ID)? {
                Value::String(id) => id.clone(),
                Value::Number(id) => id.to_string(),
                _ => return None,
            };
            let name = option.get(fields::OPTION_NAME)?.as_str()?;
            Some((id, name.to_string()))
        })
        .collect()
}

/// Shared enum label cache.
#[derive(Debug, Default)]
pub struct EnumLabelCache {
    snapshot: Snapshot<EnumLabels>,
}

impl EnumLabelCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// The current snapshot.
    pub fn snapshot(&self) -> Arc<EnumLabels> {
        self.snapshot.load()
    }

    /// Publish a new snapshot.
    pub fn replace(&self, labels: EnumLabels) {
        self.snapshot.store(labels);
    }

    /// Rebuild the snapshot from the primary store.
    ///
    /// Any failing query aborts the rebuild and the previous snapshot stays
    /// in place.
    pub async fn rebuild(
        &self,
        store: &dyn ConfigStore,
        database: &str,
    ) -> Result<usize, CacheError> {
        let models = store.find(database, MODEL_COLLECTION, &Filter::new()).await?;

        let mut labels = EnumLabels::default();
        for object_id in models
            .iter()
            .filter_map(|model| model.get(fields::OBJ_ID).and_then(Value::as_str))
        {
            let mut filter = filter_eq(fields::OBJ_ID, object_id);
            filter.insert(fields::PROPERTY_TYPE.to_string(), PROPERTY_TYPE_ENUM.into());
            let attributes = store.find(database, ATTRIBUTE_COLLECTION, &filter).await?;

            let properties: PropertyLabels = attributes
                .iter()
                .filter_map(|attribute| {
                    let property_id = attribute.get(fields::PROPERTY_ID)?.as_str()?;
                    Some((property_id.to_string(), option_labels(attribute)))
                })
                .collect();
            debug!(object_id = %object_id, properties = properties.len(), "Loaded enum attributes");
            labels.objects.insert(object_id.to_string(), properties);
        }

        let count = labels.object_count();
        self.replace(labels);
        info!(objects = count, "Enum label cache rebuilt");
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryStore;
    use serde_json::json;

    fn record(value: Value) -> SourceDocument {
        value.as_object().cloned().unwrap()
    }

    fn seeded_store() -> InMemoryStore {
        let store = InMemoryStore::new();
        store.insert("cmdb", MODEL_COLLECTION, json!({"bk_obj_id": "host"}));
        store.insert("cmdb", MODEL_COLLECTION, json!({"bk_obj_id": "switch"}));
        store.insert(
            "cmdb",
            ATTRIBUTE_COLLECTION,
            json!({
                "id": 1,
                "bk_obj_id": "host",
                "bk_property_id": "bk_os_type",
                "bk_property_type": "enum",
                "option": [
                    {"id": "1", "name": "Linux", "type": "text"},
                    {"id": "2", "name": "Windows", "type": "text"}
                ]
            }),
        );
        store.insert(
            "cmdb",
            ATTRIBUTE_COLLECTION,
            json!({
                "id": 2,
                "bk_obj_id": "host",
                "bk_property_id": "bk_host_name",
                "bk_property_type": "singlechar"
            }),
        );
        store
    }

    #[tokio::test]
    async fn test_rebuild_builds_labels() {
        let store = seeded_store();
        let cache = EnumLabelCache::new();

        let count = cache.rebuild(&store, "cmdb").await.unwrap();

        let labels = cache.snapshot();
        assert_eq!(count, 1);
        assert_eq!(labels.label("host", "bk_os_type", "1"), Some("Linux"));
        assert_eq!(labels.label("host", "bk_os_type", "2"), Some("Windows"));
        assert_eq!(labels.label("host", "bk_os_type", "3"), None);
        assert_eq!(labels.label("host", "bk_host_name", "1"), None);
    }

    #[tokio::test]
    async fn test_failed_rebuild_keeps_snapshot() {
        let store = seeded_store();
        let cache = EnumLabelCache::new();
        cache.rebuild(&store, "cmdb").await.unwrap();
        let before = cache.snapshot();

        store.set_unavailable(true);
        assert!(cache.rebuild(&store, "cmdb").await.is_err());

        assert_eq!(*cache.snapshot(), *before);
    }

    #[test]
    fn test_apply_substitutes_labels() {
        let labels = EnumLabels::from_entries([
            ("host", "bk_os_type", "1", "Linux"),
            ("host", "bk_state", "1", ""),
        ]);
        let mut doc = record(json!({
            "bk_os_type": "1",
            "bk_state": "1",
            "bk_host_name": "1"
        }));

        labels.apply("host", &mut doc);

        assert_eq!(doc["bk_os_type"], "Linux");
        // empty label passes the raw value through
        assert_eq!(doc["bk_state"], "1");
        assert_eq!(doc["bk_host_name"], "1");
    }

    #[test]
    fn test_apply_passes_unknown_values_through() {
        let labels = EnumLabels::from_entries([("host", "bk_os_type", "1", "Linux")]);
        let mut doc = record(json!({"bk_os_type": "9"}));
        labels.apply("host", &mut doc);
        assert_eq!(doc["bk_os_type"], "9");

        let mut numeric = record(json!({"bk_os_type": 1}));
        labels.apply("host", &mut numeric);
        assert_eq!(numeric["bk_os_type"], 1);

        let mut other = record(json!({"bk_os_type": "1"}));
        labels.apply("switch", &mut other);
        assert_eq!(other["bk_os_type"], "1");
    }
}
