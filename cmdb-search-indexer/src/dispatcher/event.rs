//! Change events delivered by the host runtime.

use serde::Deserialize;

use crate::identity::SourceDocument;

/// Operation carried by a change event, as in the primary store's oplog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum Operation {
    #[serde(rename = "i")]
    Insert,
    #[serde(rename = "u")]
    Update,
    #[serde(rename = "r")]
    Replace,
    #[serde(rename = "d")]
    Delete,
}

impl Operation {
    pub fn is_delete(&self) -> bool {
        matches!(self, Self::Delete)
    }
}

/// A single change in the primary store.
#[derive(Debug, Clone, Deserialize)]
pub struct ChangeEvent {
    /// Collection the record belongs to.
    pub collection: String,
    /// The full record after the change; for deletes, at least its `_id`.
    pub document: SourceDocument,
    /// Database the record belongs to.
    pub database: String,
    pub operation: Operation,
}

impl ChangeEvent {
    pub fn new(
        operation: Operation,
        database: impl Into<String>,
        collection: impl Into<String>,
        document: SourceDocument,
    ) -> Self {
        Self {
            collection: collection.into(),
            document,
            database: database.into(),
            operation,
        }
    }

    /// Create an insert event.
    pub fn insert(
        database: impl Into<String>,
        collection: impl Into<String>,
        document: SourceDocument,
    ) -> Self {
        Self::new(Operation::Insert, database, collection, document)
    }

    /// Create a delete event.
    pub fn delete(
        database: impl Into<String>,
        collection: impl Into<String>,
        document: SourceDocument,
    ) -> Self {
        Self::new(Operation::Delete, database, collection, document)
    }
}
