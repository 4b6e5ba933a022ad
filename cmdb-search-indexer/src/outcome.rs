//! Result of mapping one change event.

use cmdb_search_repository::{TableRowDeleteRequest, TableRowUpdateRequest};
use serde_json::Value;

/// What the host runtime (or the loader) should do with an event.
#[derive(Debug, Clone, PartialEq)]
pub enum MapOutcome {
    /// Upsert `body` as document `id` through `index` (an alias).
    Index {
        index: String,
        id: String,
        body: Value,
    },
    /// Set the keywords of a table row on the owning instance document.
    UpdateTableRow(TableRowUpdate),
    /// Delete document `id` from the concrete index `index`.
    Delete { index: String, id: String },
    /// Remove a table row from every document that holds it.
    DeleteTableRow(TableRowDeleteRequest),
    /// Nothing to write. Not an error.
    Drop(DropReason),
}

impl MapOutcome {
    pub fn is_drop(&self) -> bool {
        matches!(self, Self::Drop(_))
    }
}

/// Why an event produced no write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    /// The record belongs to a resource-pool business.
    Excluded,
    /// The collection is not indexed.
    UnknownCollection,
    /// Model events for table objects (`bk_<obj>#<property>`).
    TableObject,
    /// A table row not linked to any instance.
    UnlinkedTableRow,
    /// The transformation panicked.
    Panicked,
}

/// A table-row update plus what is needed to create the owning document
/// when the scripted update finds nothing to update.
#[derive(Debug, Clone, PartialEq)]
pub struct TableRowUpdate {
    pub request: TableRowUpdateRequest,
    pub owner: OwnerLookup,
}

/// Where to find the instance owning a table row.
#[derive(Debug, Clone, PartialEq)]
pub struct OwnerLookup {
    pub database: String,
    /// Collection holding the owning instance.
    pub collection: String,
    /// Identifying field of the owning instance.
    pub id_field: &'static str,
    pub instance_id: i64,
    /// `{"tables": {<property>: {<row>: [keywords]}}}`, upserted on the
    /// owner's document.
    pub document: Value,
}
