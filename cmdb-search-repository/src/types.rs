//! Request types for search index write operations.

use serde_json::Value;

/// Request to create or update a document (upsert).
///
/// `index` is normally an alias; the document id is deterministic for the
/// source record so repeated requests land on the same document.
#[derive(Debug, Clone, PartialEq)]
pub struct UpsertDocumentRequest {
    /// The index or alias to write to.
    pub index: String,
    /// The search-engine document id.
    pub id: String,
    /// The document body.
    pub document: Value,
}

/// Request to delete a document from the search index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteDocumentRequest {
    /// The concrete index holding the document.
    pub index: String,
    /// The search-engine document id.
    pub id: String,
}

/// Request to set the keywords of one table-property row on the document of
/// its owning instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableRowUpdateRequest {
    /// The concrete index holding the owning instance document.
    pub index: String,
    /// `meta_id` of the owning instance.
    pub instance_id: String,
    /// Property id of the table attribute.
    pub property_id: String,
    /// Primary-store id of the row.
    pub row_id: String,
    /// Keywords extracted from the row.
    pub keywords: Vec<String>,
}

/// Request to remove one table-property row from every document holding it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableRowDeleteRequest {
    /// The concrete index holding the owning instance document.
    pub index: String,
    /// Property id of the table attribute.
    pub property_id: String,
    /// Primary-store id of the row.
    pub row_id: String,
}
