//! Utility functions for the search indexer repository.
//!
//! Builders for the scripted table-row requests shared by providers.

use cmdb_search_shared::properties::{META_ID, TABLES};
use serde_json::{json, Value};

use crate::errors::SearchIndexError;
use crate::types::{TableRowDeleteRequest, TableRowUpdateRequest};

/// Painless script that stores the keywords of one table row under
/// `tables.<property>.<row>` on the owning instance document.
pub const TABLE_ROW_UPDATE_SCRIPT: &str = "if (ctx._source.tables == null) { ctx._source.tables = [:] } \
if (!ctx._source.tables.containsKey(params.property)) { ctx._source.tables[params.property] = [:] } \
ctx._source.tables[params.property][params.row] = params.keywords";

/// Painless script that removes `tables.<property>.<row>` and drops the
/// property entry once it holds no rows.
pub const TABLE_ROW_DELETE_SCRIPT: &str = "def rows = ctx._source.tables[params.property]; \
rows.remove(params.row); \
if (rows.isEmpty()) { ctx._source.tables.remove(params.property) }";

/// Validate an identifier that ends up in a field path of the index.
///
/// Identifiers must contain only alphanumeric characters and underscores.
///
/// # Arguments
///
/// * `what` - What the identifier names, used in the error message
/// * `value` - The identifier to validate
///
/// # Returns
///
/// * `Ok(())` - If the identifier is valid
/// * `Err(SearchIndexError)` - If it is empty or contains other characters
pub fn validate_identifier(what: &str, value: &str) -> Result<(), SearchIndexError> {
    if value.is_empty() {
        return Err(SearchIndexError::validation(format!(
            "{} cannot be empty",
            what
        )));
    }

    if !value.chars().all(|c| c.is_alphanumeric() || c == '_') {
        return Err(SearchIndexError::validation(format!(
            "{} '{}' contains invalid characters. Only alphanumeric characters and underscores are allowed",
            what, value
        )));
    }

    Ok(())
}

/// Build the update-by-query body for a table-row update.
///
/// Matches the owning instance by `meta_id` and runs [`TABLE_ROW_UPDATE_SCRIPT`].
pub fn table_row_update_body(request: &TableRowUpdateRequest) -> Result<Value, SearchIndexError> {
    validate_identifier("Property id", &request.property_id)?;
    validate_identifier("Row id", &request.row_id)?;

    Ok(json!({
        "query": {
            "term": { META_ID: request.instance_id }
        },
        "script": {
            "source": TABLE_ROW_UPDATE_SCRIPT,
            "lang": "painless",
            "params": {
                "property": request.property_id,
                "row": request.row_id,
                "keywords": request.keywords
            }
        }
    }))
}

/// Build the update-by-query body for a table-row delete.
///
/// Matches every document that holds `tables.<property>.<row>` and runs
/// [`TABLE_ROW_DELETE_SCRIPT`].
pub fn table_row_delete_body(request: &TableRowDeleteRequest) -> Result<Value, SearchIndexError> {
    validate_identifier("Property id", &request.property_id)?;
    validate_identifier("Row id", &request.row_id)?;

    Ok(json!({
        "query": {
            "exists": {
                "field": format!("{}.{}.{}", TABLES, request.property_id, request.row_id)
            }
        },
        "script": {
            "source": TABLE_ROW_DELETE_SCRIPT,
            "lang": "painless",
            "params": {
                "property": request.property_id,
                "row": request.row_id
            }
        }
    }))
}
