//! Reading identifiers out of source records.

use serde_json::{Map, Value};

use crate::collections::fields;
use crate::errors::MapError;

/// A raw record from the primary store.
pub type SourceDocument = Map<String, Value>;

/// Build the search document id for a record.
pub fn document_id(primary_id: &str, marker: &str) -> String {
    format!("{}:{}", primary_id, marker)
}

/// Hex form of the record's primary-store id.
///
/// The id arrives either as a plain string or as extended JSON
/// (`{"$oid": "..."}`).
pub fn primary_id(document: &SourceDocument) -> Result<String, MapError> {
    match document.get(fields::PRIMARY_ID) {
        Some(Value::String(id)) if !id.is_empty() => Ok(id.clone()),
        Some(Value::Object(extended)) => extended
            .get("$oid")
            .and_then(Value::as_str)
            .filter(|id| !id.is_empty())
            .map(str::to_string)
            .ok_or(MapError::MissingPrimaryId),
        _ => Err(MapError::MissingPrimaryId),
    }
}

/// String form of an identifying field.
///
/// Strings are taken verbatim and other values in their JSON form; a missing
/// or null field is an error.
pub fn identifier(document: &SourceDocument, field: &str) -> Result<String, MapError> {
    match document.get(field) {
        None | Some(Value::Null) => Err(MapError::missing(field)),
        Some(value) => Ok(value_to_string(value)),
    }
}

pub fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Tenant marker of a record, falling back to the legacy supplier account.
pub fn tenant(document: &SourceDocument) -> Option<Value> {
    [fields::TENANT_ID, fields::SUPPLIER_ACCOUNT]
        .iter()
        .filter_map(|field| document.get(*field))
        .find(|value| !value.is_null())
        .cloned()
}

/// Non-null value of `field`, for linkage fields copied onto the document.
pub fn linkage(document: &SourceDocument, field: &str) -> Option<Value> {
    document.get(field).filter(|value| !value.is_null()).cloned()
}

/// Integer form of an id stored as a number or a numeric string.
pub fn as_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.fract() == 0.0 && f.abs() < i64::MAX as f64)
                .map(|f| f as i64)
        }),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
