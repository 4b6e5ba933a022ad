//! Keyword extraction.
//!
//! A record is indexed as the flat list of every scalar it contains.

use serde_json::Value;

/// Flatten a document tree into its leaf values, in walk order.
///
/// Maps are walked in key order and arrays in element order. Strings are
/// taken verbatim, numbers and booleans in their JSON form; nulls produce
/// nothing.
pub fn extract(value: &Value) -> Vec<String> {
    let mut keywords = Vec::new();
    collect(value, &mut keywords);
    keywords
}

fn collect(value: &Value, keywords: &mut Vec<String>) {
    match value {
        Value::Null => {}
        Value::String(s) => keywords.push(s.clone()),
        Value::Number(n) => keywords.push(n.to_string()),
        Value::Bool(b) => keywords.push(b.to_string()),
        Value::Array(items) => items.iter().for_each(|item| collect(item, keywords)),
        Value::Object(map) => map.values().for_each(|item| collect(item, keywords)),
    }
}

/// De-duplicate keywords, keeping the first occurrence of each and dropping
/// empty strings.
pub fn compress(keywords: Vec<String>) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    keywords
        .into_iter()
        .filter(|k| !k.is_empty() && seen.insert(k.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_extract_scalars() {
        let doc = json!({
            "name": "web-01",
            "cpu": 8,
            "load": 0.5,
            "enabled": true,
            "comment": null
        });

        assert_eq!(extract(&doc), vec!["8", "true", "0.5", "web-01"]);
    }

    #[test]
    fn test_extract_nested() {
        let doc = json!({
            "a": {"b": ["x", {"c": "y"}]},
            "d": [[1, 2], []]
        });

        assert_eq!(extract(&doc), vec!["x", "y", "1", "2"]);
    }

    #[test]
    fn test_extract_scalar_root() {
        assert_eq!(extract(&json!("only")), vec!["only"]);
        assert!(extract(&Value::Null).is_empty());
    }

    #[test]
    fn test_compress_keeps_first_seen_order() {
        let keywords = vec!["b", "a", "b", "", "c", "a"]
            .into_iter()
            .map(String::from)
            .collect();

        assert_eq!(compress(keywords), vec!["b", "a", "c"]);
    }

    #[test]
    fn test_permuted_documents_extract_identically() {
        let doc: Value =
            serde_json::from_str(r#"{"owner": "acct1", "name": "pay", "alias": "pay"}"#).unwrap();
        let permuted: Value =
            serde_json::from_str(r#"{"alias": "pay", "name": "pay", "owner": "acct1"}"#).unwrap();

        let first = compress(extract(&doc));
        assert_eq!(first, compress(extract(&permuted)));
        assert_eq!(first, vec!["pay", "acct1"]);
    }
}
