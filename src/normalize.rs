//! Identifier and label resolution for decoded entities.
//!
//! The store exposes two identities per entity: the internal numeric `id` it
//! assigns on insert, and an optional logical `properties.id` set by whoever
//! created the data. The logical one wins so ids survive re-imports.

use crate::agtype::DecodedEntity;
use serde_json::Value;

pub const UNKNOWN_NODE_LABEL: &str = "Unknown";
pub const EMPTY_EDGE_TYPE: &str = "";

/// Resolved, stable identifier of a visualization element.
pub type ElementId = String;

/// Resolve the element id of an entity. Never fails.
pub fn resolve_id(entity: &DecodedEntity) -> ElementId {
    entity
        .properties
        .get("id")
        .and_then(logical_id)
        .unwrap_or_else(|| entity.raw_id.to_string())
}

/// Display label for a node; empty or missing labels become `"Unknown"`.
pub fn resolve_node_label(entity: &DecodedEntity) -> String {
    non_empty_label(entity).unwrap_or(UNKNOWN_NODE_LABEL).to_string()
}

/// Relationship type for an edge; empty or missing labels become `""`.
pub fn resolve_edge_type(entity: &DecodedEntity) -> String {
    non_empty_label(entity).unwrap_or(EMPTY_EDGE_TYPE).to_string()
}

fn non_empty_label(entity: &DecodedEntity) -> Option<&str> {
    entity.label.as_deref().filter(|l| !l.is_empty())
}

/// String form of a logical id, or `None` when it is null or empty.
pub(crate) fn logical_id(value: &Value) -> Option<String> {
    scalar_string(value).filter(|s| !s.is_empty())
}

/// Canonical string form of a property value: strings verbatim, other
/// scalars via display, nested values as compact JSON. `null` has none.
pub(crate) fn scalar_string(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        other => Some(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agtype::decode;

    #[test]
    fn test_logical_id_wins() {
        let e = decode(r#"{"id":7,"label":"Claim","properties":{"id":"c-1"}}::vertex"#).unwrap();
        assert_eq!(resolve_id(&e), "c-1");
        assert_eq!(resolve_node_label(&e), "Claim");
    }

    #[test]
    fn test_falls_back_to_raw_id() {
        let e = decode(r#"{"id":9,"properties":{}}::vertex"#).unwrap();
        assert_eq!(resolve_id(&e), "9");
        assert_eq!(resolve_node_label(&e), "Unknown");
    }

    #[test]
    fn test_empty_or_null_logical_id_ignored() {
        let e = decode(r#"{"id":9,"properties":{"id":""}}::vertex"#).unwrap();
        assert_eq!(resolve_id(&e), "9");
        let e = decode(r#"{"id":9,"properties":{"id":null}}::vertex"#).unwrap();
        assert_eq!(resolve_id(&e), "9");
    }

    #[test]
    fn test_numeric_logical_id() {
        let e = decode(r#"{"id":9,"properties":{"id":42}}::vertex"#).unwrap();
        assert_eq!(resolve_id(&e), "42");
    }

    #[test]
    fn test_edge_type_fallback() {
        let e = decode(r#"{"id":5,"start_id":1,"end_id":2}::edge"#).unwrap();
        assert_eq!(resolve_edge_type(&e), "");
        let e = decode(r#"{"id":5,"label":"","start_id":1,"end_id":2}::edge"#).unwrap();
        assert_eq!(resolve_edge_type(&e), "");
        let e = decode(r#"{"id":5,"label":"REFUTES","start_id":1,"end_id":2}::edge"#).unwrap();
        assert_eq!(resolve_edge_type(&e), "REFUTES");
    }

    #[test]
    fn test_empty_label_on_node_is_unknown() {
        let e = decode(r#"{"id":1,"label":""}::vertex"#).unwrap();
        assert_eq!(resolve_node_label(&e), "Unknown");
    }

    #[test]
    fn test_resolution_is_deterministic() {
        let raw = r#"{"id":281474976710657,"label":"Source","properties":{"title":"t"}}::vertex"#;
        let first = resolve_id(&decode(raw).unwrap());
        for _ in 0..5 {
            assert_eq!(resolve_id(&decode(raw).unwrap()), first);
        }
    }
}
