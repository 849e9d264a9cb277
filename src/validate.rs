//! Batch shape validation and node/edge statistics.
//!
//! Statistics classify elements by shape: anything whose `data` carries both
//! `source` and `target` counts as an edge. This is the same rule
//! [`VisualElement::from_data`](crate::elements::VisualElement::from_data)
//! uses, so counts over the wire form and over decoded elements agree.
//!
//! [`validate`] is the only fatal check. [`parse_batch`] decodes elements one
//! by one and drops the ones it cannot read, so a single corrupt element never
//! costs the rest of the batch.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::elements::{ElementBatch, VisualElement};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct GraphStats {
    pub total: usize,
    #[serde(rename = "nodeCount")]
    pub node_count: usize,
    #[serde(rename = "edgeCount")]
    pub edge_count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("graph batch is missing")]
    Absent,
    #[error("graph batch has no 'elements' field")]
    MissingElements,
    #[error("graph batch 'elements' is not a list (found {0})")]
    ElementsNotArray(&'static str),
}

/// Check the overall shape of a received batch and count its elements.
pub fn validate(batch: &Value) -> Result<GraphStats, ValidationError> {
    elements_of(batch).map(stats)
}

fn elements_of(batch: &Value) -> Result<&[Value], ValidationError> {
    let obj = batch.as_object().ok_or(ValidationError::Absent)?;
    match obj.get("elements") {
        None => Err(ValidationError::MissingElements),
        Some(Value::Array(elements)) => Ok(elements.as_slice()),
        Some(other) => Err(ValidationError::ElementsNotArray(json_type(other))),
    }
}

pub fn stats(elements: &[Value]) -> GraphStats {
    let edge_count = elements.iter().filter(|el| is_edge_shaped(el)).count();
    GraphStats {
        total: elements.len(),
        node_count: elements.len() - edge_count,
        edge_count,
    }
}

/// Counts taken from the elements' own node/edge tagging.
pub fn tagged_stats(batch: &ElementBatch) -> GraphStats {
    let edge_count = batch.elements.iter().filter(|el| el.is_edge()).count();
    GraphStats {
        total: batch.len(),
        node_count: batch.len() - edge_count,
        edge_count,
    }
}

/// Whether an element is structurally an edge. Looks inside `data` when the
/// element is wrapped, at the element itself otherwise.
pub fn is_edge_shaped(element: &Value) -> bool {
    let fields = match element.get("data") {
        Some(Value::Object(data)) => data,
        _ => match element.as_object() {
            Some(obj) => obj,
            None => return false,
        },
    };
    fields.contains_key("source") && fields.contains_key("target")
}

/// An element of a received batch that could not be read.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkippedElement {
    pub index: usize,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedBatch {
    pub batch: ElementBatch,
    /// Counts over the kept elements only.
    pub stats: GraphStats,
    pub skipped: Vec<SkippedElement>,
}

/// Validate the wire form of a batch and decode it into elements, skipping
/// any element that is not a readable `{data: {...}}` object.
pub fn parse_batch(batch: &Value) -> Result<ParsedBatch, ValidationError> {
    let mut parsed = ParsedBatch::default();
    for (index, element) in elements_of(batch)?.iter().enumerate() {
        match VisualElement::deserialize(element) {
            Ok(el) => parsed.batch.elements.push(el),
            Err(e) => {
                tracing::warn!(index, "[Validate] Skipping element: {}", e);
                parsed.skipped.push(SkippedElement { index, reason: e.to_string() });
            }
        }
    }
    parsed.stats = tagged_stats(&parsed.batch);
    Ok(parsed)
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assemble::assemble;
    use crate::rows::{EdgeRow, NodeRow};
    use serde_json::json;

    #[test]
    fn test_validate_rejects_bad_shapes() {
        assert_eq!(validate(&json!({"elements": "not-an-array"})), Err(ValidationError::ElementsNotArray("string")));
        assert_eq!(validate(&Value::Null), Err(ValidationError::Absent));
        assert_eq!(validate(&json!({})), Err(ValidationError::MissingElements));
        assert_eq!(validate(&json!({"elements": null})), Err(ValidationError::ElementsNotArray("null")));
    }

    #[test]
    fn test_validate_empty_batch() {
        let s = validate(&json!({"elements": []})).unwrap();
        assert_eq!(s, GraphStats { total: 0, node_count: 0, edge_count: 0 });
    }

    #[test]
    fn test_stats_discriminator() {
        let elements = vec![
            json!({"data": {"id": "a"}}),
            json!({"data": {"id": "b", "source": "a"}}),
            json!({"data": {"id": "e", "source": "a", "target": "b"}}),
            json!({"id": "f", "source": "a", "target": "b"}),
            json!(42),
        ];
        let s = stats(&elements);
        assert_eq!(s.total, 5);
        assert_eq!(s.edge_count, 2);
        assert_eq!(s.node_count, 3);
    }

    #[test]
    fn test_shape_stats_match_tagged_stats() {
        let vtx = |id: u32| format!(r#"{{"id":{},"label":"V","properties":{{"name":"n{}"}}}}::vertex"#, id, id);
        let edge = |id: u32| format!(r#"{{"id":{},"label":"R","start_id":1,"end_id":2,"properties":{{}}}}::edge"#, id);
        let out = assemble(
            &[
                NodeRow { node: vtx(1) },
                NodeRow { node: vtx(2) },
                NodeRow { node: "garbage".into() },
            ],
            &[
                EdgeRow { source: vtx(1), edge: edge(10), target: vtx(2) },
                EdgeRow { source: vtx(2), edge: "garbage".into(), target: vtx(1) },
            ],
        );
        let wire = serde_json::to_value(&out.batch).unwrap();
        let shaped = validate(&wire).unwrap();
        let tagged = tagged_stats(&out.batch);
        assert_eq!(shaped, tagged);
        assert_eq!(shaped.node_count + shaped.edge_count, shaped.total);
        assert_eq!(shaped, GraphStats { total: 3, node_count: 2, edge_count: 1 });
    }

    #[test]
    fn test_node_with_endpoint_properties_counts_as_edge() {
        // Shape wins over tagging: a node whose attributes carry both
        // `source` and `target` is indistinguishable from an edge on the wire.
        let out = assemble(
            &[NodeRow { node: r#"{"id":1,"properties":{"source":"x","target":"y"}}::vertex"#.into() }],
            &[],
        );
        let wire = serde_json::to_value(&out.batch).unwrap();
        assert_eq!(tagged_stats(&out.batch).edge_count, 0);
        assert_eq!(validate(&wire).unwrap().edge_count, 1);
    }

    #[test]
    fn test_parse_batch() {
        let parsed = parse_batch(&json!({"elements": [
            {"data": {"id": "a", "label": "A"}},
            {"data": {"id": "e", "source": "a", "target": "a", "composite_id": "g"}}
        ]}))
        .unwrap();
        assert_eq!(parsed.stats.edge_count, 1);
        assert!(parsed.skipped.is_empty());
        assert_eq!(parsed.batch.edges().next().unwrap().composite_id.as_deref(), Some("g"));
    }

    #[test]
    fn test_parse_batch_skips_unreadable_elements() {
        let wire = json!({"elements": [
            {"data": {"id": "a"}},
            {"data": {"id": "b"}},
            {"data": {"id": "e1", "source": "a", "target": "b"}},
            42,
            {"data": {"id": "e2", "source": null, "target": "b"}},
            {"data": {"label": "no id"}},
            {"id": "bare", "source": "a", "target": "b"}
        ]});
        let parsed = parse_batch(&wire).unwrap();

        let kept: Vec<_> = parsed.batch.elements.iter().map(|el| el.id()).collect();
        assert_eq!(kept, vec!["a", "b", "e1"]);
        let skipped: Vec<_> = parsed.skipped.iter().map(|s| s.index).collect();
        assert_eq!(skipped, vec![3, 4, 5, 6]);
        assert!(parsed.skipped[1].reason.contains("null source"));

        assert_eq!(parsed.stats, GraphStats { total: 3, node_count: 2, edge_count: 1 });
        assert_eq!(parsed.stats, tagged_stats(&parsed.batch));
        let kept_wire = serde_json::to_value(&parsed.batch).unwrap();
        assert_eq!(validate(&kept_wire).unwrap(), parsed.stats);
    }

    #[test]
    fn test_parse_batch_shape_errors_are_fatal() {
        assert_eq!(parse_batch(&json!({"elements": {}})), Err(ValidationError::ElementsNotArray("object")));
        assert_eq!(parse_batch(&json!({})), Err(ValidationError::MissingElements));
    }
}
