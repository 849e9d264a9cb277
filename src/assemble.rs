//! Turns raw vertex rows and (source, edge, target) rows into an
//! [`ElementBatch`].
//!
//! Rows that fail to decode are skipped one at a time and recorded in the
//! returned [`Assembly`]; they never abort the batch. Nodes come first, then
//! edges, both in input order.

use serde::Serialize;

use crate::agtype::{self, DecodeError, DecodedEntity};
use crate::elements::{composite_id_of, EdgeElement, ElementBatch, NodeElement, VisualElement};
use crate::normalize::{resolve_edge_type, resolve_id, resolve_node_label};
use crate::rows::{EdgeRow, NodeRow, RowSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RowSection {
    Nodes,
    Edges,
}

/// Which field of an edge row failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EdgeField {
    Source,
    Edge,
    Target,
}

/// A row left out of the batch, with the reason.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkippedRow {
    pub section: RowSection,
    pub index: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<EdgeField>,
    pub reason: &'static str,
    #[serde(skip)]
    pub error: DecodeError,
}

/// Result of one assembly pass: the batch plus the per-row failures.
#[derive(Debug, Clone, Default)]
pub struct Assembly {
    pub batch: ElementBatch,
    pub skipped: Vec<SkippedRow>,
}

impl Assembly {
    pub fn is_clean(&self) -> bool {
        self.skipped.is_empty()
    }
}

pub fn assemble_rows(rows: &RowSet) -> Assembly {
    assemble(&rows.nodes, &rows.edges)
}

pub fn assemble(node_rows: &[NodeRow], edge_rows: &[EdgeRow]) -> Assembly {
    let mut elements = Vec::with_capacity(node_rows.len() + edge_rows.len());
    let mut skipped = Vec::new();

    for (index, row) in node_rows.iter().enumerate() {
        match agtype::decode(&row.node) {
            Ok(entity) => elements.push(VisualElement::Node(node_element(entity))),
            Err(error) => skipped.push(skip(RowSection::Nodes, index, None, error)),
        }
    }

    for (index, row) in edge_rows.iter().enumerate() {
        match decode_edge_row(row) {
            Ok(edge) => elements.push(VisualElement::Edge(edge)),
            Err((field, error)) => skipped.push(skip(RowSection::Edges, index, Some(field), error)),
        }
    }

    let assembly = Assembly {
        batch: ElementBatch { elements },
        skipped,
    };
    tracing::debug!(
        elements = assembly.batch.len(),
        skipped = assembly.skipped.len(),
        "[Assemble] Built batch from {} node rows, {} edge rows",
        node_rows.len(),
        edge_rows.len()
    );
    assembly
}

fn node_element(entity: DecodedEntity) -> NodeElement {
    let id = resolve_id(&entity);
    let label = resolve_node_label(&entity);
    NodeElement {
        id,
        label,
        attributes: entity.properties,
    }
}

/// Decode all three fields of an edge row. Each field is decoded on its own
/// so the reported failure names the first field that is bad.
fn decode_edge_row(row: &EdgeRow) -> Result<EdgeElement, (EdgeField, DecodeError)> {
    let source = agtype::decode(&row.source);
    let edge = agtype::decode(&row.edge);
    let target = agtype::decode(&row.target);

    let source = source.map_err(|e| (EdgeField::Source, e))?;
    let edge = edge.map_err(|e| (EdgeField::Edge, e))?;
    let target = target.map_err(|e| (EdgeField::Target, e))?;

    Ok(EdgeElement {
        id: resolve_id(&edge),
        source: resolve_id(&source),
        target: resolve_id(&target),
        edge_type: resolve_edge_type(&edge),
        composite_id: composite_id_of(&edge.properties),
        attributes: edge.properties,
    })
}

fn skip(section: RowSection, index: usize, field: Option<EdgeField>, error: DecodeError) -> SkippedRow {
    tracing::warn!(
        section = ?section,
        index,
        field = ?field,
        reason = error.reason.as_str(),
        "[Assemble] Skipping row: {}",
        error
    );
    SkippedRow {
        section,
        index,
        field,
        reason: error.reason.as_str(),
        error,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agtype::DecodeReason;

    fn v(id: u64, label: &str, props: &str) -> String {
        format!(r#"{{"id":{},"label":"{}","properties":{}}}::vertex"#, id, label, props)
    }

    fn e(id: u64, label: &str, props: &str) -> String {
        format!(
            r#"{{"id":{},"label":"{}","start_id":1,"end_id":2,"properties":{}}}::edge"#,
            id, label, props
        )
    }

    fn node_row(raw: &str) -> NodeRow {
        NodeRow { node: raw.to_string() }
    }

    fn edge_row(source: &str, edge: &str, target: &str) -> EdgeRow {
        EdgeRow {
            source: source.to_string(),
            edge: edge.to_string(),
            target: target.to_string(),
        }
    }

    #[test]
    fn test_node_examples() {
        let out = assemble(
            &[
                node_row(r#"{"id":7,"label":"Claim","properties":{"id":"c-1"}}::vertex"#),
                node_row(r#"{"id":9,"properties":{}}::vertex"#),
            ],
            &[],
        );
        let nodes: Vec<_> = out.batch.nodes().collect();
        assert_eq!(nodes[0].id, "c-1");
        assert_eq!(nodes[0].label, "Claim");
        assert_eq!(nodes[1].id, "9");
        assert_eq!(nodes[1].label, "Unknown");
        assert!(out.is_clean());
    }

    #[test]
    fn test_malformed_node_row_skipped() {
        let out = assemble(
            &[
                node_row(&v(1, "A", "{}")),
                node_row("not-json::vertex"),
                node_row(&v(2, "B", "{}")),
                node_row(&v(3, "C", "{}")),
            ],
            &[],
        );
        assert_eq!(out.batch.nodes().count(), 3);
        assert_eq!(out.skipped.len(), 1);
        assert_eq!(out.skipped[0].index, 1);
        assert_eq!(out.skipped[0].section, RowSection::Nodes);
        assert_eq!(out.skipped[0].error.reason, DecodeReason::MalformedJson);
        assert_eq!(out.skipped[0].reason, "malformed-json");
    }

    #[test]
    fn test_one_bad_field_drops_only_that_edge() {
        let a = v(1, "A", r#"{"id":"a"}"#);
        let b = v(2, "B", r#"{"id":"b"}"#);
        let good = e(10, "SUPPORTS", "{}");
        for bad_field in 0..3 {
            let mut fields = [a.clone(), good.clone(), b.clone()];
            fields[bad_field] = "{broken".to_string();
            let rows = vec![
                edge_row(&a, &e(11, "X", "{}"), &b),
                edge_row(&fields[0], &fields[1], &fields[2]),
                edge_row(&b, &e(12, "Y", "{}"), &a),
            ];
            let out = assemble(&[], &rows);
            let ids: Vec<_> = out.batch.edges().map(|e| e.id.as_str()).collect();
            assert_eq!(ids, vec!["11", "12"]);
            assert_eq!(out.skipped.len(), 1);
            assert_eq!(out.skipped[0].index, 1);
            let expected = [EdgeField::Source, EdgeField::Edge, EdgeField::Target][bad_field];
            assert_eq!(out.skipped[0].field, Some(expected));
        }
    }

    #[test]
    fn test_edge_endpoints_from_embedded_vertices() {
        // The source vertex never appears as a node row; the edge still resolves.
        let out = assemble(
            &[node_row(&v(2, "B", r#"{"id":"b"}"#))],
            &[edge_row(
                &v(1, "A", r#"{"id":"a"}"#),
                &e(10, "SUPPORTS", r#"{"composite_id":"g1","weight":2}"#),
                &v(2, "B", r#"{"id":"b"}"#),
            )],
        );
        let edge = out.batch.edges().next().unwrap();
        assert_eq!(edge.source, "a");
        assert_eq!(edge.target, "b");
        assert_eq!(edge.edge_type, "SUPPORTS");
        assert_eq!(edge.composite_id.as_deref(), Some("g1"));
        assert_eq!(edge.attributes.get("weight"), Some(&serde_json::json!(2)));
    }

    #[test]
    fn test_nodes_before_edges_in_input_order() {
        let a = v(1, "A", "{}");
        let b = v(2, "B", "{}");
        let out = assemble(
            &[node_row(&b), node_row(&a)],
            &[edge_row(&a, &e(20, "R", "{}"), &b), edge_row(&b, &e(21, "R", "{}"), &a)],
        );
        let ids: Vec<_> = out.batch.elements.iter().map(|el| el.id().to_string()).collect();
        assert_eq!(ids, vec!["2", "1", "20", "21"]);
    }

    #[test]
    fn test_missing_edge_type_is_empty() {
        let a = v(1, "A", "{}");
        let out = assemble(&[], &[edge_row(&a, r#"{"id":5,"properties":{}}::edge"#, &a)]);
        assert_eq!(out.batch.edges().next().unwrap().edge_type, "");
    }

    #[test]
    fn test_assemble_rows_document() {
        let rows = RowSet::from_str(&serde_json::json!({
            "nodes": [{"node": v(1, "A", "{}")}],
            "edges": [{"source": v(1, "A", "{}"), "edge": e(3, "R", "{}"), "target": v(1, "A", "{}")}]
        }).to_string())
        .unwrap();
        let out = assemble_rows(&rows);
        assert_eq!(out.batch.len(), 2);
    }
}
