//! Raw query-result rows as handed over by the query layer.
//!
//! A rows document looks like:
//!
//! ```json
//! { "nodes": [ { "node": "{...}::vertex" } ],
//!   "edges": [ { "source": "{...}::vertex", "edge": "{...}::edge", "target": "{...}::vertex" } ] }
//! ```
//!
//! Only the outer shape is checked here. Individual row fields stay opaque
//! until the assembler decodes them.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeRow {
    pub node: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdgeRow {
    pub source: String,
    pub edge: String,
    pub target: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RowSet {
    pub nodes: Vec<NodeRow>,
    pub edges: Vec<EdgeRow>,
}

#[derive(Debug, Error)]
pub enum RowsError {
    #[error("rows document is not a JSON object")]
    NotAnObject,
    #[error("'{0}' is not an array of rows")]
    NotAnArray(&'static str),
    #[error("row {index} of '{section}' is not an object")]
    RowNotAnObject { section: &'static str, index: usize },
    #[error("invalid rows JSON: {0}")]
    Json(#[from] serde_json::Error),
}

impl RowSet {
    pub fn from_str(s: &str) -> Result<Self, RowsError> {
        let value: Value = serde_json::from_str(s)?;
        Self::from_json(&value)
    }

    /// Build a row set from a parsed document. A missing `nodes` or `edges`
    /// key is an empty section; present but non-array is an error.
    pub fn from_json(value: &Value) -> Result<Self, RowsError> {
        let obj = value.as_object().ok_or(RowsError::NotAnObject)?;

        let nodes = section(obj.get("nodes"), "nodes")?
            .iter()
            .enumerate()
            .map(|(index, row)| {
                let row = row_object(row, "nodes", index)?;
                Ok(NodeRow { node: field_text(row.get("node")) })
            })
            .collect::<Result<Vec<_>, RowsError>>()?;

        let edges = section(obj.get("edges"), "edges")?
            .iter()
            .enumerate()
            .map(|(index, row)| {
                let row = row_object(row, "edges", index)?;
                Ok(EdgeRow {
                    source: field_text(row.get("source")),
                    edge: field_text(row.get("edge")),
                    target: field_text(row.get("target")),
                })
            })
            .collect::<Result<Vec<_>, RowsError>>()?;

        Ok(RowSet { nodes, edges })
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.edges.is_empty()
    }
}

fn section<'a>(value: Option<&'a Value>, name: &'static str) -> Result<&'a [Value], RowsError> {
    match value {
        None | Some(Value::Null) => Ok(&[][..]),
        Some(Value::Array(rows)) => Ok(rows),
        Some(_) => Err(RowsError::NotAnArray(name)),
    }
}

fn row_object<'a>(
    row: &'a Value,
    section: &'static str,
    index: usize,
) -> Result<&'a serde_json::Map<String, Value>, RowsError> {
    row.as_object().ok_or(RowsError::RowNotAnObject { section, index })
}

/// Raw text of one row field. Drivers that already parsed the agtype hand us
/// an object; re-serializing it lets the decoder treat it like any untagged
/// body. A missing field becomes an empty string and fails to decode later.
fn field_text(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(s)) => s.clone(),
        None | Some(Value::Null) => String::new(),
        Some(other) => other.to_string(),
    }
}
