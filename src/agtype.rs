//! Decoder for tagged `agtype` values.
//!
//! The graph store hands back every vertex and edge as a string of the form
//! `<json-body>::vertex` or `<json-body>::edge`. This module strips the marker
//! and parses the body into a [`DecodedEntity`]. Failures are returned as
//! [`DecodeError`] values and are meant to be handled per row, never to abort
//! a whole batch.

use serde_json::{Map, Number, Value};
use std::fmt;
use thiserror::Error;

pub const VERTEX_SUFFIX: &str = "::vertex";
pub const EDGE_SUFFIX: &str = "::edge";

/// Which kind of graph entity a tagged value carried.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Vertex,
    Edge,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Vertex => "vertex",
            EntityKind::Edge => "edge",
        }
    }
}

/// Internal identity assigned by the store.
#[derive(Debug, Clone, PartialEq)]
pub enum RawId {
    Number(Number),
    Text(String),
}

impl fmt::Display for RawId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RawId::Number(n) => write!(f, "{}", n),
            RawId::Text(s) => f.write_str(s),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DecodedEntity {
    pub kind: EntityKind,
    pub raw_id: RawId,
    /// `None` when the body had no string label; `Some("")` is kept as-is.
    pub label: Option<String>,
    pub properties: Map<String, Value>,
    /// Store-level endpoints of an edge body. Informational only: assembled
    /// edges take their endpoints from the embedded vertices of the row.
    pub start_id: Option<RawId>,
    pub end_id: Option<RawId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeReason {
    MalformedJson,
    NotAnObject,
    MissingId,
    InvalidProperties,
}

impl DecodeReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            DecodeReason::MalformedJson => "malformed-json",
            DecodeReason::NotAnObject => "not-an-object",
            DecodeReason::MissingId => "missing-id",
            DecodeReason::InvalidProperties => "invalid-properties",
        }
    }
}

impl fmt::Display for DecodeReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
#[error("cannot decode tagged value ({reason}): {}", crate::utils::preview(.raw, 120))]
pub struct DecodeError {
    pub reason: DecodeReason,
    pub raw: String,
}

impl DecodeError {
    fn new(reason: DecodeReason, raw: &str) -> Self {
        DecodeError { reason, raw: raw.to_string() }
    }
}

/// Split a raw tagged value into its JSON body and the kind named by its
/// suffix, if any.
pub fn split_suffix(raw: &str) -> (&str, Option<EntityKind>) {
    let trimmed = raw.trim();
    if let Some(body) = trimmed.strip_suffix(VERTEX_SUFFIX) {
        (body, Some(EntityKind::Vertex))
    } else if let Some(body) = trimmed.strip_suffix(EDGE_SUFFIX) {
        (body, Some(EntityKind::Edge))
    } else {
        (trimmed, None)
    }
}

/// Decode one tagged value.
pub fn decode(raw: &str) -> Result<DecodedEntity, DecodeError> {
    let (body, tagged_kind) = split_suffix(raw);

    let value: Value = serde_json::from_str(body)
        .map_err(|_| DecodeError::new(DecodeReason::MalformedJson, raw))?;

    let Value::Object(mut obj) = value else {
        return Err(DecodeError::new(DecodeReason::NotAnObject, raw));
    };

    let raw_id = obj
        .get("id")
        .and_then(raw_id_of)
        .ok_or_else(|| DecodeError::new(DecodeReason::MissingId, raw))?;

    let properties = match obj.remove("properties") {
        None | Some(Value::Null) => Map::new(),
        Some(Value::Object(props)) => props,
        Some(_) => return Err(DecodeError::new(DecodeReason::InvalidProperties, raw)),
    };

    let label = match obj.get("label") {
        Some(Value::String(s)) => Some(s.clone()),
        _ => None,
    };

    let start_id = obj.get("start_id").and_then(raw_id_of);
    let end_id = obj.get("end_id").and_then(raw_id_of);

    // Untagged bodies are classified by shape: only edges carry both endpoints.
    let kind = tagged_kind.unwrap_or(if start_id.is_some() && end_id.is_some() {
        EntityKind::Edge
    } else {
        EntityKind::Vertex
    });

    Ok(DecodedEntity {
        kind,
        raw_id,
        label,
        properties,
        start_id,
        end_id,
    })
}

fn raw_id_of(value: &Value) -> Option<RawId> {
    match value {
        Value::Number(n) => Some(RawId::Number(n.clone())),
        Value::String(s) => Some(RawId::Text(s.clone())),
        _ => None,
    }
}
