//! Render-ready visualization elements.
//!
//! On the wire every element is `{ "data": { ... } }`. Structural fields sit
//! next to the element's attributes in `data`; an attribute whose key collides
//! with a structural field of that element is not emitted.

use serde::de::{self, Deserializer};
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::normalize::{scalar_string, ElementId, EMPTY_EDGE_TYPE, UNKNOWN_NODE_LABEL};

const NODE_FIELDS: [&str; 2] = ["id", "label"];
const EDGE_FIELDS: [&str; 4] = ["id", "source", "target", "type"];

/// Property key carrying the compound-edge grouping key.
pub const COMPOSITE_ID_KEY: &str = "composite_id";

#[derive(Debug, Clone, PartialEq)]
pub struct NodeElement {
    pub id: ElementId,
    pub label: String,
    pub attributes: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EdgeElement {
    pub id: ElementId,
    pub source: ElementId,
    pub target: ElementId,
    pub edge_type: String,
    pub composite_id: Option<String>,
    pub attributes: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum VisualElement {
    Node(NodeElement),
    Edge(EdgeElement),
}

impl VisualElement {
    pub fn id(&self) -> &str {
        match self {
            VisualElement::Node(n) => &n.id,
            VisualElement::Edge(e) => &e.id,
        }
    }

    pub fn is_edge(&self) -> bool {
        matches!(self, VisualElement::Edge(_))
    }

    pub fn as_edge(&self) -> Option<&EdgeElement> {
        match self {
            VisualElement::Edge(e) => Some(e),
            VisualElement::Node(_) => None,
        }
    }

    /// Rebuild an element from its `data` object. Elements with both a
    /// `source` and a `target` key are edges; everything else is a node.
    pub fn from_data(mut data: Map<String, Value>) -> Result<Self, String> {
        let id = take_string(&mut data, "id").ok_or("element data has no id")?;

        if data.contains_key("source") && data.contains_key("target") {
            let source = take_string(&mut data, "source")
                .ok_or_else(|| format!("edge '{}' has a null source", id))?;
            let target = take_string(&mut data, "target")
                .ok_or_else(|| format!("edge '{}' has a null target", id))?;
            let edge_type = take_string(&mut data, "type").unwrap_or_else(|| EMPTY_EDGE_TYPE.to_string());
            let composite_id = composite_id_of(&data);
            Ok(VisualElement::Edge(EdgeElement {
                id,
                source,
                target,
                edge_type,
                composite_id,
                attributes: data,
            }))
        } else {
            let label = take_string(&mut data, "label")
                .filter(|l| !l.is_empty())
                .unwrap_or_else(|| UNKNOWN_NODE_LABEL.to_string());
            Ok(VisualElement::Node(NodeElement { id, label, attributes: data }))
        }
    }
}

/// Grouping key of an edge: `properties.composite_id`, with `null` and `""`
/// treated as absent. No other normalization is applied.
pub fn composite_id_of(properties: &Map<String, Value>) -> Option<String> {
    properties
        .get(COMPOSITE_ID_KEY)
        .and_then(scalar_string)
        .filter(|s| !s.is_empty())
}

fn take_string(data: &mut Map<String, Value>, key: &str) -> Option<String> {
    data.remove(key).as_ref().and_then(scalar_string)
}

fn serialize_data<S: Serializer>(
    serializer: S,
    structural: &[(&str, &str)],
    reserved: &[&str],
    attributes: &Map<String, Value>,
) -> Result<S::Ok, S::Error> {
    struct Data<'a> {
        structural: &'a [(&'a str, &'a str)],
        reserved: &'a [&'a str],
        attributes: &'a Map<String, Value>,
    }

    impl Serialize for Data<'_> {
        fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
            let mut map = serializer.serialize_map(None)?;
            for (key, value) in self.structural {
                map.serialize_entry(key, value)?;
            }
            for (key, value) in self.attributes {
                if !self.reserved.contains(&key.as_str()) {
                    map.serialize_entry(key, value)?;
                }
            }
            map.end()
        }
    }

    let mut outer = serializer.serialize_map(Some(1))?;
    outer.serialize_entry("data", &Data { structural, reserved, attributes })?;
    outer.end()
}

impl Serialize for NodeElement {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serialize_data(
            serializer,
            &[("id", self.id.as_str()), ("label", self.label.as_str())],
            &NODE_FIELDS,
            &self.attributes,
        )
    }
}

impl Serialize for EdgeElement {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serialize_data(
            serializer,
            &[
                ("id", self.id.as_str()),
                ("source", self.source.as_str()),
                ("target", self.target.as_str()),
                ("type", self.edge_type.as_str()),
            ],
            &EDGE_FIELDS,
            &self.attributes,
        )
    }
}

impl Serialize for VisualElement {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            VisualElement::Node(n) => n.serialize(serializer),
            VisualElement::Edge(e) => e.serialize(serializer),
        }
    }
}

impl<'de> Deserialize<'de> for VisualElement {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        struct Envelope {
            data: Map<String, Value>,
        }

        let envelope = Envelope::deserialize(deserializer)?;
        VisualElement::from_data(envelope.data).map_err(de::Error::custom)
    }
}

impl<'de> Deserialize<'de> for EdgeElement {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match VisualElement::deserialize(deserializer)? {
            VisualElement::Edge(e) => Ok(e),
            VisualElement::Node(n) => Err(de::Error::custom(format!(
                "element '{}' has no source/target",
                n.id
            ))),
        }
    }
}

/// One complete set of elements produced by a single graph load.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ElementBatch {
    pub elements: Vec<VisualElement>,
}

impl ElementBatch {
    pub fn nodes(&self) -> impl Iterator<Item = &NodeElement> {
        self.elements.iter().filter_map(|el| match el {
            VisualElement::Node(n) => Some(n),
            VisualElement::Edge(_) => None,
        })
    }

    pub fn edges(&self) -> impl Iterator<Item = &EdgeElement> {
        self.elements.iter().filter_map(VisualElement::as_edge)
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }
}
