//! Compound (bundled) edges.
//!
//! Several physical edges that share a `composite_id` are drawn as one
//! bundled edge. Keys are compared byte for byte: "G1" and "g1" are two
//! different bundles. Edges without a key are drawn on their own and never
//! appear in a group.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::elements::EdgeElement;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompoundGroup {
    #[serde(rename = "compositeId")]
    pub composite_id: String,
    pub members: Vec<EdgeElement>,
}

impl CompoundGroup {
    /// Distinct (source, target) pairs covered by the bundle, first-seen order.
    pub fn endpoints(&self) -> Vec<(&str, &str)> {
        let mut pairs: Vec<(&str, &str)> = Vec::new();
        for m in &self.members {
            let pair = (m.source.as_str(), m.target.as_str());
            if !pairs.contains(&pair) {
                pairs.push(pair);
            }
        }
        pairs
    }
}

/// Partition edges by composite id. Member order follows input order.
pub fn group<'a, I>(edges: I) -> BTreeMap<String, CompoundGroup>
where
    I: IntoIterator<Item = &'a EdgeElement>,
{
    let mut groups: BTreeMap<String, CompoundGroup> = BTreeMap::new();
    for edge in edges {
        let Some(key) = edge.composite_id.as_ref() else {
            continue;
        };
        groups
            .entry(key.clone())
            .or_insert_with(|| CompoundGroup {
                composite_id: key.clone(),
                members: Vec::new(),
            })
            .members
            .push(edge.clone());
    }
    groups
}
