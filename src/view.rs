//! The currently displayed graph.
//!
//! A [`GraphView`] owns at most one [`ElementBatch`]. Each reload fetches a
//! fresh batch, validates it and swaps it in whole. Unreadable elements are
//! dropped from the new batch; a transport or shape failure leaves the
//! previous batch on screen and the error is kept for display.

use serde_json::Value;
use std::collections::BTreeMap;
use thiserror::Error;

use crate::compound::{self, CompoundGroup};
use crate::elements::ElementBatch;
use crate::remote_client::TransportError;
use crate::validate::{self, GraphStats, ParsedBatch, SkippedElement, ValidationError};

/// Anything that can hand over a batch in wire form.
pub trait GraphSource {
    fn fetch_graph(&self) -> Result<Value, TransportError>;
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error("invalid graph batch: {0}")]
    Validation(#[from] ValidationError),
}

impl LoadError {
    /// Message suitable for showing next to the (unchanged) graph.
    pub fn user_message(&self) -> String {
        match self {
            LoadError::Transport(TransportError::Status { status, message }) => {
                format!("Failed to load graph ({}): {}", status, message)
            }
            other => format!("Failed to load graph: {}", other),
        }
    }
}

#[derive(Default)]
pub struct GraphView {
    current: Option<ElementBatch>,
    stats: GraphStats,
    skipped: Vec<SkippedElement>,
    loaded_at: Option<i64>,
    last_error: Option<String>,
}

impl GraphView {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetch, validate and replace the displayed batch.
    ///
    /// On failure the previous batch is left untouched.
    pub fn reload(&mut self, source: &dyn GraphSource) -> Result<GraphStats, LoadError> {
        match fetch_batch(source) {
            Ok(ParsedBatch { batch, stats, skipped }) => {
                tracing::info!(
                    total = stats.total,
                    nodes = stats.node_count,
                    edges = stats.edge_count,
                    skipped = skipped.len(),
                    "[View] Loaded graph"
                );
                self.current = Some(batch);
                self.stats = stats;
                self.skipped = skipped;
                self.loaded_at = Some(chrono::Utc::now().timestamp_millis());
                self.last_error = None;
                Ok(stats)
            }
            Err(e) => {
                let message = e.user_message();
                tracing::error!("[View] {}", message);
                self.last_error = Some(message);
                Err(e)
            }
        }
    }

    pub fn batch(&self) -> Option<&ElementBatch> {
        self.current.as_ref()
    }

    pub fn stats(&self) -> GraphStats {
        self.stats
    }

    /// Elements of the last successful load that could not be read.
    pub fn skipped(&self) -> &[SkippedElement] {
        &self.skipped
    }

    pub fn loaded_at(&self) -> Option<i64> {
        self.loaded_at
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Compound groups of the displayed batch. Only batches that passed
    /// [`reload`](Self::reload) are ever displayed, so no check is repeated.
    pub fn compound_groups(&self) -> BTreeMap<String, CompoundGroup> {
        self.current
            .as_ref()
            .map(|batch| compound::group(batch.edges()))
            .unwrap_or_default()
    }
}

fn fetch_batch(source: &dyn GraphSource) -> Result<ParsedBatch, LoadError> {
    let raw = source.fetch_graph()?;
    Ok(validate::parse_batch(&raw)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::cell::RefCell;

    struct Scripted {
        responses: RefCell<Vec<Result<Value, TransportError>>>,
    }

    impl Scripted {
        fn new(mut responses: Vec<Result<Value, TransportError>>) -> Self {
            responses.reverse();
            Self { responses: RefCell::new(responses) }
        }
    }

    impl GraphSource for Scripted {
        fn fetch_graph(&self) -> Result<Value, TransportError> {
            self.responses.borrow_mut().pop().expect("no scripted response left")
        }
    }

    fn good_batch() -> Value {
        json!({"elements": [
            {"data": {"id": "a", "label": "Claim"}},
            {"data": {"id": "b", "label": "Evidence"}},
            {"data": {"id": "e1", "source": "a", "target": "b", "type": "SUPPORTS", "composite_id": "g1"}},
            {"data": {"id": "e2", "source": "b", "target": "a", "type": "SUPPORTS", "composite_id": "g1"}},
            {"data": {"id": "e3", "source": "a", "target": "b", "type": "CITES"}}
        ]})
    }

    #[test]
    fn test_reload_replaces_batch() {
        let source = Scripted::new(vec![Ok(good_batch()), Ok(json!({"elements": []}))]);
        let mut view = GraphView::new();

        let stats = view.reload(&source).unwrap();
        assert_eq!(stats, GraphStats { total: 5, node_count: 2, edge_count: 3 });
        assert!(view.loaded_at().is_some());

        view.reload(&source).unwrap();
        assert!(view.batch().unwrap().is_empty());
        assert_eq!(view.stats().total, 0);
    }

    #[test]
    fn test_validation_failure_keeps_previous_batch() {
        let source = Scripted::new(vec![Ok(good_batch()), Ok(json!({"elements": "not-an-array"}))]);
        let mut view = GraphView::new();
        view.reload(&source).unwrap();

        let err = view.reload(&source).unwrap_err();
        assert!(matches!(err, LoadError::Validation(ValidationError::ElementsNotArray(_))));
        assert_eq!(view.batch().unwrap().len(), 5);
        assert_eq!(view.stats().total, 5);
        assert!(view.last_error().unwrap().contains("not a list"));
    }

    #[test]
    fn test_transport_failure_surfaces_status() {
        let source = Scripted::new(vec![
            Ok(good_batch()),
            Err(TransportError::Status { status: 502, message: "store unreachable".into() }),
            Ok(good_batch()),
        ]);
        let mut view = GraphView::new();
        view.reload(&source).unwrap();

        let err = view.reload(&source).unwrap_err();
        assert_eq!(err.user_message(), "Failed to load graph (502): store unreachable");
        assert_eq!(view.last_error(), Some("Failed to load graph (502): store unreachable"));
        assert_eq!(view.batch().unwrap().len(), 5);

        view.reload(&source).unwrap();
        assert_eq!(view.last_error(), None);
    }

    #[test]
    fn test_compound_groups_of_displayed_batch() {
        let source = Scripted::new(vec![Ok(good_batch())]);
        let mut view = GraphView::new();
        assert!(view.compound_groups().is_empty());

        view.reload(&source).unwrap();
        let groups = view.compound_groups();
        assert_eq!(groups.len(), 1);
        let members: Vec<_> = groups["g1"].members.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(members, vec!["e1", "e2"]);
    }

    #[test]
    fn test_corrupt_elements_do_not_block_the_rest() {
        let source = Scripted::new(vec![Ok(json!({"elements": [
            {"data": {"id": "a"}},
            {"data": {"id": "b"}},
            {"data": {"id": "e", "source": "a", "target": "b", "composite_id": "g1"}},
            42,
            {"data": {"id": "x", "source": null, "target": "b"}},
            {"data": {"label": "no id"}}
        ]}))]);
        let mut view = GraphView::new();

        let stats = view.reload(&source).unwrap();
        assert_eq!(stats, GraphStats { total: 3, node_count: 2, edge_count: 1 });
        assert_eq!(view.batch().unwrap().len(), 3);
        let skipped: Vec<_> = view.skipped().iter().map(|s| s.index).collect();
        assert_eq!(skipped, vec![3, 4, 5]);
        assert_eq!(view.compound_groups()["g1"].members.len(), 1);
        assert_eq!(view.last_error(), None);
    }
}
