//! HTTP client for a running graph server.
//!
//! Used by the CLI `fetch` command and by [`GraphView`](crate::view::GraphView)
//! consumers. Non-2xx responses are load failures carrying the status and the
//! server's message; nothing is retried here.

use reqwest::blocking::Client;
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

use crate::view::GraphSource;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("request to {url} failed: {source}")]
    Network {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("server returned {status}: {message}")]
    Status { status: u16, message: String },
    #[error("response body is not valid JSON: {0}")]
    Body(String),
}

pub struct RemoteClient {
    pub base_url: String,
    graph: Option<String>,
    client: Client,
}

impl RemoteClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, TransportError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|source| TransportError::Network {
                url: base_url.to_string(),
                source,
            })?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            graph: None,
            client,
        })
    }

    /// Ask the server for a specific graph instead of its default one.
    pub fn with_graph(mut self, graph: &str) -> Self {
        self.graph = Some(graph.to_string());
        self
    }

    /// `GET /graph` — the raw batch JSON, not yet validated.
    pub fn fetch_graph(&self) -> Result<Value, TransportError> {
        let url = format!("{}/graph", self.base_url);
        let query: Vec<(&str, &str)> = self.graph.iter().map(|g| ("graph", g.as_str())).collect();
        self.get_json(&url, &query)
    }

    /// `GET /health`
    pub fn health(&self) -> Result<Value, TransportError> {
        self.get_json(&format!("{}/health", self.base_url), &[])
    }

    fn get_json(&self, url: &str, query: &[(&str, &str)]) -> Result<Value, TransportError> {
        tracing::debug!("[Remote] GET {}", url);
        let response = self.client.get(url).query(query).send().map_err(|source| TransportError::Network {
            url: url.to_string(),
            source,
        })?;

        let status = response.status();
        let body = response.text().map_err(|source| TransportError::Network {
            url: url.to_string(),
            source,
        })?;

        if !status.is_success() {
            return Err(TransportError::Status {
                status: status.as_u16(),
                message: error_message(&body, status.canonical_reason()),
            });
        }

        serde_json::from_str(&body).map_err(|e| TransportError::Body(e.to_string()))
    }
}

impl GraphSource for RemoteClient {
    fn fetch_graph(&self) -> Result<Value, TransportError> {
        RemoteClient::fetch_graph(self)
    }
}

/// Prefer the server's `{"error": "..."}` message, then the raw body, then
/// the canonical reason phrase.
fn error_message(body: &str, reason: Option<&str>) -> String {
    if let Ok(Value::Object(obj)) = serde_json::from_str::<Value>(body) {
        if let Some(Value::String(msg)) = obj.get("error") {
            return msg.clone();
        }
    }
    let trimmed = body.trim();
    if !trimmed.is_empty() {
        return crate::utils::preview(trimmed, 200);
    }
    reason.unwrap_or("request failed").to_string()
}
