//! Hyphae graph server — serves assembled element batches over HTTP.
//!
//! Thin axum server over the row store. Every request decodes the stored
//! rows afresh; nothing assembled is cached between requests.
//!
//! Usage:
//!   HYPHAE_DB=/path/to/rows.db HYPHAE_BIND=0.0.0.0:3741 hyphae-server
//!
//! Or with args:
//!   hyphae-server --db /path/to/rows.db --bind 0.0.0.0:3741 --graph claims

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use hyphae_lib::assemble::{assemble_rows, Assembly, SkippedRow};
use hyphae_lib::compound::{self, CompoundGroup};
use hyphae_lib::db::{Database, GraphInfo};
use hyphae_lib::elements::ElementBatch;
use hyphae_lib::validate::{tagged_stats, GraphStats};
use hyphae_lib::{logging, settings};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tower_http::cors::CorsLayer;

// ============================================================================
// AppState
// ============================================================================

#[derive(Clone)]
struct AppState {
    db: Arc<Database>,
    default_graph: String,
    start_time: Instant,
}

// ============================================================================
// Error type
// ============================================================================

struct AppError(StatusCode, String);

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        (self.0, Json(serde_json::json!({"error": self.1}))).into_response()
    }
}

impl From<rusqlite::Error> for AppError {
    fn from(e: rusqlite::Error) -> Self {
        AppError(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
    }
}

fn not_found(msg: impl Into<String>) -> AppError {
    AppError(StatusCode::NOT_FOUND, msg.into())
}

// ============================================================================
// Request / Response types
// ============================================================================

#[derive(Deserialize)]
struct GraphQuery {
    graph: Option<String>,
}

#[derive(Serialize)]
struct CompoundsResponse {
    graph: String,
    groups: BTreeMap<String, CompoundGroup>,
}

#[derive(Serialize)]
struct StatsResponse {
    graph: String,
    stats: GraphStats,
    skipped: Vec<SkippedRow>,
}

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
    graphs: usize,
    uptime_secs: u64,
}

// ============================================================================
// Helpers
// ============================================================================

fn graph_name(state: &AppState, query: GraphQuery) -> String {
    query.graph.filter(|g| !g.is_empty()).unwrap_or_else(|| state.default_graph.clone())
}

/// Load and assemble one graph. Decode failures are per row and only logged.
fn load_assembly(state: &AppState, graph: &str) -> Result<Assembly, AppError> {
    let rows = state.db.load_rows(graph)?
        .ok_or_else(|| not_found(format!("Graph '{}' not found", graph)))?;
    let assembly = assemble_rows(&rows);
    if !assembly.is_clean() {
        tracing::warn!(graph, skipped = assembly.skipped.len(), "[Server] Served graph with skipped rows");
    }
    Ok(assembly)
}

// ============================================================================
// Handlers
// ============================================================================

// GET /graph
async fn graph_handler(
    State(state): State<AppState>,
    Query(query): Query<GraphQuery>,
) -> Result<Json<ElementBatch>, AppError> {
    let graph = graph_name(&state, query);
    let assembly = load_assembly(&state, &graph)?;
    tracing::info!(graph = %graph, elements = assembly.batch.len(), "[GET /graph]");
    Ok(Json(assembly.batch))
}

// GET /graph/compounds
async fn compounds_handler(
    State(state): State<AppState>,
    Query(query): Query<GraphQuery>,
) -> Result<Json<CompoundsResponse>, AppError> {
    let graph = graph_name(&state, query);
    let assembly = load_assembly(&state, &graph)?;
    let groups = compound::group(assembly.batch.edges());
    Ok(Json(CompoundsResponse { graph, groups }))
}

// GET /graph/stats
async fn stats_handler(
    State(state): State<AppState>,
    Query(query): Query<GraphQuery>,
) -> Result<Json<StatsResponse>, AppError> {
    let graph = graph_name(&state, query);
    let assembly = load_assembly(&state, &graph)?;
    Ok(Json(StatsResponse {
        graph,
        stats: tagged_stats(&assembly.batch),
        skipped: assembly.skipped,
    }))
}

// GET /graphs
async fn graphs_handler(State(state): State<AppState>) -> Result<Json<Vec<GraphInfo>>, AppError> {
    Ok(Json(state.db.graphs()?))
}

// GET /health
async fn health_handler(State(state): State<AppState>) -> Result<Json<HealthResponse>, AppError> {
    let graphs = state.db.graphs()?.len();
    Ok(Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        graphs,
        uptime_secs: state.start_time.elapsed().as_secs(),
    }))
}

// ============================================================================
// Main
// ============================================================================

#[tokio::main]
async fn main() {
    settings::init(settings::app_data_dir());
    logging::init(&settings::log_filter());

    // Parse simple args (no clap to keep binary small)
    let args: Vec<String> = std::env::args().collect();
    let mut db_arg: Option<&str> = None;
    let mut bind_arg: Option<&str> = None;
    let mut graph_arg: Option<&str> = None;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--db" if i + 1 < args.len() => {
                db_arg = Some(&args[i + 1]);
                i += 2;
            }
            "--bind" if i + 1 < args.len() => {
                bind_arg = Some(&args[i + 1]);
                i += 2;
            }
            "--graph" if i + 1 < args.len() => {
                graph_arg = Some(&args[i + 1]);
                i += 2;
            }
            "--help" | "-h" => {
                println!("hyphae-server — serves assembled graph batches");
                println!();
                println!("Usage: hyphae-server [--db PATH] [--bind ADDR:PORT] [--graph NAME]");
                println!();
                println!("Environment variables:");
                println!("  HYPHAE_DB    Row store path");
                println!("  HYPHAE_BIND  Bind address (default: 127.0.0.1:3741)");
                println!("  HYPHAE_LOG   Log filter (default: info)");
                std::process::exit(0);
            }
            _ => { i += 1; }
        }
    }

    let bind_addr = bind_arg.map(|s| s.to_string()).unwrap_or_else(settings::bind_addr);
    let db_path = db_arg.map(PathBuf::from).unwrap_or_else(settings::db_path);
    let default_graph = graph_arg.map(|s| s.to_string()).unwrap_or_else(settings::graph_name);

    tracing::info!("[Server] Database: {}", db_path.display());
    tracing::info!("[Server] Default graph: {}", default_graph);

    if let Some(parent) = db_path.parent() {
        if let Err(e) = std::fs::create_dir_all(parent) {
            tracing::error!("[Server] Failed to create database directory {}: {}", parent.display(), e);
        }
    }

    let db = match Database::new(&db_path) {
        Ok(db) => Arc::new(db),
        Err(e) => {
            tracing::error!("[Server] Failed to open database: {}", e);
            std::process::exit(1);
        }
    };

    let state = AppState {
        db,
        default_graph,
        start_time: Instant::now(),
    };

    let app = Router::new()
        .route("/graph", get(graph_handler))
        .route("/graph/compounds", get(compounds_handler))
        .route("/graph/stats", get(stats_handler))
        .route("/graphs", get(graphs_handler))
        .route("/health", get(health_handler))
        .layer(CorsLayer::permissive())
        .with_state(state);

    let listener = match tokio::net::TcpListener::bind(&bind_addr).await {
        Ok(l) => l,
        Err(e) => {
            tracing::error!("[Server] Failed to bind to {}: {}", bind_addr, e);
            std::process::exit(1);
        }
    };

    tracing::info!("[Server] Listening on {}", bind_addr);
    if let Err(e) = axum::serve(listener, app).await {
        tracing::error!("[Server] Server error: {}", e);
        std::process::exit(1);
    }
}
