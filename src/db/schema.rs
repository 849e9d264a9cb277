use rusqlite::{params, Connection, OptionalExtension, Result};
use serde::Serialize;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use crate::rows::{EdgeRow, NodeRow, RowSet};

/// Snapshot store for raw query-result rows, keyed by graph name.
///
/// Rows are stored exactly as the query layer returned them; decoding
/// happens at read time, on every load.
pub struct Database {
    conn: Mutex<Connection>,
    path: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct GraphInfo {
    pub name: String,
    #[serde(rename = "importedAt")]
    pub imported_at: i64,
    #[serde(rename = "nodeRows")]
    pub node_rows: usize,
    #[serde(rename = "edgeRows")]
    pub edge_rows: usize,
}

impl Database {
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path_str = path.as_ref().to_string_lossy().to_string();
        let conn = Connection::open(&path)?;
        let db = Database { conn: Mutex::new(conn), path: path_str };
        db.init()?;
        Ok(db)
    }

    pub fn get_path(&self) -> String {
        self.path.clone()
    }

    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Database { conn: Mutex::new(conn), path: ":memory:".to_string() };
        db.init()?;
        Ok(db)
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        // A panic while holding the lock leaves SQLite itself consistent.
        self.conn.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn init(&self) -> Result<()> {
        let conn = self.conn();

        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS graphs (
                name TEXT PRIMARY KEY,
                imported_at INTEGER NOT NULL
            );

            CREATE TABLE IF NOT EXISTS node_rows (
                graph TEXT NOT NULL REFERENCES graphs(name) ON DELETE CASCADE,
                seq INTEGER NOT NULL,      -- Position in the original query result
                node TEXT NOT NULL,        -- Raw tagged value, e.g. '{...}::vertex'
                PRIMARY KEY (graph, seq)
            );

            CREATE TABLE IF NOT EXISTS edge_rows (
                graph TEXT NOT NULL REFERENCES graphs(name) ON DELETE CASCADE,
                seq INTEGER NOT NULL,
                source TEXT NOT NULL,
                edge TEXT NOT NULL,
                target TEXT NOT NULL,
                PRIMARY KEY (graph, seq)
            );

            PRAGMA foreign_keys = ON;
            "
        )?;

        Ok(())
    }

    /// Replace every stored row of `graph` with `rows`, in one transaction.
    pub fn replace_rows(&self, graph: &str, rows: &RowSet) -> Result<()> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;
        let now = chrono::Utc::now().timestamp_millis();

        tx.execute("DELETE FROM node_rows WHERE graph = ?1", params![graph])?;
        tx.execute("DELETE FROM edge_rows WHERE graph = ?1", params![graph])?;
        tx.execute(
            "INSERT INTO graphs (name, imported_at) VALUES (?1, ?2)
             ON CONFLICT(name) DO UPDATE SET imported_at = excluded.imported_at",
            params![graph, now],
        )?;

        {
            let mut stmt = tx.prepare("INSERT INTO node_rows (graph, seq, node) VALUES (?1, ?2, ?3)")?;
            for (seq, row) in rows.nodes.iter().enumerate() {
                stmt.execute(params![graph, seq as i64, row.node])?;
            }

            let mut stmt = tx.prepare(
                "INSERT INTO edge_rows (graph, seq, source, edge, target) VALUES (?1, ?2, ?3, ?4, ?5)"
            )?;
            for (seq, row) in rows.edges.iter().enumerate() {
                stmt.execute(params![graph, seq as i64, row.source, row.edge, row.target])?;
            }
        }

        tx.commit()?;
        tracing::info!(
            graph,
            nodes = rows.nodes.len(),
            edges = rows.edges.len(),
            "[Store] Replaced rows"
        );
        Ok(())
    }

    /// All rows of `graph` in original order, or `None` if it was never imported.
    pub fn load_rows(&self, graph: &str) -> Result<Option<RowSet>> {
        let conn = self.conn();

        let known: Option<String> = conn
            .query_row("SELECT name FROM graphs WHERE name = ?1", params![graph], |row| row.get(0))
            .optional()?;
        if known.is_none() {
            return Ok(None);
        }

        let mut stmt = conn.prepare("SELECT node FROM node_rows WHERE graph = ?1 ORDER BY seq")?;
        let nodes = stmt
            .query_map(params![graph], |row| Ok(NodeRow { node: row.get(0)? }))?
            .collect::<Result<Vec<_>>>()?;

        let mut stmt = conn.prepare(
            "SELECT source, edge, target FROM edge_rows WHERE graph = ?1 ORDER BY seq"
        )?;
        let edges = stmt
            .query_map(params![graph], |row| {
                Ok(EdgeRow {
                    source: row.get(0)?,
                    edge: row.get(1)?,
                    target: row.get(2)?,
                })
            })?
            .collect::<Result<Vec<_>>>()?;

        Ok(Some(RowSet { nodes, edges }))
    }

    pub fn graphs(&self) -> Result<Vec<GraphInfo>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT g.name, g.imported_at,
                    (SELECT COUNT(*) FROM node_rows n WHERE n.graph = g.name),
                    (SELECT COUNT(*) FROM edge_rows e WHERE e.graph = g.name)
             FROM graphs g ORDER BY g.name"
        )?;

        let graphs = stmt.query_map([], |row| {
            Ok(GraphInfo {
                name: row.get(0)?,
                imported_at: row.get(1)?,
                node_rows: row.get::<_, i64>(2)? as usize,
                edge_rows: row.get::<_, i64>(3)? as usize,
            })
        })?.collect::<Result<Vec<_>>>()?;

        Ok(graphs)
    }

    /// Remove a graph and its rows, in one transaction. Returns whether it existed.
    pub fn delete_graph(&self, graph: &str) -> Result<bool> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;
        tx.execute("DELETE FROM node_rows WHERE graph = ?1", params![graph])?;
        tx.execute("DELETE FROM edge_rows WHERE graph = ?1", params![graph])?;
        let removed = tx.execute("DELETE FROM graphs WHERE name = ?1", params![graph])?;
        tx.commit()?;
        Ok(removed > 0)
    }
}
