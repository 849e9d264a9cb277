//! Hyphae CLI - import query-result rows and inspect assembled graphs
//!
//! Usage: hyphae-cli [OPTIONS] <COMMAND>
//!
//! Supports JSON output for scripting.

use clap::{Parser, Subcommand};
use hyphae_lib::agtype;
use hyphae_lib::assemble::{assemble_rows, Assembly};
use hyphae_lib::compound;
use hyphae_lib::db::Database;
use hyphae_lib::normalize::{resolve_edge_type, resolve_id, resolve_node_label};
use hyphae_lib::remote_client::RemoteClient;
use hyphae_lib::rows::RowSet;
use hyphae_lib::validate::tagged_stats;
use hyphae_lib::view::GraphView;
use hyphae_lib::{logging, settings};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "hyphae-cli", version, about = "Property-graph decode-and-assemble toolkit")]
struct Cli {
    /// Row store path (default: HYPHAE_DB, settings, app data dir)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// Graph name (default: settings graph_name)
    #[arg(long, short, global = true)]
    graph: Option<String>,

    /// Machine-readable JSON output
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replace a graph's stored rows with a rows document ({"nodes": [...], "edges": [...]})
    Import {
        file: PathBuf,
    },
    /// Print the assembled element batch
    Assemble {
        #[arg(long)]
        pretty: bool,
    },
    /// Node/edge counts and skipped rows
    Stats,
    /// Compound edge groups
    Groups,
    /// List stored graphs
    Graphs,
    /// Decode a single tagged value and show its resolved identity
    Decode {
        raw: String,
    },
    /// Show settings, or change one with --set key=value
    Config {
        #[arg(long, value_name = "KEY=VALUE")]
        set: Option<String>,
    },
    /// Load a batch from a running server and summarize it
    Fetch {
        /// Server base URL (default: HYPHAE_SERVER_URL, settings)
        #[arg(long)]
        url: Option<String>,
    },
}

fn main() {
    settings::init(settings::app_data_dir());
    logging::init(&settings::log_filter());

    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), String> {
    let graph = cli.graph.clone().unwrap_or_else(settings::graph_name);

    match cli.command {
        Commands::Import { ref file } => {
            let content = std::fs::read_to_string(file)
                .map_err(|e| format!("Failed to read {}: {}", file.display(), e))?;
            let rows = RowSet::from_str(&content).map_err(|e| e.to_string())?;
            let db = open_db(&cli)?;
            db.replace_rows(&graph, &rows).map_err(|e| e.to_string())?;
            if cli.json {
                print_json(&serde_json::json!({
                    "graph": graph,
                    "nodeRows": rows.nodes.len(),
                    "edgeRows": rows.edges.len(),
                }))?;
            } else {
                println!("Imported '{}': {} node rows, {} edge rows", graph, rows.nodes.len(), rows.edges.len());
            }
        }
        Commands::Assemble { pretty } => {
            let assembly = load_assembly(&cli, &graph)?;
            let out = if pretty {
                serde_json::to_string_pretty(&assembly.batch)
            } else {
                serde_json::to_string(&assembly.batch)
            }
            .map_err(|e| e.to_string())?;
            println!("{}", out);
        }
        Commands::Stats => {
            let assembly = load_assembly(&cli, &graph)?;
            let stats = tagged_stats(&assembly.batch);
            if cli.json {
                print_json(&serde_json::json!({
                    "graph": graph,
                    "stats": stats,
                    "skipped": assembly.skipped,
                }))?;
            } else {
                println!("Graph '{}'", graph);
                println!("  elements: {}", stats.total);
                println!("  nodes:    {}", stats.node_count);
                println!("  edges:    {}", stats.edge_count);
                println!("  skipped:  {}", assembly.skipped.len());
                for s in &assembly.skipped {
                    match s.field {
                        Some(field) => println!("    {:?}[{}].{:?}: {}", s.section, s.index, field, s.reason),
                        None => println!("    {:?}[{}]: {}", s.section, s.index, s.reason),
                    }
                }
            }
        }
        Commands::Groups => {
            let assembly = load_assembly(&cli, &graph)?;
            let groups = compound::group(assembly.batch.edges());
            if cli.json {
                print_json(&groups)?;
            } else if groups.is_empty() {
                println!("No compound edges in '{}'", graph);
            } else {
                for group in groups.values() {
                    let pairs: Vec<String> = group.endpoints().iter()
                        .map(|(s, t)| format!("{} -> {}", s, t))
                        .collect();
                    println!("{} ({} edges): {}", group.composite_id, group.members.len(), pairs.join(", "));
                }
            }
        }
        Commands::Graphs => {
            let db = open_db(&cli)?;
            let graphs = db.graphs().map_err(|e| e.to_string())?;
            if cli.json {
                print_json(&graphs)?;
            } else {
                for g in graphs {
                    let when = chrono::DateTime::from_timestamp_millis(g.imported_at)
                        .map(|d| d.format("%Y-%m-%d %H:%M").to_string())
                        .unwrap_or_default();
                    println!("{:<24} {:>6} nodes {:>6} edges  imported {}", g.name, g.node_rows, g.edge_rows, when);
                }
            }
        }
        Commands::Decode { ref raw } => {
            let entity = agtype::decode(raw).map_err(|e| e.to_string())?;
            let label = match entity.kind {
                agtype::EntityKind::Vertex => resolve_node_label(&entity),
                agtype::EntityKind::Edge => resolve_edge_type(&entity),
            };
            let out = serde_json::json!({
                "kind": entity.kind,
                "id": resolve_id(&entity),
                "rawId": entity.raw_id.to_string(),
                "label": label,
                "properties": entity.properties,
            });
            if cli.json {
                print_json(&out)?;
            } else {
                println!("{} {} ({}), raw id {}", entity.kind.as_str(), out["id"], label, entity.raw_id);
            }
        }
        Commands::Config { ref set } => {
            if let Some(assignment) = set {
                let (key, value) = assignment.split_once('=')
                    .ok_or_else(|| format!("Expected KEY=VALUE, got '{}'", assignment))?;
                settings::set(key.trim(), value.trim())?;
            }
            print_json(&settings::current())?;
        }
        Commands::Fetch { ref url } => {
            let base = url.clone().unwrap_or_else(settings::server_url);
            let mut client = RemoteClient::new(&base, settings::request_timeout()).map_err(|e| e.to_string())?;
            if cli.graph.is_some() {
                client = client.with_graph(&graph);
            }

            let mut view = GraphView::new();
            let stats = view.reload(&client).map_err(|e| e.user_message())?;
            let groups = view.compound_groups();
            if cli.json {
                print_json(&serde_json::json!({
                    "stats": stats,
                    "compoundGroups": groups.len(),
                    "skipped": view.skipped(),
                }))?;
            } else {
                println!("Loaded {} elements from {} ({} nodes, {} edges, {} compound groups)",
                    stats.total, base, stats.node_count, stats.edge_count, groups.len());
                for s in view.skipped() {
                    println!("  skipped element {}: {}", s.index, s.reason);
                }
            }
        }
    }

    Ok(())
}

fn open_db(cli: &Cli) -> Result<Database, String> {
    let path = cli.db.clone().unwrap_or_else(settings::db_path);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|e| format!("Failed to create {}: {}", parent.display(), e))?;
    }
    Database::new(&path).map_err(|e| format!("Failed to open {}: {}", path.display(), e))
}

fn load_assembly(cli: &Cli, graph: &str) -> Result<Assembly, String> {
    let db = open_db(cli)?;
    let rows = db.load_rows(graph)
        .map_err(|e| e.to_string())?
        .ok_or_else(|| format!("Graph '{}' not found (import it first)", graph))?;
    Ok(assemble_rows(&rows))
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<(), String> {
    let out = serde_json::to_string_pretty(value).map_err(|e| e.to_string())?;
    println!("{}", out);
    Ok(())
}
