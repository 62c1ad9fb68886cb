//! OpenGIN Explorer Command Line Interface
//!
//! Explore entity category trees, run raw graph API queries and decode saved
//! wire payloads.
//!
//! # Usage
//!
//! ```bash
//! # Category tree below an entity
//! OPENGIN_API_URL=https://graph.example.org/v1 opengin_explorer explore gov_01
//!
//! # Dataset table of a leaf
//! opengin_explorer attribute cat_42 "Budget 2024" --start 2024-01-01
//!
//! # Relations of an entity, then the cURL commands that fetched them
//! opengin_explorer relations gov_01 --name AS_CATEGORY --show-calls
//!
//! # Decode a saved response offline
//! cat response.json | opengin_explorer decode -
//! ```

use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use opengin_explorer::{
    decode, execute_query, normalize_table, AttributeTable, CancelSignal, CancellationHandle,
    Direction, ExploreResult, Explorer, ExplorerConfig, GraphNode, HttpTransport, QueryKind,
    QueryParams, TimeWindow,
};

#[derive(Parser)]
#[command(name = "opengin_explorer")]
#[command(version)]
#[command(about = "Explore the OpenGIN entity graph and decode its wire values")]
#[command(long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Emit JSON instead of text
    #[arg(long, global = true)]
    json: bool,

    /// Graph API base URL (overrides config and environment)
    #[arg(long, global = true)]
    base_url: Option<String>,

    /// YAML config file (default: $OPENGIN_CONFIG, then built-in defaults)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Print a cURL command for every API call once the command finishes
    #[arg(long, global = true)]
    show_calls: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Explore the category tree below an entity
    Explore {
        /// Root entity id
        entity_id: String,
    },

    /// Search entities by id, kind or name
    Search {
        #[arg(long)]
        id: Option<String>,

        /// Kind major, e.g. Organisation
        #[arg(long)]
        kind: Option<String>,

        /// Kind minor
        #[arg(long)]
        minor: Option<String>,

        #[arg(long)]
        name: Option<String>,
    },

    /// List relations of an entity
    Relations {
        entity_id: String,

        /// Relation name filter
        #[arg(long)]
        name: Option<String>,

        /// OUTGOING or INCOMING
        #[arg(long, value_parser = parse_direction)]
        direction: Option<Direction>,
    },

    /// Fetch a dataset value as a table
    Attribute {
        /// Entity holding the attribute (the dataset's parent)
        parent_id: String,

        /// Attribute (dataset) name
        name: String,

        #[arg(long)]
        start: Option<String>,

        #[arg(long)]
        end: Option<String>,
    },

    /// Decode a saved API response and print it as a table
    Decode {
        /// Input file, or - for stdin
        input: String,
    },
}

fn parse_direction(s: &str) -> Result<Direction, String> {
    match s.to_ascii_uppercase().as_str() {
        "OUTGOING" => Ok(Direction::Outgoing),
        "INCOMING" => Ok(Direction::Incoming),
        other => Err(format!("unknown direction '{other}'")),
    }
}

// =============================================================================
// MAIN
// =============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "opengin_explorer=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    let cli = Cli::parse();

    let command = match cli.command {
        Commands::Decode { input } => return cmd_decode(&input, cli.json),
        command => command,
    };

    let config = load_config(cli.config.as_deref(), cli.base_url.as_deref())?;
    if config.base_url.is_empty() {
        bail!("No graph API URL configured; set OPENGIN_API_URL or pass --base-url");
    }

    let transport = Arc::new(
        HttpTransport::from_config(&config).context("Failed to create HTTP client")?,
    );

    let (handle, signal) = CancellationHandle::new();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Interrupted, cancelling");
            handle.cancel();
        }
    });

    let call_log = transport.call_log();
    let outcome = run_command(command, transport, &config, &signal, cli.json).await;

    // printed even when the command failed
    if cli.show_calls {
        for curl in call_log.curl_commands() {
            eprintln!("{curl}");
        }
    }

    outcome
}

async fn run_command(
    command: Commands,
    transport: Arc<HttpTransport>,
    config: &ExplorerConfig,
    signal: &CancelSignal,
    json: bool,
) -> Result<()> {
    match command {
        Commands::Explore { entity_id } => {
            let explorer = Explorer::from_config(transport, config);
            let result = explorer.explore(&entity_id, signal).await;
            print_explore(&result, json)?;
            if let Some(error) = &result.error {
                bail!("Exploration failed: {error}");
            }
        }
        Commands::Search {
            id,
            kind,
            minor,
            name,
        } => {
            let params = QueryParams {
                entity_id: id,
                kind_major: kind,
                kind_minor: minor,
                entity_name: name,
                ..QueryParams::new(QueryKind::Search)
            };
            run_query(transport.as_ref(), &params, signal).await?;
        }
        Commands::Relations {
            entity_id,
            name,
            direction,
        } => {
            let params = QueryParams {
                relation_name: name,
                direction,
                ..QueryParams::for_entity(QueryKind::Relations, entity_id)
            };
            run_query(transport.as_ref(), &params, signal).await?;
        }
        Commands::Attribute {
            parent_id,
            name,
            start,
            end,
        } => {
            let explorer = Explorer::from_config(transport, config);
            let window = TimeWindow {
                start_time: start,
                end_time: end,
            };
            let table = explorer
                .api()
                .fetch_attribute_value(&parent_id, &name, Some(&window), signal)
                .await
                .with_context(|| format!("Failed to fetch attribute '{name}' of {parent_id}"))?;
            print_table(&table, json)?;
        }
        Commands::Decode { input } => cmd_decode(&input, json)?,
    }

    Ok(())
}

fn load_config(path: Option<&Path>, base_url: Option<&str>) -> Result<ExplorerConfig> {
    let mut config = match path {
        Some(path) => {
            let path = path.to_string_lossy();
            ExplorerConfig::from_file(&path)
                .with_context(|| format!("Failed to load config from {path}"))?
        }
        None => ExplorerConfig::from_env().context("Failed to load configuration")?,
    };
    if let Some(url) = base_url {
        config = config.with_base_url(url);
    }
    Ok(config)
}

// =============================================================================
// COMMANDS
// =============================================================================

async fn run_query(
    transport: &HttpTransport,
    params: &QueryParams,
    signal: &CancelSignal,
) -> Result<()> {
    let response = execute_query(transport, params, signal).await;
    if let Some(error) = &response.error {
        bail!("{} {} failed: {error}", response.method, response.endpoint);
    }
    println!("{}", serde_json::to_string_pretty(&decode(&response.data))?);
    Ok(())
}

fn cmd_decode(input: &str, json: bool) -> Result<()> {
    let content = if input == "-" {
        let mut buf = String::new();
        io::stdin()
            .read_to_string(&mut buf)
            .context("Failed to read stdin")?;
        buf
    } else {
        std::fs::read_to_string(input).with_context(|| format!("Failed to read {input}"))?
    };

    let payload: serde_json::Value =
        serde_json::from_str(&content).context("Input is not valid JSON")?;
    let table = normalize_table(&decode(&payload));
    print_table(&table, json)
}

// =============================================================================
// OUTPUT
// =============================================================================

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_explore(result: &ExploreResult, json: bool) -> Result<()> {
    if json {
        return print_json(result);
    }

    for category in &result.categories {
        print_node(category);
    }
    let stats = result.stats();
    println!(
        "\n{} nodes: {} categories, {} datasets",
        stats.total, stats.categories, stats.datasets
    );
    Ok(())
}

fn print_node(node: &GraphNode) {
    let indent = "  ".repeat(node.depth);
    let marker = if node.is_dataset { "■" } else { "▸" };
    let via = node
        .relation
        .as_ref()
        .map(|rel| format!(" via {}", rel.name))
        .unwrap_or_default();
    println!("{indent}{marker} {} [{}] ({}){via}", node.name, node.kind, node.id);
    for child in &node.children {
        print_node(child);
    }
}

fn print_table(table: &AttributeTable, json: bool) -> Result<()> {
    if json {
        return print_json(table);
    }
    if table.is_empty() {
        println!("(no tabular data)");
        return print_json(&table.raw);
    }

    println!("{}", table.columns.join("\t"));
    for row in &table.rows {
        let cells: Vec<String> = row
            .iter()
            .map(|cell| match cell {
                serde_json::Value::String(s) => s.clone(),
                serde_json::Value::Null => String::new(),
                other => other.to_string(),
            })
            .collect();
        println!("{}", cells.join("\t"));
    }
    Ok(())
}
