//! graphctl - Command-line driver for the graph-core DAG scheduler.
//!
//! Loads a campaign description (vertices, shell commands, edges), runs it
//! to completion through a `Scheduler`, and reports the outcome.

mod graph_file;
mod output;
mod shell_task;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tokio::sync::oneshot;

use graph_file::GraphFile;
use graph_core::dag::SharedResults;
use output::OutputFormat;

#[derive(Parser)]
#[command(
    name = "graphctl",
    author = "Aezi <aezi.zhu@icloud.com>",
    version = "0.1.0",
    about = "Run a DAG of shell-command vertices through graph-core's scheduler",
    propagate_version = true
)]
pub struct Cli {
    /// Output format
    #[arg(short, long, global = true, default_value = "table")]
    output: OutputFormat,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a campaign described by a JSON or YAML graph file to completion
    Run(RunArgs),
    /// Parse a graph file and report its topological order without running anything
    Validate(ValidateArgs),
}

#[derive(clap::Args)]
struct RunArgs {
    /// Path to a .json, .yaml, or .yml graph description
    file: PathBuf,
}

#[derive(clap::Args)]
struct ValidateArgs {
    /// Path to a .json, .yaml, or .yml graph description
    file: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.no_color {
        colored::control::set_override(false);
    }

    let result = match cli.command {
        Commands::Run(args) => run(args, cli.output).await,
        Commands::Validate(args) => validate(args, cli.output).await,
    };

    if let Err(e) = result {
        output::print_error(&format!("{e:#}"));
        std::process::exit(1);
    }

    Ok(())
}

async fn run(args: RunArgs, format: OutputFormat) -> Result<()> {
    let graph_file = GraphFile::load(&args.file)?;
    let name = graph_file.name.clone();

    let (tx, rx) = oneshot::channel();
    let tx = std::sync::Mutex::new(Some(tx));
    let callback: graph_core::dag::scheduler::TerminalCallback = Box::new(move |err, results| {
        if let Some(tx) = tx.lock().unwrap().take() {
            let _ = tx.send((err, results));
        }
    });

    let scheduler = graph_file.into_scheduler(callback).await?;
    output::print_info(&format!("starting campaign {name}"));

    let results: SharedResults = Arc::new(dashmap::DashMap::new());
    scheduler.start(results).await?;

    let (err, results) = rx.await.expect("terminal callback always fires exactly once");

    output::print_header("results");
    let rows: Vec<(String, String)> = results
        .iter()
        .map(|entry| (entry.key().clone(), entry.value().to_string()))
        .collect();
    for (id, value) in &rows {
        output::print_detail(id, value);
    }

    let state = scheduler.overall_state().await;
    if matches!(format, OutputFormat::Json | OutputFormat::Yaml) {
        output::print_item(&format!("{state}"), format);
    }

    match err {
        None => {
            output::print_success(&format!("campaign {name} succeeded"));
            Ok(())
        }
        Some(e) => {
            output::print_error(&format!("campaign {name} failed: {e}"));
            Err(anyhow::anyhow!(e))
        }
    }
}

async fn validate(args: ValidateArgs, format: OutputFormat) -> Result<()> {
    let graph_file = GraphFile::load(&args.file)?;
    let mut graph = graph_core::dag::Graph::new();
    for vertex in &graph_file.vertices {
        graph.add_vertex(vertex.id.clone(), serde_json::Value::Null)?;
    }
    for edge in &graph_file.edges {
        graph.add_edge(&edge.from, &edge.to)?;
    }

    let order = graph.topological_sort();
    if order.len() != graph.vertex_count() {
        output::print_error("graph contains a cycle; no valid topological order exists");
        std::process::exit(1);
    }

    output::print_success(&format!("{} is acyclic", graph_file.name));
    output::print_item(&order, format);
    Ok(())
}
