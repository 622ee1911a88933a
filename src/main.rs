//! Binary entry point for kgraph.
//!
//! This binary provides the CLI interface for the kgraph knowledge-graph engine.

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(missing_docs)]
// Allow print_stderr in main binary for CLI output
#![allow(clippy::print_stderr)]
#![allow(clippy::print_stdout)]
// Allow needless_pass_by_value for command functions
#![allow(clippy::needless_pass_by_value)]
// Allow multiple crate versions from transitive dependencies
#![allow(clippy::multiple_crate_versions)]

mod commands;

use clap::{Parser, Subcommand};
use commands::{GraphsAction, QueryAction};
use kgraph::config::KgraphConfig;
use kgraph::observability;
use std::path::PathBuf;
use std::process::ExitCode;

/// kgraph - An embedded knowledge-graph engine.
#[derive(Parser)]
#[command(name = "kgraph")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to configuration file.
    #[arg(short, long, global = true, env = "KGRAPH_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Available commands.
#[derive(Subcommand)]
enum Commands {
    /// Ingest extracted documents into the graph.
    Ingest {
        /// Files holding `{"entities": [...], "relations": [...]}` JSON.
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },

    /// Query the graph.
    Query {
        #[command(subcommand)]
        action: QueryAction,
    },

    /// Print the graph as JSON, or copy the saved graph to a file.
    Export {
        /// Destination file.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Replace the graph with a snapshot file.
    Import {
        /// Snapshot file to import.
        path: PathBuf,
    },

    /// Show graph, storage and query statistics.
    Stats,

    /// Remove every node and edge.
    Clear,

    /// Manage saved snapshots.
    Graphs {
        #[command(subcommand)]
        action: GraphsAction,
    },

    /// Render the graph.
    Visualize {
        /// Output format: dot or summary.
        #[arg(short, long, default_value = "dot")]
        format: String,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match KgraphConfig::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            return ExitCode::FAILURE;
        },
    };

    if let Err(e) = observability::init_logging(config.logging_config(cli.verbose)) {
        eprintln!("Failed to initialize logging: {e}");
        return ExitCode::FAILURE;
    }

    match run_command(cli.command, &config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        },
    }
}

/// Runs the selected command.
fn run_command(command: Commands, config: &KgraphConfig) -> Result<(), Box<dyn std::error::Error>> {
    let service = commands::open_service(config)?;

    match command {
        Commands::Ingest { paths } => commands::cmd_ingest(&service, &paths),
        Commands::Query { action } => commands::cmd_query(&service, action),
        Commands::Export { output } => commands::cmd_export(&service, output.as_deref()),
        Commands::Import { path } => commands::cmd_import(&service, &path),
        Commands::Stats => commands::cmd_stats(&service),
        Commands::Clear => commands::cmd_clear(&service),
        Commands::Graphs { action } => commands::cmd_graphs(&service, action),
        Commands::Visualize { format } => commands::cmd_visualize(&service, &format),
    }
}
