//! Command handlers module.
//!
//! - `graph.rs`: ingestion, import/export, statistics and snapshot management
//! - `query.rs`: semantic, structured and JSON-file queries

mod graph;
mod query;

use kgraph::config::KgraphConfig;
use kgraph::services::JsonResultExtractor;
use kgraph::KnowledgeGraphService;
use serde::Serialize;
use std::error::Error;

pub use graph::{
    GraphsAction, cmd_clear, cmd_export, cmd_graphs, cmd_import, cmd_ingest, cmd_stats,
    cmd_visualize,
};
pub use query::{QueryAction, cmd_query};

/// The service type every command runs against.
pub type Service = KnowledgeGraphService<JsonResultExtractor>;

/// Opens the service for `config`.
///
/// # Errors
///
/// Returns an error if the data directory cannot be created.
pub fn open_service(config: &KgraphConfig) -> Result<Service, Box<dyn Error>> {
    Ok(KnowledgeGraphService::open(config, JsonResultExtractor)?)
}

/// Prints `value` as pretty JSON on stdout.
fn print_json<T: Serialize>(value: &T) -> Result<(), Box<dyn Error>> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
