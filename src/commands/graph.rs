//! Graph CLI commands.
//!
//! - `ingest`: process extracted documents
//! - `export` / `import`: move snapshots in and out
//! - `stats`, `clear`, `visualize`
//! - `graphs list|delete`: manage saved snapshots

use super::{Service, print_json};
use kgraph::services::VisualFormat;
use std::error::Error;
use std::path::{Path, PathBuf};

/// Snapshot management subcommands.
#[derive(clap::Subcommand)]
pub enum GraphsAction {
    /// List saved snapshot identifiers.
    List,

    /// Delete a saved snapshot.
    Delete {
        /// Snapshot identifier.
        id: String,
    },
}

/// Ingests each document, reporting failures without stopping.
///
/// # Errors
///
/// Returns an error if no document could be ingested.
pub fn cmd_ingest(service: &Service, paths: &[PathBuf]) -> Result<(), Box<dyn Error>> {
    let mut processed = 0usize;
    for path in paths {
        match service.process_document(path) {
            Ok(result) => {
                processed += 1;
                println!(
                    "{}: {} entities, {} relations",
                    path.display(),
                    result.entities.len(),
                    result.relations.len()
                );
            },
            Err(e) => eprintln!("{}: {e}", path.display()),
        }
    }

    println!("Ingested {processed} of {} documents", paths.len());
    if processed == 0 {
        return Err("no documents were ingested".into());
    }
    Ok(())
}

/// Prints the graph, or copies the saved graph to `output`.
///
/// # Errors
///
/// Returns an error if the graph has never been saved and `output` is given.
pub fn cmd_export(service: &Service, output: Option<&Path>) -> Result<(), Box<dyn Error>> {
    let snapshot = service.export_graph(output)?;
    match output {
        Some(path) => println!(
            "Exported {} nodes and {} edges to {}",
            snapshot.nodes.len(),
            snapshot.edges.len(),
            path.display()
        ),
        None => print_json(&snapshot)?,
    }
    Ok(())
}

/// Imports a snapshot file as the current graph.
///
/// # Errors
///
/// Returns an error if the file is invalid.
pub fn cmd_import(service: &Service, path: &Path) -> Result<(), Box<dyn Error>> {
    service.import_graph(path)?;
    let stats = service.store().stats()?;
    println!(
        "Imported {} nodes and {} edges",
        stats.node_count, stats.edge_count
    );
    Ok(())
}

/// Prints combined statistics as JSON.
///
/// # Errors
///
/// Returns an error if statistics cannot be collected.
pub fn cmd_stats(service: &Service) -> Result<(), Box<dyn Error>> {
    print_json(&service.stats()?)
}

/// Clears the graph.
///
/// # Errors
///
/// Returns an error if the empty graph cannot be saved.
pub fn cmd_clear(service: &Service) -> Result<(), Box<dyn Error>> {
    service.clear()?;
    println!("Knowledge graph cleared");
    Ok(())
}

/// Runs a snapshot management subcommand.
///
/// # Errors
///
/// Returns an error if the snapshot does not exist or storage fails.
pub fn cmd_graphs(service: &Service, action: GraphsAction) -> Result<(), Box<dyn Error>> {
    match action {
        GraphsAction::List => {
            let graphs = service.list_graphs()?;
            if graphs.is_empty() {
                println!("No saved graphs");
            }
            for id in graphs {
                println!("{id}");
            }
        },
        GraphsAction::Delete { id } => {
            service.delete_graph(&id)?;
            println!("Deleted graph '{id}'");
        },
    }
    Ok(())
}

/// Prints the graph in `format`.
///
/// # Errors
///
/// Returns an error for an unknown format.
pub fn cmd_visualize(service: &Service, format: &str) -> Result<(), Box<dyn Error>> {
    let format: VisualFormat = format.parse()?;
    println!("{}", service.visualize(format)?);
    Ok(())
}
