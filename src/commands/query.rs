//! Query CLI commands.

use super::{Service, print_json};
use kgraph::models::{
    EdgePattern, GraphPatterns, NodePattern, PropertyValue, QueryContext, SemanticOptions,
    SemanticQuery, StructuredQuery,
};
use std::error::Error;
use std::path::PathBuf;

/// Query subcommands.
#[derive(clap::Subcommand)]
pub enum QueryAction {
    /// Lexical search with neighbourhood expansion.
    Semantic {
        /// Space-separated search terms.
        text: String,

        /// Minimum relevance for a node to seed a match.
        #[arg(short, long)]
        threshold: Option<f64>,

        /// Maximum hops explored from each seed.
        #[arg(short = 'd', long)]
        max_distance: Option<usize>,

        /// Maximum number of matches.
        #[arg(short, long)]
        limit: Option<usize>,

        /// Drop matches scoring below this value.
        #[arg(short, long)]
        min_confidence: Option<f64>,
    },

    /// Match nodes by id, label and properties.
    Structured {
        /// Node id.
        #[arg(long)]
        id: Option<String>,

        /// Node label.
        #[arg(short, long)]
        label: Option<String>,

        /// Required property as `key=value`; repeatable.
        #[arg(short, long = "prop")]
        props: Vec<String>,

        /// Only collect edges with this label.
        #[arg(short, long)]
        edge_label: Option<String>,

        /// Maximum number of matches.
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Run a query stored as JSON with a `type` field.
    File {
        /// Query file.
        path: PathBuf,
    },
}

/// Executes a query subcommand and prints the result as JSON.
///
/// # Errors
///
/// Returns an error if the arguments are invalid or the query fails.
pub fn cmd_query(service: &Service, action: QueryAction) -> Result<(), Box<dyn Error>> {
    let result = match action {
        QueryAction::Semantic {
            text,
            threshold,
            max_distance,
            limit,
            min_confidence,
        } => {
            let mut options = SemanticOptions::default();
            if let Some(threshold) = threshold {
                options = options.with_threshold(threshold);
            }
            if let Some(distance) = max_distance {
                options = options.with_max_distance(distance);
            }
            let mut query = SemanticQuery::new(text).with_options(options);
            if let Some(context) = build_context(limit, min_confidence) {
                query = query.with_context(context);
            }
            service.query(&query.into())?
        },
        QueryAction::Structured {
            id,
            label,
            props,
            edge_label,
            limit,
        } => {
            let mut node = NodePattern {
                id: id.map(Into::into),
                label,
                properties: None,
            };
            for prop in &props {
                let (key, value) = parse_property(prop)?;
                node = node.with_property(key, value);
            }
            let mut patterns = GraphPatterns::nodes([node]);
            if let Some(edge_label) = edge_label {
                patterns = patterns.with_edges([EdgePattern::with_label(edge_label)]);
            }
            let mut query = StructuredQuery::new(patterns);
            query.context = build_context(limit, None);
            service.query(&query.into())?
        },
        QueryAction::File { path } => {
            let contents = std::fs::read_to_string(&path)?;
            service.query_json(serde_json::from_str(&contents)?)?
        },
    };

    print_json(&result)
}

fn build_context(limit: Option<usize>, min_confidence: Option<f64>) -> Option<QueryContext> {
    if limit.is_none() && min_confidence.is_none() {
        return None;
    }
    Some(QueryContext {
        max_results: limit,
        min_confidence,
        ..QueryContext::default()
    })
}

/// Parses `key=value`; the value is read as JSON when it parses as a scalar,
/// otherwise as a plain string.
fn parse_property(raw: &str) -> Result<(String, PropertyValue), String> {
    let (key, value) = raw
        .split_once('=')
        .filter(|(key, _)| !key.is_empty())
        .ok_or_else(|| format!("expected key=value, got '{raw}'"))?;

    let value = match serde_json::from_str::<serde_json::Value>(value) {
        Ok(json) if !json.is_object() && !json.is_array() => {
            serde_json::from_value(json).map_err(|e| e.to_string())?
        },
        _ => PropertyValue::from(value),
    };
    Ok((key.to_string(), value))
}
