//! Text renderings of a graph snapshot.

use crate::Error;
use crate::models::{GraphSnapshot, Node};
use indexmap::IndexMap;
use std::fmt::Write as _;
use std::str::FromStr;

/// Output format for [`render`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VisualFormat {
    /// Graphviz DOT.
    #[default]
    Dot,
    /// Plain-text label counts and totals.
    Summary,
}

impl FromStr for VisualFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "dot" => Ok(Self::Dot),
            "summary" | "text" => Ok(Self::Summary),
            other => Err(Error::InvalidInput(format!(
                "unknown visualization format: {other} (expected dot or summary)"
            ))),
        }
    }
}

/// Renders `snapshot` in `format`.
#[must_use]
pub fn render(snapshot: &GraphSnapshot, format: VisualFormat) -> String {
    match format {
        VisualFormat::Dot => to_dot(snapshot),
        VisualFormat::Summary => summary(snapshot),
    }
}

/// Fill colour for a node label.
#[must_use]
pub fn node_color(label: &str) -> &'static str {
    match label.to_lowercase().as_str() {
        "person" => "#AED6F1",
        "organization" => "#F5B7B1",
        "location" => "#A2D9CE",
        "project" => "#D7BDE2",
        "technology" => "#FAD7A0",
        _ => "#F2F3F4",
    }
}

fn escape(text: &str) -> String {
    text.replace('\\', "\\\\").replace('"', "\\\"")
}

fn display_name(node: &Node) -> String {
    node.property("name")
        .map(ToString::to_string)
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| node.label.clone())
}

/// Renders a left-to-right Graphviz digraph.
#[must_use]
pub fn to_dot(snapshot: &GraphSnapshot) -> String {
    let mut out = String::from("digraph KnowledgeGraph {\n");
    out.push_str("  rankdir=LR;\n");
    out.push_str("  node [style=filled, fontname=\"Arial\"];\n");
    out.push_str("  edge [fontname=\"Arial\"];\n");

    for node in &snapshot.nodes {
        let _ = writeln!(
            out,
            "  \"{}\" [label=\"{}\", fillcolor=\"{}\"];",
            escape(node.id.as_str()),
            escape(&display_name(node)),
            node_color(&node.label)
        );
    }

    for edge in &snapshot.edges {
        let _ = writeln!(
            out,
            "  \"{}\" -> \"{}\" [label=\"{}\"];",
            escape(edge.source.as_str()),
            escape(edge.target.as_str()),
            escape(&edge.label)
        );
    }

    out.push('}');
    out
}

/// Renders label counts in first-seen order, followed by totals.
#[must_use]
pub fn summary(snapshot: &GraphSnapshot) -> String {
    let mut node_types: IndexMap<&str, usize> = IndexMap::new();
    for node in &snapshot.nodes {
        *node_types.entry(node.label.as_str()).or_default() += 1;
    }
    let mut edge_types: IndexMap<&str, usize> = IndexMap::new();
    for edge in &snapshot.edges {
        *edge_types.entry(edge.label.as_str()).or_default() += 1;
    }

    let mut out = String::from("Knowledge Graph Summary:\n\nNode Types:\n");
    for (label, count) in &node_types {
        let _ = writeln!(out, "  {label}: {count}");
    }
    out.push_str("\nRelationship Types:\n");
    for (label, count) in &edge_types {
        let _ = writeln!(out, "  {label}: {count}");
    }
    let _ = write!(
        out,
        "\nTotal Nodes: {}\nTotal Relationships: {}",
        snapshot.nodes.len(),
        snapshot.edges.len()
    );
    out
}
