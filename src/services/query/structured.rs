//! Structured pattern matching.
//!
//! Patterns compare by literal equality. Unset fields, and fields set to the
//! empty string, match anything.

use super::ranking::describe;
use crate::models::{Edge, EdgePattern, GraphPatterns, Node, NodeId, NodePattern, Properties, QueryMatch};
use crate::storage::GraphView;
use std::collections::HashSet;

fn id_matches(expected: Option<&NodeId>, actual: &NodeId) -> bool {
    expected.is_none_or(|id| id.is_empty() || id == actual)
}

fn text_matches(expected: Option<&String>, actual: &str) -> bool {
    expected.is_none_or(|text| text.is_empty() || text == actual)
}

fn properties_match(expected: Option<&Properties>, actual: &Properties) -> bool {
    expected.is_none_or(|props| {
        props
            .iter()
            .all(|(key, value)| actual.get(key).is_some_and(|v| v.literal_eq(value)))
    })
}

/// Returns `true` if `node` satisfies `pattern`.
#[must_use]
pub fn node_matches(node: &Node, pattern: &NodePattern) -> bool {
    id_matches(pattern.id.as_ref(), &node.id)
        && text_matches(pattern.label.as_ref(), &node.label)
        && properties_match(pattern.properties.as_ref(), &node.properties)
}

/// Returns `true` if `edge` satisfies `pattern`.
#[must_use]
pub fn edge_matches(edge: &Edge, pattern: &EdgePattern) -> bool {
    id_matches(pattern.source.as_ref(), &edge.source)
        && id_matches(pattern.target.as_ref(), &edge.target)
        && text_matches(pattern.label.as_ref(), &edge.label)
        && properties_match(pattern.properties.as_ref(), &edge.properties)
}

/// Runs a structured query and returns matches in node order.
///
/// Each node matching any node pattern yields one match with score 1.0. Its
/// edges are the incident edges matching any edge pattern; its nodes are the
/// anchor followed by the other endpoints of those edges, in graph order.
#[must_use]
pub fn execute(view: GraphView<'_>, patterns: &GraphPatterns) -> Vec<QueryMatch> {
    let mut matches = Vec::new();

    for anchor in view.nodes() {
        if !patterns.nodes.iter().any(|p| node_matches(anchor, p)) {
            continue;
        }

        let edges: Vec<Edge> = view
            .edges()
            .filter(|e| e.touches(&anchor.id))
            .filter(|e| patterns.edges.iter().any(|p| edge_matches(e, p)))
            .cloned()
            .collect();

        let endpoints: HashSet<&str> = edges
            .iter()
            .flat_map(|e| [e.source.as_str(), e.target.as_str()])
            .collect();

        let mut nodes = vec![anchor.clone()];
        nodes.extend(
            view.nodes()
                .filter(|n| n.id != anchor.id && endpoints.contains(n.id.as_str()))
                .cloned(),
        );

        matches.push(QueryMatch {
            nodes,
            edges,
            score: 1.0,
            context: describe(anchor),
        });
    }

    matches
}
