//! Lexical relevance search with neighbourhood expansion.
//!
//! Relevance is the fraction of query terms that occur as substrings of the
//! node's lowercase serialized properties. The query is split on single
//! spaces, so consecutive spaces yield empty terms, and an empty term occurs
//! in every node.

use super::ranking::describe;
use crate::models::{Edge, Node, QueryMatch, SemanticOptions};
use crate::storage::GraphView;
use crate::{Error, Result};
use std::collections::{HashMap, HashSet, VecDeque};

/// Lowercases and splits a query into terms.
#[must_use]
pub fn terms(query: &str) -> Vec<String> {
    query.to_lowercase().split(' ').map(str::to_owned).collect()
}

/// Relevance of `node` for pre-split `terms`, in `[0, 1]`.
///
/// # Errors
///
/// Returns an error if the node's properties cannot be serialized.
#[allow(clippy::cast_precision_loss)]
pub fn relevance(node: &Node, terms: &[String]) -> Result<f64> {
    if terms.is_empty() {
        return Ok(0.0);
    }

    let text = serde_json::to_string(&node.properties)
        .map_err(|e| Error::mutation("serialize_node_properties", e))?
        .to_lowercase();

    let hits = terms
        .iter()
        .filter(|term| text.contains(term.as_str()))
        .count();
    Ok(hits as f64 / terms.len() as f64)
}

/// Edges incident to each node id, in edge insertion order.
fn adjacency<'a>(view: GraphView<'a>) -> HashMap<&'a str, Vec<&'a Edge>> {
    let mut adjacent: HashMap<&str, Vec<&Edge>> = HashMap::new();
    for edge in view.edges() {
        adjacent.entry(edge.source.as_str()).or_default().push(edge);
        if edge.target != edge.source {
            adjacent.entry(edge.target.as_str()).or_default().push(edge);
        }
    }
    adjacent
}

/// Breadth-first expansion from `seed` over undirected edges.
///
/// Returns the reached nodes (excluding the seed) in discovery order. Each
/// node is visited once; edges to missing nodes are skipped.
fn expand<'a>(
    view: GraphView<'a>,
    adjacent: &HashMap<&'a str, Vec<&'a Edge>>,
    seed: &'a Node,
    max_distance: usize,
) -> Vec<&'a Node> {
    let mut visited: HashSet<&str> = HashSet::from([seed.id.as_str()]);
    let mut queue: VecDeque<(&str, usize)> = VecDeque::from([(seed.id.as_str(), 0)]);
    let mut reached = Vec::new();

    while let Some((current, depth)) = queue.pop_front() {
        if depth >= max_distance {
            continue;
        }

        for edge in adjacent.get(current).into_iter().flatten() {
            let next = if edge.source.as_str() == current {
                edge.target.as_str()
            } else {
                edge.source.as_str()
            };
            if visited.contains(next) {
                continue;
            }
            let Some(node) = view.node(next) else {
                continue;
            };
            visited.insert(next);
            reached.push(node);
            queue.push_back((next, depth + 1));
        }
    }

    reached
}

/// Runs a semantic search and returns unranked matches in node order.
///
/// Nodes whose relevance is strictly above the threshold become seeds. Each
/// match holds the seed followed by the nodes reachable within
/// `max_distance` hops, plus every edge whose endpoints both lie in that
/// set. The score is the seed's relevance.
///
/// # Errors
///
/// Returns an error if node properties cannot be serialized.
pub fn execute(view: GraphView<'_>, query: &str, options: &SemanticOptions) -> Result<Vec<QueryMatch>> {
    let terms = terms(query);
    let adjacent = adjacency(view);
    let mut matches = Vec::new();

    for seed in view.nodes() {
        let score = relevance(seed, &terms)?;
        if score <= options.similarity_threshold {
            continue;
        }

        let mut nodes = vec![seed];
        nodes.extend(expand(view, &adjacent, seed, options.max_distance));

        let members: HashSet<&str> = nodes.iter().map(|n| n.id.as_str()).collect();
        let edges = view
            .edges()
            .filter(|e| members.contains(e.source.as_str()) && members.contains(e.target.as_str()))
            .cloned()
            .collect();

        matches.push(QueryMatch {
            nodes: nodes.into_iter().cloned().collect(),
            edges,
            score,
            context: describe(seed),
        });
    }

    Ok(matches)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{GraphUpdate, UpdateKind};
    use crate::storage::GraphStore;
    use test_case::test_case;

    fn chain_store() -> GraphStore {
        // a - b - c - d, plus an edge to a node that does not exist
        let store = GraphStore::in_memory();
        let nodes = [
            Node::new("a", "person").with_property("name", "Alice"),
            Node::new("b", "person").with_property("name", "Bob"),
            Node::new("c", "organization").with_property("name", "Acme"),
            Node::new("d", "location").with_property("name", "Berlin"),
        ];
        let edges = [
            Edge::new("ab", "a", "b", "knows"),
            Edge::new("bc", "b", "c", "works_at"),
            Edge::new("cd", "d", "c", "hosts"),
            Edge::new("ax", "a", "ghost", "knows"),
        ];
        store
            .update_graph(&GraphUpdate::new(UpdateKind::Add).with_nodes(nodes).with_edges(edges))
            .unwrap();
        store
    }

    #[test_case("alice", 1.0 ; "single matching term")]
    #[test_case("alice nobody", 0.5 ; "half the terms")]
    #[test_case("ALICE", 1.0 ; "case insensitive")]
    #[test_case("zzz", 0.0 ; "no match")]
    #[test_case("", 1.0 ; "empty term matches everything")]
    fn test_relevance(query: &str, expected: f64) {
        let node = Node::new("a", "person").with_property("name", "Alice");
        let score = relevance(&node, &terms(query)).unwrap();
        assert!((score - expected).abs() < 1e-9);
    }

    #[test]
    fn test_relevance_ignores_label() {
        let node = Node::new("a", "person");
        assert!(relevance(&node, &terms("person")).unwrap().abs() < f64::EPSILON);
    }

    #[test]
    fn test_expansion_respects_max_distance() {
        let store = chain_store();
        let options = SemanticOptions::default().with_max_distance(1);

        let matches = store
            .read(|view| execute(view, "alice", &options))
            .unwrap()
            .unwrap();

        assert_eq!(matches.len(), 1);
        let ids: Vec<&str> = matches[0].nodes.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
        assert_eq!(matches[0].edges.len(), 1);
        assert_eq!(matches[0].edges[0].id.as_str(), "ab");
        assert!((matches[0].score - 1.0).abs() < f64::EPSILON);
        assert_eq!(matches[0].context, "person: Alice ()");
    }

    #[test]
    fn test_expansion_follows_edges_in_both_directions() {
        let store = chain_store();
        let options = SemanticOptions::default().with_max_distance(3);

        let matches = store
            .read(|view| execute(view, "alice", &options))
            .unwrap()
            .unwrap();

        let ids: Vec<&str> = matches[0].nodes.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c", "d"]);
        assert_eq!(matches[0].edges.len(), 3);
    }

    #[test]
    fn test_zero_distance_returns_seed_only() {
        let store = chain_store();
        let options = SemanticOptions::default().with_max_distance(0);

        let matches = store
            .read(|view| execute(view, "bob", &options))
            .unwrap()
            .unwrap();
        assert_eq!(matches[0].nodes.len(), 1);
        assert!(matches[0].edges.is_empty());
    }

    #[test]
    fn test_threshold_is_strict() {
        let store = chain_store();
        let options = SemanticOptions::default();

        // "alice zzz" scores exactly 0.5 and is not above the default threshold.
        let matches = store
            .read(|view| execute(view, "alice zzz", &options))
            .unwrap()
            .unwrap();
        assert!(matches.is_empty());
    }
}
