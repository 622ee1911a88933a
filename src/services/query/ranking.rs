//! Ranking, filtering and merging of query matches.

use crate::models::{Node, QueryContext, QueryMatch};
use indexmap::IndexMap;
use indexmap::map::Entry;

/// Sorts matches by descending score, then applies the context's
/// `min_confidence` filter and `max_results` truncation.
///
/// The sort is stable, so ties keep their discovery order.
#[must_use]
pub fn rank_and_filter(mut matches: Vec<QueryMatch>, context: Option<&QueryContext>) -> Vec<QueryMatch> {
    matches.sort_by(|a, b| b.score.total_cmp(&a.score));

    let Some(context) = context else {
        return matches;
    };

    if let Some(min) = context.min_confidence {
        matches.retain(|m| m.score >= min);
    }
    if let Some(max) = context.max_results {
        matches.truncate(max);
    }
    matches
}

/// Mean score of `matches`, or 0 when there are none.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn mean_score(matches: &[QueryMatch]) -> f64 {
    if matches.is_empty() {
        return 0.0;
    }
    matches.iter().map(|m| m.score).sum::<f64>() / matches.len() as f64
}

/// Merges semantic and structured matches keyed by their node sets.
///
/// Semantic matches enter with `score * semantic_weight`, structured ones
/// with `score * structured_weight`; a key present in both sums the two.
/// A later semantic match with the same key replaces an earlier one.
#[must_use]
pub fn merge_weighted(
    semantic: Vec<QueryMatch>,
    structured: Vec<QueryMatch>,
    semantic_weight: f64,
    structured_weight: f64,
) -> Vec<QueryMatch> {
    let mut merged: IndexMap<String, QueryMatch> = IndexMap::new();

    for mut m in semantic {
        m.score *= semantic_weight;
        merged.insert(m.node_key(), m);
    }

    for mut m in structured {
        match merged.entry(m.node_key()) {
            Entry::Occupied(mut existing) => {
                existing.get_mut().score += m.score * structured_weight;
            },
            Entry::Vacant(slot) => {
                m.score *= structured_weight;
                slot.insert(m);
            },
        }
    }

    merged.into_values().collect()
}

/// One-line description of a node: `"{label}: {name} ({sourceDocument})"`.
#[must_use]
pub fn describe(node: &Node) -> String {
    let name = node.property("name").map(ToString::to_string).unwrap_or_default();
    let source = node
        .property("sourceDocument")
        .map(ToString::to_string)
        .unwrap_or_default();
    format!("{}: {name} ({source})", node.label)
}
