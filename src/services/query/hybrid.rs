//! Hybrid queries: a semantic and a structured query merged by weight.

use super::ranking::{merge_weighted, rank_and_filter};
use super::{semantic, structured};
use crate::models::{HybridQuery, HybridStrategy, QueryMatch};
use crate::storage::GraphView;
use crate::{Error, QueryErrorKind, Result};
use std::thread;

/// Runs both halves of a hybrid query and merges their matches.
///
/// Each half is ranked and filtered with the hybrid's context before the
/// merge. `parallel` runs the semantic half on a scoped thread while the
/// structured half runs on the caller's thread; the other strategies run
/// semantic then structured.
///
/// # Errors
///
/// Returns an error if the semantic half fails or its worker panics.
pub fn execute(view: GraphView<'_>, query: &HybridQuery) -> Result<Vec<QueryMatch>> {
    let context = query.context.as_ref();

    let (semantic_matches, structured_matches) = match query.strategy {
        HybridStrategy::Parallel => thread::scope(|scope| {
            let worker = scope.spawn(|| {
                semantic::execute(view, &query.semantic.query, &query.semantic.options)
            });
            let structured_matches = structured::execute(view, &query.structured.patterns);
            let semantic_matches = worker.join().map_err(|_| Error::QueryExecution {
                kind: QueryErrorKind::InternalFailure,
                query: Box::new(serde_json::to_value(query).unwrap_or_default()),
                cause: "semantic worker panicked".to_string(),
            });
            (semantic_matches, structured_matches)
        }),
        HybridStrategy::Sequential | HybridStrategy::Weighted => {
            let semantic_matches =
                semantic::execute(view, &query.semantic.query, &query.semantic.options);
            let structured_matches = structured::execute(view, &query.structured.patterns);
            (Ok(semantic_matches), structured_matches)
        },
    };

    let semantic_matches = rank_and_filter(semantic_matches??, context);
    let structured_matches = rank_and_filter(structured_matches, context);

    let (semantic_weight, structured_weight) = query.strategy.weights();
    Ok(merge_weighted(
        semantic_matches,
        structured_matches,
        semantic_weight,
        structured_weight,
    ))
}
