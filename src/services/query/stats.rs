//! Query usage counters.

use crate::models::{PatternCount, QueryStats};
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

#[derive(Debug, Default)]
struct Counters {
    by_type: HashMap<String, u64>,
    successes: u64,
    failures: u64,
    total_time: Duration,
}

/// Tracks executed queries per type.
///
/// Only executions count; cache hits are not recorded.
#[derive(Debug, Default)]
pub struct QueryStatsTracker {
    counters: Mutex<Counters>,
}

impl QueryStatsTracker {
    /// Creates an empty tracker.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a successful execution.
    pub fn record_success(&self, query_type: &str, elapsed: Duration) {
        if let Ok(mut counters) = self.counters.lock() {
            *counters.by_type.entry(query_type.to_string()).or_default() += 1;
            counters.successes += 1;
            counters.total_time += elapsed;
        }
    }

    /// Records a failed execution.
    pub fn record_failure(&self) {
        if let Ok(mut counters) = self.counters.lock() {
            counters.failures += 1;
        }
    }

    /// Returns the aggregate statistics.
    ///
    /// With no executions the success rate is 1.0 and the average time 0.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn snapshot(&self) -> QueryStats {
        let Ok(counters) = self.counters.lock() else {
            return QueryStats {
                total_queries: 0,
                average_execution_time_ms: 0.0,
                success_rate: 1.0,
                common_patterns: Vec::new(),
            };
        };

        let attempts = counters.successes + counters.failures;
        let average_execution_time_ms = if counters.successes == 0 {
            0.0
        } else {
            counters.total_time.as_secs_f64() * 1000.0 / counters.successes as f64
        };
        let success_rate = if attempts == 0 {
            1.0
        } else {
            counters.successes as f64 / attempts as f64
        };

        let mut common_patterns: Vec<PatternCount> = counters
            .by_type
            .iter()
            .map(|(pattern, count)| PatternCount {
                pattern: pattern.clone(),
                count: *count,
            })
            .collect();
        common_patterns.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.pattern.cmp(&b.pattern)));

        QueryStats {
            total_queries: counters.successes,
            average_execution_time_ms,
            success_rate,
            common_patterns,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_stats() {
        let stats = QueryStatsTracker::new().snapshot();
        assert_eq!(stats.total_queries, 0);
        assert!((stats.success_rate - 1.0).abs() < f64::EPSILON);
        assert!(stats.average_execution_time_ms.abs() < f64::EPSILON);
        assert!(stats.common_patterns.is_empty());
    }

    #[test]
    fn test_counts_and_ordering() {
        let tracker = QueryStatsTracker::new();
        tracker.record_success("structured", Duration::from_millis(10));
        tracker.record_success("semantic", Duration::from_millis(20));
        tracker.record_success("semantic", Duration::from_millis(30));
        tracker.record_failure();

        let stats = tracker.snapshot();
        assert_eq!(stats.total_queries, 3);
        assert!((stats.average_execution_time_ms - 20.0).abs() < 1e-9);
        assert!((stats.success_rate - 0.75).abs() < 1e-9);
        assert_eq!(stats.common_patterns[0].pattern, "semantic");
        assert_eq!(stats.common_patterns[0].count, 2);
        assert_eq!(stats.common_patterns[1].pattern, "structured");
    }
}
