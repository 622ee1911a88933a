//! Query result cache.
//!
//! Results are keyed by the SHA-256 of the query's JSON serialization and
//! kept in an LRU cache with a fixed time-to-live.
//!
//! # Staleness
//!
//! Entries are not invalidated when the graph changes. A query repeated
//! within the TTL returns the cached result even if nodes or edges were
//! added, updated or deleted in between. Call
//! [`QueryCache::clear`] to drop results eagerly.
//!
//! # Lock Poisoning
//!
//! A poisoned lock turns lookups into misses and inserts into no-ops; the
//! query is simply re-executed.

use crate::models::{Query, QueryResult};
use crate::{Error, QueryErrorKind, Result};
use lru::LruCache;
use sha2::{Digest, Sha256};
use std::num::NonZeroUsize;
use std::sync::RwLock;
use std::time::{Duration, Instant};

/// Default time-to-live of cached results.
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(300);

/// Default maximum number of cached results.
pub const DEFAULT_CACHE_CAPACITY: usize = 1000;

#[derive(Debug, Clone)]
struct CacheEntry {
    result: QueryResult,
    inserted_at: Instant,
}

/// LRU cache of query results with TTL-based expiry.
#[derive(Debug)]
pub struct QueryCache {
    cache: RwLock<LruCache<String, CacheEntry>>,
    ttl: Duration,
}

impl QueryCache {
    /// Creates a cache holding up to `capacity` results for `ttl` each.
    ///
    /// A capacity of zero is treated as one.
    #[must_use]
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            cache: RwLock::new(LruCache::new(capacity)),
            ttl,
        }
    }

    /// Computes the cache key of a query.
    ///
    /// # Errors
    ///
    /// Returns an error if the query cannot be serialized.
    pub fn key(query: &Query) -> Result<String> {
        let canonical = serde_json::to_string(query).map_err(|e| Error::QueryExecution {
            kind: QueryErrorKind::InternalFailure,
            query: Box::new(serde_json::Value::Null),
            cause: format!("cannot serialize query for caching: {e}"),
        })?;

        let mut hasher = Sha256::new();
        hasher.update(canonical.as_bytes());
        Ok(hex::encode(hasher.finalize()))
    }

    /// Returns a fresh cached result, evicting it if it has expired.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<QueryResult> {
        let mut cache = self.cache.write().ok()?;

        let fresh = cache.get(key).map(|entry| entry.inserted_at.elapsed() < self.ttl)?;
        if fresh {
            return cache.get(key).map(|entry| entry.result.clone());
        }

        cache.pop(key);
        tracing::debug!(key, "Evicted expired query result");
        None
    }

    /// Stores a result.
    pub fn put(&self, key: String, result: QueryResult) {
        if let Ok(mut cache) = self.cache.write() {
            cache.put(
                key,
                CacheEntry {
                    result,
                    inserted_at: Instant::now(),
                },
            );
            #[allow(clippy::cast_precision_loss)]
            metrics::gauge!("kgraph_query_cache_size").set(cache.len() as f64);
        }
    }

    /// Drops every cached result.
    pub fn clear(&self) {
        if let Ok(mut cache) = self.cache.write() {
            cache.clear();
            metrics::gauge!("kgraph_query_cache_size").set(0.0);
        }
    }

    /// Returns the number of cached results, including expired ones not yet
    /// evicted.
    #[must_use]
    pub fn len(&self) -> usize {
        self.cache.read().map(|c| c.len()).unwrap_or(0)
    }

    /// Returns `true` if nothing is cached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the configured TTL.
    #[must_use]
    pub const fn ttl(&self) -> Duration {
        self.ttl
    }
}

impl Default for QueryCache {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_CAPACITY, DEFAULT_CACHE_TTL)
    }
}
