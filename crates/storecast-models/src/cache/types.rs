//! Core data types for artifact caching.

use serde::Serialize;

/// Cache statistics for observability.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    /// Lookups answered from the cache.
    pub total_hits: u64,
    /// Lookups that found nothing.
    pub total_misses: u64,
    /// Artifacts inserted after a load.
    pub total_loads: u64,
    /// Current number of cached artifacts.
    pub cache_size: usize,
}
