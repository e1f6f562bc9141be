//! Artifact caching for the serving process.
//!
//! Loaded artifacts are kept in memory for the lifetime of the process,
//! keyed by store identifier. Entries are populated lazily by the resolver
//! and never evicted: the set of stores is small and closed.

pub mod cache;
pub mod types;

pub use cache::ArtifactCache;
pub use types::CacheStats;
