//! ArtifactCache implementation.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use tracing::{debug, info};

use super::types::CacheStats;
use crate::artifact::ModelArtifact;
use crate::store_id::StoreId;

/// Process-lifetime cache of loaded artifacts keyed by store identifier.
///
/// Lookups take the read lock only; the write lock is held for a single
/// insert. A cached artifact is immutable, so handing out clones of its
/// `Arc` is safe across concurrent requests. Poisoned locks are recovered,
/// since no operation leaves the map half-written.
#[derive(Debug, Default)]
pub struct ArtifactCache {
    entries: RwLock<HashMap<StoreId, Arc<ModelArtifact>>>,
    hits: AtomicU64,
    misses: AtomicU64,
    loads: AtomicU64,
}

impl ArtifactCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a store's artifact, counting a hit or a miss.
    pub fn get(&self, store_id: &StoreId) -> Option<Arc<ModelArtifact>> {
        let found = self.peek(store_id);
        if found.is_some() {
            self.hits.fetch_add(1, Ordering::Relaxed);
            debug!(store_id = %store_id, "Artifact cache hit");
        } else {
            self.misses.fetch_add(1, Ordering::Relaxed);
            debug!(store_id = %store_id, "Artifact cache miss");
        }
        found
    }

    /// Look up without touching statistics.
    pub fn peek(&self, store_id: &StoreId) -> Option<Arc<ModelArtifact>> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        entries.get(store_id).map(Arc::clone)
    }

    /// Insert a freshly loaded artifact. An existing entry is replaced.
    pub fn insert(&self, store_id: StoreId, artifact: Arc<ModelArtifact>) {
        let size = {
            let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
            entries.insert(store_id.clone(), artifact);
            entries.len()
        };
        self.loads.fetch_add(1, Ordering::Relaxed);
        info!(store_id = %store_id, cache_size = size, "Artifact cached");
    }

    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// A snapshot of current cache statistics.
    #[must_use]
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            total_hits: self.hits.load(Ordering::Relaxed),
            total_misses: self.misses.load(Ordering::Relaxed),
            total_loads: self.loads.load(Ordering::Relaxed),
            cache_size: self.len(),
        }
    }
}
