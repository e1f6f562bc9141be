//! Store identifier → loaded artifact, through cache, local disk and the
//! configured fallback sources.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, info, warn};

use crate::artifact::ModelArtifact;
use crate::cache::{ArtifactCache, CacheStats};
use crate::error::{ArtifactError, ArtifactResult};
use crate::layout::ArtifactLayout;
use crate::sources::ArtifactSource;
use crate::store_id::StoreId;

/// Resolves store identifiers to loaded artifacts.
///
/// Lookup order is cache, then `<models_dir>/<store_id>.<ext>`, then each
/// source in the order it was added. The first source to produce the file
/// wins. Concurrent first-time resolutions of one store share a single
/// fetch and load.
#[derive(Debug)]
pub struct ArtifactResolver {
    layout: ArtifactLayout,
    sources: Vec<Box<dyn ArtifactSource>>,
    cache: Arc<ArtifactCache>,
    gates: GateMap,
}

impl ArtifactResolver {
    /// A resolver over local disk only, with a fresh cache.
    #[must_use]
    pub fn new(layout: ArtifactLayout) -> Self {
        Self {
            layout,
            sources: Vec::new(),
            cache: Arc::new(ArtifactCache::new()),
            gates: GateMap::default(),
        }
    }

    /// Appends a fallback tier.
    #[must_use]
    pub fn with_source(mut self, source: impl ArtifactSource + 'static) -> Self {
        self.sources.push(Box::new(source));
        self
    }

    /// Shares an existing cache.
    #[must_use]
    pub fn with_cache(mut self, cache: Arc<ArtifactCache>) -> Self {
        self.cache = cache;
        self
    }

    #[must_use]
    pub fn layout(&self) -> &ArtifactLayout {
        &self.layout
    }

    #[must_use]
    pub fn cache(&self) -> &Arc<ArtifactCache> {
        &self.cache
    }

    /// Names of the configured fallback tiers, in order.
    #[must_use]
    pub fn source_names(&self) -> Vec<&str> {
        self.sources.iter().map(|s| s.name()).collect()
    }

    #[must_use]
    pub fn canonical_path(&self, store_id: &StoreId) -> PathBuf {
        self.layout.canonical_path(store_id)
    }

    /// The cached artifact for a store, without loading or counting.
    #[must_use]
    pub fn cached(&self, store_id: &StoreId) -> Option<Arc<ModelArtifact>> {
        self.cache.peek(store_id)
    }

    #[must_use]
    pub fn stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// Returns the store's artifact, loading and caching it on first use.
    ///
    /// # Errors
    /// - `ArtifactError::NotFound` when no tier produced a file
    /// - `ArtifactError::Invalid` when the file exists but is not a usable artifact
    /// - `ArtifactError::Io` when the file cannot be read
    pub async fn resolve(&self, store_id: &StoreId) -> ArtifactResult<Arc<ModelArtifact>> {
        if let Some(artifact) = self.cache.get(store_id) {
            return Ok(artifact);
        }

        let lease = self.gate(store_id);
        let _guard = lease.gate.lock().await;

        // Another task may have finished loading while we waited.
        if let Some(artifact) = self.cache.peek(store_id) {
            debug!(store_id = %store_id, "Artifact loaded by concurrent request");
            return Ok(artifact);
        }

        let path = self.canonical_path(store_id);
        if !path_exists(&path).await {
            self.acquire(store_id).await?;
        }

        let artifact = Arc::new(ModelArtifact::load(&path).await?);
        info!(
            store_id = %store_id,
            path = %path.display(),
            scorer = artifact.scorer().kind(),
            features = artifact.active_features().len(),
            "Artifact loaded"
        );
        self.cache.insert(store_id.clone(), Arc::clone(&artifact));
        Ok(artifact)
    }

    /// Walks the fallback tiers until one places the canonical file.
    async fn acquire(&self, store_id: &StoreId) -> ArtifactResult<()> {
        let path = self.canonical_path(store_id);
        let mut attempts = Vec::new();

        for source in &self.sources {
            debug!(store_id = %store_id, source = source.name(), "Trying artifact source");
            match source.fetch(store_id, &self.layout).await {
                Ok(()) if path_exists(&path).await => {
                    info!(store_id = %store_id, source = source.name(), "Artifact fetched");
                    return Ok(());
                }
                Ok(()) => {
                    warn!(store_id = %store_id, source = source.name(), "Source reported success without a file");
                }
                Err(e) => {
                    warn!(store_id = %store_id, source = source.name(), error = %e, "Artifact source failed");
                    attempts.push(e);
                }
            }
        }

        Err(ArtifactError::NotFound { store_id: store_id.to_string(), attempts })
    }

    fn gate(&self, store_id: &StoreId) -> GateLease<'_> {
        let mut gates = self.gates.lock().unwrap_or_else(PoisonError::into_inner);
        let gate = Arc::clone(gates.entry(store_id.clone()).or_default());
        GateLease { gates: &self.gates, store_id: store_id.clone(), gate }
    }
}

type GateMap = Mutex<HashMap<StoreId, Arc<tokio::sync::Mutex<()>>>>;

/// A claim on a store's single-flight gate. The last holder removes the
/// gate from the map on drop, so only stores with a resolution in flight
/// keep an entry.
struct GateLease<'a> {
    gates: &'a GateMap,
    store_id: StoreId,
    gate: Arc<tokio::sync::Mutex<()>>,
}

impl Drop for GateLease<'_> {
    fn drop(&mut self) {
        let mut gates = self.gates.lock().unwrap_or_else(PoisonError::into_inner);
        // One reference is ours and one is the map's.
        let last = Arc::strong_count(&self.gate) == 2
            && gates.get(&self.store_id).is_some_and(|g| Arc::ptr_eq(g, &self.gate));
        if last {
            gates.remove(&self.store_id);
        }
    }
}

async fn path_exists(path: &std::path::Path) -> bool {
    tokio::fs::try_exists(path).await.unwrap_or(false)
}
