use std::path::{Path, PathBuf};

use crate::store_id::StoreId;

/// Default artifact file extension.
pub const DEFAULT_EXTENSION: &str = "json";

/// Filesystem layout for store artifacts.
///
/// Every store has exactly one canonical location,
/// `<root>/<store_id>.<extension>`. Fetching tiers write into a staging file
/// next to it and rename into place, so a reader never sees a partial file.
#[derive(Debug, Clone)]
pub struct ArtifactLayout {
    root: PathBuf,
    extension: String,
}

impl ArtifactLayout {
    #[must_use]
    pub fn new(root: PathBuf) -> Self {
        Self::with_extension(root, DEFAULT_EXTENSION)
    }

    #[must_use]
    pub fn with_extension(root: PathBuf, extension: &str) -> Self {
        Self { root, extension: extension.trim_start_matches('.').to_string() }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    #[must_use]
    pub fn extension(&self) -> &str {
        &self.extension
    }

    /// `<store_id>.<extension>`
    #[must_use]
    pub fn file_name(&self, store_id: &StoreId) -> String {
        format!("{store_id}.{}", self.extension)
    }

    #[must_use]
    pub fn canonical_path(&self, store_id: &StoreId) -> PathBuf {
        self.root.join(self.file_name(store_id))
    }

    /// A unique hidden sibling of the canonical path for in-flight writes.
    #[must_use]
    pub fn staging_path(&self, store_id: &StoreId) -> PathBuf {
        self.root.join(format!(".{}.{}.part", self.file_name(store_id), uuid::Uuid::new_v4()))
    }

    pub async fn ensure_root(&self) -> std::io::Result<()> {
        tokio::fs::create_dir_all(&self.root).await
    }
}
