//! Model-hub tier: downloads a dataset archive over HTTP and unpacks every
//! store artifact in it into the models directory.

use async_trait::async_trait;
use flate2::read::GzDecoder;
use futures::StreamExt;
use reqwest::Client;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use super::{ArtifactSource, place_file};
use crate::error::SourceError;
use crate::layout::ArtifactLayout;
use crate::store_id::StoreId;

const SOURCE_NAME: &str = "hub";

/// Default public hub API.
pub const DEFAULT_HUB_BASE_URL: &str = "https://www.kaggle.com/api/v1";

/// Hub account used for basic auth.
#[derive(Clone)]
pub struct HubCredentials {
    pub username: String,
    pub key: String,
}

impl std::fmt::Debug for HubCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HubCredentials")
            .field("username", &self.username)
            .field("key", &"<redacted>")
            .finish()
    }
}

/// Downloads `<base>/models/<dataset>/download` (a gzipped tarball) once and
/// unpacks every `<store_id>.<ext>` inside onto its canonical path.
///
/// After one successful download the dataset is known locally: stores it
/// did not contain fail with `MissingFromDataset` without another request.
/// Clones share that state.
#[derive(Debug, Clone)]
pub struct HubSource {
    base_url: String,
    dataset: String,
    credentials: Option<HubCredentials>,
    client: Client,
    unpacked: Arc<Mutex<bool>>,
}

impl HubSource {
    /// # Errors
    /// Returns a `SourceError` if the HTTP client cannot be created.
    pub fn new(base_url: &str, dataset: &str, timeout: Duration) -> Result<Self, SourceError> {
        let client = Client::builder().timeout(timeout).build().map_err(|e| {
            SourceError::Transport {
                source_name: SOURCE_NAME.to_string(),
                url: base_url.to_string(),
                message: format!("Failed to create HTTP client: {e}"),
            }
        })?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            dataset: dataset.trim_matches('/').to_string(),
            credentials: None,
            client,
            unpacked: Arc::new(Mutex::new(false)),
        })
    }

    #[must_use]
    pub fn with_credentials(mut self, credentials: Option<HubCredentials>) -> Self {
        self.credentials = credentials;
        self
    }

    #[must_use]
    pub fn dataset(&self) -> &str {
        &self.dataset
    }

    #[must_use]
    pub fn download_url(&self) -> String {
        format!("{}/models/{}/download", self.base_url, self.dataset)
    }

    fn missing(&self, layout: &ArtifactLayout, store_id: &StoreId) -> SourceError {
        SourceError::MissingFromDataset {
            source_name: SOURCE_NAME.to_string(),
            dataset: self.dataset.clone(),
            file_name: layout.file_name(store_id),
        }
    }

    /// Streams the archive into a temp file under the models directory.
    async fn download(&self, layout: &ArtifactLayout) -> Result<tempfile::NamedTempFile, SourceError> {
        let url = self.download_url();
        debug!(dataset = %self.dataset, url = %url, "Downloading hub dataset");

        let mut request = self.client.get(&url);
        if let Some(creds) = &self.credentials {
            request = request.basic_auth(&creds.username, Some(&creds.key));
        }

        let transport = |e: reqwest::Error| SourceError::Transport {
            source_name: SOURCE_NAME.to_string(),
            url: url.clone(),
            message: e.to_string(),
        };

        let response = request.send().await.map_err(transport)?;
        let status = response.status();
        if !status.is_success() {
            warn!(dataset = %self.dataset, status = status.as_u16(), "Hub refused dataset download");
            return Err(SourceError::Status {
                source_name: SOURCE_NAME.to_string(),
                url: url.clone(),
                status: status.as_u16(),
            });
        }

        layout.ensure_root().await.map_err(|e| SourceError::io(SOURCE_NAME, &e))?;
        let archive = tempfile::Builder::new()
            .prefix(".hub-")
            .suffix(".tar.gz")
            .tempfile_in(layout.root())
            .map_err(|e| SourceError::io(SOURCE_NAME, &e))?;
        let mut writer = tokio::fs::File::from_std(
            archive.as_file().try_clone().map_err(|e| SourceError::io(SOURCE_NAME, &e))?,
        );

        let mut total = 0u64;
        let mut body = response.bytes_stream();
        while let Some(chunk) = body.next().await {
            let chunk = chunk.map_err(transport)?;
            writer.write_all(&chunk).await.map_err(|e| SourceError::io(SOURCE_NAME, &e))?;
            total += chunk.len() as u64;
        }
        writer.flush().await.map_err(|e| SourceError::io(SOURCE_NAME, &e))?;
        debug!(dataset = %self.dataset, bytes = total, "Hub dataset downloaded");
        Ok(archive)
    }
}

/// Unpacks `archive` into a scratch directory next to the models and moves
/// every file named `<store_id>.<ext>` onto its canonical path. Existing
/// canonical files are left alone. Returns how many files were placed.
fn unpack_store_files(archive: &Path, layout: &ArtifactLayout) -> Result<usize, SourceError> {
    let scratch = tempfile::Builder::new()
        .prefix(".hub-")
        .tempdir_in(layout.root())
        .map_err(|e| SourceError::io(SOURCE_NAME, &e))?;

    let file = std::fs::File::open(archive).map_err(|e| SourceError::io(SOURCE_NAME, &e))?;
    tar::Archive::new(GzDecoder::new(file)).unpack(scratch.path()).map_err(|e| {
        SourceError::Archive { source_name: SOURCE_NAME.to_string(), message: e.to_string() }
    })?;

    let mut placed = 0;
    for entry in WalkDir::new(scratch.path()).follow_links(false).into_iter().filter_map(Result::ok) {
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) != Some(layout.extension()) {
            continue;
        }
        let Some(store_id) =
            path.file_stem().and_then(|stem| stem.to_str()).and_then(|stem| StoreId::new(stem).ok())
        else {
            continue;
        };
        if layout.canonical_path(&store_id).exists() {
            continue;
        }
        place_file(SOURCE_NAME, path, layout, &store_id)?;
        placed += 1;
    }
    Ok(placed)
}

#[async_trait]
impl ArtifactSource for HubSource {
    fn name(&self) -> &str {
        SOURCE_NAME
    }

    async fn fetch(&self, store_id: &StoreId, layout: &ArtifactLayout) -> Result<(), SourceError> {
        // Held across the download so concurrent misses share one archive.
        let mut unpacked = self.unpacked.lock().await;
        if *unpacked {
            return if layout.canonical_path(store_id).exists() {
                Ok(())
            } else {
                Err(self.missing(layout, store_id))
            };
        }

        let archive = self.download(layout).await?;
        let extract_layout = layout.clone();
        let placed = tokio::task::spawn_blocking(move || {
            let placed = unpack_store_files(archive.path(), &extract_layout);
            drop(archive);
            placed
        })
        .await
        .map_err(|e| SourceError::Archive {
            source_name: SOURCE_NAME.to_string(),
            message: format!("Extraction task failed: {e}"),
        })??;

        *unpacked = true;
        info!(dataset = %self.dataset, files = placed, "Hub dataset unpacked into models directory");

        if layout.canonical_path(store_id).exists() {
            info!(store_id = %store_id, dataset = %self.dataset, "Artifact extracted from hub dataset");
            Ok(())
        } else {
            Err(self.missing(layout, store_id))
        }
    }
}
