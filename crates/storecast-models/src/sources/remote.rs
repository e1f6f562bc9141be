//! Remote object-store tier: plain HTTP GET of `<base>/<store_id>.<ext>`.

use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, warn};

use super::{ArtifactSource, persist_stream};
use crate::error::SourceError;
use crate::layout::ArtifactLayout;
use crate::store_id::StoreId;

const SOURCE_NAME: &str = "remote";

/// Fetches artifacts from an HTTP object store.
#[derive(Debug, Clone)]
pub struct RemoteSource {
    /// Base URL without trailing slash (e.g. "https://bucket.example.com/models").
    base_url: String,
    /// HTTP client with the fetch timeout applied.
    client: Client,
}

impl RemoteSource {
    /// Creates a remote source with a bounded request timeout.
    ///
    /// # Errors
    /// Returns a `SourceError` if the HTTP client cannot be created.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, SourceError> {
        let client = Client::builder().timeout(timeout).build().map_err(|e| {
            SourceError::Transport {
                source_name: SOURCE_NAME.to_string(),
                url: base_url.to_string(),
                message: format!("Failed to create HTTP client: {e}"),
            }
        })?;
        Ok(Self::with_client(base_url, client))
    }

    /// Creates a remote source around an existing client.
    #[must_use]
    pub fn with_client(base_url: &str, client: Client) -> Self {
        Self { base_url: base_url.trim_end_matches('/').to_string(), client }
    }

    #[must_use]
    pub fn url_for(&self, store_id: &StoreId, layout: &ArtifactLayout) -> String {
        format!("{}/{}", self.base_url, layout.file_name(store_id))
    }
}

#[async_trait]
impl ArtifactSource for RemoteSource {
    fn name(&self) -> &str {
        SOURCE_NAME
    }

    async fn fetch(&self, store_id: &StoreId, layout: &ArtifactLayout) -> Result<(), SourceError> {
        let url = self.url_for(store_id, layout);
        debug!(store_id = %store_id, url = %url, "Fetching artifact from remote store");

        let response = self.client.get(&url).send().await.map_err(|e| {
            let kind = if e.is_timeout() { "timeout" } else { "transport" };
            warn!(store_id = %store_id, url = %url, error = %e, kind, "Remote fetch failed");
            SourceError::Transport {
                source_name: SOURCE_NAME.to_string(),
                url: url.clone(),
                message: e.to_string(),
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            warn!(store_id = %store_id, url = %url, status = status.as_u16(), "Remote store refused artifact");
            return Err(SourceError::Status {
                source_name: SOURCE_NAME.to_string(),
                url,
                status: status.as_u16(),
            });
        }

        persist_stream(SOURCE_NAME, &url, layout, store_id, response.bytes_stream()).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn setup() -> (TempDir, ArtifactLayout, StoreId) {
        let temp = TempDir::new().unwrap();
        let layout = ArtifactLayout::new(temp.path().join("models"));
        (temp, layout, StoreId::new("CA_1").unwrap())
    }

    #[test]
    fn test_url_trims_trailing_slash() {
        let (_temp, layout, id) = setup();
        let source = RemoteSource::new("http://bucket/models/", Duration::from_secs(5)).unwrap();
        assert_eq!(source.url_for(&id, &layout), "http://bucket/models/CA_1.json");
    }

    #[tokio::test]
    async fn test_fetch_success_writes_file() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/models/CA_1.json")
            .with_status(200)
            .with_body(r#"{"kind": "constant", "value": 4.0}"#)
            .create_async()
            .await;

        let (_temp, layout, id) = setup();
        let source =
            RemoteSource::new(&format!("{}/models", server.url()), Duration::from_secs(5)).unwrap();

        source.fetch(&id, &layout).await.unwrap();

        let body = std::fs::read_to_string(layout.canonical_path(&id)).unwrap();
        assert!(body.contains("constant"));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_fetch_404_is_soft_error_without_file() {
        let mut server = mockito::Server::new_async().await;
        let mock = server.mock("GET", "/CA_1.json").with_status(404).create_async().await;

        let (_temp, layout, id) = setup();
        let source = RemoteSource::new(&server.url(), Duration::from_secs(5)).unwrap();

        let err = source.fetch(&id, &layout).await.unwrap_err();

        assert!(matches!(err, SourceError::Status { status: 404, .. }));
        assert!(!layout.canonical_path(&id).exists());
        assert!(!layout.root().exists());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_fetch_unreachable_host_is_transport_error() {
        let (_temp, layout, id) = setup();
        // Port 9 (discard) on localhost is closed in test environments.
        let source = RemoteSource::new("http://127.0.0.1:9", Duration::from_secs(2)).unwrap();

        let err = source.fetch(&id, &layout).await.unwrap_err();
        assert!(matches!(err, SourceError::Transport { .. }));
        assert!(!layout.canonical_path(&id).exists());
    }
}
