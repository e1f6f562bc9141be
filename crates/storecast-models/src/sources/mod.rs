//! Fallback tiers that can materialize an artifact file on local disk.
//!
//! A source either leaves the store's artifact at its canonical path and
//! returns `Ok(())`, or returns a [`SourceError`]. Sources never load or
//! cache anything; the resolver owns that.

pub mod hub;
pub mod hub_cli;
pub mod remote;

pub use hub::{HubCredentials, HubSource};
pub use hub_cli::HubCliSource;
pub use remote::RemoteSource;

use async_trait::async_trait;
use futures::{Stream, StreamExt};
use std::fmt;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use walkdir::WalkDir;

use crate::error::SourceError;
use crate::layout::ArtifactLayout;
use crate::store_id::StoreId;

/// One tier of the artifact fallback chain.
#[async_trait]
pub trait ArtifactSource: Send + Sync + fmt::Debug {
    /// Short name used in logs and soft errors.
    fn name(&self) -> &str;

    /// Try to place `store_id`'s artifact at `layout.canonical_path(store_id)`.
    ///
    /// # Errors
    /// Returns a `SourceError` describing why this tier could not produce
    /// the file. The caller treats it as a soft failure.
    async fn fetch(&self, store_id: &StoreId, layout: &ArtifactLayout) -> Result<(), SourceError>;
}

/// Stream a body into the canonical path via a staging file.
///
/// The staging file is removed on any failure, so an interrupted download
/// leaves nothing behind.
pub(crate) async fn persist_stream<S, B, E>(
    source_name: &str,
    url: &str,
    layout: &ArtifactLayout,
    store_id: &StoreId,
    mut stream: S,
) -> Result<PathBuf, SourceError>
where
    S: Stream<Item = Result<B, E>> + Unpin,
    B: AsRef<[u8]>,
    E: fmt::Display,
{
    layout.ensure_root().await.map_err(|e| SourceError::io(source_name, &e))?;
    let staging = layout.staging_path(store_id);
    let canonical = layout.canonical_path(store_id);

    let written = async {
        let mut file =
            tokio::fs::File::create(&staging).await.map_err(|e| SourceError::io(source_name, &e))?;
        let mut total = 0u64;
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| SourceError::Transport {
                source_name: source_name.to_string(),
                url: url.to_string(),
                message: e.to_string(),
            })?;
            let bytes = chunk.as_ref();
            file.write_all(bytes).await.map_err(|e| SourceError::io(source_name, &e))?;
            total += bytes.len() as u64;
        }
        file.flush().await.map_err(|e| SourceError::io(source_name, &e))?;
        Ok::<u64, SourceError>(total)
    }
    .await;

    let renamed = match written {
        Ok(total) => tokio::fs::rename(&staging, &canonical)
            .await
            .map(|()| total)
            .map_err(|e| SourceError::io(source_name, &e)),
        Err(e) => Err(e),
    };

    match renamed {
        Ok(total) => {
            tracing::debug!(
                source = source_name,
                store_id = %store_id,
                bytes = total,
                path = %canonical.display(),
                "Artifact written"
            );
            Ok(canonical)
        }
        Err(e) => {
            let _ = tokio::fs::remove_file(&staging).await;
            Err(e)
        }
    }
}

/// First file named `file_name` under `root`, depth-first.
pub(crate) fn find_in_tree(root: &Path, file_name: &str) -> Option<PathBuf> {
    WalkDir::new(root)
        .follow_links(false)
        .into_iter()
        .filter_map(Result::ok)
        .find(|entry| entry.file_type().is_file() && entry.file_name() == file_name)
        .map(walkdir::DirEntry::into_path)
}

/// Move `from` onto the canonical path.
///
/// Falls back to copy-through-staging when a plain rename fails (for
/// example across filesystems).
pub(crate) fn place_file(
    source_name: &str,
    from: &Path,
    layout: &ArtifactLayout,
    store_id: &StoreId,
) -> Result<PathBuf, SourceError> {
    let canonical = layout.canonical_path(store_id);
    std::fs::create_dir_all(layout.root()).map_err(|e| SourceError::io(source_name, &e))?;

    if std::fs::rename(from, &canonical).is_ok() {
        return Ok(canonical);
    }

    let staging = layout.staging_path(store_id);
    let copied = std::fs::copy(from, &staging).and_then(|_| std::fs::rename(&staging, &canonical));
    if let Err(e) = copied {
        let _ = std::fs::remove_file(&staging);
        return Err(SourceError::io(source_name, &e));
    }
    Ok(canonical)
}
