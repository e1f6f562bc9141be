//! Last-resort tier: shells out to the hub's command-line client.

use async_trait::async_trait;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, info, warn};

use super::{ArtifactSource, find_in_tree, place_file};
use crate::error::SourceError;
use crate::layout::ArtifactLayout;
use crate::store_id::StoreId;

const SOURCE_NAME: &str = "hub-cli";

pub const DEFAULT_HUB_CLI: &str = "kaggle";

/// Runs `<program> models instances versions download <dataset> -p <models_dir> --untar`
/// under a timeout, then looks for the store's file in the models directory.
#[derive(Debug, Clone)]
pub struct HubCliSource {
    program: String,
    dataset: String,
    timeout: Duration,
}

impl HubCliSource {
    #[must_use]
    pub fn new(program: impl Into<String>, dataset: impl Into<String>, timeout: Duration) -> Self {
        Self { program: program.into(), dataset: dataset.into(), timeout }
    }

    fn args(&self, layout: &ArtifactLayout) -> Vec<String> {
        vec![
            "models".to_string(),
            "instances".to_string(),
            "versions".to_string(),
            "download".to_string(),
            self.dataset.clone(),
            "-p".to_string(),
            layout.root().display().to_string(),
            "--untar".to_string(),
        ]
    }

    fn command_error(&self, message: impl Into<String>) -> SourceError {
        SourceError::Command {
            source_name: SOURCE_NAME.to_string(),
            program: self.program.clone(),
            message: message.into(),
        }
    }
}

#[async_trait]
impl ArtifactSource for HubCliSource {
    fn name(&self) -> &str {
        SOURCE_NAME
    }

    async fn fetch(&self, store_id: &StoreId, layout: &ArtifactLayout) -> Result<(), SourceError> {
        layout.ensure_root().await.map_err(|e| SourceError::io(SOURCE_NAME, &e))?;

        let args = self.args(layout);
        debug!(program = %self.program, args = ?args, "Running hub CLI");

        let child = Command::new(&self.program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| self.command_error(e.to_string()))?;

        let output = tokio::time::timeout(self.timeout, child.wait_with_output())
            .await
            .map_err(|_| {
                warn!(program = %self.program, secs = self.timeout.as_secs(), "Hub CLI timed out");
                SourceError::Timeout {
                    source_name: SOURCE_NAME.to_string(),
                    secs: self.timeout.as_secs(),
                }
            })?
            .map_err(|e| self.command_error(e.to_string()))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            let message = if stderr.is_empty() { format!("exited with {}", output.status) } else { stderr };
            warn!(program = %self.program, message = %message, "Hub CLI failed");
            return Err(self.command_error(message));
        }

        let canonical = layout.canonical_path(store_id);
        if tokio::fs::try_exists(&canonical).await.unwrap_or(false) {
            info!(store_id = %store_id, path = %canonical.display(), "Artifact downloaded by hub CLI");
            return Ok(());
        }

        let file_name = layout.file_name(store_id);
        match find_in_tree(layout.root(), &file_name) {
            Some(found) => {
                let placed = place_file(SOURCE_NAME, &found, layout, store_id)?;
                info!(store_id = %store_id, path = %placed.display(), "Artifact moved from hub CLI download");
                Ok(())
            }
            None => Err(SourceError::MissingFromDataset {
                source_name: SOURCE_NAME.to_string(),
                dataset: self.dataset.clone(),
                file_name,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn setup() -> (TempDir, ArtifactLayout, StoreId) {
        let temp = TempDir::new().unwrap();
        let layout = ArtifactLayout::new(temp.path().join("models"));
        (temp, layout, StoreId::new("WI_3").unwrap())
    }

    #[test]
    fn test_command_line_shape() {
        let layout = ArtifactLayout::new("/srv/models".into());
        let source = HubCliSource::new("kaggle", "acme/m5", Duration::from_secs(120));
        assert_eq!(
            source.args(&layout),
            vec!["models", "instances", "versions", "download", "acme/m5", "-p", "/srv/models", "--untar"]
        );
    }

    #[tokio::test]
    async fn test_missing_program_is_command_error() {
        let (_temp, layout, id) = setup();
        let source =
            HubCliSource::new("storecast-no-such-hub-cli", "acme/m5", Duration::from_secs(5));

        let err = source.fetch(&id, &layout).await.unwrap_err();
        assert!(matches!(err, SourceError::Command { ref program, .. } if program == "storecast-no-such-hub-cli"));
        assert!(!layout.canonical_path(&id).exists());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_nonzero_exit_is_command_error() {
        let (_temp, layout, id) = setup();
        // `false` ignores its arguments and exits 1.
        let source = HubCliSource::new("false", "acme/m5", Duration::from_secs(5));

        let err = source.fetch(&id, &layout).await.unwrap_err();
        assert!(matches!(err, SourceError::Command { ref message, .. } if message.contains("exit")));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_successful_run_without_file_is_missing() {
        let (_temp, layout, id) = setup();
        // `true` exits 0 without writing anything.
        let source = HubCliSource::new("true", "acme/m5", Duration::from_secs(5));

        let err = source.fetch(&id, &layout).await.unwrap_err();
        assert!(matches!(err, SourceError::MissingFromDataset { ref file_name, .. } if file_name == "WI_3.json"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_finds_file_nested_in_models_dir() {
        let (_temp, layout, id) = setup();
        let nested = layout.root().join("acme").join("m5").join("1");
        std::fs::create_dir_all(&nested).unwrap();
        std::fs::write(nested.join("WI_3.json"), "{}").unwrap();

        let source = HubCliSource::new("true", "acme/m5", Duration::from_secs(5));
        source.fetch(&id, &layout).await.unwrap();

        assert!(layout.canonical_path(&id).exists());
        assert!(!nested.join("WI_3.json").exists());
    }
}
