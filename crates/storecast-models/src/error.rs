use std::path::PathBuf;
use thiserror::Error;

pub type ArtifactResult<T> = std::result::Result<T, ArtifactError>;

/// Errors raised while resolving or loading a store's model artifact.
#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("invalid store identifier '{0}': expected [A-Za-z0-9_.-] without a leading '.'")]
    InvalidStoreId(String),

    /// Every tier of the fallback chain was tried without producing a file.
    #[error("model artifact not found for store '{store_id}'{}", last_attempt(.attempts))]
    NotFound {
        store_id: String,
        /// Soft errors collected from each tier, oldest first.
        attempts: Vec<SourceError>,
    },

    /// The file exists but does not hold a usable bundle.
    #[error("invalid model artifact at {}: {reason}", .path.display())]
    Invalid { path: PathBuf, reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl ArtifactError {
    pub(crate) fn invalid(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::Invalid { path: path.into(), reason: reason.into() }
    }

    /// The most recent soft error recorded before giving up, if any.
    #[must_use]
    pub fn last_attempt(&self) -> Option<&SourceError> {
        match self {
            Self::NotFound { attempts, .. } => attempts.last(),
            _ => None,
        }
    }
}

fn last_attempt(attempts: &[SourceError]) -> String {
    attempts
        .last()
        .map_or_else(|| " (no fallback source configured)".to_string(), |e| format!(": {e}"))
}

/// A failure inside one fallback tier.
///
/// These never abort resolution on their own; the resolver records them and
/// moves on to the next tier.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SourceError {
    #[error("{source_name}: GET {url} returned status {status}")]
    Status { source_name: String, url: String, status: u16 },

    #[error("{source_name}: request to {url} failed: {message}")]
    Transport { source_name: String, url: String, message: String },

    #[error("{source_name}: I/O error: {message}")]
    Io { source_name: String, message: String },

    #[error("{source_name}: could not unpack archive: {message}")]
    Archive { source_name: String, message: String },

    #[error("{source_name}: no file named {file_name} in dataset {dataset}")]
    MissingFromDataset { source_name: String, dataset: String, file_name: String },

    #[error("{source_name}: command `{program}` failed: {message}")]
    Command { source_name: String, program: String, message: String },

    #[error("{source_name}: timed out after {secs}s")]
    Timeout { source_name: String, secs: u64 },
}

impl SourceError {
    pub(crate) fn io(source_name: &str, err: &std::io::Error) -> Self {
        Self::Io { source_name: source_name.to_string(), message: err.to_string() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_surfaces_last_attempt() {
        let err = ArtifactError::NotFound {
            store_id: "CA_1".to_string(),
            attempts: vec![
                SourceError::Status {
                    source_name: "remote".to_string(),
                    url: "http://x/CA_1.json".to_string(),
                    status: 404,
                },
                SourceError::Timeout { source_name: "hub-cli".to_string(), secs: 120 },
            ],
        };
        let msg = err.to_string();
        assert!(msg.contains("CA_1"));
        assert!(msg.contains("hub-cli: timed out after 120s"));
        assert!(!msg.contains("404"));
        assert!(matches!(err.last_attempt(), Some(SourceError::Timeout { .. })));
    }

    #[test]
    fn test_not_found_without_sources() {
        let err = ArtifactError::NotFound { store_id: "TX_1".to_string(), attempts: vec![] };
        assert!(err.to_string().contains("no fallback source configured"));
        assert!(err.last_attempt().is_none());
    }

    #[test]
    fn test_invalid_display() {
        let err = ArtifactError::invalid("/models/CA_1.json", "missing 'model'");
        let msg = err.to_string();
        assert!(msg.contains("/models/CA_1.json"));
        assert!(msg.contains("missing 'model'"));
    }
}
