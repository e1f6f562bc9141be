//! Error types for Storecast Core.

use http::StatusCode;
use storecast_abstraction::ScoreError;
use storecast_models::ArtifactError;
use thiserror::Error;

/// Core error type for Storecast operations.
#[derive(Error, Debug)]
pub enum StorecastError {
    /// Artifact resolution or loading errors
    #[error(transparent)]
    Artifact(#[from] ArtifactError),

    /// Input is missing something required before any artifact is touched
    #[error("Schema error: {0}")]
    Schema(String),

    /// The scorer failed or produced unusable output
    #[error("Prediction failed for store '{store_id}': {source}")]
    Prediction {
        store_id: String,
        #[source]
        source: ScoreError,
    },

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed CSV input
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

impl StorecastError {
    pub(crate) fn schema(message: impl Into<String>) -> Self {
        Self::Schema(message.into())
    }

    /// HTTP status the API answers with for this error.
    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Artifact(ArtifactError::NotFound { .. }) => StatusCode::NOT_FOUND,
            Self::Artifact(ArtifactError::InvalidStoreId(_)) | Self::Schema(_) | Self::Csv(_) => {
                StatusCode::BAD_REQUEST
            }
            Self::Artifact(_) | Self::Prediction { .. } | Self::Config(_) | Self::Io(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl From<config::ConfigError> for StorecastError {
    fn from(err: config::ConfigError) -> Self {
        Self::Config(err.to_string())
    }
}

/// Result type alias for Storecast operations.
pub type Result<T> = std::result::Result<T, StorecastError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_artifact_error_conversion() {
        let err: StorecastError = ArtifactError::InvalidStoreId("../x".to_string()).into();
        assert!(matches!(err, StorecastError::Artifact(ArtifactError::InvalidStoreId(_))));
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_prediction_error_carries_cause() {
        let err = StorecastError::Prediction {
            store_id: "CA_1".to_string(),
            source: ScoreError::InvalidOutput("NaN at row 0".to_string()),
        };
        let msg = err.to_string();
        assert!(msg.contains("CA_1"));
        assert!(msg.contains("NaN at row 0"));
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_not_found_and_invalid_artifact_status() {
        let missing: StorecastError =
            ArtifactError::NotFound { store_id: "TX_1".to_string(), attempts: vec![] }.into();
        assert_eq!(missing.status_code(), StatusCode::NOT_FOUND);

        let invalid: StorecastError = ArtifactError::Invalid {
            path: "models/CA_1.json".into(),
            reason: "artifact must contain a 'model' entry".to_string(),
        }
        .into();
        assert_eq!(invalid.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(StorecastError::schema("x").status_code(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_config_error_conversion() {
        let err: StorecastError = config::ConfigError::Message("bad value".to_string()).into();
        match err {
            StorecastError::Config(msg) => assert!(msg.contains("bad value")),
            _ => panic!("Expected Config error variant"),
        }
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::AddrInUse, "port taken");
        let err: StorecastError = io_err.into();
        assert!(matches!(err, StorecastError::Io(_)));
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
