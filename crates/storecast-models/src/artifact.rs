//! Model artifacts: the scorer plus the fitted preprocessing it was trained with.
//!
//! On disk an artifact is JSON in one of two shapes:
//!
//! - a bundle object: `{"model": {...}, "scaler": {...}, "item_encoder": {...}, "features": [...]}`
//! - a bare scorer object, recognised by its `"kind"` tag
//!
//! Both are normalized into [`ModelArtifact`] at load time; nothing downstream
//! ever sees the raw payload.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use storecast_abstraction::Scorer;

use crate::error::{ArtifactError, ArtifactResult};
use crate::schema::canonical_features;
use crate::scorers::ScorerSpec;

/// Fitted standard scaler: `(x - mean) / scale`, matched to columns by name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    pub feature_names: Vec<String>,
    pub mean: Vec<f64>,
    pub scale: Vec<f64>,
}

impl StandardScaler {
    fn validate(&self) -> Result<(), String> {
        let n = self.feature_names.len();
        if self.mean.len() != n || self.scale.len() != n {
            return Err(format!(
                "scaler has {n} feature names but {} means and {} scales",
                self.mean.len(),
                self.scale.len()
            ));
        }
        if self.mean.iter().chain(&self.scale).any(|v| !v.is_finite()) {
            return Err("scaler parameters must be finite".to_string());
        }
        Ok(())
    }

    /// `(mean, scale)` fitted for a column, if the scaler knows it.
    ///
    /// A zero scale is reported as 1.0, matching a constant training column.
    #[must_use]
    pub fn params(&self, feature: &str) -> Option<(f64, f64)> {
        let idx = self.feature_names.iter().position(|name| name == feature)?;
        let scale = if self.scale[idx] == 0.0 { 1.0 } else { self.scale[idx] };
        Some((self.mean[idx], scale))
    }
}

fn default_unknown_value() -> f64 {
    -1.0
}

/// Fitted ordinal encoder for the raw item identifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemEncoder {
    pub categories: Vec<String>,
    /// Code assigned to identifiers not seen during fitting.
    #[serde(default = "default_unknown_value")]
    pub unknown_value: f64,
}

impl ItemEncoder {
    #[must_use]
    pub fn encode(&self, item_id: &str) -> f64 {
        self.categories
            .iter()
            .position(|c| c == item_id)
            .map_or(self.unknown_value, |idx| idx as f64)
    }
}

/// Explicit bundle shape of the payload.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BundlePayload {
    #[serde(default)]
    pub model: Option<ScorerSpec>,
    #[serde(default)]
    pub scaler: Option<StandardScaler>,
    #[serde(default)]
    pub item_encoder: Option<ItemEncoder>,
    #[serde(default)]
    pub features: Option<Vec<String>>,
}

/// The two payload shapes an artifact file may hold.
#[derive(Debug, Clone)]
pub enum ArtifactPayload {
    Bundle(BundlePayload),
    Bare(ScorerSpec),
}

impl ArtifactPayload {
    /// Classifies a decoded JSON document.
    ///
    /// # Errors
    /// Returns the reason the document matches neither shape.
    pub fn from_value(value: Value) -> Result<Self, String> {
        let Value::Object(map) = &value else {
            return Err("artifact payload must be a JSON object".to_string());
        };
        if map.contains_key("kind") {
            serde_json::from_value(value).map(Self::Bare).map_err(|e| format!("bare scorer: {e}"))
        } else {
            serde_json::from_value(value).map(Self::Bundle).map_err(|e| format!("bundle: {e}"))
        }
    }

    /// Collapses either shape into the bundle shape.
    ///
    /// A bare scorer becomes a bundle with no transforms and no feature list.
    #[must_use]
    pub fn into_bundle(self) -> BundlePayload {
        match self {
            Self::Bundle(bundle) => bundle,
            Self::Bare(spec) => BundlePayload { model: Some(spec), ..BundlePayload::default() },
        }
    }
}

/// Where a loaded artifact came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArtifactOrigin {
    pub path: PathBuf,
    pub sha256: String,
}

/// A loaded, validated, immutable model artifact.
#[derive(Clone)]
pub struct ModelArtifact {
    scorer: Arc<dyn Scorer>,
    scaler: Option<StandardScaler>,
    item_encoder: Option<ItemEncoder>,
    features: Option<Vec<String>>,
    origin: Option<ArtifactOrigin>,
}

impl ModelArtifact {
    /// Wraps a scorer with an empty transform set.
    #[must_use]
    pub fn new(scorer: Arc<dyn Scorer>) -> Self {
        Self { scorer, scaler: None, item_encoder: None, features: None, origin: None }
    }

    #[must_use]
    pub fn with_scaler(mut self, scaler: StandardScaler) -> Self {
        self.scaler = Some(scaler);
        self
    }

    #[must_use]
    pub fn with_item_encoder(mut self, encoder: ItemEncoder) -> Self {
        self.item_encoder = Some(encoder);
        self
    }

    #[must_use]
    pub fn with_features(mut self, features: Vec<String>) -> Self {
        self.features = Some(features);
        self
    }

    /// Builds an artifact from a payload, validating every part.
    ///
    /// # Errors
    /// Returns `ArtifactError::Invalid` if the scorer is missing or any part
    /// is inconsistent.
    pub fn from_payload(payload: ArtifactPayload, path: &Path) -> ArtifactResult<Self> {
        let bundle = payload.into_bundle();
        let spec = bundle
            .model
            .ok_or_else(|| ArtifactError::invalid(path, "artifact must contain a 'model' entry"))?;
        let scorer = spec.build().map_err(|reason| ArtifactError::invalid(path, reason))?;

        if let Some(scaler) = &bundle.scaler {
            scaler.validate().map_err(|reason| ArtifactError::invalid(path, reason))?;
        }
        if let Some(features) = &bundle.features {
            validate_feature_list(features).map_err(|reason| ArtifactError::invalid(path, reason))?;
        }

        let artifact = Self {
            scorer,
            scaler: bundle.scaler,
            item_encoder: bundle.item_encoder,
            features: bundle.features,
            origin: None,
        };

        if let Some(expected) = artifact.scorer.n_features() {
            let active = artifact.active_features().len();
            if expected != active {
                return Err(ArtifactError::invalid(
                    path,
                    format!("scorer expects {expected} features but the active list has {active}"),
                ));
            }
        }

        Ok(artifact)
    }

    /// Decodes an artifact from raw file bytes.
    ///
    /// # Errors
    /// Returns `ArtifactError::Invalid` if the bytes are not a valid artifact.
    pub fn from_slice(bytes: &[u8], path: &Path) -> ArtifactResult<Self> {
        let value: Value = serde_json::from_slice(bytes)
            .map_err(|e| ArtifactError::invalid(path, format!("malformed JSON: {e}")))?;
        let payload =
            ArtifactPayload::from_value(value).map_err(|reason| ArtifactError::invalid(path, reason))?;
        let mut artifact = Self::from_payload(payload, path)?;
        artifact.origin =
            Some(ArtifactOrigin { path: path.to_path_buf(), sha256: sha256_bytes(bytes) });
        Ok(artifact)
    }

    /// Reads and decodes an artifact file.
    ///
    /// # Errors
    /// Returns `ArtifactError::Io` if the file cannot be read, or
    /// `ArtifactError::Invalid` if its contents are not a valid artifact.
    pub async fn load(path: &Path) -> ArtifactResult<Self> {
        let bytes = tokio::fs::read(path).await?;
        Self::from_slice(&bytes, path)
    }

    #[must_use]
    pub fn scorer(&self) -> &Arc<dyn Scorer> {
        &self.scorer
    }

    #[must_use]
    pub fn scaler(&self) -> Option<&StandardScaler> {
        self.scaler.as_ref()
    }

    #[must_use]
    pub fn item_encoder(&self) -> Option<&ItemEncoder> {
        self.item_encoder.as_ref()
    }

    /// The embedded feature list, if the artifact carries one.
    #[must_use]
    pub fn explicit_features(&self) -> Option<&[String]> {
        self.features.as_deref()
    }

    /// The feature list scoring must follow: embedded list, else canonical.
    #[must_use]
    pub fn active_features(&self) -> &[String] {
        self.features.as_deref().unwrap_or_else(|| canonical_features())
    }

    #[must_use]
    pub fn origin(&self) -> Option<&ArtifactOrigin> {
        self.origin.as_ref()
    }

    /// True when the artifact carries no scaler and no encoder.
    #[must_use]
    pub fn has_empty_transforms(&self) -> bool {
        self.scaler.is_none() && self.item_encoder.is_none()
    }
}

impl fmt::Debug for ModelArtifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelArtifact")
            .field("scorer", &self.scorer.kind())
            .field("scaler", &self.scaler.is_some())
            .field("item_encoder", &self.item_encoder.is_some())
            .field("features", &self.features.as_ref().map(Vec::len))
            .field("origin", &self.origin)
            .finish()
    }
}

fn validate_feature_list(features: &[String]) -> Result<(), String> {
    if features.is_empty() {
        return Err("explicit feature list is empty".to_string());
    }
    let mut seen = HashSet::new();
    if let Some(dup) = features.iter().find(|f| !seen.insert(f.as_str())) {
        return Err(format!("feature '{dup}' listed more than once"));
    }
    Ok(())
}

#[must_use]
pub fn sha256_bytes(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use storecast_abstraction::FeatureMatrix;

    fn load(json: &str) -> ArtifactResult<ModelArtifact> {
        ModelArtifact::from_slice(json.as_bytes(), Path::new("test.json"))
    }

    #[test]
    fn test_bare_scorer_is_wrapped_with_empty_transforms() {
        let artifact = load(r#"{"kind": "constant", "value": 3.0}"#).unwrap();
        assert!(artifact.has_empty_transforms());
        assert!(artifact.explicit_features().is_none());
        assert_eq!(artifact.active_features().len(), 19);
        assert_eq!(artifact.scorer().kind(), "constant");
    }

    #[test]
    fn test_active_features_embedded_or_canonical() {
        let embedded = load(
            r#"{"model": {"kind": "constant", "value": 1.0}, "features": ["wday", "snap"]}"#,
        )
        .unwrap();
        assert_eq!(embedded.active_features(), ["wday".to_string(), "snap".to_string()]);

        let canonical = load(r#"{"model": {"kind": "constant", "value": 1.0}}"#).unwrap();
        assert_eq!(canonical.active_features(), canonical_features());
        assert_eq!(canonical.active_features()[0], "wm_yr_wk");
    }

    #[test]
    fn test_bare_and_wrapped_score_identically() {
        let bare = load(
            r#"{"kind": "linear", "intercept": 1.5, "coefficients": [1,2,3,4,5,6,7,8,9,10,11,12,13,14,15,16,17,18,19]}"#,
        )
        .unwrap();
        let wrapped = load(
            r#"{"model": {"kind": "linear", "intercept": 1.5, "coefficients": [1,2,3,4,5,6,7,8,9,10,11,12,13,14,15,16,17,18,19]}}"#,
        )
        .unwrap();

        let row: Vec<f64> = (0..19).map(f64::from).collect();
        let matrix = FeatureMatrix::from_rows(canonical_features().to_vec(), vec![row]).unwrap();
        assert_eq!(bare.scorer().predict(&matrix), wrapped.scorer().predict(&matrix));
        assert_eq!(bare.has_empty_transforms(), wrapped.has_empty_transforms());
    }

    #[test]
    fn test_bundle_without_model_is_invalid() {
        let err = load(r#"{"features": ["a"]}"#).unwrap_err();
        assert!(matches!(err, ArtifactError::Invalid { ref reason, .. } if reason.contains("'model'")));
    }

    #[test]
    fn test_malformed_json_is_invalid() {
        assert!(matches!(load("{not json"), Err(ArtifactError::Invalid { .. })));
        assert!(matches!(load("[1, 2]"), Err(ArtifactError::Invalid { .. })));
    }

    #[test]
    fn test_scaler_shape_is_checked() {
        let err = load(
            r#"{"model": {"kind": "constant", "value": 1.0},
                "scaler": {"feature_names": ["a", "b"], "mean": [0.0], "scale": [1.0, 1.0]}}"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("2 feature names"));
    }

    #[test]
    fn test_positional_scorer_must_match_active_width() {
        let err = load(
            r#"{"model": {"kind": "linear", "intercept": 0, "coefficients": [1, 2]},
                "features": ["a", "b", "c"]}"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("expects 2 features"));
    }

    #[test]
    fn test_duplicate_features_rejected() {
        let err = load(
            r#"{"model": {"kind": "constant", "value": 1.0}, "features": ["a", "a"]}"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("more than once"));
    }

    #[test]
    fn test_origin_records_digest() {
        let json = r#"{"kind": "constant", "value": 1.0}"#;
        let artifact = load(json).unwrap();
        let origin = artifact.origin().unwrap();
        assert_eq!(origin.path, PathBuf::from("test.json"));
        assert_eq!(origin.sha256, sha256_bytes(json.as_bytes()));
        assert_eq!(origin.sha256.len(), 64);
    }

    #[test]
    fn test_scaler_params_and_zero_scale() {
        let scaler = StandardScaler {
            feature_names: vec!["a".to_string(), "b".to_string()],
            mean: vec![1.0, 2.0],
            scale: vec![2.0, 0.0],
        };
        assert_eq!(scaler.params("a"), Some((1.0, 2.0)));
        assert_eq!(scaler.params("b"), Some((2.0, 1.0)));
        assert_eq!(scaler.params("c"), None);
    }

    #[test]
    fn test_item_encoder_unknown() {
        let encoder: ItemEncoder =
            serde_json::from_str(r#"{"categories": ["FOODS_1_001", "HOBBIES_1_002"]}"#).unwrap();
        assert!((encoder.encode("HOBBIES_1_002") - 1.0).abs() < f64::EPSILON);
        assert!((encoder.encode("NOPE") + 1.0).abs() < f64::EPSILON);
    }
}
