//! Prediction routing: single records and store-partitioned batches.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use storecast_abstraction::ScoreError;
use storecast_models::{ArtifactResolver, ModelArtifact, STORE_ID_COLUMN, StoreId};
use tracing::{debug, info};

use crate::error::{Result, StorecastError};
use crate::features::{Record, normalize};

/// One batch result row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PredictionRecord {
    /// Position of the row in the submitted batch.
    pub index: usize,
    #[serde(rename = "store")]
    pub store_id: String,
    pub prediction: i64,
}

/// Rounds half-way cases to the nearest even integer.
#[must_use]
pub fn round_prediction(score: f64) -> i64 {
    score.round_ties_even() as i64
}

fn store_key(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Dispatches inputs to the artifact of the store they belong to.
#[derive(Debug, Clone)]
pub struct PredictionRouter {
    resolver: Arc<ArtifactResolver>,
}

impl PredictionRouter {
    #[must_use]
    pub fn new(resolver: Arc<ArtifactResolver>) -> Self {
        Self { resolver }
    }

    #[must_use]
    pub fn resolver(&self) -> &Arc<ArtifactResolver> {
        &self.resolver
    }

    /// Predicts one record. `store_id` selects the artifact and is not a feature.
    ///
    /// # Errors
    /// - `StorecastError::Schema` if the record has no usable `store_id`
    /// - `StorecastError::Artifact` if the store's artifact cannot be resolved
    /// - `StorecastError::Prediction` if scoring fails
    pub async fn predict_one(&self, record: &Record) -> Result<i64> {
        let raw = record
            .get(STORE_ID_COLUMN)
            .and_then(store_key)
            .ok_or_else(|| StorecastError::schema("record must include store_id"))?;
        let store_id = StoreId::new(raw)?;

        let mut features = record.clone();
        features.remove(STORE_ID_COLUMN);

        let artifact = self.resolver.resolve(&store_id).await?;
        let predictions = score(&store_id, &artifact, &[features])?;
        let prediction = predictions[0];
        debug!(store_id = %store_id, prediction, "Single prediction");
        Ok(prediction)
    }

    /// Predicts a batch, one artifact per store.
    ///
    /// Rows are grouped by store in first-seen order and each group is
    /// scored as one matrix. Results come back grouped by store, each
    /// carrying its original row index. Any failure aborts the whole batch.
    ///
    /// # Errors
    /// - `StorecastError::Schema` if any row lacks `store_id`, before any resolution
    /// - `StorecastError::Artifact` / `StorecastError::Prediction` for the first failing store
    pub async fn predict_batch(&self, rows: &[Record]) -> Result<Vec<PredictionRecord>> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }
        if !rows.iter().any(|row| row.contains_key(STORE_ID_COLUMN)) {
            return Err(StorecastError::schema("batch must include a store_id column"));
        }

        let groups = group_by_store(rows)?;
        info!(rows = rows.len(), stores = groups.len(), "Routing batch");

        let mut results = Vec::with_capacity(rows.len());
        for (store_id, indices) in groups {
            let artifact = self.resolver.resolve(&store_id).await?;
            let group_rows: Vec<Record> = indices
                .iter()
                .map(|&i| {
                    let mut row = rows[i].clone();
                    row.remove(STORE_ID_COLUMN);
                    row
                })
                .collect();

            let predictions = score(&store_id, &artifact, &group_rows)?;
            debug!(store_id = %store_id, rows = indices.len(), "Scored store group");
            results.extend(indices.into_iter().zip(predictions).map(|(index, prediction)| {
                PredictionRecord { index, store_id: store_id.to_string(), prediction }
            }));
        }
        Ok(results)
    }
}

/// Partitions row indices by store, keeping first-seen store order.
fn group_by_store(rows: &[Record]) -> Result<Vec<(StoreId, Vec<usize>)>> {
    let mut groups: Vec<(StoreId, Vec<usize>)> = Vec::new();
    let mut positions: HashMap<String, usize> = HashMap::new();

    for (index, row) in rows.iter().enumerate() {
        let raw = row.get(STORE_ID_COLUMN).and_then(store_key).ok_or_else(|| {
            StorecastError::Schema(format!("row {index} has no store_id value"))
        })?;
        if let Some(&pos) = positions.get(&raw) {
            groups[pos].1.push(index);
        } else {
            positions.insert(raw.clone(), groups.len());
            groups.push((StoreId::new(raw)?, vec![index]));
        }
    }
    Ok(groups)
}

/// Normalizes, scores and rounds one store's rows.
fn score(store_id: &StoreId, artifact: &ModelArtifact, rows: &[Record]) -> Result<Vec<i64>> {
    let prediction_error =
        |source: ScoreError| StorecastError::Prediction { store_id: store_id.to_string(), source };

    let matrix = normalize(rows, artifact);
    let scores = artifact.scorer().predict(&matrix).map_err(prediction_error)?;

    if scores.len() != rows.len() {
        return Err(prediction_error(ScoreError::InvalidOutput(format!(
            "scorer returned {} values for {} rows",
            scores.len(),
            rows.len()
        ))));
    }
    if let Some(pos) = scores.iter().position(|s| !s.is_finite()) {
        return Err(prediction_error(ScoreError::InvalidOutput(format!(
            "non-finite score {} at row {pos}",
            scores[pos]
        ))));
    }
    Ok(scores.into_iter().map(round_prediction).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use storecast_abstraction::{FeatureMatrix, Scorer};
    use storecast_models::scorers::ConstantScorer;

    #[derive(Debug)]
    struct FixedOutput(Vec<f64>);

    impl Scorer for FixedOutput {
        fn predict(&self, _features: &FeatureMatrix) -> std::result::Result<Vec<f64>, ScoreError> {
            Ok(self.0.clone())
        }

        fn kind(&self) -> &str {
            "fixed"
        }
    }

    fn rows(value: Value) -> Vec<Record> {
        serde_json::from_value(value).unwrap()
    }

    fn id() -> StoreId {
        StoreId::new("CA_1").unwrap()
    }

    #[test]
    fn test_round_prediction_ties_to_even() {
        assert_eq!(round_prediction(7.4), 7);
        assert_eq!(round_prediction(7.6), 8);
        assert_eq!(round_prediction(2.5), 2);
        assert_eq!(round_prediction(3.5), 4);
        assert_eq!(round_prediction(-0.5), 0);
    }

    #[test]
    fn test_group_by_store_first_seen_order() {
        let input = rows(json!([
            {"store_id": "TX_1"}, {"store_id": "CA_1"}, {"store_id": "TX_1"}, {"store_id": "CA_1"}
        ]));
        let groups = group_by_store(&input).unwrap();
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].0.as_str(), "TX_1");
        assert_eq!(groups[0].1, vec![0, 2]);
        assert_eq!(groups[1].0.as_str(), "CA_1");
        assert_eq!(groups[1].1, vec![1, 3]);
    }

    #[test]
    fn test_group_by_store_rejects_blank_store() {
        let input = rows(json!([{"store_id": "CA_1"}, {"store_id": ""}]));
        assert!(matches!(group_by_store(&input), Err(StorecastError::Schema(_))));

        let input = rows(json!([{"store_id": "CA_1"}, {"store_id": "../etc"}]));
        assert!(matches!(group_by_store(&input), Err(StorecastError::Artifact(_))));
    }

    #[test]
    fn test_score_rounds_constant() {
        let artifact = ModelArtifact::new(Arc::new(ConstantScorer::new(7.4)));
        let out = score(&id(), &artifact, &rows(json!([{}, {"wday": 1}]))).unwrap();
        assert_eq!(out, vec![7, 7]);
    }

    #[test]
    fn test_score_rejects_wrong_output_count() {
        let artifact = ModelArtifact::new(Arc::new(FixedOutput(vec![1.0])));
        let err = score(&id(), &artifact, &rows(json!([{}, {}]))).unwrap_err();
        assert!(matches!(
            err,
            StorecastError::Prediction { source: ScoreError::InvalidOutput(_), .. }
        ));
    }

    #[test]
    fn test_score_rejects_non_finite() {
        let artifact = ModelArtifact::new(Arc::new(FixedOutput(vec![1.0, f64::NAN])));
        let err = score(&id(), &artifact, &rows(json!([{}, {}]))).unwrap_err();
        assert!(err.to_string().contains("row 1"));
    }
}
