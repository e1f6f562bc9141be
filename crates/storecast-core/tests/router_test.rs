//! Integration tests for prediction routing over on-disk artifacts.

use serde_json::{Value, json};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use storecast_core::{PredictionRouter, Record, StorecastError};
use storecast_models::{ArtifactError, ArtifactLayout, ArtifactResolver, RemoteSource};
use tempfile::TempDir;

fn write_artifact(temp: &TempDir, store: &str, payload: &Value) {
    std::fs::write(temp.path().join(format!("{store}.json")), payload.to_string()).unwrap();
}

fn router(temp: &TempDir) -> PredictionRouter {
    let resolver = ArtifactResolver::new(ArtifactLayout::new(temp.path().to_path_buf()));
    PredictionRouter::new(Arc::new(resolver))
}

fn record(value: Value) -> Record {
    serde_json::from_value(value).unwrap()
}

fn records(value: Value) -> Vec<Record> {
    serde_json::from_value(value).unwrap()
}

#[tokio::test]
async fn test_single_prediction_rounds_constant() {
    let temp = TempDir::new().unwrap();
    write_artifact(&temp, "CA_1", &json!({"kind": "constant", "value": 7.4}));

    let prediction = router(&temp)
        .predict_one(&record(json!({"store_id": "CA_1", "wday": 1, "snap": 0})))
        .await
        .unwrap();

    assert_eq!(prediction, 7);
}

#[tokio::test]
async fn test_single_prediction_requires_store_id() {
    let temp = TempDir::new().unwrap();
    let err = router(&temp).predict_one(&record(json!({"wday": 1}))).await.unwrap_err();
    assert!(matches!(err, StorecastError::Schema(_)));
}

#[tokio::test]
async fn test_single_prediction_unknown_store() {
    let temp = TempDir::new().unwrap();
    let err = router(&temp).predict_one(&record(json!({"store_id": "WI_9"}))).await.unwrap_err();
    assert!(matches!(err, StorecastError::Artifact(ArtifactError::NotFound { .. })));
}

#[tokio::test]
async fn test_store_id_is_not_a_feature() {
    let temp = TempDir::new().unwrap();
    write_artifact(
        &temp,
        "101",
        &json!({
            "model": {"kind": "linear", "intercept": 0.0, "coefficients": [1.0, 1.0],
                      "feature_names": ["store_id", "wday"]},
            "features": ["store_id", "wday"]
        }),
    );

    // A numeric store id routes like a string one and is zero as a feature.
    let prediction = router(&temp)
        .predict_one(&record(json!({"store_id": 101, "wday": 3})))
        .await
        .unwrap();

    assert_eq!(prediction, 3);
}

#[tokio::test]
async fn test_batch_partitions_indices_by_store() {
    let temp = TempDir::new().unwrap();
    write_artifact(&temp, "CA_1", &json!({"kind": "constant", "value": 1.0}));
    write_artifact(&temp, "CA_2", &json!({"model": {"kind": "constant", "value": 2.0}}));

    let rows = records(json!([
        {"store_id": "CA_1"}, {"store_id": "CA_2"}, {"store_id": "CA_1"},
        {"store_id": "CA_2"}, {"store_id": "CA_1"}
    ]));
    let results = router(&temp).predict_batch(&rows).await.unwrap();

    assert_eq!(results.len(), rows.len());
    let indices: HashSet<usize> = results.iter().map(|r| r.index).collect();
    assert_eq!(indices, (0..rows.len()).collect());

    let order: Vec<usize> = results.iter().map(|r| r.index).collect();
    assert_eq!(order, vec![0, 2, 4, 1, 3]);
    for result in &results {
        let expected = if result.store_id == "CA_1" { 1 } else { 2 };
        assert_eq!(result.prediction, expected);
        assert_eq!(rows[result.index]["store_id"], json!(result.store_id));
    }
}

#[tokio::test]
async fn test_batch_with_missing_store_fails_as_a_whole() {
    let temp = TempDir::new().unwrap();
    write_artifact(&temp, "CA_1", &json!({"kind": "constant", "value": 3.0}));

    let rows = records(json!([{"store_id": "CA_1"}, {"store_id": "TX_1"}, {"store_id": "CA_1"}]));
    let err = router(&temp).predict_batch(&rows).await.unwrap_err();

    match err {
        StorecastError::Artifact(ArtifactError::NotFound { store_id, .. }) => {
            assert_eq!(store_id, "TX_1");
        }
        other => panic!("expected NotFound, got {other:?}"),
    }
}

#[tokio::test]
async fn test_batch_without_store_column_fails_before_resolution() {
    let mut server = mockito::Server::new_async().await;
    let mock = server.mock("GET", mockito::Matcher::Any).expect(0).create_async().await;

    let temp = TempDir::new().unwrap();
    let resolver = ArtifactResolver::new(ArtifactLayout::new(temp.path().to_path_buf()))
        .with_source(RemoteSource::new(&server.url(), Duration::from_secs(5)).unwrap());
    let router = PredictionRouter::new(Arc::new(resolver));

    let err = router.predict_batch(&records(json!([{"wday": 1}, {"wday": 2}]))).await.unwrap_err();

    assert!(matches!(err, StorecastError::Schema(_)));
    mock.assert_async().await;
}

#[tokio::test]
async fn test_bare_and_wrapped_artifacts_predict_identically() {
    let temp = TempDir::new().unwrap();
    let scorer = json!({
        "kind": "tree_ensemble",
        "base_score": 0.5,
        "trees": [{"nodes": [
            {"feature": 10, "threshold": 2.0, "left": 1, "right": 2},
            {"value": 10.0},
            {"value": 3.0}
        ]}]
    });
    write_artifact(&temp, "TX_1", &scorer);
    write_artifact(&temp, "TX_2", &json!({"model": scorer}));

    let router = router(&temp);
    for price in [1.0, 2.0, 5.5] {
        let bare = router
            .predict_one(&record(json!({"store_id": "TX_1", "sell_price": price})))
            .await
            .unwrap();
        let wrapped = router
            .predict_one(&record(json!({"store_id": "TX_2", "sell_price": price})))
            .await
            .unwrap();
        assert_eq!(bare, wrapped);
    }
}

#[tokio::test]
async fn test_scaler_leaves_boolean_columns_untouched() {
    let temp = TempDir::new().unwrap();
    write_artifact(
        &temp,
        "WI_1",
        &json!({
            "model": {"kind": "linear", "intercept": 0.0, "coefficients": [10.0, 100.0],
                      "feature_names": ["sell_price", "is_event"]},
            "scaler": {"feature_names": ["sell_price", "is_event"], "mean": [1.0, 0.5], "scale": [2.0, 0.5]},
            "features": ["sell_price", "is_event"]
        }),
    );

    let router = router(&temp);
    // sell_price: (3 - 1) / 2 = 1 → 10; is_event stays 1 → 100.
    let prediction = router
        .predict_one(&record(json!({"store_id": "WI_1", "sell_price": 3, "is_event": true})))
        .await
        .unwrap();
    assert_eq!(prediction, 110);

    // A numeric is_event is scaled: (0 - 0.5) / 0.5 = -1 → -100.
    let prediction = router
        .predict_one(&record(json!({"store_id": "WI_1", "sell_price": 1, "is_event": 0})))
        .await
        .unwrap();
    assert_eq!(prediction, -100);
}

#[tokio::test]
async fn test_empty_batch_yields_no_records() {
    let temp = TempDir::new().unwrap();
    assert!(router(&temp).predict_batch(&[]).await.unwrap().is_empty());
}
