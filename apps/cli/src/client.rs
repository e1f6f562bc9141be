//! Thin HTTP client for the prediction API.

use anyhow::{Context, Result, bail};
use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::time::Duration;
use tracing::debug;

/// One row of a batch response.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BatchPrediction {
    pub index: usize,
    pub store: String,
    pub prediction: i64,
}

#[derive(Debug, Deserialize)]
struct SingleResponse {
    prediction: i64,
}

#[derive(Debug, Deserialize)]
struct BatchResponse {
    predictions: Vec<BatchPrediction>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
}

pub struct ApiClient {
    base_url: String,
    client: Client,
}

impl ApiClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let client =
            Client::builder().timeout(timeout).build().context("Failed to create HTTP client")?;
        Ok(Self { base_url: base_url.trim_end_matches('/').to_string(), client })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    pub async fn health(&self) -> Result<String> {
        let response = self
            .client
            .get(self.url("/health"))
            .send()
            .await
            .with_context(|| format!("Could not reach backend at {}", self.base_url))?;
        let body: Value = check(response).await?.json().await.context("Invalid health response")?;
        Ok(body.get("status").and_then(Value::as_str).unwrap_or("unknown").to_string())
    }

    pub async fn predict_single(&self, payload: &Map<String, Value>) -> Result<i64> {
        debug!(payload = ?payload, "Requesting single prediction");
        let response = self
            .client
            .post(self.url("/predict/single"))
            .json(payload)
            .send()
            .await
            .with_context(|| format!("Could not reach backend at {}", self.base_url))?;
        let body: SingleResponse =
            check(response).await?.json().await.context("Invalid prediction response")?;
        Ok(body.prediction)
    }

    pub async fn predict_batch(&self, csv: String) -> Result<Vec<BatchPrediction>> {
        let response = self
            .client
            .post(self.url("/predict/batch"))
            .header(reqwest::header::CONTENT_TYPE, "text/csv")
            .body(csv)
            .send()
            .await
            .with_context(|| format!("Could not reach backend at {}", self.base_url))?;
        let body: BatchResponse =
            check(response).await?.json().await.context("Invalid batch response")?;
        Ok(body.predictions)
    }
}

/// Turns a non-success response into an error carrying the API's message.
async fn check(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let text = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorBody>(&text).map_or(text, |body| body.error);
    bail!("API returned {}: {}", status.as_u16(), message)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(server: &mockito::ServerGuard) -> ApiClient {
        ApiClient::new(&format!("{}/", server.url()), Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn test_predict_single() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/predict/single")
            .match_body(mockito::Matcher::PartialJson(serde_json::json!({"store_id": "CA_1"})))
            .with_status(200)
            .with_body(r#"{"prediction": 7}"#)
            .create_async()
            .await;

        let mut payload = Map::new();
        payload.insert("store_id".to_string(), Value::from("CA_1"));
        assert_eq!(client(&server).predict_single(&payload).await.unwrap(), 7);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_error_body_is_surfaced() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/predict/batch")
            .with_status(400)
            .with_body(r#"{"error": "Schema error: CSV must include store_id column"}"#)
            .create_async()
            .await;

        let err = client(&server).predict_batch("wday\n1\n".to_string()).await.unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("400"));
        assert!(msg.contains("CSV must include store_id column"));
    }

    #[tokio::test]
    async fn test_health_status() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/health")
            .with_status(200)
            .with_body(r#"{"status": "online"}"#)
            .create_async()
            .await;

        assert_eq!(client(&server).health().await.unwrap(), "online");
    }
}
