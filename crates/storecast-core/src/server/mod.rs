//! Server module for Storecast Core.
//!
//! This module contains the HTTP routes and the mapping from core errors to
//! status codes.

pub mod logging;

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{FromRequest, Multipart, Request, State};
use http::{HeaderMap, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{Value, json};
use storecast_models::CacheStats;
use tower_http::cors::CorsLayer;
use tracing::{debug, error, info, warn};

use crate::batch::parse_csv;
use crate::config::Config;
use crate::error::{Result, StorecastError};
use crate::features::Record;
use crate::router::PredictionRouter;
use logging::RequestLoggerLayer;

/// Shared handler state.
#[derive(Debug, Clone)]
pub struct AppState {
    router: Arc<PredictionRouter>,
}

impl AppState {
    #[must_use]
    pub fn new(router: Arc<PredictionRouter>) -> Self {
        Self { router }
    }
}

impl IntoResponse for StorecastError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            error!(error = %self, status = status.as_u16(), "Request failed");
        } else {
            warn!(error = %self, status = status.as_u16(), "Request rejected");
        }
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

/// Form field carrying the CSV in a multipart batch upload.
pub const UPLOAD_FIELD: &str = "file";

/// Builds the application router. Cross-origin requests are allowed from
/// any origin so browser front ends can call the API directly.
pub fn app(router: Arc<PredictionRouter>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/stats", get(stats))
        .route("/predict/single", post(predict_single))
        .route("/predict/batch", post(predict_batch))
        .layer(CorsLayer::permissive())
        .layer(RequestLoggerLayer)
        .with_state(AppState::new(router))
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "online" }))
}

async fn stats(State(state): State<AppState>) -> Json<CacheStats> {
    Json(state.router.resolver().stats())
}

async fn predict_single(State(state): State<AppState>, body: Bytes) -> Result<Json<Value>> {
    let value: Value = serde_json::from_slice(&body)
        .map_err(|e| StorecastError::Schema(format!("request body is not valid JSON: {e}")))?;
    let Value::Object(record) = value else {
        return Err(StorecastError::Schema("request body must be a JSON object".to_string()));
    };

    let prediction = state.router.predict_one(&record).await?;
    Ok(Json(json!({ "prediction": prediction })))
}

/// Accepts either a multipart form with a `file` part or a raw CSV body.
async fn predict_batch(State(state): State<AppState>, request: Request) -> Result<Json<Value>> {
    let csv = if is_multipart(request.headers()) {
        let multipart = Multipart::from_request(request, &state)
            .await
            .map_err(|e| StorecastError::Schema(format!("invalid multipart upload: {e}")))?;
        read_upload(multipart).await?
    } else {
        Bytes::from_request(request, &state)
            .await
            .map_err(|e| StorecastError::Schema(format!("could not read request body: {e}")))?
    };

    let rows: Vec<Record> = parse_csv(csv.as_ref())?;
    let predictions = state.router.predict_batch(&rows).await?;
    Ok(Json(json!({ "predictions": predictions })))
}

fn is_multipart(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.to_ascii_lowercase().starts_with("multipart/form-data"))
}

async fn read_upload(mut multipart: Multipart) -> Result<Bytes> {
    let invalid = |e: axum::extract::multipart::MultipartError| {
        StorecastError::Schema(format!("invalid multipart upload: {e}"))
    };
    while let Some(field) = multipart.next_field().await.map_err(invalid)? {
        if field.name() == Some(UPLOAD_FIELD) {
            debug!(file_name = ?field.file_name(), "Reading uploaded CSV");
            return field.bytes().await.map_err(invalid);
        }
    }
    Err(StorecastError::Schema(format!("multipart upload must include a '{UPLOAD_FIELD}' field")))
}

/// Start the Storecast HTTP server.
///
/// # Errors
///
/// Returns an error if the resolver cannot be built or the server fails to
/// bind to the configured address.
pub async fn run(config: &Config) -> Result<()> {
    let resolver = config.artifacts.build_resolver()?;
    info!(
        models_dir = %config.artifacts.models_dir.display(),
        sources = ?resolver.source_names(),
        "Artifact resolver ready"
    );
    let router = Arc::new(PredictionRouter::new(Arc::new(resolver)));

    let listener = tokio::net::TcpListener::bind(config.server.address).await?;
    info!(addr = %config.server.address, "Starting HTTP server");

    axum::serve(listener, app(router)).with_graceful_shutdown(shutdown_signal()).await?;
    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
