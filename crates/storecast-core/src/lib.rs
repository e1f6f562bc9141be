//! Storecast Core: per-store prediction serving.
//!
//! Requests are routed by store identifier to that store's model artifact,
//! normalized into the artifact's feature layout, scored and rounded.

pub mod batch;
pub mod config;
pub mod error;
pub mod features;
pub mod router;
pub mod server;

pub use config::{ArtifactsConfig, Config, ServerConfig};
pub use error::{Result, StorecastError};
pub use features::{Record, coerce, normalize};
pub use router::{PredictionRecord, PredictionRouter, round_prediction};
