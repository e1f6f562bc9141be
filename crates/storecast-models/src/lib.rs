//! Model artifacts for Storecast.
//!
//! This crate turns a store identifier into a loaded, validated
//! [`ModelArtifact`]: a scorer plus the fitted preprocessing it was trained
//! with.
//!
//! # Resolution tiers
//!
//! - **Cache**: process-lifetime, keyed by store identifier
//! - **Local**: `<models_dir>/<store_id>.json`
//! - **Remote**: HTTP object store, streamed to disk
//! - **Hub**: dataset archive download, then the hub CLI as a last resort

pub mod artifact;
pub mod cache;
pub mod error;
pub mod layout;
pub mod resolver;
pub mod schema;
pub mod scorers;
pub mod sources;
pub mod store_id;

pub use artifact::{
    ArtifactOrigin, ArtifactPayload, BundlePayload, ItemEncoder, ModelArtifact, StandardScaler,
};
pub use cache::{ArtifactCache, CacheStats};
pub use error::{ArtifactError, ArtifactResult, SourceError};
pub use layout::ArtifactLayout;
pub use resolver::ArtifactResolver;
pub use schema::{
    CANONICAL_FEATURES, ITEM_ID_COLUMN, ITEM_ID_ENCODED_COLUMN, STORE_ID_COLUMN,
    canonical_features,
};
pub use scorers::ScorerSpec;
pub use sources::{ArtifactSource, HubCliSource, HubCredentials, HubSource, RemoteSource};
pub use store_id::StoreId;
