//! Configuration module for Storecast Core.
//!
//! Values are layered, lowest precedence first: built-in defaults, the hub
//! credentials in `KAGGLE_USERNAME`/`KAGGLE_KEY`, an optional TOML file
//! (`storecast.toml`, or the path in `STORECAST_CONFIG`), environment
//! variables of the form `STORECAST__SECTION__KEY`, and finally the flat
//! variables `MODELS_DIR`, `MODEL_STORE_URL` and `KAGGLE_DATASET`.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use storecast_models::sources::hub::DEFAULT_HUB_BASE_URL;
use storecast_models::sources::hub_cli::DEFAULT_HUB_CLI;
use storecast_models::{
    ArtifactLayout, ArtifactResolver, HubCliSource, HubCredentials, HubSource, RemoteSource,
};

use crate::error::{Result, StorecastError};

/// Default config file looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "storecast.toml";

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// The address to bind the HTTP server to.
    #[serde(default = "default_address")]
    pub address: SocketAddr,
}

fn default_address() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 8000))
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { address: default_address() }
    }
}

/// Where artifacts live and how to fetch missing ones.
#[derive(Debug, Clone, Deserialize)]
pub struct ArtifactsConfig {
    #[serde(default = "default_models_dir")]
    pub models_dir: PathBuf,
    #[serde(default = "default_extension")]
    pub extension: String,
    /// Remote object store base URL. Remote fetch is skipped when unset.
    #[serde(default)]
    pub remote_base_url: Option<String>,
    #[serde(default = "default_fetch_timeout")]
    pub fetch_timeout_secs: u64,
    /// Dataset hub handle (`owner/name/...`). Both hub tiers are skipped when unset.
    #[serde(default)]
    pub hub_dataset: Option<String>,
    #[serde(default = "default_hub_base_url")]
    pub hub_base_url: String,
    #[serde(default)]
    pub hub_username: Option<String>,
    #[serde(default)]
    pub hub_key: Option<String>,
    #[serde(default = "default_hub_timeout")]
    pub hub_timeout_secs: u64,
    /// Hub CLI program. An empty string disables the CLI tier.
    #[serde(default = "default_hub_cli")]
    pub hub_cli: String,
    #[serde(default = "default_hub_timeout")]
    pub hub_cli_timeout_secs: u64,
}

fn default_models_dir() -> PathBuf {
    PathBuf::from("models")
}

fn default_extension() -> String {
    storecast_models::layout::DEFAULT_EXTENSION.to_string()
}

const fn default_fetch_timeout() -> u64 {
    30
}

const fn default_hub_timeout() -> u64 {
    120
}

fn default_hub_base_url() -> String {
    DEFAULT_HUB_BASE_URL.to_string()
}

fn default_hub_cli() -> String {
    DEFAULT_HUB_CLI.to_string()
}

impl Default for ArtifactsConfig {
    fn default() -> Self {
        Self {
            models_dir: default_models_dir(),
            extension: default_extension(),
            remote_base_url: None,
            fetch_timeout_secs: default_fetch_timeout(),
            hub_dataset: None,
            hub_base_url: default_hub_base_url(),
            hub_username: None,
            hub_key: None,
            hub_timeout_secs: default_hub_timeout(),
            hub_cli: default_hub_cli(),
            hub_cli_timeout_secs: default_hub_timeout(),
        }
    }
}

impl ArtifactsConfig {
    /// # Errors
    /// Returns `StorecastError::Config` describing the first invalid value.
    pub fn validate(&self) -> Result<()> {
        if self.extension.trim_start_matches('.').is_empty() {
            return Err(StorecastError::Config("artifacts.extension must not be empty".into()));
        }
        for (key, secs) in [
            ("fetch_timeout_secs", self.fetch_timeout_secs),
            ("hub_timeout_secs", self.hub_timeout_secs),
            ("hub_cli_timeout_secs", self.hub_cli_timeout_secs),
        ] {
            if secs == 0 {
                return Err(StorecastError::Config(format!("artifacts.{key} must be positive")));
            }
        }
        for (key, url) in [
            ("remote_base_url", self.remote_base_url.as_deref()),
            ("hub_base_url", Some(self.hub_base_url.as_str())),
        ] {
            if let Some(url) = url {
                if !(url.starts_with("http://") || url.starts_with("https://")) {
                    return Err(StorecastError::Config(format!(
                        "artifacts.{key} must be an http(s) URL, got '{url}'"
                    )));
                }
            }
        }
        Ok(())
    }

    fn credentials(&self) -> Option<HubCredentials> {
        match (&self.hub_username, &self.hub_key) {
            (Some(username), Some(key)) => {
                Some(HubCredentials { username: username.clone(), key: key.clone() })
            }
            _ => None,
        }
    }

    /// Builds the resolver with every configured fallback tier, in order:
    /// remote, hub download, hub CLI.
    ///
    /// # Errors
    /// Returns `StorecastError::Config` if a source cannot be constructed.
    pub fn build_resolver(&self) -> Result<ArtifactResolver> {
        self.validate()?;
        let layout = ArtifactLayout::with_extension(self.models_dir.clone(), &self.extension);
        let mut resolver = ArtifactResolver::new(layout);

        if let Some(url) = &self.remote_base_url {
            let remote = RemoteSource::new(url, Duration::from_secs(self.fetch_timeout_secs))
                .map_err(|e| StorecastError::Config(e.to_string()))?;
            resolver = resolver.with_source(remote);
        }

        if let Some(dataset) = &self.hub_dataset {
            let hub = HubSource::new(
                &self.hub_base_url,
                dataset,
                Duration::from_secs(self.hub_timeout_secs),
            )
            .map_err(|e| StorecastError::Config(e.to_string()))?
            .with_credentials(self.credentials());
            resolver = resolver.with_source(hub);

            if !self.hub_cli.is_empty() {
                resolver = resolver.with_source(HubCliSource::new(
                    &self.hub_cli,
                    dataset,
                    Duration::from_secs(self.hub_cli_timeout_secs),
                ));
            }
        }

        Ok(resolver)
    }
}

/// Root configuration for Storecast.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Server configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Artifact configuration.
    #[serde(default)]
    pub artifacts: ArtifactsConfig,
}

impl Config {
    /// Create a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from the process environment and config file.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading fails.
    pub fn load() -> Result<Self> {
        let vars: HashMap<String, String> = std::env::vars().collect();
        let file = vars.get("STORECAST_CONFIG").map_or_else(
            || PathBuf::from(DEFAULT_CONFIG_FILE),
            PathBuf::from,
        );
        Self::load_from(&file, &vars)
    }

    /// Load configuration from an explicit file path and variable snapshot.
    ///
    /// A missing file is not an error; a malformed one is.
    ///
    /// # Errors
    ///
    /// Returns `StorecastError::Config` if any layer is malformed or the
    /// merged result fails validation.
    pub fn load_from(file: &Path, vars: &HashMap<String, String>) -> Result<Self> {
        let mut builder = config::Config::builder();

        for (var, key) in [("KAGGLE_USERNAME", "artifacts.hub_username"), ("KAGGLE_KEY", "artifacts.hub_key")] {
            if let Some(value) = vars.get(var) {
                builder = builder.set_default(key, value.as_str())?;
            }
        }

        builder = builder
            .add_source(config::File::from(file).format(config::FileFormat::Toml).required(false))
            .add_source(
                config::Environment::with_prefix("STORECAST")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true)
                    .source(Some(vars.clone().into_iter().collect())),
            );

        for (var, key) in [
            ("MODELS_DIR", "artifacts.models_dir"),
            ("MODEL_STORE_URL", "artifacts.remote_base_url"),
            ("KAGGLE_DATASET", "artifacts.hub_dataset"),
        ] {
            builder = builder.set_override_option(key, vars.get(var).filter(|v| !v.is_empty()).cloned())?;
        }

        let config: Self = builder.build()?.try_deserialize()?;
        config.artifacts.validate()?;
        Ok(config)
    }
}
