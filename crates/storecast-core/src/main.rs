//! Storecast Server - Entry Point
//!
//! Starts the HTTP prediction server. `RUST_LOG` filters log output and
//! `STORECAST_LOG_FORMAT=json` switches to JSON lines.

use std::process::ExitCode;

use tracing::{error, info};
use tracing_subscriber::{EnvFilter, Layer, layer::SubscriberExt, util::SubscriberInitExt};

use storecast_core::{config::Config, server};

const DEFAULT_FILTER: &str = "storecast_core=debug,storecast_models=debug,info";

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_FILTER.into());
    let json = std::env::var("STORECAST_LOG_FORMAT").is_ok_and(|format| format == "json");
    let fmt = if json {
        tracing_subscriber::fmt::layer().json().boxed()
    } else {
        tracing_subscriber::fmt::layer().boxed()
    };
    tracing_subscriber::registry().with(filter).with(fmt).init();
}

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();

    let config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "Failed to load configuration");
            return ExitCode::FAILURE;
        }
    };
    info!(
        models_dir = %config.artifacts.models_dir.display(),
        remote = config.artifacts.remote_base_url.as_deref().unwrap_or("-"),
        hub_dataset = config.artifacts.hub_dataset.as_deref().unwrap_or("-"),
        "Configuration loaded"
    );

    match server::run(&config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "Server error");
            ExitCode::FAILURE
        }
    }
}
