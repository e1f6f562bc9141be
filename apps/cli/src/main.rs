//! Storecast CLI - command-line client for the Storecast prediction API.
//!
//! Stands in for the form-based front end: it computes the derived
//! features a single prediction needs, uploads CSV batches, and can inspect
//! artifact files locally.

mod client;
mod commands;
mod derive;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use client::ApiClient;
use commands::predict::PredictArgs;

/// Storecast - per-store sales predictions
#[derive(Parser, Debug)]
#[command(name = "storecast", author, version, about = "Storecast - per-store sales predictions")]
struct Args {
    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "warn", global = true)]
    log_level: String,

    /// Base URL of the prediction API
    #[arg(long, env = "STORECAST_API_URL", default_value = "http://127.0.0.1:8000", global = true)]
    api_url: String,

    /// Request timeout in seconds
    #[arg(long, default_value_t = 10, global = true)]
    timeout: u64,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Predict sales for one item on one day
    ///
    /// Derived features (weekend flags, SNAP interactions, price flag and
    /// the item id decomposition) are computed from the raw inputs.
    Predict(PredictArgs),

    /// Predict every row of a CSV file
    ///
    /// The file must have a header row including a store_id column.
    Batch {
        /// CSV file to upload
        file: PathBuf,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Check that the API is online
    Health,

    /// Load an artifact file locally and print its shape
    Inspect {
        /// Artifact JSON file
        path: PathBuf,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let level = match args.log_level.as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "error" => Level::ERROR,
        _ => Level::WARN,
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .without_time()
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let client = || ApiClient::new(&args.api_url, Duration::from_secs(args.timeout));

    match &args.command {
        Command::Predict(predict) => commands::predict::execute(&client()?, predict).await,
        Command::Batch { file, json } => commands::batch::execute(&client()?, file, *json).await,
        Command::Health => commands::health::execute(&client()?).await,
        Command::Inspect { path, json } => commands::inspect::execute(path, *json).await,
    }
}
