//! Local artifact inspection. Loads a file the way the server would and
//! reports its shape without contacting the API.

use anyhow::{Context, Result};
use colored::Colorize;
use serde_json::json;
use std::path::Path;
use storecast_models::ModelArtifact;

/// Execute the inspect command.
pub async fn execute(path: &Path, json: bool) -> Result<()> {
    let artifact = ModelArtifact::load(path)
        .await
        .with_context(|| format!("Failed to load artifact {}", path.display()))?;

    let features = artifact.active_features();
    let sha256 = artifact.origin().map(|o| o.sha256.clone()).unwrap_or_default();

    if json {
        let out = json!({
            "path": path.display().to_string(),
            "sha256": sha256,
            "scorer": artifact.scorer().kind(),
            "explicit_features": artifact.explicit_features().is_some(),
            "features": features,
            "scaler": artifact.scaler().map(|s| s.feature_names.clone()),
            "item_encoder": artifact.item_encoder().map(|e| e.categories.len()),
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    println!("{}", "Artifact".bold().cyan());
    println!("  Path:    {}", path.display());
    println!("  SHA-256: {}", sha256.dimmed());
    println!("  Scorer:  {}", artifact.scorer().kind().green());

    let source = if artifact.explicit_features().is_some() { "embedded" } else { "canonical" };
    println!("  Features ({}, {}):", features.len(), source);
    for (i, name) in features.iter().enumerate() {
        println!("    {i:>2}  {name}");
    }

    match artifact.scaler() {
        Some(scaler) => println!("  Scaler:  {} columns", scaler.feature_names.len()),
        None => println!("  Scaler:  {}", "none".dimmed()),
    }
    match artifact.item_encoder() {
        Some(encoder) => println!("  Encoder: {} item ids", encoder.categories.len()),
        None => println!("  Encoder: {}", "none".dimmed()),
    }
    Ok(())
}
