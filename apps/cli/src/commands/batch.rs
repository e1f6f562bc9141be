//! Batch prediction from a CSV file.

use anyhow::{Context, Result};
use colored::Colorize;
use comfy_table::{Cell, Color, Table};
use std::path::Path;

use crate::client::{ApiClient, BatchPrediction};

/// Execute the batch command.
pub async fn execute(client: &ApiClient, file: &Path, json: bool) -> Result<()> {
    let csv = tokio::fs::read_to_string(file)
        .await
        .with_context(|| format!("Failed to read {}", file.display()))?;

    let predictions = client.predict_batch(csv).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&predictions)?);
    } else {
        print_table(&predictions);
    }
    Ok(())
}

fn print_table(predictions: &[BatchPrediction]) {
    if predictions.is_empty() {
        println!("{}", "No rows in batch".yellow());
        return;
    }

    let mut table = Table::new();
    table.set_header(vec!["Index", "Store", "Prediction"]);
    for row in predictions {
        table.add_row(vec![
            Cell::new(row.index.to_string()),
            Cell::new(&row.store).fg(Color::Cyan),
            Cell::new(row.prediction.to_string()).fg(Color::Green),
        ]);
    }
    println!("{table}");
    println!("{} predictions", predictions.len().to_string().bold());
}
