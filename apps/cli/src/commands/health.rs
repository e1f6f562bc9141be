//! Health command implementation.

use anyhow::Result;
use colored::Colorize;

use crate::client::ApiClient;

/// Execute the health command.
pub async fn execute(client: &ApiClient) -> Result<()> {
    let status = client.health().await?;
    if status == "online" {
        println!("API status: {}", status.green());
    } else {
        println!("API status: {}", status.yellow());
    }
    Ok(())
}
