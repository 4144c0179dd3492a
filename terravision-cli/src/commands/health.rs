//! Health check

use anyhow::{Context, Result};
use colored::*;
use terravision_client::TerravisionClient;

use crate::config::Config;

/// Handle `health`
pub async fn handle_health(config: &Config) -> Result<()> {
    let client = TerravisionClient::new(&config.api_url);
    let health = client
        .health()
        .await
        .with_context(|| format!("API at {} is unreachable", config.api_url))?;

    let status = if health.status == "healthy" {
        health.status.green()
    } else {
        health.status.red()
    };

    println!("  {} {}", "▸".cyan(), health.service.bold());
    println!("    Status:    {}", status);
    println!("    Version:   {}", health.version);
    println!(
        "    Checked:   {}",
        health
            .timestamp
            .format("%Y-%m-%d %H:%M:%S")
            .to_string()
            .dimmed()
    );
    Ok(())
}
