//! Diagram download

use anyhow::{Context, Result};
use colored::*;
use std::path::Path;
use terravision_client::TerravisionClient;

use crate::config::Config;

/// Handle `output <file>`
pub async fn handle_output(file: &Path, config: &Config) -> Result<()> {
    let client = TerravisionClient::new(&config.api_url);
    save_output(&client, file).await
}

/// Downloads the current diagram into `file`
pub async fn save_output(client: &TerravisionClient, file: &Path) -> Result<()> {
    let png = match client.download_output().await {
        Ok(png) => png,
        Err(e) if e.is_not_found() => {
            anyhow::bail!("No diagram yet; run `terravision graph` first")
        }
        Err(e) => return Err(anyhow::Error::new(e).context("Failed to download diagram")),
    };

    tokio::fs::write(file, &png)
        .await
        .with_context(|| format!("Failed to write {}", file.display()))?;

    println!(
        "{} Saved diagram ({} bytes) to {}",
        "✓".green(),
        png.len(),
        file.display().to_string().cyan()
    );
    Ok(())
}
