//! Terravision CLI
//!
//! Command-line interface for the Terravision API.

mod ansi;
mod commands;
mod config;

use anyhow::Result;
use clap::Parser;
use commands::{Commands, handle_command};
use config::Config;

#[derive(Parser)]
#[command(name = "terravision")]
#[command(about = "Terraform diagram generation CLI", long_about = None)]
struct Cli {
    /// Terravision API URL
    #[arg(long, env = "TERRAVISION_API_URL", default_value = "http://localhost:8001")]
    api_url: String,

    /// Print pipeline output exactly as received, colour codes included
    #[arg(long, global = true)]
    raw: bool,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = Config {
        api_url: cli.api_url,
        raw: cli.raw,
    };

    handle_command(cli.command, &config).await
}
