//! Commands module
//!
//! Defines all CLI commands and their handlers.

mod files;
mod health;
mod output;
mod pipeline;

use anyhow::Result;
use clap::Subcommand;
use std::path::PathBuf;

use crate::config::Config;

/// Top-level CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Upload the configuration files found in a directory
    Write {
        /// Directory holding main.tf, variables.tf and/or terraform.tfvars
        dir: PathBuf,
    },
    /// Run terraform init and validate on the server
    Validate {
        /// Upload the files in this directory first
        #[arg(short, long)]
        dir: Option<PathBuf>,
    },
    /// Generate the architecture diagram
    Graph {
        /// Upload the files in this directory first
        #[arg(short, long)]
        dir: Option<PathBuf>,

        /// Save the rendered diagram to this file once the run succeeds
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
    /// Download the diagram from the last graph run
    Output {
        /// Destination PNG file
        file: PathBuf,
    },
    /// Check API health
    Health,
}

/// Handle a CLI command
///
/// Routes the command to the appropriate handler module.
///
/// # Arguments
/// * `command` - The command to execute
/// * `config` - The CLI configuration
pub async fn handle_command(command: Commands, config: &Config) -> Result<()> {
    match command {
        Commands::Write { dir } => files::handle_write(&dir, config).await,
        Commands::Validate { dir } => pipeline::handle_validate(dir.as_deref(), config).await,
        Commands::Graph { dir, out } => {
            pipeline::handle_graph(dir.as_deref(), out.as_deref(), config).await
        }
        Commands::Output { file } => output::handle_output(&file, config).await,
        Commands::Health => health::handle_health(config).await,
    }
}
