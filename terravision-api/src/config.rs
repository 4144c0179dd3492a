//! API configuration
//!
//! Defines the configurable parameters of the service: where it listens,
//! which directory holds the Terraform workspace, and how pipelines are
//! launched and their output ordered.

use std::path::PathBuf;

use terravision_core::domain::pipeline::{DEFAULT_TRANSFORM_COMMAND, Invocation};

use crate::service::{OutputOrder, PipelineMode};

/// API configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Address the HTTP server binds to (e.g., "0.0.0.0:8001")
    pub bind_addr: String,

    /// Directory holding the configuration files and the rendered diagram
    pub workspace: PathBuf,

    /// Command line of the graph transform program
    pub transform_command: String,

    /// Whether pipelines run as an explicit process graph or through a shell
    pub pipeline_mode: PipelineMode,

    /// How stdout and stderr lines are ordered in streamed responses
    pub output_order: OutputOrder,

    /// Shell used when `pipeline_mode` is `Shell`
    pub shell: String,
}

impl Config {
    /// Creates a new configuration with defaults for the given workspace
    pub fn new(workspace: impl Into<PathBuf>) -> Self {
        Self {
            bind_addr: "0.0.0.0:8001".to_string(),
            workspace: workspace.into(),
            transform_command: DEFAULT_TRANSFORM_COMMAND.to_string(),
            pipeline_mode: PipelineMode::Native,
            output_order: OutputOrder::Interleaved,
            shell: "sh".to_string(),
        }
    }

    /// Creates configuration from environment variables
    ///
    /// Expected environment variables (all optional):
    /// - TERRAVISION_BIND_ADDR (default: 0.0.0.0:8001)
    /// - TERRAVISION_WORKSPACE (default: ./data)
    /// - TERRAVISION_TRANSFORM_CMD (default: node ../index.js)
    /// - TERRAVISION_PIPELINE_MODE (native | shell, default: native)
    /// - TERRAVISION_OUTPUT_ORDER (interleaved | sequential, default: interleaved)
    /// - TERRAVISION_SHELL (default: sh)
    pub fn from_env() -> anyhow::Result<Self> {
        let mut config = Self::default();

        if let Ok(addr) = std::env::var("TERRAVISION_BIND_ADDR") {
            config.bind_addr = addr;
        }

        if let Ok(workspace) = std::env::var("TERRAVISION_WORKSPACE") {
            config.workspace = PathBuf::from(workspace);
        }

        if let Ok(command) = std::env::var("TERRAVISION_TRANSFORM_CMD") {
            config.transform_command = command;
        }

        if let Ok(mode) = std::env::var("TERRAVISION_PIPELINE_MODE") {
            config.pipeline_mode = mode
                .parse()
                .map_err(|e| anyhow::anyhow!("TERRAVISION_PIPELINE_MODE: {}", e))?;
        }

        if let Ok(order) = std::env::var("TERRAVISION_OUTPUT_ORDER") {
            config.output_order = order
                .parse()
                .map_err(|e| anyhow::anyhow!("TERRAVISION_OUTPUT_ORDER: {}", e))?;
        }

        if let Ok(shell) = std::env::var("TERRAVISION_SHELL") {
            config.shell = shell;
        }

        Ok(config)
    }

    /// Sets how pipelines are launched
    pub fn with_pipeline_mode(mut self, mode: PipelineMode) -> Self {
        self.pipeline_mode = mode;
        self
    }

    /// Sets how streamed output is ordered
    pub fn with_output_order(mut self, order: OutputOrder) -> Self {
        self.output_order = order;
        self
    }

    /// Sets the graph transform command line
    pub fn with_transform_command(mut self, command: impl Into<String>) -> Self {
        self.transform_command = command.into();
        self
    }

    /// Sets the shell used in shell pipeline mode
    pub fn with_shell(mut self, shell: impl Into<String>) -> Self {
        self.shell = shell.into();
        self
    }

    /// The transform command parsed into an invocation
    pub fn transform_invocation(&self) -> anyhow::Result<Invocation> {
        Invocation::parse(&self.transform_command)
            .ok_or_else(|| anyhow::anyhow!("transform_command cannot be empty"))
    }

    /// Validates the configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.bind_addr.is_empty() {
            anyhow::bail!("bind_addr cannot be empty");
        }

        if self.workspace.as_os_str().is_empty() {
            anyhow::bail!("workspace cannot be empty");
        }

        self.transform_invocation()?;

        if self.pipeline_mode == PipelineMode::Shell && self.shell.trim().is_empty() {
            anyhow::bail!("shell cannot be empty in shell pipeline mode");
        }

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new("./data")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.bind_addr, "0.0.0.0:8001");
        assert_eq!(config.workspace, PathBuf::from("./data"));
        assert_eq!(config.pipeline_mode, PipelineMode::Native);
        assert_eq!(config.output_order, OutputOrder::Interleaved);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let mut config = Config::default();
        assert!(config.validate().is_ok());

        config.transform_command = "   ".to_string();
        assert!(config.validate().is_err());

        config.transform_command = "python3 transform.py".to_string();
        assert!(config.validate().is_ok());

        config.bind_addr = String::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_shell_mode_requires_shell() {
        let config = Config::default()
            .with_pipeline_mode(PipelineMode::Shell)
            .with_shell("");
        assert!(config.validate().is_err());

        let config = config.with_shell("bash");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_transform_invocation() {
        let config = Config::default().with_transform_command("node ../index.js");
        let invocation = config.transform_invocation().unwrap();
        assert_eq!(invocation.program, "node");
        assert_eq!(invocation.args, vec!["../index.js"]);
    }
}
