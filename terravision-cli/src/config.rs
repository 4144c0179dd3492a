//! Configuration module
//!
//! Handles CLI configuration: where the API lives and how output is shown.

/// CLI configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// URL of the Terravision API
    pub api_url: String,
    /// Keep ANSI escape sequences in streamed output
    pub raw: bool,
}
