//! Terravision HTTP Client
//!
//! A typed HTTP client for the Terravision API: upload configuration files,
//! run the validate and graph pipelines while reading their output as it is
//! produced, and download the rendered diagram.
//!
//! # Example
//!
//! ```no_run
//! use futures::StreamExt;
//! use terravision_client::TerravisionClient;
//! use terravision_core::domain::config_file::ConfigFileName;
//! use terravision_core::dto::write::WriteFiles;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let client = TerravisionClient::new("http://localhost:8001");
//!
//!     let mut files = WriteFiles::new();
//!     files.insert(ConfigFileName::Main, "resource \"null_resource\" \"x\" {}\n");
//!     client.write_files(&files).await?;
//!
//!     let mut output = client.graph().await?;
//!     while let Some(line) = output.next().await {
//!         println!("{}", line?);
//!     }
//!
//!     let png = client.download_output().await?;
//!     std::fs::write("diagram.png", png)?;
//!     Ok(())
//! }
//! ```

pub mod error;
mod lines;
mod terravision;

// Re-export commonly used types
pub use error::{ClientError, Result};
pub use lines::{LineSplitter, OutputLines};

use reqwest::Client;
use serde::de::DeserializeOwned;

/// HTTP client for the Terravision API
#[derive(Debug, Clone)]
pub struct TerravisionClient {
    /// Base URL of the API (e.g., "http://localhost:8001")
    base_url: String,
    /// HTTP client instance
    client: Client,
}

impl TerravisionClient {
    /// Create a new client
    ///
    /// # Arguments
    /// * `base_url` - The base URL of the API (e.g., "http://localhost:8001")
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(base_url, Client::new())
    }

    /// Create a new client with a custom HTTP client
    ///
    /// This allows you to configure timeouts, proxies, TLS settings, etc.
    /// Pipeline runs can take minutes, so keep any timeout generous.
    pub fn with_client(base_url: impl Into<String>, client: Client) -> Self {
        let base_url = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        }
    }

    /// Get the base URL of the API
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    // =============================================================================
    // Response Handlers
    // =============================================================================

    /// Fails with [`ClientError::ApiError`] unless the response is a success
    async fn check_status(&self, response: reqwest::Response) -> Result<reqwest::Response> {
        let status = response.status();

        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(ClientError::api_error(status.as_u16(), error_text));
        }

        Ok(response)
    }

    /// Handle an API response and deserialize JSON
    async fn handle_response<T: DeserializeOwned>(&self, response: reqwest::Response) -> Result<T> {
        self.check_status(response)
            .await?
            .json()
            .await
            .map_err(|e| ClientError::ParseError(format!("Failed to parse JSON response: {}", e)))
    }
}
