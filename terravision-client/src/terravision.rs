//! Terravision API endpoints

use terravision_core::dto::health::HealthStatus;
use terravision_core::dto::write::{WriteFiles, WriteResponse};

use crate::TerravisionClient;
use crate::error::{ClientError, Result};
use crate::lines::OutputLines;

impl TerravisionClient {
    // =============================================================================
    // Configuration Files
    // =============================================================================

    /// Upload configuration files
    ///
    /// Files absent from `files` keep whatever content the server already
    /// has for them.
    pub async fn write_files(&self, files: &WriteFiles) -> Result<()> {
        let url = format!("{}/terravision/write", self.base_url);
        tracing::debug!("Uploading {} file(s) to {}", files.len(), url);

        let response = self.client.post(&url).json(files).send().await?;
        let body: WriteResponse = self.handle_response(response).await?;

        if !body.success {
            return Err(ClientError::ParseError(
                "write endpoint answered without success".to_string(),
            ));
        }

        Ok(())
    }

    // =============================================================================
    // Pipelines
    // =============================================================================

    /// Run `terraform init` + `terraform validate`, streaming the output
    ///
    /// A failing validation is not an error here: its message arrives as
    /// lines of the returned stream.
    pub async fn validate(&self) -> Result<OutputLines> {
        self.stream("validate").await
    }

    /// Run the full diagram pipeline, streaming the output
    pub async fn graph(&self) -> Result<OutputLines> {
        self.stream("graph").await
    }

    async fn stream(&self, pipeline: &str) -> Result<OutputLines> {
        let url = format!("{}/terravision/{}", self.base_url, pipeline);
        let response = self.client.get(&url).send().await?;
        let response = self.check_status(response).await?;

        Ok(OutputLines::new(response.bytes_stream()))
    }

    // =============================================================================
    // Artifacts
    // =============================================================================

    /// Download the diagram produced by the last graph run
    pub async fn download_output(&self) -> Result<Vec<u8>> {
        let url = format!("{}/terravision/output", self.base_url);
        let response = self.client.get(&url).send().await?;
        let response = self.check_status(response).await?;

        Ok(response.bytes().await?.to_vec())
    }

    /// Check service health
    pub async fn health(&self) -> Result<HealthStatus> {
        let url = format!("{}/health", self.base_url);
        let response = self.client.get(&url).send().await?;

        self.handle_response(response).await
    }
}
