//! Health Check API Handler
//!
//! Health check endpoint for container orchestration and monitoring.

use axum::Json;
use terravision_core::dto::health::HealthStatus;

const SERVICE_NAME: &str = "terravision-api";

/// GET /health
/// Reports service metadata and the current time
pub async fn health_check() -> Json<HealthStatus> {
    tracing::debug!("Health check requested");
    Json(HealthStatus::healthy(SERVICE_NAME, env!("CARGO_PKG_VERSION")))
}
