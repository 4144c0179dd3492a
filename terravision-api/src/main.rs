use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use terravision_api::api::{self, AppState};
use terravision_api::config::Config;
use terravision_api::service::TracingObserver;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "terravision_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Terravision API...");

    let config = Config::from_env().context("Failed to load configuration")?;
    config.validate()?;

    info!(
        "Workspace: {}, pipeline mode: {:?}, output order: {:?}",
        config.workspace.display(),
        config.pipeline_mode,
        config.output_order
    );
    info!("Transform command: {}", config.transform_command);

    let state = AppState::new(&config, Arc::new(TracingObserver))?;
    let app = api::create_router(state);

    info!("Listening on {}", config.bind_addr);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", config.bind_addr))?;

    axum::serve(listener, app)
        .await
        .context("Failed to start server")?;

    Ok(())
}
