//! API Module
//!
//! HTTP API layer of the service.
//! Each submodule handles endpoints for a specific concern.

pub mod error;
pub mod health;
pub mod terravision;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::service::{
    FileStore, PipelineService, ProcessStreamer, RunObserver, WorkspaceLock,
};

/// State shared by all handlers
#[derive(Clone)]
pub struct AppState {
    pub file_store: FileStore,
    pub pipelines: Arc<PipelineService>,
    pub workspace_lock: WorkspaceLock,
}

impl AppState {
    /// Wires the services for the workspace described by `config`
    pub fn new(config: &Config, observer: Arc<dyn RunObserver>) -> anyhow::Result<Self> {
        let workspace_lock = WorkspaceLock::new();
        let streamer = ProcessStreamer::new(&config.shell, config.output_order, observer.clone());
        let pipelines = PipelineService::new(
            streamer,
            config.pipeline_mode,
            config.transform_invocation()?,
            &config.workspace,
            workspace_lock.clone(),
            observer,
        );

        Ok(Self {
            file_store: FileStore::new(&config.workspace),
            pipelines: Arc::new(pipelines),
            workspace_lock,
        })
    }
}

/// Create the main API router with all endpoints
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(health::health_check))
        // Terravision endpoints
        .route("/terravision/graph", get(terravision::graph))
        // Uploads are not size-capped
        .route(
            "/terravision/write",
            post(terravision::write).layer(DefaultBodyLimit::disable()),
        )
        .route("/terravision/validate", get(terravision::validate))
        .route("/terravision/output", get(terravision::output))
        // Add state and middleware
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}
