//! Terravision API Handlers
//!
//! Endpoints for uploading configuration, running the validate and graph
//! pipelines, and fetching the rendered diagram.
//!
//! Pipeline endpoints answer 200 as soon as the run has started; a tool
//! failing later only shows up as text in the streamed body.

use axum::{
    Json,
    body::{Body, Bytes},
    extract::State,
    http::header,
    response::{IntoResponse, Response},
};
use futures::StreamExt;
use std::convert::Infallible;
use terravision_core::dto::write::WriteResponse;

use crate::api::AppState;
use crate::api::error::{ApiError, ApiResult};
use crate::service::{FileStoreError, LineStream, PipelineKind, WriteError, write_config_files};

/// GET /terravision/graph
/// Run init, validate and render the diagram, streaming tool output
pub async fn graph(State(state): State<AppState>) -> ApiResult<Response> {
    tracing::info!("Starting Terraform graph generation workflow");
    run_pipeline(&state, PipelineKind::Graph).await
}

/// GET /terravision/validate
/// Run init and validate, streaming tool output
pub async fn validate(State(state): State<AppState>) -> ApiResult<Response> {
    tracing::info!("Starting Terraform validation workflow");
    run_pipeline(&state, PipelineKind::Validate).await
}

/// POST /terravision/write
/// Store the configuration files carried in the JSON body
pub async fn write(State(state): State<AppState>, body: Bytes) -> ApiResult<Json<WriteResponse>> {
    tracing::info!("Raw request data length: {} bytes", body.len());

    write_config_files(&state.file_store, &state.workspace_lock, &body)
        .await
        .map_err(|e| match e {
            WriteError::InvalidJson(ref err) => {
                tracing::error!("JSON decode error: {}", err);
                ApiError::BadRequest(e.to_string())
            }
            WriteError::NotAnObject | WriteError::MissingValue(_) | WriteError::InvalidValue(_) => {
                ApiError::BadRequest(e.to_string())
            }
            WriteError::Store(err) => ApiError::InternalError(err.to_string()),
        })?;

    Ok(Json(WriteResponse { success: true }))
}

/// GET /terravision/output
/// Return the diagram rendered by the last graph run
pub async fn output(State(state): State<AppState>) -> ApiResult<Response> {
    let _guard = state.workspace_lock.acquire().await;

    let bytes = state
        .file_store
        .read_artifact()
        .await
        .map_err(|e| match e {
            FileStoreError::ArtifactMissing(path) => {
                tracing::debug!("No diagram at {}", path.display());
                ApiError::NotFound("Diagram has not been generated yet".to_string())
            }
            FileStoreError::Io { .. } => ApiError::InternalError(e.to_string()),
        })?;

    Ok(([(header::CONTENT_TYPE, "image/png")], bytes).into_response())
}

async fn run_pipeline(state: &AppState, kind: PipelineKind) -> ApiResult<Response> {
    let lines = state.pipelines.start(kind).await.map_err(|e| {
        tracing::error!("Failed to start {:?} pipeline: {}", kind, e);
        ApiError::InternalError(format!("Unexpected error: {}", e))
    })?;

    Ok(stream_response(lines))
}

/// Streams each output line, newline terminated, as a plain-text body
fn stream_response(lines: LineStream) -> Response {
    let chunks = lines.map(|line| Ok::<_, Infallible>(format!("{}\n", line.text)));

    (
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        Body::from_stream(chunks),
    )
        .into_response()
}
