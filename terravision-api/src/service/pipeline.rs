//! Pipeline service
//!
//! Picks the pipeline for a request, serializes it against other work on the
//! workspace and hands the output stream back to the handler.

use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use terravision_core::domain::pipeline::{Invocation, Pipeline};
use tracing::{error, info};

use super::observer::RunObserver;
use super::process::{LineStream, ProcessRun, ProcessStreamer, RunStatus, StreamError};
use super::workspace::WorkspaceLock;

/// How pipelines are launched
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PipelineMode {
    /// Every stage is spawned directly, pipes are connected in-process
    #[default]
    Native,
    /// The pipeline is rendered to one command line and run by a shell
    Shell,
}

impl FromStr for PipelineMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "native" => Ok(PipelineMode::Native),
            "shell" => Ok(PipelineMode::Shell),
            other => Err(format!(
                "unknown pipeline mode '{}' (expected 'native' or 'shell')",
                other
            )),
        }
    }
}

/// The pipelines exposed over HTTP
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineKind {
    Validate,
    Graph,
}

/// Runs the fixed pipelines against one workspace
pub struct PipelineService {
    streamer: ProcessStreamer,
    mode: PipelineMode,
    transform: Invocation,
    workspace: PathBuf,
    lock: WorkspaceLock,
    observer: Arc<dyn RunObserver>,
}

impl PipelineService {
    pub fn new(
        streamer: ProcessStreamer,
        mode: PipelineMode,
        transform: Invocation,
        workspace: impl Into<PathBuf>,
        lock: WorkspaceLock,
        observer: Arc<dyn RunObserver>,
    ) -> Self {
        Self {
            streamer,
            mode,
            transform,
            workspace: workspace.into(),
            lock,
            observer,
        }
    }

    /// The pipeline definition behind `kind`
    pub fn pipeline(&self, kind: PipelineKind) -> Pipeline {
        match kind {
            PipelineKind::Validate => Pipeline::validate(),
            PipelineKind::Graph => Pipeline::graph(self.transform.clone()),
        }
    }

    /// Starts a pipeline and returns its output stream
    ///
    /// Waits for the workspace to be free first. The workspace stays locked
    /// until every process of the run has exited, whether or not the stream
    /// is read to the end.
    pub async fn start(&self, kind: PipelineKind) -> Result<LineStream, StreamError> {
        let pipeline = self.pipeline(kind);
        let name = pipeline.name;

        let guard = self.lock.acquire().await;
        info!(
            "Starting '{}' pipeline in {} ({:?} mode)",
            name,
            self.workspace.display(),
            self.mode
        );

        let ProcessRun { lines, finished } = match self.mode {
            PipelineMode::Native => self.streamer.run_pipeline(pipeline, &self.workspace).await?,
            PipelineMode::Shell => {
                let command = pipeline.to_shell_command();
                self.streamer.run(&command, &self.workspace).await?
            }
        };

        let observer = self.observer.clone();
        tokio::spawn(async move {
            let status = finished.await.unwrap_or_else(|e| {
                error!("Pipeline '{}' task failed: {}", name, e);
                RunStatus {
                    exit_code: 1,
                    failed_stage: None,
                }
            });
            drop(guard);
            observer.run_finished(name, &status);
        });

        Ok(lines)
    }
}
