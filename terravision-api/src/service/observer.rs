//! Pipeline run observation
//!
//! The executor reports stage progress to an injected observer rather than
//! writing to the global logger directly.

use terravision_core::domain::pipeline::Stage;
use tracing::{debug, info, warn};

use super::process::RunStatus;

/// Receives progress events from pipeline runs
pub trait RunObserver: Send + Sync {
    /// A stage is about to run
    fn stage_started(&self, pipeline: &str, index: usize, stage: &Stage);

    /// A stage finished with the given exit code
    fn stage_finished(&self, pipeline: &str, index: usize, exit_code: i32);

    /// The whole run finished (after its last stage, or after the failing one)
    fn run_finished(&self, pipeline: &str, status: &RunStatus);
}

/// Observer forwarding events to `tracing`
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl RunObserver for TracingObserver {
    fn stage_started(&self, pipeline: &str, index: usize, stage: &Stage) {
        debug!("[{}] stage {}: {}", pipeline, index + 1, stage);
    }

    fn stage_finished(&self, pipeline: &str, index: usize, exit_code: i32) {
        if exit_code == 0 {
            debug!("[{}] stage {} completed", pipeline, index + 1);
        } else {
            warn!(
                "[{}] stage {} exited with code {}",
                pipeline,
                index + 1,
                exit_code
            );
        }
    }

    fn run_finished(&self, pipeline: &str, status: &RunStatus) {
        if status.success() {
            info!("Pipeline '{}' completed successfully", pipeline);
        } else {
            warn!(
                "Pipeline '{}' failed with exit code {}",
                pipeline, status.exit_code
            );
        }
    }
}
