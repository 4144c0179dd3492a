//! Service layer
//!
//! Services contain the logic behind the HTTP handlers: persisting
//! configuration files, launching pipelines and relaying their output.
//!
//! Observability of pipeline runs goes through the `RunObserver` trait so
//! tests can record stage events instead of reading logs.

mod config_files;
mod executor;
mod file_store;
mod observer;
mod pipeline;
mod process;
mod workspace;

pub use config_files::{WriteError, parse_write_request, write_config_files};
pub use file_store::{FileStore, FileStoreError};
pub use observer::{RunObserver, TracingObserver};
pub use pipeline::{PipelineKind, PipelineMode, PipelineService};
pub use process::{
    LineStream, OutputLine, OutputOrder, OutputSource, ProcessRun, ProcessStreamer, RunStatus,
    StreamError,
};
pub use workspace::{WorkspaceGuard, WorkspaceLock};
