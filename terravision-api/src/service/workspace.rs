//! Workspace serialization
//!
//! Writes and pipeline runs share one directory. Holding the workspace lock
//! while writing files or while a pipeline runs keeps a run from seeing a
//! half-written configuration and keeps two renders from writing the same
//! diagram at once.

use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::debug;

/// Shared lock guarding a single workspace directory
#[derive(Debug, Clone, Default)]
pub struct WorkspaceLock {
    inner: Arc<Mutex<()>>,
}

/// Proof of exclusive access to the workspace; released on drop
#[derive(Debug)]
pub struct WorkspaceGuard {
    _guard: OwnedMutexGuard<()>,
}

impl WorkspaceLock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits until the workspace is free and takes it
    pub async fn acquire(&self) -> WorkspaceGuard {
        if let Ok(guard) = self.inner.clone().try_lock_owned() {
            return WorkspaceGuard { _guard: guard };
        }

        debug!("Workspace busy, waiting for the current operation to finish");
        WorkspaceGuard {
            _guard: self.inner.clone().lock_owned().await,
        }
    }

    /// Whether someone currently holds the workspace
    pub fn is_busy(&self) -> bool {
        self.inner.try_lock().is_err()
    }
}
