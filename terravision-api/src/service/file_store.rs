//! Configuration file store
//!
//! Persists uploaded configuration files into the workspace directory and
//! locates the diagram rendered by the graph pipeline.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use terravision_core::domain::config_file::ConfigFileName;
use terravision_core::domain::pipeline::{DIAGRAM_FILE, OUTPUT_DIR};
use thiserror::Error;
use tokio::fs;
use tracing::{debug, error, info};

#[derive(Debug, Error)]
pub enum FileStoreError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("diagram not found at {0}")]
    ArtifactMissing(PathBuf),
}

/// Files kept in a single workspace directory
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Location of a configuration file inside the workspace
    pub fn path_of(&self, name: ConfigFileName) -> PathBuf {
        self.root.join(name.as_str())
    }

    /// Location of the rendered diagram
    pub fn artifact_path(&self) -> PathBuf {
        self.root.join(OUTPUT_DIR).join(DIAGRAM_FILE)
    }

    /// Writes `content` to the named file, replacing whatever was there
    ///
    /// The workspace directory is created first if needed. Errors are logged
    /// and returned; a failed write is not cleaned up.
    pub async fn write(&self, name: ConfigFileName, content: &str) -> Result<PathBuf, FileStoreError> {
        let path = self.path_of(name);
        info!("Writing file: {} to path: {}", name, path.display());
        debug!("Content length: {} characters", content.chars().count());

        fs::create_dir_all(&self.root)
            .await
            .map_err(|source| io_error(&self.root, source))?;

        fs::write(&path, content.as_bytes())
            .await
            .map_err(|source| io_error(&path, source))?;

        info!("Successfully wrote file: {}", name);
        Ok(path)
    }

    /// Reads the rendered diagram
    pub async fn read_artifact(&self) -> Result<Vec<u8>, FileStoreError> {
        let path = self.artifact_path();

        match fs::read(&path).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(FileStoreError::ArtifactMissing(path)),
            Err(source) => Err(io_error(&path, source)),
        }
    }
}

fn io_error(path: &Path, source: std::io::Error) -> FileStoreError {
    error!("Filesystem error on {}: {}", path.display(), source);
    FileStoreError::Io {
        path: path.to_path_buf(),
        source,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_write_creates_workspace() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path().join("data"));

        let path = store.write(ConfigFileName::Main, "a = 1\n").await.unwrap();

        assert_eq!(path, dir.path().join("data").join("main.tf"));
        assert_eq!(std::fs::read_to_string(path).unwrap(), "a = 1\n");
    }

    #[tokio::test]
    async fn test_write_truncates_previous_content() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path());

        store
            .write(ConfigFileName::Variables, "variable \"long\" {}\n\n\n")
            .await
            .unwrap();
        store.write(ConfigFileName::Variables, "x  ").await.unwrap();

        let content = std::fs::read_to_string(store.path_of(ConfigFileName::Variables)).unwrap();
        assert_eq!(content, "x  ");
    }

    #[tokio::test]
    async fn test_write_failure_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("not-a-dir");
        std::fs::write(&blocker, "file").unwrap();

        let store = FileStore::new(&blocker);
        let result = store.write(ConfigFileName::Main, "x").await;

        assert!(matches!(result, Err(FileStoreError::Io { .. })));
    }

    #[tokio::test]
    async fn test_read_missing_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path());

        let result = store.read_artifact().await;
        assert!(matches!(result, Err(FileStoreError::ArtifactMissing(_))));
    }

    #[tokio::test]
    async fn test_read_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path());

        std::fs::create_dir_all(dir.path().join("output")).unwrap();
        std::fs::write(store.artifact_path(), [0x89, b'P', b'N', b'G']).unwrap();

        assert_eq!(
            store.read_artifact().await.unwrap(),
            vec![0x89, b'P', b'N', b'G']
        );
    }
}
