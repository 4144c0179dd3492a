//! Configuration upload
//!
//! Parses the body of a write request and stores every known file it
//! carries. Keys that are not known configuration files are ignored and
//! known files missing from the body keep their previous content.

use terravision_core::domain::config_file::ConfigFileName;
use thiserror::Error;
use tracing::{debug, info, warn};

use super::file_store::{FileStore, FileStoreError};
use super::workspace::WorkspaceLock;

const PREVIEW_CHARS: usize = 100;

#[derive(Debug, Error)]
pub enum WriteError {
    #[error("Invalid JSON data")]
    InvalidJson(#[source] serde_json::Error),

    #[error("Invalid JSON data: expected an object keyed by file name")]
    NotAnObject,

    #[error("Missing required key: 'value' (in '{0}')")]
    MissingValue(ConfigFileName),

    #[error("Invalid value for '{0}': expected a string")]
    InvalidValue(ConfigFileName),

    #[error(transparent)]
    Store(#[from] FileStoreError),
}

/// Extracts `data[name]["value"]` for every known file present in `body`
///
/// The whole body is checked before anything is returned, so a malformed
/// entry rejects the request without any file being written.
pub fn parse_write_request(body: &[u8]) -> Result<Vec<(ConfigFileName, String)>, WriteError> {
    let data: serde_json::Value = serde_json::from_slice(body).map_err(WriteError::InvalidJson)?;
    let object = data.as_object().ok_or(WriteError::NotAnObject)?;

    debug!(
        "Parsed JSON data keys: {:?}",
        object.keys().collect::<Vec<_>>()
    );

    let mut files = Vec::with_capacity(ConfigFileName::ALL.len());
    for name in ConfigFileName::ALL {
        let Some(entry) = object.get(name.as_str()) else {
            warn!("Missing expected file: {}", name);
            continue;
        };

        let content = entry
            .get("value")
            .ok_or(WriteError::MissingValue(name))?
            .as_str()
            .ok_or(WriteError::InvalidValue(name))?;

        debug!(
            "Processing file: {}, content preview: {}...",
            name,
            content.chars().take(PREVIEW_CHARS).collect::<String>()
        );
        files.push((name, content.to_string()));
    }

    Ok(files)
}

/// Parses `body` and writes every file it carries into the store
///
/// Holds the workspace lock while writing so no pipeline run observes a
/// half-updated set of files.
///
/// # Returns
/// The names of the files that were written
pub async fn write_config_files(
    store: &FileStore,
    lock: &WorkspaceLock,
    body: &[u8],
) -> Result<Vec<ConfigFileName>, WriteError> {
    let files = parse_write_request(body)?;

    let _guard = lock.acquire().await;
    let mut written = Vec::with_capacity(files.len());
    for (name, content) in &files {
        store.write(*name, content).await?;
        written.push(*name);
    }

    info!("All files processed successfully ({} written)", written.len());
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_known_files_only() {
        let body = br#"{
            "main.tf": {"name": "main.tf", "language": "hcl", "value": "a = 1\n"},
            "notes.txt": {"value": "ignored"},
            "../escape.tf": {"value": "ignored"}
        }"#;

        let files = parse_write_request(body).unwrap();
        assert_eq!(files, vec![(ConfigFileName::Main, "a = 1\n".to_string())]);
    }

    #[test]
    fn test_parse_invalid_json() {
        let result = parse_write_request(b"{not json");
        assert!(matches!(result, Err(WriteError::InvalidJson(_))));
    }

    #[test]
    fn test_parse_non_object() {
        let result = parse_write_request(b"[1, 2, 3]");
        assert!(matches!(result, Err(WriteError::NotAnObject)));
    }

    #[test]
    fn test_parse_missing_value() {
        let body = br#"{"main.tf": {"value": "ok"}, "variables.tf": {"content": "x"}}"#;
        let result = parse_write_request(body);
        assert!(matches!(
            result,
            Err(WriteError::MissingValue(ConfigFileName::Variables))
        ));
    }

    #[test]
    fn test_parse_non_string_value() {
        let body = br#"{"terraform.tfvars": {"value": 42}}"#;
        let result = parse_write_request(body);
        assert!(matches!(
            result,
            Err(WriteError::InvalidValue(ConfigFileName::VariableValues))
        ));
    }

    #[tokio::test]
    async fn test_malformed_entry_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path());
        let body = br#"{"main.tf": {"value": "first"}, "terraform.tfvars": {}}"#;

        let result = write_config_files(&store, &WorkspaceLock::new(), body).await;

        assert!(matches!(result, Err(WriteError::MissingValue(_))));
        assert!(!store.path_of(ConfigFileName::Main).exists());
    }

    #[tokio::test]
    async fn test_write_all_three() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path());
        let body = serde_json::json!({
            "main.tf": {"value": "resource \"null_resource\" \"a\" {}\n"},
            "variables.tf": {"value": "variable \"region\" {}\n  "},
            "terraform.tfvars": {"value": "region = \"eu-west-1\"\n"},
        });

        let written = write_config_files(
            &store,
            &WorkspaceLock::new(),
            body.to_string().as_bytes(),
        )
        .await
        .unwrap();

        assert_eq!(written, ConfigFileName::ALL.to_vec());
        assert_eq!(
            std::fs::read_to_string(store.path_of(ConfigFileName::Variables)).unwrap(),
            "variable \"region\" {}\n  "
        );
    }
}
