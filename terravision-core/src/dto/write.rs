//! Write request/response DTOs

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::domain::config_file::ConfigFileName;

/// Editor payload for one configuration file
///
/// Only `value` is read by the server; `name` and `language` are carried so
/// editor state can be posted unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileValue {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    pub value: String,
}

impl FileValue {
    pub fn hcl(name: ConfigFileName, value: impl Into<String>) -> Self {
        Self {
            name: Some(name.as_str().to_string()),
            language: Some("hcl".to_string()),
            value: value.into(),
        }
    }
}

/// Request body of `POST /terravision/write`
///
/// Serializes as a JSON object keyed by file name, e.g.
/// `{"main.tf": {"value": "..."}}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WriteFiles {
    pub files: BTreeMap<ConfigFileName, FileValue>,
}

impl WriteFiles {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds (or replaces) a file's content
    pub fn insert(&mut self, name: ConfigFileName, content: impl Into<String>) {
        self.files.insert(name, FileValue::hcl(name, content));
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }
}

/// Response body of a successful write
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WriteResponse {
    pub success: bool,
}
