//! Data Transfer Objects for the HTTP API
//!
//! Request and response bodies used by the API handlers and the client.

pub mod health;
pub mod write;

use serde::{Deserialize, Serialize};

/// Body of every JSON error response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}
