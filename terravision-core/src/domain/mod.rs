//! Core domain types
//!
//! The known Terraform configuration files and the fixed command pipelines
//! that run against them. Shared between the API (executes pipelines, stores
//! files) and the client (names files when uploading).

pub mod config_file;
pub mod pipeline;
