//! Terravision API
//!
//! HTTP service that stores Terraform configuration files and drives the
//! external toolchain (terraform, the graph transform program, graphviz)
//! to render a dependency diagram, streaming tool output back as it is
//! produced.
//!
//! Architecture:
//! - Configuration: settings from environment or defaults
//! - Services: file store, process streamer, pipeline execution
//! - API: axum handlers mapping outcomes to HTTP responses

pub mod api;
pub mod config;
pub mod service;
