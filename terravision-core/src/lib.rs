//! Terravision Core
//!
//! Core types shared by the Terravision API server and its clients.
//!
//! This crate contains:
//! - Domain types: configuration file names and pipeline definitions
//! - DTOs: request and response bodies exchanged over HTTP

pub mod domain;
pub mod dto;
