//! # Probr Common
//!
//! Shared domain model for the probr exporter: scan targets, scan results,
//! configuration and error kinds. Pure data types with no IO dependencies;
//! the actual scanning and serving live in `probr-core` and `probr-cli`.

pub mod config;
pub mod error;
pub mod logging;
pub mod network;
pub mod scan;
