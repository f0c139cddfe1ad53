//! Error kinds for the scan pipeline.
//!
//! Per-scan failures ([`ScanError`]) are recoverable: the scheduler records
//! them and keeps serving the previous snapshot. [`ConfigError`] is fatal and
//! only ever surfaces before the scheduling loop starts.

use std::time::Duration;
use thiserror::Error;

/// A single scan attempt failed. The published snapshot stays untouched.
#[derive(Debug, Error)]
pub enum ScanError {
    /// The external scanner did not finish within the configured timeout.
    /// Any partial output it produced is discarded.
    #[error("scan timed out after {0:?}")]
    Timeout(Duration),

    /// The external scanner exited non-zero without usable output.
    #[error("scanner exited with code {code}: {stderr}")]
    Process { code: i32, stderr: String },

    /// The scanner output could not be decoded into a result document.
    #[error("unparseable scanner output: {0}")]
    Parse(String),
}

impl ScanError {
    pub fn kind(&self) -> FailureKind {
        match self {
            ScanError::Timeout(_) => FailureKind::Timeout,
            ScanError::Process { .. } => FailureKind::Process,
            ScanError::Parse(_) => FailureKind::Parse,
        }
    }
}

/// Failure classification used for the per-kind failure counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    Timeout,
    Process,
    Parse,
}

impl FailureKind {
    /// Stable label value for the exposition output.
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureKind::Timeout => "timeout",
            FailureKind::Process => "process",
            FailureKind::Parse => "parse",
        }
    }
}

/// Invalid startup configuration. Fail fast, never enter the serving loop.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("no scan targets configured")]
    NoTargets,

    #[error("invalid target '{target}': {reason}")]
    InvalidTarget { target: String, reason: String },

    #[error("scan timeout must be greater than zero")]
    ZeroTimeout,

    #[error("scan interval must be greater than zero")]
    ZeroInterval,
}
