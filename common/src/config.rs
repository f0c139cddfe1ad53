//! Runtime configuration.
//!
//! Loaded once at startup by the CLI and read-only afterwards. Validation
//! happens here so every later stage can assume a sane configuration.

use std::time::Duration;

use crate::error::ConfigError;
use crate::network::target::Target;

#[derive(Clone, Debug)]
pub struct Config {
    /// Targets to hand to the scanner, in configured order.
    pub targets: Vec<Target>,
    /// Pause between scan ticks.
    pub interval: Duration,
    /// Hard deadline for one external scanner run.
    pub scan_timeout: Duration,
    /// Port the metrics endpoint listens on.
    pub listen_port: u16,
    /// Path or name of the scanner binary.
    pub nmap_path: String,
    /// Extra flags passed through to the scanner (e.g. `-F`, `-sU`).
    pub scan_flags: Vec<String>,
    /// Label value stamped on every host and port metric. Empty by default.
    pub group: String,
}

impl Config {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.targets.is_empty() {
            return Err(ConfigError::NoTargets);
        }
        if self.scan_timeout.is_zero() {
            return Err(ConfigError::ZeroTimeout);
        }
        if self.interval.is_zero() {
            return Err(ConfigError::ZeroInterval);
        }
        Ok(())
    }
}
