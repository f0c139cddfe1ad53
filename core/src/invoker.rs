//! External scanner invocation.
//!
//! Runs nmap as a child process via `tokio::process::Command` with XML
//! output on stdout (`-oX -`) and a hard deadline. The [`ScanInvoker`] trait
//! is the seam that lets tests replace process management with canned
//! output.

use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use tokio::time;

use probr_common::error::ScanError;
use probr_common::network::target::Target;
use probr_common::{debug, info};

/// How much captured stderr to keep on a process failure.
const STDERR_SNIPPET_LEN: usize = 512;

/// Raw structured output captured from one scanner run.
#[derive(Debug, Clone)]
pub struct RawOutput {
    pub bytes: Vec<u8>,
}

/// One scan attempt against the configured targets.
///
/// Implementations must spawn at most one external process per call;
/// the scheduler guarantees calls never overlap.
#[async_trait]
pub trait ScanInvoker: Send + Sync {
    async fn run_scan(
        &self,
        targets: &[Target],
        timeout: Duration,
    ) -> Result<RawOutput, ScanError>;
}

/// The real invoker: shells out to the nmap binary.
pub struct NmapInvoker {
    nmap_path: String,
    scan_flags: Vec<String>,
}

impl NmapInvoker {
    pub fn new(nmap_path: impl Into<String>, scan_flags: Vec<String>) -> Self {
        Self {
            nmap_path: nmap_path.into(),
            scan_flags,
        }
    }

    /// Startup probe: verify the scanner binary is present and runnable.
    ///
    /// Returns the first line of its version banner. Failure here is fatal;
    /// there is no point entering the serving loop without a scanner.
    pub async fn verify_installation(&self) -> anyhow::Result<String> {
        let output = Command::new(&self.nmap_path)
            .arg("--version")
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| anyhow::anyhow!("cannot execute '{}': {e}", self.nmap_path))?;

        anyhow::ensure!(
            output.status.success(),
            "'{} --version' exited with {}",
            self.nmap_path,
            output.status
        );

        let banner = String::from_utf8_lossy(&output.stdout);
        Ok(banner.lines().next().unwrap_or_default().to_string())
    }

    /// Builds the scanner argument list for one run.
    ///
    /// Construction is deterministic: targets keep their configured order and
    /// port selectors are merged in that same order, so identical input
    /// always produces an identical command line.
    fn build_args(&self, targets: &[Target]) -> Vec<String> {
        let mut args: Vec<String> = vec!["-oX".into(), "-".into()];
        args.extend(self.scan_flags.iter().cloned());

        // nmap takes a single global -p; merge the per-target selectors.
        if let Some(selector) = merge_port_selectors(targets) {
            args.push("-p".into());
            args.push(selector);
        }

        args.extend(targets.iter().map(|t| t.host_arg()));
        args
    }
}

#[async_trait]
impl ScanInvoker for NmapInvoker {
    async fn run_scan(
        &self,
        targets: &[Target],
        timeout: Duration,
    ) -> Result<RawOutput, ScanError> {
        let args = self.build_args(targets);
        debug!("executing {} {}", self.nmap_path, args.join(" "));

        let child = Command::new(&self.nmap_path)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| ScanError::Process {
                code: -1,
                stderr: format!("failed to spawn '{}': {e}", self.nmap_path),
            })?;

        // Dropping the future on timeout kills the child (kill_on_drop), so
        // a hung scan never leaks a process or its partial output.
        let output = match time::timeout(timeout, child.wait_with_output()).await {
            Err(_) => return Err(ScanError::Timeout(timeout)),
            Ok(Err(e)) => {
                return Err(ScanError::Process {
                    code: -1,
                    stderr: format!("failed to collect scanner output: {e}"),
                });
            }
            Ok(Ok(output)) => output,
        };

        // A non-zero exit with usable XML on stdout still counts: nmap
        // reports some per-host errors that way. Only a silent failure is
        // terminal.
        if !output.status.success() && output.stdout.trim_ascii().is_empty() {
            return Err(ScanError::Process {
                code: output.status.code().unwrap_or(-1),
                stderr: stderr_snippet(&output.stderr),
            });
        }

        info!("scan finished, captured {} bytes of output", output.stdout.len());
        Ok(RawOutput {
            bytes: output.stdout,
        })
    }
}

/// Joins the port selectors of all targets into one nmap `-p` value,
/// preserving target order and dropping exact duplicates. `None` when no
/// target specifies ports.
fn merge_port_selectors(targets: &[Target]) -> Option<String> {
    let mut parts: Vec<String> = Vec::new();

    for target in targets {
        if let Some(selector) = &target.ports {
            let s = selector.to_string();
            if !parts.contains(&s) {
                parts.push(s);
            }
        }
    }

    if parts.is_empty() {
        None
    } else {
        Some(parts.join(","))
    }
}

fn stderr_snippet(stderr: &[u8]) -> String {
    let text = String::from_utf8_lossy(stderr);
    let trimmed = text.trim();
    if trimmed.chars().count() > STDERR_SNIPPET_LEN {
        let cut: String = trimmed.chars().take(STDERR_SNIPPET_LEN).collect();
        format!("{cut}...")
    } else {
        trimmed.to_string()
    }
}
