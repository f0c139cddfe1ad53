//! # Scan Result Model
//!
//! Typed, immutable view of one completed scan: hosts, their ports and the
//! run metadata. A [`Snapshot`] is built once by the parser, published
//! atomically by the scheduler, and only ever read after that.
//!
//! All state enums carry an explicit `Unknown` variant. The parser maps any
//! unrecognized token to it instead of failing, so metrics stay available
//! under partial scanner output.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Reachability of one scanned host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostState {
    Up,
    Down,
    Unknown,
}

impl HostState {
    pub fn from_token(token: &str) -> Self {
        match token {
            "up" => HostState::Up,
            "down" => HostState::Down,
            _ => HostState::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            HostState::Up => "up",
            HostState::Down => "down",
            HostState::Unknown => "unknown",
        }
    }
}

/// Transport protocol of a scanned port.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Protocol {
    Tcp,
    Udp,
}

impl Protocol {
    /// Returns `None` for protocols the model does not cover (sctp, ip);
    /// the parser skips those port entries as unparseable fragments.
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "tcp" => Some(Protocol::Tcp),
            "udp" => Some(Protocol::Udp),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Protocol::Tcp => "tcp",
            Protocol::Udp => "udp",
        }
    }
}

/// State of one scanned port.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortState {
    Open,
    Closed,
    Filtered,
    Unfiltered,
    Unknown,
}

impl PortState {
    /// Any token outside the known set maps to `Unknown` rather than failing.
    pub fn from_token(token: &str) -> Self {
        match token {
            "open" => PortState::Open,
            "closed" => PortState::Closed,
            "filtered" => PortState::Filtered,
            "unfiltered" => PortState::Unfiltered,
            _ => PortState::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PortState::Open => "open",
            PortState::Closed => "closed",
            PortState::Filtered => "filtered",
            PortState::Unfiltered => "unfiltered",
            PortState::Unknown => "unknown",
        }
    }
}

/// One discovered port on a host. Immutable once parsed.
#[derive(Debug, Clone, PartialEq)]
pub struct PortResult {
    pub port: u16,
    pub protocol: Protocol,
    pub state: PortState,
    pub service: Option<String>,
    /// Certificate `notAfter` as a unix timestamp, when the scanner ran a
    /// TLS script against this port and the date parsed.
    pub tls_expiry_unix: Option<f64>,
}

/// One target's outcome within a scan run.
#[derive(Debug, Clone, PartialEq)]
pub struct HostResult {
    /// Address as reported by the scanner.
    pub address: String,
    /// Reverse-resolved name, when the scanner found one.
    pub hostname: Option<String>,
    pub state: HostState,
    /// Smoothed round-trip time in milliseconds, when reported.
    pub srtt_ms: Option<f64>,
    /// Ports in scanner output order.
    pub ports: Vec<PortResult>,
}

impl HostResult {
    /// Label value for the `hostname` dimension: the resolved name when
    /// available, otherwise the address itself.
    pub fn display_name(&self) -> &str {
        self.hostname.as_deref().unwrap_or(&self.address)
    }
}

/// Terminal outcome of one scan attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanOutcome {
    Success,
    Timeout,
    ProcessError,
    ParseError,
}

/// Metadata of one completed scan attempt.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScanRun {
    pub started_at: SystemTime,
    pub finished_at: SystemTime,
    pub outcome: ScanOutcome,
    /// Size of the raw scanner output in bytes.
    pub raw_bytes: usize,
}

impl ScanRun {
    pub fn duration(&self) -> Duration {
        self.finished_at
            .duration_since(self.started_at)
            .unwrap_or(Duration::ZERO)
    }

    /// Unix timestamp of completion, in seconds.
    pub fn finished_unix(&self) -> f64 {
        self.finished_at
            .duration_since(UNIX_EPOCH)
            .unwrap_or(Duration::ZERO)
            .as_secs_f64()
    }
}

/// The published, queryable result of the most recent successful scan.
///
/// Either entirely from one completed run, or the initial empty snapshot
/// before the first scan succeeds. Never observed half-updated: the
/// scheduler swaps a shared pointer to a fully built value.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    /// Hosts in scanner output order.
    pub hosts: Vec<HostResult>,
    /// Run that produced this snapshot; `None` only for the empty snapshot.
    pub run: Option<ScanRun>,
}

impl Snapshot {
    pub fn empty() -> Self {
        Self {
            hosts: Vec::new(),
            run: None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.run.is_none()
    }
}
