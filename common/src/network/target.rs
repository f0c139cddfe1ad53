//! # Scan Target Model
//!
//! Defines the possible inputs for a scan cycle.
//!
//! This module handles parsing and representing targets, which can be:
//! * A single IP address (v4 or v6).
//! * A CIDR block (e.g., `192.168.1.0/24`).
//! * A hostname (e.g., `gateway.lan`).
//!
//! Any of these may carry a port selector suffix (e.g., `10.0.0.5:22,80` or
//! `192.168.1.0/24:1-1024`). Without one, the scanner's default port set is
//! used. Targets are validated here, at load time; the invoker downstream
//! assumes every target it receives is well formed.

use std::fmt;
use std::net::{IpAddr, Ipv4Addr};
use std::str::FromStr;

/// The host portion of a target: what the external scanner is pointed at.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HostExpr {
    /// A single specific address.
    Addr(IpAddr),
    /// An IPv4 network in CIDR notation.
    Cidr { addr: Ipv4Addr, prefix: u8 },
    /// A DNS name, resolved by the scanner itself.
    Name(String),
}

impl fmt::Display for HostExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HostExpr::Addr(addr) => write!(f, "{addr}"),
            HostExpr::Cidr { addr, prefix } => write!(f, "{addr}/{prefix}"),
            HostExpr::Name(name) => write!(f, "{name}"),
        }
    }
}

/// An inclusive port range. A single port is a range of length one.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PortRange {
    pub start: u16,
    pub end: u16,
}

impl fmt::Display for PortRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.start == self.end {
            write!(f, "{}", self.start)
        } else {
            write!(f, "{}-{}", self.start, self.end)
        }
    }
}

/// Which ports to probe on a target, as a list of ranges.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PortSelector {
    pub ranges: Vec<PortRange>,
}

impl FromStr for PortSelector {
    type Err = String;

    /// Parses a selector like `22`, `1-1024` or `22,80,443,8000-8100`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut ranges = Vec::new();

        for part in s.split(',') {
            let part = part.trim();
            if part.is_empty() {
                return Err(format!("empty port range in selector: {s}"));
            }
            ranges.push(parse_port_range(part)?);
        }

        if ranges.is_empty() {
            return Err("empty port selector".into());
        }

        Ok(Self { ranges })
    }
}

impl fmt::Display for PortSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.ranges.iter().map(|r| r.to_string()).collect();
        write!(f, "{}", parts.join(","))
    }
}

/// Represents a distinct target to be scanned.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Target {
    pub host: HostExpr,
    pub ports: Option<PortSelector>,
}

impl Target {
    /// The host expression as the external scanner expects it on the
    /// command line.
    pub fn host_arg(&self) -> String {
        self.host.to_string()
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.ports {
            Some(selector) => write!(f, "{}:{}", self.host, selector),
            None => write!(f, "{}", self.host),
        }
    }
}

impl FromStr for Target {
    type Err = String;

    /// Parses a string into a `Target`.
    ///
    /// Supported formats:
    /// * **Address**: `192.168.1.5`, `fe80::1`.
    /// * **CIDR**: `192.168.1.0/24`, optionally with ports: `192.168.1.0/24:1-1024`.
    /// * **Hostname**: `gateway.lan`, optionally with ports: `gateway.lan:443`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err("empty target".into());
        }

        // A bare address first. IPv6 literals contain colons, so this must
        // run before the port-suffix split.
        if let Ok(addr) = s.parse::<IpAddr>() {
            return Ok(Target {
                host: HostExpr::Addr(addr),
                ports: None,
            });
        }

        let (host_str, ports) = split_port_suffix(s)?;

        if let Some(host) = parse_cidr(host_str)? {
            return Ok(Target { host, ports });
        }

        if let Ok(addr) = host_str.parse::<IpAddr>() {
            return Ok(Target {
                host: HostExpr::Addr(addr),
                ports,
            });
        }

        if let Some(host) = parse_name(host_str) {
            return Ok(Target { host, ports });
        }

        Err(format!("invalid target: {s}"))
    }
}

/// Splits a trailing `:ports` selector off a target string, if present.
///
/// The suffix is only treated as a selector when it actually parses as one,
/// so strings like `fe80::1` fall through untouched.
fn split_port_suffix(s: &str) -> Result<(&str, Option<PortSelector>), String> {
    let Some((host_str, ports_str)) = s.rsplit_once(':') else {
        return Ok((s, None));
    };

    if host_str.is_empty() {
        return Err(format!("missing host in target: {s}"));
    }

    match ports_str.parse::<PortSelector>() {
        Ok(selector) => Ok((host_str, Some(selector))),
        Err(e) => Err(format!("invalid port selector '{ports_str}': {e}")),
    }
}

/// Parses one `N` or `A-B` element of a port selector.
fn parse_port_range(part: &str) -> Result<PortRange, String> {
    if let Some((start_str, end_str)) = part.split_once('-') {
        let start = parse_port(start_str)?;
        let end = parse_port(end_str)?;
        if start > end {
            return Err(format!("descending port range: {part}"));
        }
        return Ok(PortRange { start, end });
    }

    let port = parse_port(part)?;
    Ok(PortRange {
        start: port,
        end: port,
    })
}

fn parse_port(s: &str) -> Result<u16, String> {
    let port: u16 = s
        .trim()
        .parse()
        .map_err(|e| format!("invalid port '{s}': {e}"))?;
    if port == 0 {
        return Err("port 0 is not scannable".into());
    }
    Ok(port)
}

/// Parses CIDR notation like `192.168.1.0/24`.
fn parse_cidr(s: &str) -> Result<Option<HostExpr>, String> {
    let Some((ip_str, prefix_str)) = s.split_once('/') else {
        return Ok(None);
    };

    let addr = ip_str
        .parse::<Ipv4Addr>()
        .map_err(|e| format!("invalid IP in CIDR '{ip_str}': {e}"))?;

    let prefix = prefix_str
        .parse::<u8>()
        .map_err(|e| format!("invalid prefix in CIDR '{prefix_str}': {e}"))?;

    if prefix > 32 {
        return Err(format!("CIDR prefix out of range: /{prefix}"));
    }

    Ok(Some(HostExpr::Cidr { addr, prefix }))
}

/// Parses a plain hostname. Deliberately strict: anything that is not a
/// DNS-name-shaped string is rejected rather than handed to the scanner as-is.
fn parse_name(s: &str) -> Option<HostExpr> {
    if s.is_empty() || s.len() > 253 || s.starts_with('-') || s.starts_with('.') {
        return None;
    }

    let valid = s
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '.' | '_'));

    valid.then(|| HostExpr::Name(s.to_string()))
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
