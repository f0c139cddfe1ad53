//! Prometheus exposition rendering.
//!
//! Maps one snapshot plus the scan counters into the text exposition format.
//! Rendering is a pure function over its inputs: no locks, no mutation, safe
//! to call from any number of concurrent requests.
//!
//! Emission policy (sparse): only hosts and ports present in the snapshot
//! produce samples. A host that fell out of the scan disappears from the
//! output rather than being emitted as zero. Port state values follow the
//! scheme open=1, closed=0, filtered=-2, unfiltered=-1, unknown=0, with the
//! state also carried as a label so consumers can match on it symbolically.
//! Every host and port sample carries a configured `group` label so multiple
//! exporter instances can share one Prometheus.

use std::fmt::Write;

use probr_common::error::FailureKind;
use probr_common::scan::{HostState, PortState, Snapshot};

use crate::scheduler::ScanStats;

/// Content type of the rendered output.
pub const CONTENT_TYPE: &str = "text/plain; version=0.0.4";

const FAILURE_KINDS: [FailureKind; 3] = [
    FailureKind::Timeout,
    FailureKind::Process,
    FailureKind::Parse,
];

/// Renders the exposition text for one consistent (snapshot, stats) pair.
pub fn render(snapshot: &Snapshot, stats: &ScanStats, group: &str) -> String {
    let mut out = String::with_capacity(1024);

    render_host_metrics(&mut out, snapshot, group);
    render_scan_metrics(&mut out, snapshot, stats);

    out
}

fn render_host_metrics(out: &mut String, snapshot: &Snapshot, group: &str) {
    family(out, "nmap_host_up", "gauge", "Host reachability as reported by the last scan (1 = up).");
    for host in &snapshot.hosts {
        let up = matches!(host.state, HostState::Up);
        sample(
            out,
            "nmap_host_up",
            &[
                ("address", &host.address),
                ("hostname", host.display_name()),
                ("group", group),
            ],
            if up { 1.0 } else { 0.0 },
        );
    }

    family(out, "nmap_ping_srtt_ms", "gauge", "Smoothed round-trip time per host in milliseconds (0 when unreported).");
    for host in &snapshot.hosts {
        sample(
            out,
            "nmap_ping_srtt_ms",
            &[
                ("address", &host.address),
                ("hostname", host.display_name()),
                ("group", group),
            ],
            host.srtt_ms.unwrap_or(0.0),
        );
    }

    family(out, "nmap_port_state", "gauge", "Discovered port state per host (open=1, closed=0, filtered=-2, unfiltered=-1).");
    for host in &snapshot.hosts {
        for port in &host.ports {
            let port_label = port.port.to_string();
            sample(
                out,
                "nmap_port_state",
                &[
                    ("address", &host.address),
                    ("hostname", host.display_name()),
                    ("group", group),
                    ("proto", port.protocol.as_str()),
                    ("port", &port_label),
                    ("service", port.service.as_deref().unwrap_or("unknown")),
                    ("state", port.state.as_str()),
                ],
                state_value(port.state),
            );
        }
    }

    family(out, "nmap_tls_expiry", "gauge", "Unix time at which the certificate served on this port expires.");
    for host in &snapshot.hosts {
        for port in &host.ports {
            let Some(expiry) = port.tls_expiry_unix else {
                continue;
            };
            let port_label = port.port.to_string();
            sample(
                out,
                "nmap_tls_expiry",
                &[
                    ("address", &host.address),
                    ("hostname", host.display_name()),
                    ("group", group),
                    ("proto", port.protocol.as_str()),
                    ("port", &port_label),
                    ("service", port.service.as_deref().unwrap_or("unknown")),
                    ("state", port.state.as_str()),
                ],
                expiry,
            );
        }
    }
}

fn render_scan_metrics(out: &mut String, snapshot: &Snapshot, stats: &ScanStats) {
    family(out, "nmap_scan_duration_seconds", "gauge", "Wall-clock duration of the last completed scan attempt.");
    sample(out, "nmap_scan_duration_seconds", &[], stats.last_duration.as_secs_f64());

    family(out, "nmap_scan_success", "gauge", "Whether the last completed scan attempt succeeded (1 = yes).");
    sample(out, "nmap_scan_success", &[], if stats.last_success() { 1.0 } else { 0.0 });

    // Timestamp of the snapshot actually being served, so staleness is
    // visible even while failures pile up.
    if let Some(run) = &snapshot.run {
        family(out, "nmap_scan_timestamp_seconds", "gauge", "Unix time of the scan that produced the served snapshot.");
        sample(out, "nmap_scan_timestamp_seconds", &[], run.finished_unix());

        family(out, "nmap_scan_output_bytes", "gauge", "Size of the raw scanner output behind the served snapshot.");
        sample(out, "nmap_scan_output_bytes", &[], run.raw_bytes as f64);
    }

    family(out, "nmap_scans_total", "counter", "Completed scan attempts, success or failure.");
    sample(out, "nmap_scans_total", &[], stats.scans_total as f64);

    family(out, "nmap_scan_failures_total", "counter", "Failed scan attempts by failure kind.");
    for kind in FAILURE_KINDS {
        sample(
            out,
            "nmap_scan_failures_total",
            &[("kind", kind.as_str())],
            stats.failures(kind) as f64,
        );
    }
}

fn state_value(state: PortState) -> f64 {
    match state {
        PortState::Open => 1.0,
        PortState::Closed => 0.0,
        PortState::Filtered => -2.0,
        PortState::Unfiltered => -1.0,
        PortState::Unknown => 0.0,
    }
}

fn family(out: &mut String, name: &str, kind: &str, help: &str) {
    let _ = writeln!(out, "# HELP {name} {help}");
    let _ = writeln!(out, "# TYPE {name} {kind}");
}

fn sample(out: &mut String, name: &str, labels: &[(&str, &str)], value: f64) {
    out.push_str(name);

    if !labels.is_empty() {
        out.push('{');
        for (i, (key, val)) in labels.iter().enumerate() {
            if i > 0 {
                out.push(',');
            }
            let _ = write!(out, "{key}=\"{}\"", escape_label(val));
        }
        out.push('}');
    }

    let _ = writeln!(out, " {value}");
}

/// Escapes a label value per the exposition format: backslash, double quote
/// and newline.
fn escape_label(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => escaped.push_str("\\\\"),
            '"' => escaped.push_str("\\\""),
            '\n' => escaped.push_str("\\n"),
            _ => escaped.push(c),
        }
    }
    escaped
}
