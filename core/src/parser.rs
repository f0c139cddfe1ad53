//! Scanner output parsing.
//!
//! Converts raw XML bytes into the typed result model. The policy throughout
//! is best-effort completeness over strictness: a host without a readable
//! status becomes `Unknown`, an unrecognized port state token becomes
//! `Unknown`, and fragments that cannot be read at all (a host without an
//! address, a port without a numeric id) are skipped with a warning. Only a
//! document that is empty or structurally unreadable fails the scan.

use probr_common::error::ScanError;
use probr_common::scan::{HostResult, HostState, PortResult, PortState, Protocol};
use probr_common::warn;
use time::PrimitiveDateTime;
use time::format_description::BorrowedFormatItem;
use time::macros::format_description;

use crate::invoker::RawOutput;
use crate::nmap_xml::{self, NmapRun};

/// Certificate validity timestamps as nmap's TLS scripts print them.
const TLS_NOT_AFTER: &[BorrowedFormatItem<'static>] =
    format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]");

/// Parses one scan's raw output into hosts, preserving document order.
pub fn parse(raw: &RawOutput) -> Result<Vec<HostResult>, ScanError> {
    if raw.bytes.trim_ascii().is_empty() {
        return Err(ScanError::Parse("empty scanner output".into()));
    }

    let text = String::from_utf8_lossy(&raw.bytes);
    let run: NmapRun =
        quick_xml::de::from_str(&text).map_err(|e| ScanError::Parse(e.to_string()))?;

    Ok(run.hosts.iter().filter_map(convert_host).collect())
}

fn convert_host(host: &nmap_xml::Host) -> Option<HostResult> {
    let Some(address) = host.primary_address() else {
        warn!("skipping host entry without an address");
        return None;
    };

    let state = host
        .status
        .as_ref()
        .and_then(|s| s.state.as_deref())
        .map(HostState::from_token)
        .unwrap_or(HostState::Unknown);

    // nmap reports srtt in microseconds.
    let srtt_ms = host
        .times
        .as_ref()
        .and_then(|t| t.srtt.as_deref())
        .and_then(|s| s.parse::<f64>().ok())
        .map(|us| us / 1000.0);

    let ports: Vec<PortResult> = host
        .ports
        .iter()
        .flat_map(|p| p.ports.iter())
        .filter_map(|port| convert_port(address, port))
        .collect();

    Some(HostResult {
        address: address.to_string(),
        hostname: host.first_hostname().map(str::to_string),
        state,
        srtt_ms,
        ports,
    })
}

fn convert_port(address: &str, port: &nmap_xml::Port) -> Option<PortResult> {
    let Some(number) = port.portid.as_deref().and_then(|id| id.parse::<u16>().ok()) else {
        warn!("skipping port with unreadable id on {address}");
        return None;
    };

    // Protocol is always present in practice; default to tcp if it is not.
    let token = port.protocol.as_deref().unwrap_or("tcp");
    let Some(protocol) = Protocol::from_token(token) else {
        warn!("skipping unsupported protocol '{token}' on {address}:{number}");
        return None;
    };

    let state = port
        .state
        .as_ref()
        .and_then(|s| s.state.as_deref())
        .map(PortState::from_token)
        .unwrap_or(PortState::Unknown);

    let service = port
        .service
        .as_ref()
        .and_then(|s| s.name.clone());

    Some(PortResult {
        port: number,
        protocol,
        state,
        service,
        tls_expiry_unix: port.tls_not_after().and_then(parse_tls_expiry),
    })
}

/// An unreadable date drops the expiry rather than the port.
fn parse_tls_expiry(not_after: &str) -> Option<f64> {
    PrimitiveDateTime::parse(not_after, TLS_NOT_AFTER)
        .ok()
        .map(|dt| dt.assume_utc().unix_timestamp() as f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(xml: &str) -> RawOutput {
        RawOutput {
            bytes: xml.as_bytes().to_vec(),
        }
    }

    const TWO_HOSTS: &str = r#"
        <nmaprun scanner="nmap">
            <host>
                <status state="up"/>
                <address addr="10.0.0.5" addrtype="ipv4"/>
                <hostnames><hostname name="alpha.lan"/></hostnames>
                <times srtt="1337"/>
                <ports>
                    <port protocol="tcp" portid="22">
                        <state state="open"/>
                        <service name="ssh"/>
                    </port>
                    <port protocol="tcp" portid="80">
                        <state state="closed"/>
                    </port>
                </ports>
            </host>
            <host>
                <status state="down"/>
                <address addr="10.0.0.6" addrtype="ipv4"/>
            </host>
        </nmaprun>"#;

    #[test]
    fn well_formed_output_preserves_host_count_and_order() {
        let hosts = parse(&raw(TWO_HOSTS)).unwrap();
        assert_eq!(hosts.len(), 2);
        assert_eq!(hosts[0].address, "10.0.0.5");
        assert_eq!(hosts[1].address, "10.0.0.6");

        assert_eq!(hosts[0].state, HostState::Up);
        assert_eq!(hosts[0].hostname.as_deref(), Some("alpha.lan"));
        assert_eq!(hosts[0].srtt_ms, Some(1.337));
        assert_eq!(hosts[1].state, HostState::Down);

        let ports = &hosts[0].ports;
        assert_eq!(ports.len(), 2);
        assert_eq!(ports[0].port, 22);
        assert_eq!(ports[0].state, PortState::Open);
        assert_eq!(ports[0].service.as_deref(), Some("ssh"));
        assert_eq!(ports[1].port, 80);
        assert_eq!(ports[1].state, PortState::Closed);
    }

    #[test]
    fn missing_port_state_defaults_to_unknown() {
        let xml = r#"
            <nmaprun>
                <host>
                    <address addr="10.0.0.5"/>
                    <ports><port protocol="tcp" portid="443"/></ports>
                </host>
            </nmaprun>"#;

        let hosts = parse(&raw(xml)).unwrap();
        assert_eq!(hosts[0].ports[0].state, PortState::Unknown);
    }

    #[test]
    fn missing_host_status_defaults_to_unknown() {
        let xml = r#"<nmaprun><host><address addr="10.0.0.5"/></host></nmaprun>"#;
        let hosts = parse(&raw(xml)).unwrap();
        assert_eq!(hosts[0].state, HostState::Unknown);
    }

    #[test]
    fn unrecognized_state_token_maps_to_unknown() {
        let xml = r#"
            <nmaprun>
                <host>
                    <address addr="10.0.0.5"/>
                    <ports>
                        <port protocol="tcp" portid="53">
                            <state state="open|filtered"/>
                        </port>
                    </ports>
                </host>
            </nmaprun>"#;

        let hosts = parse(&raw(xml)).unwrap();
        assert_eq!(hosts[0].ports[0].state, PortState::Unknown);
    }

    #[test]
    fn tls_script_not_after_becomes_unix_expiry() {
        let xml = r#"
            <nmaprun>
                <host>
                    <address addr="10.0.0.5"/>
                    <ports>
                        <port protocol="tcp" portid="443">
                            <state state="open"/>
                            <script id="ssl-cert">
                                <table key="validity">
                                    <elem key="notAfter">2030-01-01T00:00:00</elem>
                                </table>
                            </script>
                        </port>
                        <port protocol="tcp" portid="22">
                            <state state="open"/>
                        </port>
                    </ports>
                </host>
            </nmaprun>"#;

        let hosts = parse(&raw(xml)).unwrap();
        assert_eq!(hosts[0].ports[0].tls_expiry_unix, Some(1893456000.0));
        assert_eq!(hosts[0].ports[1].tls_expiry_unix, None);
    }

    #[test]
    fn unreadable_tls_date_drops_the_expiry_only() {
        let xml = r#"
            <nmaprun>
                <host>
                    <address addr="10.0.0.5"/>
                    <ports>
                        <port protocol="tcp" portid="443">
                            <state state="open"/>
                            <script id="ssl-cert">
                                <table key="validity">
                                    <elem key="notAfter">sometime next year</elem>
                                </table>
                            </script>
                        </port>
                    </ports>
                </host>
            </nmaprun>"#;

        let hosts = parse(&raw(xml)).unwrap();
        let port = &hosts[0].ports[0];
        assert_eq!(port.state, PortState::Open);
        assert_eq!(port.tls_expiry_unix, None);
    }

    #[test]
    fn unreadable_fragments_are_skipped_not_fatal() {
        let xml = r#"
            <nmaprun>
                <host><status state="up"/></host>
                <host>
                    <address addr="10.0.0.5"/>
                    <ports>
                        <port protocol="tcp" portid="not-a-port"><state state="open"/></port>
                        <port protocol="sctp" portid="9"><state state="open"/></port>
                        <port protocol="tcp" portid="22"><state state="open"/></port>
                    </ports>
                </host>
            </nmaprun>"#;

        let hosts = parse(&raw(xml)).unwrap();
        // The address-less host is dropped, the readable one survives with
        // only its readable port.
        assert_eq!(hosts.len(), 1);
        assert_eq!(hosts[0].ports.len(), 1);
        assert_eq!(hosts[0].ports[0].port, 22);
    }

    #[test]
    fn empty_input_is_a_parse_error() {
        assert!(matches!(parse(&raw("")), Err(ScanError::Parse(_))));
        assert!(matches!(parse(&raw("   \n")), Err(ScanError::Parse(_))));
    }

    #[test]
    fn garbage_input_is_a_parse_error() {
        let result = parse(&raw("this is not xml at all < > &"));
        assert!(matches!(result, Err(ScanError::Parse(_))));
    }

    #[test]
    fn document_without_hosts_is_an_empty_result() {
        let hosts = parse(&raw(r#"<nmaprun scanner="nmap"/>"#)).unwrap();
        assert!(hosts.is_empty());
    }
}
