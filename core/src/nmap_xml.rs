//! Nmap XML document model.
//!
//! Deliberately partial serde model of nmap's `-oX` output: only the host,
//! port and timing elements the exporter consumes. Unknown elements and
//! attributes are ignored, so newer scanner versions with extra fields still
//! parse. Fields that individual hosts may lack are `Option`s; deciding what
//! a missing field *means* is the parser's job, not the document model's.

use serde::Deserialize;

/// Root `<nmaprun>` element.
#[derive(Debug, Deserialize)]
pub struct NmapRun {
    #[serde(rename = "host", default)]
    pub hosts: Vec<Host>,
}

#[derive(Debug, Deserialize)]
pub struct Host {
    #[serde(rename = "address", default)]
    pub addresses: Vec<Address>,

    pub status: Option<Status>,

    pub hostnames: Option<Hostnames>,

    pub ports: Option<Ports>,

    pub times: Option<Times>,
}

impl Host {
    /// The host's primary address: the first IP-typed one, falling back to
    /// the first address of any type (nmap lists MAC addresses too).
    pub fn primary_address(&self) -> Option<&str> {
        self.addresses
            .iter()
            .find(|a| a.addr_type.as_deref().is_some_and(|t| t.starts_with("ipv")))
            .or_else(|| self.addresses.first())
            .map(|a| a.addr.as_str())
    }

    /// The first reverse-resolved hostname, if nmap found one.
    pub fn first_hostname(&self) -> Option<&str> {
        self.hostnames
            .as_ref()?
            .hostnames
            .first()
            .map(|h| h.name.as_str())
    }
}

#[derive(Debug, Deserialize)]
pub struct Address {
    #[serde(rename = "@addr")]
    pub addr: String,
    #[serde(rename = "@addrtype")]
    pub addr_type: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Status {
    #[serde(rename = "@state")]
    pub state: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Hostnames {
    #[serde(rename = "hostname", default)]
    pub hostnames: Vec<Hostname>,
}

#[derive(Debug, Deserialize)]
pub struct Hostname {
    #[serde(rename = "@name")]
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct Ports {
    #[serde(rename = "port", default)]
    pub ports: Vec<Port>,
}

#[derive(Debug, Deserialize)]
pub struct Port {
    /// Kept as a string so one corrupt port id skips that entry instead of
    /// failing the whole document.
    #[serde(rename = "@portid")]
    pub portid: Option<String>,
    #[serde(rename = "@protocol")]
    pub protocol: Option<String>,
    pub state: Option<PortStateEl>,
    pub service: Option<Service>,
    #[serde(rename = "script", default)]
    pub scripts: Vec<Script>,
}

impl Port {
    /// Certificate `notAfter` from a TLS script result, if one ran against
    /// this port. Nmap nests it as `<table key="validity"><elem
    /// key="notAfter">` somewhere under the script element.
    pub fn tls_not_after(&self) -> Option<&str> {
        self.scripts
            .iter()
            .flat_map(|s| s.tables.iter())
            .find_map(find_not_after)
    }
}

fn find_not_after(table: &Table) -> Option<&str> {
    if table.key.as_deref() == Some("validity") {
        if let Some(value) = table
            .elems
            .iter()
            .find(|e| e.key.as_deref() == Some("notAfter"))
            .and_then(|e| e.value.as_deref())
        {
            return Some(value);
        }
    }
    table.tables.iter().find_map(find_not_after)
}

#[derive(Debug, Deserialize)]
pub struct Script {
    #[serde(rename = "@id")]
    pub id: Option<String>,
    #[serde(rename = "table", default)]
    pub tables: Vec<Table>,
}

#[derive(Debug, Deserialize)]
pub struct Table {
    #[serde(rename = "@key")]
    pub key: Option<String>,
    #[serde(rename = "table", default)]
    pub tables: Vec<Table>,
    #[serde(rename = "elem", default)]
    pub elems: Vec<Elem>,
}

#[derive(Debug, Deserialize)]
pub struct Elem {
    #[serde(rename = "@key")]
    pub key: Option<String>,
    #[serde(rename = "$text")]
    pub value: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PortStateEl {
    #[serde(rename = "@state")]
    pub state: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Service {
    #[serde(rename = "@name")]
    pub name: Option<String>,
}

/// `<times>` timing element; `srtt` is in microseconds.
#[derive(Debug, Deserialize)]
pub struct Times {
    #[serde(rename = "@srtt")]
    pub srtt: Option<String>,
}
