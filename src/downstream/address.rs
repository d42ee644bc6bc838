//! Downstream list parsing.
//!
//! A downstream spec is a comma-separated `host:port` list. Hosts are kept
//! as written and resolved at connect time.

use std::fmt;

use crate::lifecycle::startup::HostError;

/// One downstream server.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DownstreamAddr {
    pub host: String,
    pub port: u16,
}

impl DownstreamAddr {
    /// The address in a form `TcpStream::connect` accepts.
    pub fn connect_target(&self) -> String {
        if self.host.contains(':') && !self.host.starts_with('[') {
            format!("[{}]:{}", self.host, self.port)
        } else {
            format!("{}:{}", self.host, self.port)
        }
    }
}

impl fmt::Display for DownstreamAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.connect_target())
    }
}

/// Parse `host:port[,host:port]*`. Blank items are skipped.
pub fn parse_downstreams(spec: &str) -> Result<Vec<DownstreamAddr>, HostError> {
    let mut addrs = Vec::new();

    for item in spec.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        let (host, port) = item.rsplit_once(':').ok_or_else(|| HostError::BadDownstream {
            item: item.to_string(),
            reason: "expected host:port",
        })?;

        if host.is_empty() || host == "[]" {
            return Err(HostError::BadDownstream { item: item.to_string(), reason: "empty host" });
        }

        let port = port
            .parse::<u16>()
            .ok()
            .filter(|p| *p > 0)
            .ok_or_else(|| HostError::BadDownstream { item: item.to_string(), reason: "bad port" })?;

        addrs.push(DownstreamAddr { host: host.to_string(), port });
    }

    if addrs.is_empty() {
        return Err(HostError::BadDownstream { item: spec.to_string(), reason: "no downstream servers" });
    }

    Ok(addrs)
}
