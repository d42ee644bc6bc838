//! Topology string parsing.
//!
//! # Format
//! ```text
//! <port>=<host:port,host:port>[;<port>=<host:port,...>]*
//! ```
//! e.g. `11222=memcached1.foo.net:11211` makes local port 11222 a proxy
//! to the memcached server at memcached1.foo.net:11211.
//!
//! Sections keep their left-to-right order. The downstream list is passed
//! through untouched; the proxy host interprets it.

use std::sync::Arc;

use serde::Serialize;

use crate::config::behavior::BehaviorConfig;
use crate::config::error::ConfigError;
use crate::config::lenient::parse_leading_int;

/// Name given to every proxy built from a topology string.
pub const DEFAULT_PROXY_NAME: &str = "default";

/// One `port=downstreams` section, ready to hand to a proxy host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProxyDefinition {
    pub name: String,
    pub local_port: u16,
    pub downstream_spec: String,
    /// Always 0 for topology strings.
    pub config_version: u32,
    pub behavior: Arc<BehaviorConfig>,
}

/// Parse a topology string into proxy definitions sharing `behavior`.
///
/// The first invalid section aborts the parse.
pub fn parse_topology(
    topology_str: &str,
    behavior: &Arc<BehaviorConfig>,
) -> Result<Vec<ProxyDefinition>, ConfigError> {
    if topology_str.is_empty() {
        return Ok(Vec::new());
    }

    topology_str
        .split(';')
        .map(|section| parse_section(section, behavior))
        .collect()
}

fn parse_section(section: &str, behavior: &Arc<BehaviorConfig>) -> Result<ProxyDefinition, ConfigError> {
    let (port_str, downstream_spec) = section
        .split_once('=')
        .ok_or_else(|| ConfigError::MissingEquals { section: section.to_string() })?;

    let local_port = u16::try_from(parse_leading_int(port_str))
        .ok()
        .filter(|port| *port > 0)
        .ok_or_else(|| ConfigError::BadPort { value: port_str.to_string() })?;

    Ok(ProxyDefinition {
        name: DEFAULT_PROXY_NAME.to_string(),
        local_port,
        downstream_spec: downstream_spec.to_string(),
        config_version: 0,
        behavior: Arc::clone(behavior),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn behavior() -> Arc<BehaviorConfig> {
        Arc::new(BehaviorConfig::defaults(4))
    }

    #[test]
    fn single_section() {
        let b = behavior();
        let defs = parse_topology("11222=memcached1.foo.net:11211", &b).unwrap();

        assert_eq!(
            defs,
            vec![ProxyDefinition {
                name: "default".into(),
                local_port: 11222,
                downstream_spec: "memcached1.foo.net:11211".into(),
                config_version: 0,
                behavior: b.clone(),
            }]
        );
    }

    #[test]
    fn sections_keep_order_and_share_behavior() {
        let b = behavior();
        let defs = parse_topology("11222=h1:11211;11223=h2:11211", &b).unwrap();

        assert_eq!(defs.len(), 2);
        assert_eq!(defs[0].local_port, 11222);
        assert_eq!(defs[0].downstream_spec, "h1:11211");
        assert_eq!(defs[1].local_port, 11223);
        assert_eq!(defs[1].downstream_spec, "h2:11211");
        assert!(defs.iter().all(|d| Arc::ptr_eq(&d.behavior, &b)));
        assert!(defs.iter().all(|d| d.config_version == 0));
    }

    #[test]
    fn downstream_spec_is_split_on_first_equals_only() {
        let defs = parse_topology("11222=a:1,b:2=x", &behavior()).unwrap();
        assert_eq!(defs[0].downstream_spec, "a:1,b:2=x");
    }

    #[test]
    fn missing_equals_is_fatal() {
        let err = parse_topology("bogus", &behavior()).unwrap_err();
        assert!(matches!(err, ConfigError::MissingEquals { ref section } if section == "bogus"));
    }

    #[test]
    fn trailing_separator_yields_empty_section() {
        let err = parse_topology("11222=h1:11211;", &behavior()).unwrap_err();
        assert!(matches!(err, ConfigError::MissingEquals { .. }));
    }

    #[test]
    fn bad_ports_are_fatal() {
        for input in ["0=h1:11211", "-5=h1:11211", "abc=h1:11211", "=h1:11211", "70000=h1:11211"] {
            let err = parse_topology(input, &behavior()).unwrap_err();
            assert!(matches!(err, ConfigError::BadPort { .. }), "{input}");
        }
    }

    #[test]
    fn lenient_port_prefix() {
        let defs = parse_topology("11222abc=h1:11211", &behavior()).unwrap();
        assert_eq!(defs[0].local_port, 11222);
    }

    #[test]
    fn later_bad_section_fails_whole_parse() {
        let err = parse_topology("11222=h1:11211;0=h2:11211", &behavior()).unwrap_err();
        assert!(matches!(err, ConfigError::BadPort { .. }));
    }

    #[test]
    fn empty_input_is_noop() {
        assert!(parse_topology("", &behavior()).unwrap().is_empty());
    }
}
