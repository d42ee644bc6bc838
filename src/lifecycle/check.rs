//! Dry-run startup for `--check`.
//!
//! Runs the same [`initialize`] path as the real server against a host that
//! validates each proxy's downstreams but never binds a socket.

use crate::config::error::ConfigError;
use crate::config::schema::Settings;
use crate::config::topology::ProxyDefinition;
use crate::downstream::parse_downstreams;
use crate::lifecycle::startup::{initialize, HostError, ProxyHost, Startup};
use crate::net::relay::ProtocolAdapters;

/// A [`ProxyHost`] whose proxies are the validated definitions themselves.
#[derive(Debug, Default)]
pub struct CheckHost {
    adapters: ProtocolAdapters,
}

impl ProxyHost for CheckHost {
    type Proxy = ProxyDefinition;

    fn init_adapters(&mut self) {
        self.adapters.init();
    }

    fn create_proxy(&mut self, definition: &ProxyDefinition) -> Result<ProxyDefinition, HostError> {
        let protocol = definition.behavior.downstream_protocol;
        self.adapters.for_protocol(protocol).ok_or(HostError::AdapterMissing(protocol))?;
        parse_downstreams(&definition.downstream_spec)?;
        Ok(definition.clone())
    }

    fn start_listening(&mut self, _proxy: &mut ProxyDefinition) -> Result<usize, HostError> {
        Ok(1)
    }
}

/// Resolve the configured proxies without starting them.
pub fn check_config(settings: &Settings) -> Result<Vec<ProxyDefinition>, ConfigError> {
    let mut host = CheckHost::default();
    let startup = initialize(
        settings.topology.as_deref(),
        settings.behavior.as_deref(),
        settings,
        &mut host,
        None,
    )?;

    match startup {
        Startup::Skipped => Ok(Vec::new()),
        Startup::Started { proxies, .. } => Ok(proxies),
    }
}
