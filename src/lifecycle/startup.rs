//! Startup orchestration.
//!
//! # Responsibilities
//! - Set up protocol adapters once per initialization
//! - Resolve the shared behavior
//! - Choose between a topology string and an agent identifier
//! - Create and start a proxy per topology entry, in order
//!
//! # Design Decisions
//! - Fail fast: the first invalid entry, failed construction or failed
//!   listen stops startup with a `ConfigError`
//! - Proxy construction and listening are behind `ProxyHost` so the
//!   dispatcher stays testable without sockets

use std::sync::Arc;

use thiserror::Error;

use crate::config::behavior::{parse_behavior, BehaviorConfig, DownstreamProtocol};
use crate::config::error::ConfigError;
use crate::config::schema::Settings;
use crate::config::topology::{parse_topology, ProxyDefinition};

/// Errors reported by a [`ProxyHost`].
#[derive(Debug, Error)]
pub enum HostError {
    /// The downstream list could not be interpreted.
    #[error("bad downstream {item:?}: {reason}")]
    BadDownstream { item: String, reason: &'static str },

    /// No adapter was initialized for the downstream protocol.
    #[error("no protocol adapter for {0:?} downstreams")]
    AdapterMissing(DownstreamProtocol),
}

/// Builds and starts proxies for topology entries.
pub trait ProxyHost {
    type Proxy;

    /// One-time setup of the ascii and ascii-to-binary adapters.
    fn init_adapters(&mut self);

    fn create_proxy(&mut self, definition: &ProxyDefinition) -> Result<Self::Proxy, HostError>;

    /// Start listening; returns the number of listening sockets established.
    fn start_listening(&mut self, proxy: &mut Self::Proxy) -> Result<usize, HostError>;
}

/// A dynamically delivered configuration source, selected by `id@domain` strings.
pub trait DynamicConfigSource {
    fn load_dynamic_topology(
        &mut self,
        identifier: &str,
        behavior: &Arc<BehaviorConfig>,
    ) -> Result<Vec<ProxyDefinition>, ConfigError>;
}

/// Outcome of a successful [`initialize`].
#[derive(Debug)]
pub enum Startup<P> {
    /// No topology was configured; nothing was started.
    Skipped,
    /// Every proxy was created and is listening.
    Started { proxies: Vec<P>, listeners: usize },
}

/// Initialize proxies from a topology string or agent identifier.
pub fn initialize<H: ProxyHost>(
    topology_or_agent: Option<&str>,
    behavior_str: Option<&str>,
    settings: &Settings,
    host: &mut H,
    agent: Option<&mut dyn DynamicConfigSource>,
) -> Result<Startup<H::Proxy>, ConfigError> {
    let nthreads = settings.worker_thread_count;
    if nthreads <= 1 {
        return Err(ConfigError::TooFewThreads { count: nthreads });
    }

    let Some(cfg) = topology_or_agent.filter(|s| !s.is_empty()) else {
        return Ok(Startup::Skipped);
    };

    tracing::debug!(config = %cfg, "Proxy initialization");

    host.init_adapters();

    let behavior = Arc::new(parse_behavior(behavior_str, nthreads)?);

    let definitions = if cfg.contains('@') {
        match agent {
            Some(source) => source.load_dynamic_topology(cfg, &behavior)?,
            None => {
                return Err(ConfigError::AgentUnavailable { identifier: cfg.to_string() });
            }
        }
    } else {
        parse_topology(cfg, &behavior)?
    };

    launch(definitions, host)
}

fn launch<H: ProxyHost>(
    definitions: Vec<ProxyDefinition>,
    host: &mut H,
) -> Result<Startup<H::Proxy>, ConfigError> {
    let mut proxies = Vec::with_capacity(definitions.len());
    let mut listeners = 0;

    for definition in &definitions {
        let port = definition.local_port;

        let mut proxy = host
            .create_proxy(definition)
            .map_err(|source| ConfigError::ProxyCreate { port, source })?;

        let count = match host.start_listening(&mut proxy) {
            Ok(count) => count,
            Err(e) => {
                tracing::warn!(port, error = %e, "Listen failed");
                0
            }
        };
        if count == 0 {
            return Err(ConfigError::PortUnavailable { port });
        }

        tracing::debug!(port, conns = count, "Proxy listening");
        listeners += count;
        proxies.push(proxy);
    }

    Ok(Startup::Started { proxies, listeners })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Default)]
    struct RecordingHost {
        adapter_inits: usize,
        created: Vec<ProxyDefinition>,
        listened: Vec<u16>,
        fail_create_on: Option<u16>,
        listen_count: usize,
    }

    impl RecordingHost {
        fn new() -> Self {
            Self { listen_count: 1, ..Self::default() }
        }
    }

    impl ProxyHost for RecordingHost {
        type Proxy = u16;

        fn init_adapters(&mut self) {
            self.adapter_inits += 1;
        }

        fn create_proxy(&mut self, definition: &ProxyDefinition) -> Result<u16, HostError> {
            if self.fail_create_on == Some(definition.local_port) {
                return Err(HostError::BadDownstream { item: String::new(), reason: "test" });
            }
            self.created.push(definition.clone());
            Ok(definition.local_port)
        }

        fn start_listening(&mut self, proxy: &mut u16) -> Result<usize, HostError> {
            self.listened.push(*proxy);
            Ok(self.listen_count)
        }
    }

    struct StaticAgent {
        identifiers: Vec<String>,
    }

    impl DynamicConfigSource for StaticAgent {
        fn load_dynamic_topology(
            &mut self,
            identifier: &str,
            behavior: &Arc<BehaviorConfig>,
        ) -> Result<Vec<ProxyDefinition>, ConfigError> {
            self.identifiers.push(identifier.to_string());
            Ok(vec![ProxyDefinition {
                name: "agent".into(),
                local_port: 22122,
                downstream_spec: "h9:11211".into(),
                config_version: 3,
                behavior: behavior.clone(),
            }])
        }
    }

    #[test]
    fn empty_config_is_noop() {
        let mut host = RecordingHost::new();
        let result = initialize(None, None, &Settings::default(), &mut host, None).unwrap();
        assert!(matches!(result, Startup::Skipped));

        let result = initialize(Some(""), None, &Settings::default(), &mut host, None).unwrap();
        assert!(matches!(result, Startup::Skipped));
        assert_eq!(host.adapter_inits, 0);
    }

    #[test]
    fn creates_and_listens_in_order() {
        let mut host = RecordingHost::new();
        let result = initialize(
            Some("11222=h1:11211;11223=h2:11211"),
            Some("downstream_max=4"),
            &Settings::default(),
            &mut host,
            None,
        )
        .unwrap();

        match result {
            Startup::Started { proxies, listeners } => {
                assert_eq!(proxies, vec![11222, 11223]);
                assert_eq!(listeners, 2);
            }
            Startup::Skipped => panic!("expected proxies to start"),
        }

        assert_eq!(host.adapter_inits, 1);
        assert_eq!(host.listened, vec![11222, 11223]);
        assert_eq!(host.created.len(), 2);
        assert!(host.created.iter().all(|d| d.config_version == 0 && d.name == "default"));
        assert!(Arc::ptr_eq(&host.created[0].behavior, &host.created[1].behavior));
        assert_eq!(host.created[0].behavior.downstream_max, 4);
    }

    #[test]
    fn agent_identifier_without_source_fails() {
        let mut host = RecordingHost::new();
        let err = initialize(Some("proxy@example.com"), None, &Settings::default(), &mut host, None)
            .unwrap_err();

        assert!(matches!(err, ConfigError::AgentUnavailable { .. }));
        assert_ne!(err.exit_code(), 0);
        assert_eq!(host.adapter_inits, 1);
        assert!(host.created.is_empty());
    }

    #[test]
    fn agent_identifier_uses_source() {
        let mut host = RecordingHost::new();
        let mut agent = StaticAgent { identifiers: vec![] };
        let result = initialize(
            Some("proxy@example.com"),
            None,
            &Settings::default(),
            &mut host,
            Some(&mut agent),
        )
        .unwrap();

        assert!(matches!(result, Startup::Started { listeners: 1, .. }));
        assert_eq!(agent.identifiers, vec!["proxy@example.com".to_string()]);
        assert_eq!(host.created[0].config_version, 3);
    }

    #[test]
    fn create_failure_is_fatal_and_stops() {
        let mut host = RecordingHost { fail_create_on: Some(11222), ..RecordingHost::new() };
        let err = initialize(
            Some("11222=h1:11211;11223=h2:11211"),
            None,
            &Settings::default(),
            &mut host,
            None,
        )
        .unwrap_err();

        assert!(matches!(err, ConfigError::ProxyCreate { port: 11222, .. }));
        assert!(host.listened.is_empty());
    }

    #[test]
    fn zero_listeners_is_fatal() {
        let mut host = RecordingHost { listen_count: 0, ..RecordingHost::new() };
        let err = initialize(Some("11222=h1:11211"), None, &Settings::default(), &mut host, None)
            .unwrap_err();
        assert!(matches!(err, ConfigError::PortUnavailable { port: 11222 }));
    }

    #[test]
    fn topology_errors_propagate() {
        let mut host = RecordingHost::new();
        let err = initialize(Some("bogus"), None, &Settings::default(), &mut host, None).unwrap_err();
        assert!(matches!(err, ConfigError::MissingEquals { .. }));

        let err = initialize(Some("0=h1:11211"), None, &Settings::default(), &mut host, None)
            .unwrap_err();
        assert!(matches!(err, ConfigError::BadPort { .. }));
        assert!(host.created.is_empty());
    }

    #[test]
    fn behavior_errors_propagate() {
        let mut host = RecordingHost::new();
        let err = initialize(
            Some("11222=h1:11211"),
            Some("downstream_max=0"),
            &Settings::default(),
            &mut host,
            None,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidDownstreamMax { .. }));
    }

    #[test]
    fn single_thread_rejected() {
        let settings = Settings { worker_thread_count: 1, ..Settings::default() };
        let mut host = RecordingHost::new();
        let err = initialize(Some("11222=h1:11211"), None, &settings, &mut host, None).unwrap_err();
        assert!(matches!(err, ConfigError::TooFewThreads { count: 1 }));
    }
}
