//! Process-wide settings.
//!
//! Read from an optional TOML file, then overridden by command-line flags.

use serde::{Deserialize, Serialize};

/// Settings for the hosting process.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct Settings {
    /// Main thread plus workers (memcached `-t`).
    pub worker_thread_count: usize,

    /// Diagnostic verbosity (memcached `-v`, repeatable).
    pub verbose: u8,

    /// Topology string, or an `id@domain` agent identifier.
    pub topology: Option<String>,

    /// Behavior override string.
    pub behavior: Option<String>,

    /// Interfaces every proxy port is bound on.
    pub listen_hosts: Vec<String>,

    /// Maximum concurrent client connections per listening socket.
    pub max_connections: usize,

    /// Prometheus scrape address (e.g., "127.0.0.1:9090"); disabled when unset.
    pub metrics_address: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            worker_thread_count: 4,
            verbose: 0,
            topology: None,
            behavior: None,
            listen_hosts: vec!["0.0.0.0".to_string()],
            max_connections: 1024,
            metrics_address: None,
        }
    }
}
