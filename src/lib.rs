//! memcached-protocol proxy bootstrap library.
//!
//! Parses the topology (`-z`) and behavior (`-Z`) strings and starts one
//! proxy per topology entry.

pub mod config;
pub mod downstream;
pub mod lifecycle;
pub mod net;
pub mod observability;

pub use config::{BehaviorConfig, ConfigError, ProxyDefinition, Settings};
pub use lifecycle::{initialize, Shutdown, Startup};
pub use net::{ProxyServer, TcpProxyHost};
