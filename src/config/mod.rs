//! Configuration subsystem.
//!
//! # Data Flow
//! ```text
//! settings file (TOML, optional) + CLI flags
//!     → loader.rs (read, deserialize, apply overrides, validate)
//!     → Settings (worker count, verbosity, raw strings)
//!
//! behavior string
//!     → behavior.rs (defaults + overrides)
//!     → BehaviorConfig (immutable, shared via Arc)
//!
//! topology string
//!     → topology.rs (split on ';', then first '=')
//!     → Vec<ProxyDefinition> (one per section, in order)
//! ```
//!
//! # Design Decisions
//! - Parsers are pure and return `ConfigError`; the binary decides to exit
//! - Topology errors are fatal, behavior errors are lenient except
//!   `downstream_max <= 0`
//! - Configuration is produced once at startup; there is no reload

pub mod behavior;
pub mod error;
pub mod lenient;
pub mod loader;
pub mod schema;
pub mod topology;

pub use behavior::{parse_behavior, BehaviorConfig, DownstreamProtocol, Timeval};
pub use error::ConfigError;
pub use loader::{load_settings, read_settings, resolve_settings, SettingsOverrides};
pub use schema::Settings;
pub use topology::{parse_topology, ProxyDefinition};
