//! Startup configuration errors.
//!
//! Every variant is fatal to startup. The parsers only return these; the
//! binary decides to log and exit with [`ConfigError::exit_code`].

use thiserror::Error;

/// `EX_CONFIG` from sysexits.h.
pub const EXIT_CONFIG: u8 = 78;
/// `EX_SOFTWARE` from sysexits.h.
pub const EXIT_SOFTWARE: u8 = 70;
/// `EX_UNAVAILABLE` from sysexits.h.
pub const EXIT_UNAVAILABLE: u8 = 69;
/// `EX_OSERR` from sysexits.h.
pub const EXIT_OSERR: u8 = 71;

/// Errors raised while turning configuration strings into running proxies.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A topology section had no `=` between port and downstreams.
    #[error("bad proxy config, missing = in section {section:?}")]
    MissingEquals { section: String },

    /// A topology section's port was zero, negative, non-numeric or out of range.
    #[error("bad proxy config, bad proxy port {value:?}")]
    BadPort { value: String },

    /// `downstream_max` resolved to a non-positive value.
    #[error("bad behavior config, downstream_max must be > 0 (got {value})")]
    InvalidDownstreamMax { value: i64 },

    /// The process needs a main thread plus at least one worker.
    #[error("worker thread count must be > 1 (got {count})")]
    TooFewThreads { count: usize },

    /// The proxy host could not construct a proxy for a topology entry.
    #[error("could not create proxy on port {port}: {source}")]
    ProxyCreate {
        port: u16,
        #[source]
        source: crate::lifecycle::startup::HostError,
    },

    /// No listening socket could be established for a proxy.
    #[error("could not listen on port {port} -- port unavailable?")]
    PortUnavailable { port: u16 },

    /// The configuration names an agent source but none is available.
    #[error("agent configuration {identifier:?} requested but no dynamic config source is available")]
    AgentUnavailable { identifier: String },

    /// The settings file could not be read.
    #[error("could not read settings file: {0}")]
    SettingsIo(#[source] std::io::Error),

    /// The settings file is not valid TOML for [`crate::config::Settings`].
    #[error("could not parse settings file: {0}")]
    SettingsParse(#[from] toml::de::Error),

    /// The settings file parsed but holds unusable values.
    #[error("invalid settings: {0}")]
    SettingsInvalid(String),

    /// The worker runtime or listener registration failed.
    #[error("runtime error: {0}")]
    Runtime(#[source] std::io::Error),
}

impl ConfigError {
    /// Process exit status for this error.
    pub fn exit_code(&self) -> u8 {
        match self {
            ConfigError::ProxyCreate { .. } => EXIT_SOFTWARE,
            ConfigError::PortUnavailable { .. } => EXIT_UNAVAILABLE,
            ConfigError::AgentUnavailable { .. } => 1,
            ConfigError::Runtime(_) => EXIT_OSERR,
            _ => EXIT_CONFIG,
        }
    }
}
