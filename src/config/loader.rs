//! Settings loading from disk.
//!
//! A file is only deserialized here. Validation runs once, on the settings
//! that result after command-line overrides are applied.

use std::fs;
use std::path::Path;

use crate::config::error::ConfigError;
use crate::config::schema::Settings;

/// Read and deserialize a TOML settings file without validating it.
pub fn read_settings(path: &Path) -> Result<Settings, ConfigError> {
    let content = fs::read_to_string(path).map_err(ConfigError::SettingsIo)?;
    let settings: Settings = toml::from_str(&content)?;

    tracing::debug!(path = %path.display(), "Settings file loaded");
    Ok(settings)
}

/// Load and validate settings from a TOML file.
pub fn load_settings(path: &Path) -> Result<Settings, ConfigError> {
    let settings = read_settings(path)?;
    validate_settings(&settings)?;
    Ok(settings)
}

/// Values given on the command line. Each one present replaces the file value.
#[derive(Debug, Clone, Default)]
pub struct SettingsOverrides {
    pub topology: Option<String>,
    pub behavior: Option<String>,
    pub worker_thread_count: Option<usize>,
    pub verbose: u8,
    pub max_connections: Option<usize>,
    pub listen_hosts: Vec<String>,
    pub metrics_address: Option<String>,
}

impl SettingsOverrides {
    pub fn apply(self, mut settings: Settings) -> Settings {
        if self.topology.is_some() {
            settings.topology = self.topology;
        }
        if self.behavior.is_some() {
            settings.behavior = self.behavior;
        }
        if let Some(threads) = self.worker_thread_count {
            settings.worker_thread_count = threads;
        }
        if self.verbose > 0 {
            settings.verbose = self.verbose;
        }
        if let Some(max) = self.max_connections {
            settings.max_connections = max;
        }
        if !self.listen_hosts.is_empty() {
            settings.listen_hosts = self.listen_hosts;
        }
        if self.metrics_address.is_some() {
            settings.metrics_address = self.metrics_address;
        }
        settings
    }
}

/// Merge an optional settings file with overrides, then validate the result.
pub fn resolve_settings(
    path: Option<&Path>,
    overrides: SettingsOverrides,
) -> Result<Settings, ConfigError> {
    let base = match path {
        Some(path) => read_settings(path)?,
        None => Settings::default(),
    };

    let settings = overrides.apply(base);
    validate_settings(&settings)?;
    Ok(settings)
}

/// Semantic checks serde cannot express.
pub fn validate_settings(settings: &Settings) -> Result<(), ConfigError> {
    if settings.worker_thread_count <= 1 {
        return Err(ConfigError::TooFewThreads { count: settings.worker_thread_count });
    }
    if settings.max_connections == 0 {
        return Err(ConfigError::SettingsInvalid("max_connections must be > 0".into()));
    }
    if settings.listen_hosts.is_empty() {
        return Err(ConfigError::SettingsInvalid("listen_hosts must not be empty".into()));
    }
    if let Some(addr) = &settings.metrics_address {
        if addr.parse::<std::net::SocketAddr>().is_err() {
            return Err(ConfigError::SettingsInvalid(format!("bad metrics_address {addr:?}")));
        }
    }
    Ok(())
}
