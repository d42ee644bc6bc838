//! Behavior string parsing.
//!
//! # Format
//! ```text
//! downstream_max=4,downstream_prot=binary,downstream_timeout=250,wait_queue_timeout=10
//! ```
//!
//! # Design Decisions
//! - Start from hard-coded defaults, layer recognized keys on top
//! - Unknown keys, unknown protocol names and malformed pairs are accepted
//!   and logged at warn level
//! - Only `downstream_max <= 0` is rejected

use std::time::Duration;

use serde::Serialize;

use crate::config::error::ConfigError;
use crate::config::lenient::parse_leading_int;

/// Wire protocol spoken to downstream servers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DownstreamProtocol {
    Ascii,
    Binary,
}

impl DownstreamProtocol {
    /// Exact, case-sensitive match on the behavior string value.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "ascii" => Some(DownstreamProtocol::Ascii),
            "binary" => Some(DownstreamProtocol::Binary),
            _ => None,
        }
    }
}

/// A seconds + microseconds pair, as produced from a millisecond value.
///
/// Zero means "no timeout". Negative inputs are carried through unchanged
/// (`-250` ms becomes `-1 s, -250000 µs`) and also mean "no timeout".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Timeval {
    pub secs: i64,
    pub micros: i64,
}

impl Timeval {
    pub fn from_millis(ms: i64) -> Self {
        Self {
            secs: ms.div_euclid(1000),
            micros: (ms % 1000) * 1000,
        }
    }

    /// The timeout as a `Duration`, or `None` when no timeout applies.
    pub fn as_duration(&self) -> Option<Duration> {
        let total_micros = self.secs.checked_mul(1_000_000)?.checked_add(self.micros)?;
        if total_micros <= 0 {
            return None;
        }
        Some(Duration::from_micros(total_micros as u64))
    }
}

/// Resolved connection-handling parameters shared by every proxy of one startup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BehaviorConfig {
    /// Main thread plus workers; always > 1.
    pub worker_thread_count: usize,
    /// Maximum downstream connections per proxy; always > 0.
    pub downstream_max: u32,
    pub downstream_protocol: DownstreamProtocol,
    pub downstream_timeout: Timeval,
    pub wait_queue_timeout: Timeval,
}

impl BehaviorConfig {
    /// The default behavior for a process with `worker_thread_count` threads.
    pub fn defaults(worker_thread_count: usize) -> Self {
        Self {
            worker_thread_count,
            downstream_max: 1,
            downstream_protocol: DownstreamProtocol::Ascii,
            downstream_timeout: Timeval::default(),
            wait_queue_timeout: Timeval::default(),
        }
    }
}

/// Parse a behavior string on top of the defaults.
pub fn parse_behavior(
    behavior_str: Option<&str>,
    worker_thread_count: usize,
) -> Result<BehaviorConfig, ConfigError> {
    if worker_thread_count <= 1 {
        return Err(ConfigError::TooFewThreads { count: worker_thread_count });
    }

    let mut behavior = BehaviorConfig::defaults(worker_thread_count);

    let Some(input) = behavior_str.filter(|s| !s.is_empty()) else {
        return Ok(behavior);
    };

    for pair in input.split(',') {
        if pair.is_empty() {
            continue;
        }
        let Some((key, val)) = pair.split_once('=') else {
            tracing::warn!(pair = %pair, "Ignoring behavior entry without '='");
            continue;
        };

        match key {
            "downstream_max" => {
                let value = parse_leading_int(val);
                if value <= 0 {
                    return Err(ConfigError::InvalidDownstreamMax { value });
                }
                behavior.downstream_max = u32::try_from(value).unwrap_or(u32::MAX);
            }
            "downstream_prot" => match DownstreamProtocol::from_name(val) {
                Some(protocol) => behavior.downstream_protocol = protocol,
                None => {
                    tracing::warn!(value = %val, "Ignoring unknown downstream_prot");
                }
            },
            "downstream_timeout" => {
                behavior.downstream_timeout = Timeval::from_millis(parse_leading_int(val));
            }
            "wait_queue_timeout" => {
                behavior.wait_queue_timeout = Timeval::from_millis(parse_leading_int(val));
            }
            _ => {
                tracing::warn!(key = %key, "Ignoring unknown behavior key");
            }
        }
    }

    Ok(behavior)
}
