//! Structured logging setup.
//!
//! `RUST_LOG` wins when set; otherwise the memcached-style `-v` count
//! picks the level. Output goes to stderr so stdout stays free for
//! `--check` output.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Default filter directive for a verbosity level.
pub fn default_filter(verbose: u8) -> &'static str {
    match verbose {
        0 => "memproxy=info",
        1 => "memproxy=info,memproxy::lifecycle=debug",
        2 => "memproxy=debug",
        _ => "memproxy=trace",
    }
}

/// Install the global subscriber. Safe to call more than once.
pub fn init_logging(verbose: u8) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter(verbose).into());

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbosity_maps_to_levels() {
        assert_eq!(default_filter(0), "memproxy=info");
        assert_eq!(default_filter(1), "memproxy=info,memproxy::lifecycle=debug");
        assert_eq!(default_filter(2), "memproxy=debug");
        assert_eq!(default_filter(5), "memproxy=trace");
    }

    #[test]
    fn every_level_is_a_valid_filter() {
        for verbose in 0..4 {
            assert!(EnvFilter::try_new(default_filter(verbose)).is_ok(), "verbose={verbose}");
        }
    }
}
