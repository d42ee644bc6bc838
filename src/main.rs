//! memproxy: memcached protocol proxy.
//!
//! # Architecture Overview
//!
//! ```text
//!   -z "11222=mc1:11211,mc2:11211;11223=mc3:11211"   -Z "downstream_max=4,..."
//!                  │                                         │
//!                  ▼                                         ▼
//!          ┌──────────────┐   shares Arc<BehaviorConfig> ┌──────────┐
//!          │   topology   │◀─────────────────────────────│ behavior │
//!          └──────┬───────┘                              └──────────┘
//!                 │ ProxyDefinition per section
//!                 ▼
//!          ┌──────────────┐  create_proxy / start_listening
//!          │   startup    │────────────────────────────────▶ TcpProxyHost
//!          └──────────────┘
//!                 │ bound sockets
//!                 ▼
//!   worker runtime: accept loop ──▶ downstream pool ──▶ relay ──▶ memcached
//! ```

use std::net::SocketAddr;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::{ArgAction, Parser};

use memproxy::config::{resolve_settings, SettingsOverrides};
use memproxy::lifecycle::check_config;
use memproxy::lifecycle::signals::wait_for_signal;
use memproxy::net::connection::ConnectionTracker;
use memproxy::observability::{logging, metrics};
use memproxy::{initialize, ConfigError, ProxyServer, Settings, Shutdown, Startup, TcpProxyHost};

const DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Parser, Debug)]
#[command(name = "memproxy")]
#[command(about = "memcached protocol proxy", version)]
struct Cli {
    /// Topology: "port=host:port[,host:port];port=..." or an id@domain agent identifier.
    #[arg(short = 'z', long)]
    topology: Option<String>,

    /// Behavior overrides: "downstream_max=N,downstream_prot=ascii|binary,...".
    #[arg(short = 'Z', long)]
    behavior: Option<String>,

    /// Number of threads, main thread included.
    #[arg(short = 't', long)]
    threads: Option<usize>,

    /// Verbose logging; repeat for more.
    #[arg(short = 'v', action = ArgAction::Count)]
    verbose: u8,

    /// Maximum concurrent client connections per listening socket.
    #[arg(short = 'c', long)]
    max_connections: Option<usize>,

    /// Interface to bind proxy ports on; repeatable.
    #[arg(short = 'l', long = "listen")]
    listen: Vec<String>,

    /// TOML settings file; flags override its values.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Expose Prometheus metrics on this address.
    #[arg(long)]
    metrics_address: Option<String>,

    /// Parse and print the resolved configuration, then exit.
    #[arg(long)]
    check: bool,
}

impl Cli {
    fn settings(&self) -> Result<Settings, ConfigError> {
        let overrides = SettingsOverrides {
            topology: self.topology.clone(),
            behavior: self.behavior.clone(),
            worker_thread_count: self.threads,
            verbose: self.verbose,
            max_connections: self.max_connections,
            listen_hosts: self.listen.clone(),
            metrics_address: self.metrics_address.clone(),
        };
        resolve_settings(self.config.as_deref(), overrides)
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let settings = cli.settings();

    logging::init_logging(settings.as_ref().map(|s| s.verbose).unwrap_or(cli.verbose));

    let result = settings.and_then(|settings| {
        if cli.check {
            check(&settings)
        } else {
            run(settings)
        }
    });

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "memproxy startup failed");
            ExitCode::from(e.exit_code())
        }
    }
}

/// Validate the configuration and print it as JSON.
fn check(settings: &Settings) -> Result<(), ConfigError> {
    let definitions = check_config(settings)?;

    match serde_json::to_string_pretty(&definitions) {
        Ok(json) => println!("{}", json),
        Err(e) => tracing::error!(error = %e, "Failed to render configuration"),
    }
    Ok(())
}

fn run(settings: Settings) -> Result<(), ConfigError> {
    tracing::info!(
        threads = settings.worker_thread_count,
        max_connections = settings.max_connections,
        "memproxy v{} starting",
        env!("CARGO_PKG_VERSION")
    );

    let mut host = TcpProxyHost::new(settings.listen_hosts.clone());
    let startup = initialize(
        settings.topology.as_deref(),
        settings.behavior.as_deref(),
        &settings,
        &mut host,
        None,
    )?;

    let proxies = match startup {
        Startup::Skipped => {
            tracing::info!("No proxy topology configured, nothing to serve");
            return Ok(());
        }
        Startup::Started { proxies, listeners } => {
            tracing::info!(proxies = proxies.len(), listeners, "Proxies listening");
            proxies
        }
    };

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(settings.worker_thread_count - 1)
        .thread_name("memproxy-worker")
        .enable_all()
        .build()
        .map_err(ConfigError::Runtime)?;

    runtime.block_on(serve(ProxyServer::new(proxies, settings.max_connections), &settings))
}

async fn serve(server: ProxyServer, settings: &Settings) -> Result<(), ConfigError> {
    if let Some(addr) = settings.metrics_address.as_deref() {
        match addr.parse::<SocketAddr>() {
            Ok(addr) => {
                if let Err(e) = metrics::init_metrics(addr) {
                    tracing::error!(error = %e, "Failed to start metrics endpoint");
                }
            }
            Err(e) => tracing::error!(metrics_address = %addr, error = %e, "Failed to parse metrics address"),
        }
    }

    let shutdown = Shutdown::new();
    let tracker = ConnectionTracker::new();
    let handles = server.spawn(&shutdown, &tracker).map_err(ConfigError::Runtime)?;

    wait_for_signal().await;
    shutdown.trigger();

    for handle in handles {
        let _ = handle.await;
    }

    if !tracker.wait_idle(DRAIN_TIMEOUT).await {
        tracing::warn!(open = tracker.active_count(), "Drain deadline passed, dropping open sessions");
    }

    tracing::info!("Shutdown complete");
    Ok(())
}
