//! TCP proxy host and accept loops.
//!
//! # Responsibilities
//! - Build proxies from topology entries (`ProxyHost`)
//! - Bind every proxy port on each configured interface
//! - Accept clients with a per-socket connection limit
//! - Hand each client to the relay; stop on shutdown
//!
//! Sockets are bound with std before the runtime starts and converted to
//! tokio listeners by [`ProxyServer::spawn`].

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{broadcast, OwnedSemaphorePermit, Semaphore};
use tokio::task::JoinHandle;

use crate::config::behavior::BehaviorConfig;
use crate::config::topology::ProxyDefinition;
use crate::downstream::{parse_downstreams, DownstreamPool};
use crate::lifecycle::shutdown::Shutdown;
use crate::lifecycle::startup::{HostError, ProxyHost};
use crate::net::connection::ConnectionTracker;
use crate::net::relay::{relay_client, ProtocolAdapters, RelayContext};
use crate::observability::metrics;

/// Builds [`Proxy`] values backed by real sockets.
#[derive(Debug)]
pub struct TcpProxyHost {
    listen_hosts: Vec<String>,
    adapters: ProtocolAdapters,
}

impl TcpProxyHost {
    pub fn new(listen_hosts: Vec<String>) -> Self {
        Self { listen_hosts, adapters: ProtocolAdapters::default() }
    }
}

impl ProxyHost for TcpProxyHost {
    type Proxy = Proxy;

    fn init_adapters(&mut self) {
        self.adapters.init();
    }

    fn create_proxy(&mut self, definition: &ProxyDefinition) -> Result<Proxy, HostError> {
        let protocol = definition.behavior.downstream_protocol;
        let adapter = self.adapters.for_protocol(protocol).ok_or(HostError::AdapterMissing(protocol))?;
        let addrs = parse_downstreams(&definition.downstream_spec)?;

        tracing::debug!(
            name = %definition.name,
            port = definition.local_port,
            downstreams = addrs.len(),
            config_version = definition.config_version,
            "Proxy created"
        );

        let pool = DownstreamPool::new(addrs, &definition.behavior);
        Ok(Proxy {
            name: definition.name.clone(),
            config_version: definition.config_version,
            behavior: Arc::clone(&definition.behavior),
            relay: Arc::new(RelayContext { port: definition.local_port, adapter, pool }),
            sockets: Vec::new(),
        })
    }

    fn start_listening(&mut self, proxy: &mut Proxy) -> Result<usize, HostError> {
        let port = proxy.port();
        for host in &self.listen_hosts {
            match bind_std(host, port) {
                Ok(socket) => proxy.sockets.push(socket),
                Err(e) => {
                    tracing::warn!(host = %host, port, error = %e, "Failed to bind proxy port");
                }
            }
        }
        Ok(proxy.sockets.len())
    }
}

fn bind_std(host: &str, port: u16) -> std::io::Result<std::net::TcpListener> {
    let socket = std::net::TcpListener::bind((host, port))?;
    socket.set_nonblocking(true)?;
    Ok(socket)
}

/// A created proxy and its bound sockets.
#[derive(Debug)]
pub struct Proxy {
    name: String,
    config_version: u32,
    behavior: Arc<BehaviorConfig>,
    relay: Arc<RelayContext>,
    sockets: Vec<std::net::TcpListener>,
}

impl Proxy {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn port(&self) -> u16 {
        self.relay.port
    }

    pub fn config_version(&self) -> u32 {
        self.config_version
    }

    pub fn behavior(&self) -> &Arc<BehaviorConfig> {
        &self.behavior
    }

    pub fn pool(&self) -> &DownstreamPool {
        &self.relay.pool
    }
}

/// Runs accept loops for a set of listening proxies.
#[derive(Debug)]
pub struct ProxyServer {
    proxies: Vec<Proxy>,
    max_connections: usize,
}

impl ProxyServer {
    pub fn new(proxies: Vec<Proxy>, max_connections: usize) -> Self {
        Self { proxies, max_connections }
    }

    /// Spawn one accept loop per bound socket. Must run inside a tokio runtime.
    pub fn spawn(
        self,
        shutdown: &Shutdown,
        tracker: &ConnectionTracker,
    ) -> std::io::Result<Vec<JoinHandle<()>>> {
        let mut handles = Vec::new();

        for proxy in self.proxies {
            for socket in proxy.sockets {
                let listener = Listener::from_std(socket, self.max_connections)?;
                tracing::info!(
                    address = %listener.local_addr()?,
                    name = %proxy.name,
                    max_connections = self.max_connections,
                    "Proxy accepting connections"
                );
                handles.push(tokio::spawn(accept_loop(
                    listener,
                    Arc::clone(&proxy.relay),
                    tracker.clone(),
                    shutdown.subscribe(),
                )));
            }
        }

        Ok(handles)
    }
}

async fn accept_loop(
    listener: Listener,
    relay: Arc<RelayContext>,
    tracker: ConnectionTracker,
    mut shutdown: broadcast::Receiver<()>,
) {
    loop {
        tokio::select! {
            accepted = listener.accept() => match accepted {
                Ok((stream, peer, permit)) => {
                    metrics::record_client_connection(relay.port);
                    let guard = tracker.track();
                    let relay = Arc::clone(&relay);
                    tokio::spawn(async move {
                        let _permit = permit;
                        relay_client(stream, peer, relay, guard).await;
                    });
                }
                Err(e) => {
                    tracing::warn!(port = relay.port, error = %e, "Accept failed");
                    // Back off on fd exhaustion and similar errors.
                    tokio::time::sleep(Duration::from_millis(50)).await;
                }
            },
            _ = shutdown.recv() => {
                tracing::info!(port = relay.port, "Listener stopping");
                break;
            }
        }
    }
}

/// Error type for listener operations.
#[derive(Debug)]
pub enum ListenerError {
    /// Failed to accept a connection.
    Accept(std::io::Error),
}

impl std::fmt::Display for ListenerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ListenerError::Accept(e) => write!(f, "Failed to accept: {}", e),
        }
    }
}

impl std::error::Error for ListenerError {}

/// A TCP listener that limits concurrent client connections.
///
/// When the limit is reached, accepting waits until a slot is released.
pub struct Listener {
    inner: TcpListener,
    connection_limit: Arc<Semaphore>,
}

impl Listener {
    pub fn from_std(socket: std::net::TcpListener, max_connections: usize) -> std::io::Result<Self> {
        Ok(Self {
            inner: TcpListener::from_std(socket)?,
            connection_limit: Arc::new(Semaphore::new(max_connections)),
        })
    }

    /// Accept a connection. The permit must be held for the connection's lifetime.
    pub async fn accept(&self) -> Result<(TcpStream, SocketAddr, OwnedSemaphorePermit), ListenerError> {
        let permit = self
            .connection_limit
            .clone()
            .acquire_owned()
            .await
            .map_err(|e| ListenerError::Accept(std::io::Error::other(e)))?;

        let (stream, addr) = self.inner.accept().await.map_err(ListenerError::Accept)?;

        tracing::debug!(
            peer_addr = %addr,
            available_permits = self.connection_limit.available_permits(),
            "Connection accepted"
        );

        Ok((stream, addr, permit))
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.inner.local_addr()
    }
}
