//! Client-to-downstream relaying.
//!
//! # Responsibilities
//! - Choose the protocol adapter for a proxy's downstream protocol
//! - Take a downstream slot and connection from the proxy's pool
//! - Copy bytes both ways until either side closes
//!
//! Ascii clients talking to ascii downstreams are relayed verbatim.
//! Ascii-to-binary translation is not built in: such sessions get a
//! `SERVER_ERROR` line and are closed.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;

use crate::config::behavior::DownstreamProtocol;
use crate::downstream::pool::{DownstreamPool, PoolError};
use crate::net::connection::ConnectionGuard;
use crate::observability::metrics;

const A2B_UNAVAILABLE: &[u8] = b"SERVER_ERROR a2b translation unavailable\r\n";
const DOWNSTREAM_UNAVAILABLE: &[u8] = b"SERVER_ERROR proxy downstream unavailable\r\n";

/// How client traffic is carried to the downstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Adapter {
    /// ascii → ascii.
    AsciiPassthrough,
    /// ascii → binary.
    AsciiToBinary,
}

/// Registry of protocol adapters, set up once before proxies are created.
#[derive(Debug, Default)]
pub struct ProtocolAdapters {
    a2a: bool,
    a2b: bool,
}

impl ProtocolAdapters {
    pub fn init(&mut self) {
        if self.a2a && self.a2b {
            tracing::trace!("Protocol adapters already initialized");
            return;
        }
        self.a2a = true;
        self.a2b = true;
        tracing::debug!("Protocol adapters initialized (a2a, a2b)");
    }

    /// The adapter for `protocol`, if it has been initialized.
    pub fn for_protocol(&self, protocol: DownstreamProtocol) -> Option<Adapter> {
        match protocol {
            DownstreamProtocol::Ascii if self.a2a => Some(Adapter::AsciiPassthrough),
            DownstreamProtocol::Binary if self.a2b => Some(Adapter::AsciiToBinary),
            _ => None,
        }
    }
}

/// Per-proxy state shared by its accept loops.
#[derive(Debug)]
pub struct RelayContext {
    pub port: u16,
    pub adapter: Adapter,
    pub pool: DownstreamPool,
}

/// Serve one client session to completion.
pub async fn relay_client(
    mut client: TcpStream,
    peer: SocketAddr,
    ctx: Arc<RelayContext>,
    guard: ConnectionGuard,
) {
    let connection_id = guard.id();

    if ctx.adapter == Adapter::AsciiToBinary {
        tracing::debug!(connection_id = %connection_id, port = ctx.port, "Rejecting session, a2b unavailable");
        let _ = client.write_all(A2B_UNAVAILABLE).await;
        let _ = client.shutdown().await;
        return;
    }

    let mut downstream = match ctx.pool.connect().await {
        Ok(conn) => conn,
        Err(e) => {
            if matches!(e, PoolError::WaitQueueTimeout(_)) {
                metrics::record_wait_queue_timeout(ctx.port);
            }
            tracing::warn!(
                connection_id = %connection_id,
                peer_addr = %peer,
                port = ctx.port,
                error = %e,
                "No downstream for client"
            );
            let _ = client.write_all(DOWNSTREAM_UNAVAILABLE).await;
            let _ = client.shutdown().await;
            return;
        }
    };

    match tokio::io::copy_bidirectional(&mut client, &mut downstream.stream).await {
        Ok((to_downstream, to_client)) => {
            tracing::debug!(
                connection_id = %connection_id,
                downstream = %downstream.addr,
                bytes_up = to_downstream,
                bytes_down = to_client,
                "Session finished"
            );
        }
        Err(e) => {
            tracing::debug!(
                connection_id = %connection_id,
                downstream = %downstream.addr,
                error = %e,
                "Session ended with error"
            );
        }
    }
}
