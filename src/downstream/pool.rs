//! Per-proxy downstream connection pool.
//!
//! # Responsibilities
//! - Bound concurrently open downstream connections to `downstream_max`
//! - Queue callers waiting for a slot, up to `wait_queue_timeout`
//! - Pick downstreams round-robin, bounded by `downstream_timeout`
//! - Release the slot when the connection is dropped

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::net::TcpStream;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use crate::config::behavior::BehaviorConfig;
use crate::downstream::address::DownstreamAddr;
use crate::observability::metrics;

/// Errors from [`DownstreamPool`].
#[derive(Debug, Error)]
pub enum PoolError {
    /// No slot freed up within `wait_queue_timeout`.
    #[error("timed out after {0:?} waiting for a downstream slot")]
    WaitQueueTimeout(Duration),

    /// The pool was closed while waiting.
    #[error("downstream pool closed")]
    Closed,

    /// Every downstream was tried and none accepted a connection.
    #[error("could not connect to downstream {addr}: {source}")]
    Connect {
        addr: String,
        #[source]
        source: std::io::Error,
    },
}

/// Downstream servers of one proxy plus the slot limit.
#[derive(Debug)]
pub struct DownstreamPool {
    addrs: Vec<DownstreamAddr>,
    slots: Arc<Semaphore>,
    downstream_max: usize,
    next: AtomicUsize,
    connect_timeout: Option<Duration>,
    wait_timeout: Option<Duration>,
}

impl DownstreamPool {
    pub fn new(addrs: Vec<DownstreamAddr>, behavior: &BehaviorConfig) -> Self {
        let downstream_max = behavior.downstream_max as usize;
        Self {
            addrs,
            slots: Arc::new(Semaphore::new(downstream_max)),
            downstream_max,
            next: AtomicUsize::new(0),
            connect_timeout: behavior.downstream_timeout.as_duration(),
            wait_timeout: behavior.wait_queue_timeout.as_duration(),
        }
    }

    pub fn addrs(&self) -> &[DownstreamAddr] {
        &self.addrs
    }

    pub fn downstream_max(&self) -> usize {
        self.downstream_max
    }

    /// Free slots right now.
    pub fn available(&self) -> usize {
        self.slots.available_permits()
    }

    /// Wait for a free slot.
    pub async fn acquire(&self) -> Result<OwnedSemaphorePermit, PoolError> {
        let acquire = self.slots.clone().acquire_owned();
        let permit = match self.wait_timeout {
            Some(limit) => tokio::time::timeout(limit, acquire)
                .await
                .map_err(|_| PoolError::WaitQueueTimeout(limit))?,
            None => acquire.await,
        };
        permit.map_err(|_| PoolError::Closed)
    }

    /// Acquire a slot and connect to the next reachable downstream.
    pub async fn connect(&self) -> Result<DownstreamConn, PoolError> {
        let permit = self.acquire().await?;

        let start = self.next.fetch_add(1, Ordering::Relaxed);
        let len = self.addrs.len();
        let mut last_err = None;

        for i in 0..len {
            let addr = &self.addrs[(start + i) % len];
            match self.connect_one(addr).await {
                Ok(stream) => {
                    tracing::debug!(downstream = %addr, "Downstream connected");
                    return Ok(DownstreamConn { stream, addr: addr.clone(), _permit: permit });
                }
                Err(e) => {
                    tracing::warn!(downstream = %addr, error = %e, "Downstream connect failed");
                    metrics::record_downstream_connect_error(&addr.to_string());
                    last_err = Some((addr, e));
                }
            }
        }

        let (addr, source) = match last_err {
            Some(pair) => pair,
            None => return Err(PoolError::Closed),
        };
        Err(PoolError::Connect { addr: addr.to_string(), source })
    }

    async fn connect_one(&self, addr: &DownstreamAddr) -> std::io::Result<TcpStream> {
        let connect = TcpStream::connect(addr.connect_target());
        match self.connect_timeout {
            Some(limit) => tokio::time::timeout(limit, connect).await.map_err(|_| {
                std::io::Error::new(std::io::ErrorKind::TimedOut, "downstream connect timed out")
            })?,
            None => connect.await,
        }
    }
}

/// An open downstream connection holding one pool slot.
#[derive(Debug)]
pub struct DownstreamConn {
    pub stream: TcpStream,
    pub addr: DownstreamAddr,
    _permit: OwnedSemaphorePermit,
}
