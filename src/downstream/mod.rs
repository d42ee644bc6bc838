//! Downstream server subsystem.
//!
//! # Data Flow
//! ```text
//! ProxyDefinition.downstream_spec ("h1:11211,h2:11211")
//!     → address.rs (parse host:port list)
//!     → pool.rs (slot limit = downstream_max, round-robin connect)
//!     → DownstreamConn handed to the relay
//! ```
//!
//! # Design Decisions
//! - One pool per proxy; all pools of a startup share one behavior
//! - A slot is held for the whole client session
//! - Unreachable downstreams are skipped, not marked unhealthy

pub mod address;
pub mod pool;

pub use address::{parse_downstreams, DownstreamAddr};
pub use pool::{DownstreamConn, DownstreamPool, PoolError};
