//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! ProxyDefinition
//!     → listener.rs (TcpProxyHost: create proxy, bind port on each host)
//!     → listener.rs (ProxyServer: accept loop, client connection limit)
//!     → connection.rs (session id, open-session count)
//!     → relay.rs (adapter choice, downstream slot, byte copy)
//! ```
//!
//! # Design Decisions
//! - Bounded accept per socket prevents resource exhaustion
//! - Every session is tracked for graceful shutdown
//! - Relaying is protocol-agnostic for ascii downstreams

pub mod connection;
pub mod listener;
pub mod relay;

pub use listener::{Proxy, ProxyServer, TcpProxyHost};
