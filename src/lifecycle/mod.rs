//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs), single-threaded, before workers run:
//!     adapters → behavior → topology → create + listen per proxy
//!
//! Dry run (check.rs, `--check`):
//!     same startup path, downstreams validated, nothing bound
//!
//! Serving (main):
//!     worker runtime → accept loops → relay sessions
//!
//! Shutdown (shutdown.rs, signals.rs):
//!     SIGINT/SIGTERM → stop accepting → drain sessions (bounded) → exit
//! ```
//!
//! # Design Decisions
//! - Fail fast: any startup error ends the process before traffic flows
//! - Listeners are bound before the worker runtime starts
//! - Draining has a deadline; open sessions are dropped after it

pub mod check;
pub mod shutdown;
pub mod signals;
pub mod startup;

pub use check::{check_config, CheckHost};
pub use shutdown::Shutdown;
pub use startup::{initialize, DynamicConfigSource, HostError, ProxyHost, Startup};
