//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (supervisor.rs):
//!     bind listener → Serving (accept loop task)
//!
//! Shutdown (shutdown.rs, supervisor.rs):
//!     signal or fatal accept error → stop accepting → drain (bounded) → close pool → exit
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → graceful shutdown
//! ```
//!
//! # Design Decisions
//! - A bind failure is fatal and never retried
//! - Shutdown is bounded: connections still open after the grace period are aborted
//! - A failing pool close is logged and does not block exit

pub mod shutdown;
pub mod signals;
pub mod supervisor;

pub use shutdown::{Shutdown, ShutdownReason, ShutdownReport};
pub use signals::{termination, Signal};
pub use supervisor::{LifecycleError, ServerState, Supervisor};
