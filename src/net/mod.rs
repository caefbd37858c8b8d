//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming TCP connection
//!     → listener.rs (accept, connection limit)
//!     → connection.rs (id, tracking, drain/abort)
//!     → hand off to the HTTP layer
//! ```
//!
//! # Design Decisions
//! - Bounded accept prevents resource exhaustion
//! - Every connection task is owned by a `Connections` set so shutdown can drain it

pub mod connection;
pub mod listener;
