//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request (method, path)
//!     → router.rs (axum route table, longest literal match wins)
//!     → bind_route (template + path params into RequestContext and the span)
//!     → handler
//!
//! No match:
//!     → 404 "Route not found" / 405 "Method not allowed" envelopes
//!     → metrics label `unknown`
//! ```
//!
//! # Design Decisions
//! - The route table is built once at startup and immutable afterwards
//! - Metric labels come from the matched template (template.rs), never the raw path
//! - `/metrics` is mounted outside the pipeline by the server

pub mod router;
pub mod template;

pub use router::{bind_route, routes};
