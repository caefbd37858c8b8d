//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured log events)
//!     → metrics.rs (counters, gauges, histograms)
//!
//! Consumers:
//!     → Log aggregation (stdout, JSON in production)
//!     → Metrics endpoint (Prometheus scrape at /metrics)
//! ```
//!
//! # Design Decisions
//! - Request ID flows through every log line of a request via the request span
//! - Metrics are cheap (atomic increments)

pub mod logging;
pub mod metrics;
