//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (accept loop, hyper-util auto HTTP/1.1 + HTTP/2)
//!     → middleware/ (request id, access log, recovery, CORS, metrics, deadline)
//!     → routing (template match, path params)
//!     → handlers/ (health probes, user CRUD)
//!     → response.rs / error.rs (envelope)
//!     → client
//! ```

pub mod error;
pub mod handlers;
pub mod middleware;
pub mod request;
pub mod response;
pub mod server;

pub use error::ApiError;
pub use request::{RequestContext, RequestIdExt, X_REQUEST_ID};
pub use response::{ApiResponse, Envelope};
pub use server::{build_app, AppState, HttpServer};
