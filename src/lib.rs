//! User service library.

pub mod config;
pub mod http;
pub mod lifecycle;
pub mod net;
pub mod observability;
pub mod routing;
pub mod storage;
pub mod users;

pub use config::ServiceConfig;
pub use http::{build_app, AppState};
pub use lifecycle::{Shutdown, Supervisor};
