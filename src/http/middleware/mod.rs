//! Request middleware pipeline.
//!
//! # Order (outermost first)
//! ```text
//! set request id → propagate request id → attach RequestContext
//!     → access log span
//!     → panic recovery
//!     → CORS (preflight short-circuit)
//!     → metrics (drop-guarded)
//!     → write deadline
//!     → handler
//! ```
//!
//! Recovery sits inside the access log and outside metrics, so a panicking
//! handler is still logged with its 500 and still counted exactly once.

pub mod access_log;
pub mod cors;
pub mod deadline;
pub mod metrics;
pub mod recovery;

use axum::{
    middleware::{from_fn, from_fn_with_state},
    Router,
};
use tower::ServiceBuilder;

use crate::config::ServerConfig;
use crate::http::request::{attach_context, propagate_request_id_layer, set_request_id_layer};

/// Wrap every route and the fallback of `router` in the pipeline.
pub fn apply<S>(router: Router<S>, server: &ServerConfig) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    router.layer(
        ServiceBuilder::new()
            .layer(set_request_id_layer())
            .layer(propagate_request_id_layer())
            .layer(from_fn(attach_context))
            .layer(access_log::layer())
            .layer(from_fn(recovery::recover_panics))
            .layer(from_fn(cors::cors))
            .layer(from_fn(metrics::record_metrics))
            .layer(from_fn_with_state(
                server.write_timeout(),
                deadline::enforce_deadline,
            )),
    )
}
