//! Request identity and the per-request context bag.
//!
//! # Responsibilities
//! - Generate a request ID (UUID v4) when the client did not send one
//! - Echo the ID on the response
//! - Attach a `RequestContext` to the request extensions
//!
//! # Design Decisions
//! - Request ID added as early as possible for tracing
//! - A client-supplied `x-request-id` is kept verbatim
//! - The context is created per request and never shared across requests

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use axum::{body::Body, extract::Request, http::HeaderName, middleware::Next, response::Response};
use tower_http::request_id::{
    MakeRequestUuid, PropagateRequestIdLayer, RequestId as TowerRequestId, SetRequestIdLayer,
};

pub const X_REQUEST_ID: &str = "x-request-id";

/// Per-request mutable metadata shared between middleware and handlers.
#[derive(Debug, Clone)]
pub struct RequestContext {
    id: String,
    started_at: Instant,
    metadata: Arc<Mutex<BTreeMap<String, String>>>,
}

impl RequestContext {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            started_at: Instant::now(),
            metadata: Arc::new(Mutex::new(BTreeMap::new())),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn started_at(&self) -> Instant {
        self.started_at
    }

    pub fn elapsed(&self) -> Duration {
        self.started_at.elapsed()
    }

    pub fn insert(&self, key: impl Into<String>, value: impl Into<String>) {
        self.metadata
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.metadata
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }
}

/// Lookup helpers on anything carrying extensions.
pub trait RequestIdExt {
    fn request_id(&self) -> &str;
}

impl RequestIdExt for Request<Body> {
    fn request_id(&self) -> &str {
        self.extensions()
            .get::<RequestContext>()
            .map(RequestContext::id)
            .or_else(|| {
                self.headers()
                    .get(X_REQUEST_ID)
                    .and_then(|v| v.to_str().ok())
            })
            .unwrap_or("unknown")
    }
}

fn header_name() -> HeaderName {
    HeaderName::from_static(X_REQUEST_ID)
}

/// Sets `x-request-id` on the request when absent.
pub fn set_request_id_layer() -> SetRequestIdLayer<MakeRequestUuid> {
    SetRequestIdLayer::new(header_name(), MakeRequestUuid)
}

/// Copies `x-request-id` from the request onto the response.
pub fn propagate_request_id_layer() -> PropagateRequestIdLayer {
    PropagateRequestIdLayer::new(header_name())
}

/// Creates the `RequestContext` from the (by now guaranteed) request ID.
pub async fn attach_context(mut req: Request, next: Next) -> Response {
    let id = req
        .extensions()
        .get::<TowerRequestId>()
        .and_then(|id| id.header_value().to_str().ok())
        .or_else(|| req.headers().get(X_REQUEST_ID).and_then(|v| v.to_str().ok()))
        .unwrap_or_default()
        .to_string();

    req.extensions_mut().insert(RequestContext::new(id));
    next.run(req).await
}
