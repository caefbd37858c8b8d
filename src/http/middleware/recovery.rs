//! Panic recovery.
//!
//! The last line of defense: any panic raised downstream is caught here,
//! logged with the request's identity, and turned into a generic 500
//! envelope. Nothing after this point can take the server down.

use std::any::Any;
use std::panic::AssertUnwindSafe;

use axum::{extract::Request, middleware::Next, response::IntoResponse, response::Response};
use futures_util::FutureExt;

use crate::http::error::ApiError;
use crate::http::request::{RequestContext, RequestIdExt};

pub async fn recover_panics(req: Request, next: Next) -> Response {
    let method = req.method().clone();
    let path = req.uri().path().to_owned();
    let request_id = req.request_id().to_owned();
    let context = req.extensions().get::<RequestContext>().cloned();

    match AssertUnwindSafe(next.run(req)).catch_unwind().await {
        Ok(response) => response,
        Err(payload) => {
            let route = context.as_ref().and_then(|ctx| ctx.get("route"));
            let elapsed_ms = context
                .as_ref()
                .map(|ctx| ctx.elapsed().as_secs_f64() * 1000.0);
            tracing::error!(
                request_id = %request_id,
                method = %method,
                path = %path,
                route = route.as_deref(),
                elapsed_ms,
                panic = %panic_message(payload.as_ref()),
                "Panic recovered"
            );
            ApiError::Internal.into_response()
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.as_str()
    } else {
        "non-string panic payload"
    }
}
