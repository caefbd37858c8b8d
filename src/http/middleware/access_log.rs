//! Access logging.
//!
//! One `request` span per request carrying method, path and request ID; the
//! matched route is recorded on it once routing resolves. A single INFO line
//! with status and latency is emitted when the response head is ready.

use std::time::Duration;

use axum::http::{Request, Response};
use tower_http::trace::{
    DefaultOnBodyChunk, DefaultOnEos, DefaultOnRequest, HttpMakeClassifier, MakeSpan, OnResponse,
    TraceLayer,
};
use tracing::Span;

use crate::http::request::X_REQUEST_ID;

pub type AccessLogLayer = TraceLayer<
    HttpMakeClassifier,
    RequestSpan,
    DefaultOnRequest,
    LogResponse,
    DefaultOnBodyChunk,
    DefaultOnEos,
    (),
>;

#[derive(Debug, Clone, Copy, Default)]
pub struct RequestSpan;

impl<B> MakeSpan<B> for RequestSpan {
    fn make_span(&mut self, request: &Request<B>) -> Span {
        let request_id = request
            .headers()
            .get(X_REQUEST_ID)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default();

        tracing::info_span!(
            "request",
            method = %request.method(),
            path = %request.uri().path(),
            request_id = %request_id,
            route = tracing::field::Empty,
        )
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct LogResponse;

impl<B> OnResponse<B> for LogResponse {
    fn on_response(self, response: &Response<B>, latency: Duration, _span: &Span) {
        let status = response.status();
        let latency_ms = latency.as_secs_f64() * 1000.0;

        if status.is_server_error() {
            tracing::warn!(status = status.as_u16(), latency_ms, "request completed");
        } else {
            tracing::info!(status = status.as_u16(), latency_ms, "request completed");
        }
    }
}

/// Server errors are already reported by the response line, so failures log nothing extra.
pub fn layer() -> AccessLogLayer {
    TraceLayer::new_for_http()
        .make_span_with(RequestSpan)
        .on_response(LogResponse)
        .on_failure(())
}
