//! Request metrics.
//!
//! The counter and histogram are written from a drop guard so a request is
//! recorded exactly once whether the handler returns, panics, or is torn down
//! by a forced shutdown. An unfinished request is recorded as a 500.

use std::time::Instant;

use axum::{
    extract::{MatchedPath, Request},
    http::StatusCode,
    middleware::Next,
    response::Response,
};

use crate::observability::metrics as recorder;
use crate::routing::template::route_label;

struct RequestRecord {
    method: String,
    route: String,
    started: Instant,
    status: Option<StatusCode>,
}

impl Drop for RequestRecord {
    fn drop(&mut self) {
        let status = self.status.unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        recorder::record_request(
            &self.method,
            &self.route,
            status.as_u16(),
            self.started.elapsed(),
        );
    }
}

pub async fn record_metrics(req: Request, next: Next) -> Response {
    let mut record = RequestRecord {
        method: req.method().to_string(),
        route: route_label(req.extensions().get::<MatchedPath>()),
        started: Instant::now(),
        status: None,
    };

    let response = next.run(req).await;
    record.status = Some(response.status());
    response
}
