//! Health, readiness and liveness probes.
//!
//! `/ready` is the only probe that touches the database; it always answers
//! with a verdict and never surfaces a ping failure as an error.

use axum::{extract::State, http::StatusCode};
use chrono::Utc;
use serde::Serialize;

use crate::http::response::ApiResponse;
use crate::http::server::AppState;
use crate::storage::{probe, DatabaseStatus};

#[derive(Debug, Serialize)]
pub struct Health {
    pub status: &'static str,
    pub timestamp: String,
    pub service: String,
    pub version: String,
}

#[derive(Debug, Serialize)]
pub struct Readiness {
    pub database: DatabaseStatus,
    pub timestamp: String,
}

#[derive(Debug, Serialize)]
pub struct Liveness {
    pub status: &'static str,
    pub timestamp: String,
    pub instance_id: String,
}

fn now() -> String {
    Utc::now().to_rfc3339()
}

pub async fn health(State(state): State<AppState>) -> ApiResponse<Health> {
    ApiResponse::ok(
        "Service is healthy",
        Health {
            status: "ok",
            timestamp: now(),
            service: state.app.name.clone(),
            version: state.app.version.clone(),
        },
    )
}

pub async fn ready(State(state): State<AppState>) -> ApiResponse<Readiness> {
    let database = probe(state.pool.as_ref(), state.probe_timeout).await;
    let (status, message) = if database.is_ok() {
        (StatusCode::OK, "ready")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "not ready")
    };

    ApiResponse::new(
        status,
        message,
        Some(Readiness {
            database,
            timestamp: now(),
        }),
    )
}

/// Also served as `/container`.
pub async fn live(State(state): State<AppState>) -> ApiResponse<Liveness> {
    ApiResponse::ok(
        "Service is alive",
        Liveness {
            status: "alive",
            timestamp: now(),
            instance_id: state.app.instance_id.clone(),
        },
    )
}
