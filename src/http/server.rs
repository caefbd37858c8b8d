//! HTTP server setup.
//!
//! # Responsibilities
//! - Assemble the axum app: routes, fallbacks, middleware pipeline, `/metrics`
//! - Accept connections until told to stop or the listener fails
//! - Serve each connection with HTTP/1.1 or HTTP/2 through hyper-util
//! - Hand the live connections back so the lifecycle can drain them

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{middleware::from_fn, routing::get, Router};
use hyper_util::{
    rt::{TokioExecutor, TokioIo, TokioTimer},
    server::conn::auto,
    service::TowerToHyperService,
};
use metrics_exporter_prometheus::PrometheusHandle;
use tokio::net::TcpStream;
use tokio::sync::watch;

use crate::config::{AppConfig, ServerConfig};
use crate::http::handlers;
use crate::http::middleware;
use crate::net::connection::{ConnectionGuard, Connections};
use crate::net::listener::{Listener, ListenerError};
use crate::routing::bind_route;
use crate::storage::ConnectionPool;
use crate::users::UserService;

/// Pause before retrying after the process ran out of descriptors or memory.
const ACCEPT_BACKOFF: Duration = Duration::from_secs(1);

/// Upper bound on a readiness ping.
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(2);

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub users: UserService,
    pub pool: Arc<dyn ConnectionPool>,
    pub app: Arc<AppConfig>,
    pub probe_timeout: Duration,
}

impl AppState {
    pub fn new(users: UserService, pool: Arc<dyn ConnectionPool>, app: AppConfig) -> Self {
        Self {
            users,
            pool,
            app: Arc::new(app),
            probe_timeout: DEFAULT_PROBE_TIMEOUT,
        }
    }
}

/// Build the complete application router.
///
/// `routes` go through the full pipeline; `/metrics` is merged afterwards and
/// bypasses it.
pub fn build_app(
    routes: Router<AppState>,
    state: AppState,
    metrics: PrometheusHandle,
    server: &ServerConfig,
) -> Router {
    let routed = routes
        .route_layer(from_fn(bind_route))
        .method_not_allowed_fallback(handlers::method_not_allowed)
        .fallback(handlers::not_found);

    let api = middleware::apply(routed, server).with_state(state);

    let scrape = Router::new()
        .route("/metrics", get(handlers::metrics))
        .with_state(metrics);

    api.merge(scrape)
}

/// Why the accept loop returned.
#[derive(Debug)]
pub enum AcceptExit {
    /// Stop was requested.
    Stopped,
    /// The listener failed with a non-transient error.
    Failed(ListenerError),
}

/// Connections left running when the accept loop ended, plus the reason it ended.
#[derive(Debug)]
pub struct ServeOutcome {
    pub connections: Connections,
    pub exit: AcceptExit,
}

/// HTTP server: accept loop plus per-connection serving.
#[derive(Clone)]
pub struct HttpServer {
    app: Router,
    read_timeout: Duration,
}

impl HttpServer {
    pub fn new(app: Router, config: &ServerConfig) -> Self {
        Self {
            app,
            read_timeout: config.read_timeout(),
        }
    }

    /// Accept connections until `stop` flips to `true` or accepting fails fatally.
    ///
    /// The listener is dropped on return, so further connection attempts are refused.
    pub async fn accept_loop(self, listener: Listener, mut stop: watch::Receiver<bool>) -> ServeOutcome {
        let mut connections = Connections::new();

        if let Ok(addr) = listener.local_addr() {
            tracing::info!(address = %addr, "HTTP server accepting connections");
        }

        let exit = loop {
            if *stop.borrow() {
                break AcceptExit::Stopped;
            }

            tokio::select! {
                changed = stop.changed() => {
                    if changed.is_err() || *stop.borrow() {
                        break AcceptExit::Stopped;
                    }
                }
                accepted = listener.accept() => match accepted {
                    Ok((stream, peer, permit)) => {
                        connections.reap();
                        let app = self.app.clone();
                        let read_timeout = self.read_timeout;
                        connections.spawn(move |drain, guard| async move {
                            serve_connection(stream, peer, app, read_timeout, drain, guard).await;
                            drop(permit);
                        });
                    }
                    Err(e) if e.is_transient() => {
                        tracing::warn!(error = %e, "Transient accept error");
                    }
                    Err(e) if e.is_resource_exhaustion() => {
                        tracing::error!(
                            error = %e,
                            backoff_ms = ACCEPT_BACKOFF.as_millis() as u64,
                            "Accept failed, backing off"
                        );
                        tokio::select! {
                            _ = tokio::time::sleep(ACCEPT_BACKOFF) => {}
                            _ = stop.changed() => {}
                        }
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "Accept failed");
                        break AcceptExit::Failed(e);
                    }
                },
            }
        };

        tracing::info!(
            active_connections = connections.active(),
            "HTTP server stopped accepting"
        );
        ServeOutcome { connections, exit }
    }
}

async fn serve_connection(
    stream: TcpStream,
    peer: SocketAddr,
    app: Router,
    read_timeout: Duration,
    mut drain: watch::Receiver<bool>,
    guard: ConnectionGuard,
) {
    let connection_id = guard.id();
    tracing::trace!(connection_id = %connection_id, peer_addr = %peer, "Serving connection");

    let mut builder = auto::Builder::new(TokioExecutor::new());
    builder
        .http1()
        .timer(TokioTimer::new())
        .header_read_timeout(read_timeout);

    let service = TowerToHyperService::new(app);
    let conn = builder.serve_connection_with_upgrades(TokioIo::new(stream), service);
    tokio::pin!(conn);

    let result = tokio::select! {
        result = conn.as_mut() => result,
        _ = drain_requested(&mut drain) => {
            conn.as_mut().graceful_shutdown();
            conn.as_mut().await
        }
    };

    if let Err(e) = result {
        tracing::debug!(connection_id = %connection_id, error = %e, "Connection ended with error");
    }
}

/// Resolves once draining starts. The channel's read guard is released before returning.
async fn drain_requested(drain: &mut watch::Receiver<bool>) {
    let _ = drain.wait_for(|draining| *draining).await;
}
