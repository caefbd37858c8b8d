//! Server lifetime supervision.
//!
//! # States
//! ```text
//! Starting ──bind ok──▶ Serving ──signal──────▶ Draining ──▶ Stopped
//!    │                     └────fatal accept──▶ Draining ──▶ Failed
//!    └──bind error──▶ Failed
//! ```
//!
//! The accept loop runs as its own task. The supervisor waits for whichever
//! comes first, a termination signal or the accept task ending, then stops
//! accepting, drains within the grace period, and closes the pool.

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use tokio::sync::watch;
use tokio::task::JoinError;

use crate::config::ServerConfig;
use crate::http::server::{AcceptExit, HttpServer, ServeOutcome};
use crate::lifecycle::shutdown::{Shutdown, ShutdownReason, ShutdownReport};
use crate::lifecycle::signals::Signal;
use crate::net::connection::DrainOutcome;
use crate::net::listener::{Listener, ListenerError};
use crate::storage::ConnectionPool;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerState {
    Starting,
    Serving,
    Draining,
    Stopped,
    Failed,
}

impl fmt::Display for ServerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ServerState::Starting => "starting",
            ServerState::Serving => "serving",
            ServerState::Draining => "draining",
            ServerState::Stopped => "stopped",
            ServerState::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Startup failures. Never retried.
#[derive(Debug)]
pub enum LifecycleError {
    Bind(ListenerError),
}

impl fmt::Display for LifecycleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LifecycleError::Bind(e) => write!(f, "Server failed to start: {}", e),
        }
    }
}

impl std::error::Error for LifecycleError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            LifecycleError::Bind(e) => Some(e),
        }
    }
}

pub struct Supervisor {
    server: HttpServer,
    config: ServerConfig,
    pool: Arc<dyn ConnectionPool>,
    state: watch::Sender<ServerState>,
    shutdown: Shutdown,
}

impl Supervisor {
    pub fn new(app: Router, config: &ServerConfig, pool: Arc<dyn ConnectionPool>) -> Self {
        let (state, _) = watch::channel(ServerState::Starting);
        Self {
            server: HttpServer::new(app, config),
            config: config.clone(),
            pool,
            state,
            shutdown: Shutdown::new(),
        }
    }

    /// Observe state transitions.
    pub fn state(&self) -> watch::Receiver<ServerState> {
        self.state.subscribe()
    }

    /// Background tasks subscribe here; it fires when draining begins.
    pub fn shutdown(&self) -> &Shutdown {
        &self.shutdown
    }

    /// Bind the configured address and serve until `signal` resolves.
    pub async fn run<F>(self, signal: F) -> Result<ShutdownReport, LifecycleError>
    where
        F: Future<Output = Signal>,
    {
        match Listener::bind(&self.config).await {
            Ok(listener) => Ok(self.serve(listener, signal).await),
            Err(e) => {
                tracing::error!(
                    address = %self.config.bind_address,
                    error = %e,
                    "Failed to bind"
                );
                self.transition(ServerState::Failed);
                Err(LifecycleError::Bind(e))
            }
        }
    }

    /// Serve on an already bound listener until `signal` resolves or accepting fails.
    pub async fn serve<F>(self, listener: Listener, signal: F) -> ShutdownReport
    where
        F: Future<Output = Signal>,
    {
        let (stop_tx, stop_rx) = watch::channel(false);
        let mut accept = tokio::spawn(self.server.clone().accept_loop(listener, stop_rx));
        self.transition(ServerState::Serving);

        tokio::pin!(signal);
        let (reason, outcome) = tokio::select! {
            signal = &mut signal => {
                tracing::info!(signal = %signal, "Shutdown signal received");
                stop_tx.send_replace(true);
                (ShutdownReason::Signal(signal), accept.await)
            }
            joined = &mut accept => (fatal_reason(&joined), joined),
        };

        self.transition(ServerState::Draining);
        self.shutdown.trigger();

        let drain = self.drain(outcome, self.config.shutdown_timeout()).await;
        let pool_closed = self.close_pool().await;

        let terminal = if reason.is_fatal() {
            ServerState::Failed
        } else {
            ServerState::Stopped
        };
        tracing::info!(reason = %reason, ?drain, pool_closed, "Shutdown complete");
        self.transition(terminal);

        ShutdownReport {
            reason,
            drain,
            pool_closed,
        }
    }

    async fn drain(&self, outcome: Result<ServeOutcome, JoinError>, grace: Duration) -> DrainOutcome {
        match outcome {
            Ok(served) => {
                let drain = served.connections.drain(grace).await;
                match drain {
                    DrainOutcome::Graceful { completed } => {
                        tracing::info!(completed, "All connections drained")
                    }
                    DrainOutcome::Forced { completed, aborted } => {
                        tracing::warn!(completed, aborted, "Forced shutdown after grace period")
                    }
                }
                drain
            }
            // The accept task's connection set was dropped with it, aborting its tasks.
            Err(e) => {
                tracing::error!(error = %e, "Accept loop task failed");
                DrainOutcome::Forced {
                    completed: 0,
                    aborted: 0,
                }
            }
        }
    }

    async fn close_pool(&self) -> bool {
        match self.pool.close().await {
            Ok(()) => true,
            Err(e) => {
                tracing::error!(error = %e, "Failed to close database pool");
                false
            }
        }
    }

    fn transition(&self, next: ServerState) {
        let previous = self.state.send_replace(next);
        tracing::info!(from = %previous, to = %next, "Server state changed");
    }
}

fn fatal_reason(joined: &Result<ServeOutcome, JoinError>) -> ShutdownReason {
    let error = match joined {
        Ok(ServeOutcome {
            exit: AcceptExit::Failed(e),
            ..
        }) => e.to_string(),
        Ok(ServeOutcome {
            exit: AcceptExit::Stopped,
            ..
        }) => "accept loop stopped unexpectedly".to_string(),
        Err(e) => format!("accept loop task failed: {e}"),
    };
    ShutdownReason::Fatal(error)
}
