//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use tokio::net::TcpListener;
use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;

use user_service::config::{AppConfig, ServerConfig};
use user_service::http::{build_app, AppState};
use user_service::lifecycle::{ServerState, ShutdownReport, Signal, Supervisor};
use user_service::net::listener::Listener;
use user_service::observability::metrics::init_metrics;
use user_service::routing::routes;
use user_service::storage::MemoryUserStore;
use user_service::users::UserService;

/// A running server on an ephemeral localhost port.
pub struct TestServer {
    pub addr: SocketAddr,
    pub store: Arc<MemoryUserStore>,
    pub client: reqwest::Client,
    pub state: watch::Receiver<ServerState>,
    signal: Option<oneshot::Sender<()>>,
    run: JoinHandle<ShutdownReport>,
}

impl TestServer {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    /// Deliver SIGTERM to the supervisor without waiting for the outcome.
    pub fn terminate(&mut self) {
        if let Some(tx) = self.signal.take() {
            let _ = tx.send(());
        }
    }

    /// Terminate (if not already) and wait for the shutdown report.
    pub async fn shutdown(mut self) -> ShutdownReport {
        self.terminate();
        tokio::time::timeout(Duration::from_secs(30), self.run)
            .await
            .expect("shutdown did not finish")
            .expect("supervisor task panicked")
    }
}

pub fn test_config() -> ServerConfig {
    ServerConfig {
        bind_address: "127.0.0.1:0".into(),
        shutdown_timeout_secs: 5,
        ..ServerConfig::default()
    }
}

pub async fn start() -> TestServer {
    start_with(Router::new(), test_config()).await
}

/// Start the service with `extra` routes merged into the standard table.
pub async fn start_with(extra: Router<AppState>, config: ServerConfig) -> TestServer {
    let store = Arc::new(MemoryUserStore::new());
    let state = AppState::new(
        UserService::new(store.clone()),
        store.clone(),
        AppConfig {
            instance_id: "test-instance".into(),
            ..AppConfig::default()
        },
    );
    let app = build_app(routes().merge(extra), state, init_metrics().unwrap(), &config);

    let tcp = TcpListener::bind(&config.bind_address).await.unwrap();
    let addr = tcp.local_addr().unwrap();
    let listener = Listener::from_tcp(tcp, config.max_connections).unwrap();

    let supervisor = Supervisor::new(app, &config, store.clone());
    let mut state = supervisor.state();

    let (tx, rx) = oneshot::channel::<()>();
    let run = tokio::spawn(supervisor.serve(listener, async move {
        let _ = rx.await;
        Signal::Terminate
    }));

    state
        .wait_for(|s| *s == ServerState::Serving)
        .await
        .unwrap();

    let client = reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap();

    TestServer {
        addr,
        store,
        client,
        state,
        signal: Some(tx),
        run,
    }
}
