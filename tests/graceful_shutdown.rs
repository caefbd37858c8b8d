//! Drain behaviour on termination.

use std::sync::Arc;
use std::time::Duration;

use axum::{routing::get, Router};
use tokio::net::TcpStream;
use tokio::sync::Notify;

use user_service::config::ServerConfig;
use user_service::lifecycle::{ServerState, ShutdownReason, Signal};
use user_service::net::connection::DrainOutcome;

mod common;

fn slow_route(entered: Arc<Notify>, delay: Duration) -> Router<user_service::http::AppState> {
    Router::new().route(
        "/slow",
        get(move || {
            let entered = entered.clone();
            async move {
                entered.notify_one();
                tokio::time::sleep(delay).await;
                "done"
            }
        }),
    )
}

#[tokio::test]
async fn in_flight_requests_finish_and_new_connections_are_refused() {
    let entered = Arc::new(Notify::new());
    let mut server = common::start_with(
        slow_route(entered.clone(), Duration::from_millis(500)),
        common::test_config(),
    )
    .await;

    let in_flight = tokio::spawn(server.client.get(server.url("/slow")).send());
    entered.notified().await;

    server.terminate();
    server
        .state
        .wait_for(|s| *s == ServerState::Draining)
        .await
        .unwrap();

    assert!(TcpStream::connect(server.addr).await.is_err());

    let res = in_flight.await.unwrap().unwrap();
    assert_eq!(res.status(), 200);
    assert_eq!(res.text().await.unwrap(), "done");

    let store = server.store.clone();
    let report = server.shutdown().await;
    assert_eq!(report.reason, ShutdownReason::Signal(Signal::Terminate));
    assert!(report.drain.is_graceful());
    assert!(report.pool_closed);
    assert!(store.is_closed());
}

#[tokio::test]
async fn stragglers_are_aborted_after_the_grace_period() {
    let entered = Arc::new(Notify::new());
    let config = ServerConfig {
        shutdown_timeout_secs: 1,
        write_timeout_secs: 120,
        ..common::test_config()
    };
    let server = common::start_with(slow_route(entered.clone(), Duration::from_secs(60)), config).await;

    let in_flight = tokio::spawn(server.client.get(server.url("/slow")).send());
    entered.notified().await;

    let started = std::time::Instant::now();
    let mut state = server.state.clone();
    let report = server.shutdown().await;

    assert!(started.elapsed() < Duration::from_secs(10));
    assert!(matches!(report.drain, DrainOutcome::Forced { aborted: 1, .. }));
    assert!(report.pool_closed);
    assert_eq!(*state.borrow_and_update(), ServerState::Stopped);
    assert!(in_flight.await.unwrap().is_err());
}
