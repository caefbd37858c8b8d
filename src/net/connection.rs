//! Connection tracking and drain.
//!
//! # Responsibilities
//! - Generate unique connection IDs for tracing
//! - Count open connections (and export the gauge)
//! - Own every connection task so shutdown can drain, then abort, them
//!
//! # Drain
//! ```text
//! drain(grace)
//!     → broadcast `true` on the drain channel (connections stop taking requests)
//!     → join tasks until empty            → Graceful { completed }
//!     → grace elapsed with tasks left     → abort_all → Forced { aborted }
//! ```

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinSet;

use crate::observability::metrics;

/// Relaxed ordering is enough: IDs only need to be unique.
static CONNECTION_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Unique identifier for a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    pub fn new() -> Self {
        Self(CONNECTION_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Counts open connections.
#[derive(Debug, Clone, Default)]
pub struct ConnectionTracker {
    active_count: Arc<AtomicU64>,
}

impl ConnectionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a new connection. The returned guard decrements on drop.
    pub fn track(&self) -> ConnectionGuard {
        self.active_count.fetch_add(1, Ordering::SeqCst);
        metrics::connection_opened();
        ConnectionGuard {
            active_count: Arc::clone(&self.active_count),
            id: ConnectionId::new(),
        }
    }

    pub fn active_count(&self) -> u64 {
        self.active_count.load(Ordering::SeqCst)
    }
}

/// Tracks one connection's lifetime; dropping it (including on abort) closes the slot.
#[derive(Debug)]
pub struct ConnectionGuard {
    active_count: Arc<AtomicU64>,
    id: ConnectionId,
}

impl ConnectionGuard {
    pub fn id(&self) -> ConnectionId {
        self.id
    }
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        self.active_count.fetch_sub(1, Ordering::SeqCst);
        metrics::connection_closed();
        tracing::trace!(connection_id = %self.id, "Connection closed");
    }
}

/// How a drain ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrainOutcome {
    /// Every connection finished within the grace period.
    Graceful { completed: usize },
    /// The grace period elapsed; the remaining connections were aborted.
    Forced { completed: usize, aborted: usize },
}

impl DrainOutcome {
    pub fn is_graceful(&self) -> bool {
        matches!(self, DrainOutcome::Graceful { .. })
    }
}

/// The set of live connection tasks owned by one server.
#[derive(Debug)]
pub struct Connections {
    tasks: JoinSet<()>,
    drain_tx: watch::Sender<bool>,
    tracker: ConnectionTracker,
}

impl Connections {
    pub fn new() -> Self {
        let (drain_tx, _) = watch::channel(false);
        Self {
            tasks: JoinSet::new(),
            drain_tx,
            tracker: ConnectionTracker::new(),
        }
    }

    /// Spawn a connection task. It receives the drain signal and its tracking guard.
    pub fn spawn<F, Fut>(&mut self, serve: F) -> ConnectionId
    where
        F: FnOnce(watch::Receiver<bool>, ConnectionGuard) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let guard = self.tracker.track();
        let id = guard.id();
        self.tasks.spawn(serve(self.drain_tx.subscribe(), guard));
        id
    }

    /// Collect tasks that already finished so the set does not grow unbounded.
    pub fn reap(&mut self) {
        while let Some(result) = self.tasks.try_join_next() {
            log_join(result);
        }
    }

    pub fn active(&self) -> u64 {
        self.tracker.active_count()
    }

    pub fn tracker(&self) -> &ConnectionTracker {
        &self.tracker
    }

    /// Signal every connection to finish, then wait at most `grace`.
    pub async fn drain(mut self, grace: Duration) -> DrainOutcome {
        self.reap();
        tracing::info!(
            active_connections = self.active(),
            grace_ms = grace.as_millis() as u64,
            "Draining connections"
        );
        self.drain_tx.send_replace(true);

        let mut completed = 0;
        let tasks = &mut self.tasks;
        let waited = tokio::time::timeout(grace, async {
            while let Some(result) = tasks.join_next().await {
                log_join(result);
                completed += 1;
            }
        })
        .await;

        if waited.is_ok() {
            return DrainOutcome::Graceful { completed };
        }

        let aborted = self.tasks.len();
        tracing::warn!(aborted, "Grace period elapsed, aborting connections");
        self.tasks.abort_all();
        while self.tasks.join_next().await.is_some() {}

        DrainOutcome::Forced { completed, aborted }
    }
}

impl Default for Connections {
    fn default() -> Self {
        Self::new()
    }
}

fn log_join(result: Result<(), tokio::task::JoinError>) {
    if let Err(e) = result {
        if e.is_panic() {
            tracing::error!("Connection task panicked");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connection_id_unique() {
        let id1 = ConnectionId::new();
        let id2 = ConnectionId::new();
        assert_ne!(id1, id2);
    }

    #[test]
    fn connection_tracker_counts() {
        let tracker = ConnectionTracker::new();
        assert_eq!(tracker.active_count(), 0);

        let guard1 = tracker.track();
        let guard2 = tracker.track();
        assert_eq!(tracker.active_count(), 2);

        drop(guard1);
        assert_eq!(tracker.active_count(), 1);

        drop(guard2);
        assert_eq!(tracker.active_count(), 0);
    }

    #[tokio::test]
    async fn drain_waits_for_cooperative_tasks() {
        let mut connections = Connections::new();
        for _ in 0..3 {
            connections.spawn(|mut drain, _guard| async move {
                let _ = drain.wait_for(|draining| *draining).await;
                tokio::time::sleep(Duration::from_millis(20)).await;
            });
        }

        let outcome = connections.drain(Duration::from_secs(5)).await;
        assert_eq!(outcome, DrainOutcome::Graceful { completed: 3 });
    }

    #[tokio::test]
    async fn drain_aborts_after_grace() {
        let mut connections = Connections::new();
        let tracker = connections.tracker().clone();
        connections.spawn(|_drain, _guard| async move {
            tokio::time::sleep(Duration::from_secs(3600)).await;
        });
        connections.spawn(|_drain, _guard| async {});

        let outcome = connections.drain(Duration::from_millis(50)).await;
        assert!(!outcome.is_graceful());
        match outcome {
            DrainOutcome::Forced { aborted, .. } => assert_eq!(aborted, 1),
            DrainOutcome::Graceful { .. } => unreachable!(),
        }
        assert_eq!(tracker.active_count(), 0);
    }
}
