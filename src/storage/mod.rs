//! Database connection management.
//!
//! # Data Flow
//! ```text
//! Startup:
//!     DatabaseConfig → open() → postgres.rs (PgConnectionPool::connect) or memory.rs
//!                             → Database { pool, users } handed to the server
//!
//! Readiness:
//!     /ready → probe() → ConnectionPool::ping → DatabaseStatus (never an error)
//!
//! Shutdown:
//!     lifecycle supervisor → ConnectionPool::close (idempotent)
//! ```
//!
//! # Design Decisions
//! - The pool is an explicit value handed to whoever needs it; there is no global handle
//! - Probing converts every failure, including a panic or a hang, into `Unhealthy`

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::FutureExt;
use serde::Serialize;

use crate::config::{DatabaseConfig, StorageBackend};
use crate::users::postgres::PgUserStore;
use crate::users::{StoreError, UserStore};

pub mod memory;
pub mod postgres;

pub use memory::MemoryUserStore;
pub use postgres::PgConnectionPool;

/// Lifecycle and liveness operations on a pool of database connections.
#[async_trait]
pub trait ConnectionPool: Send + Sync {
    /// Succeeds only if a connection could be obtained and a round trip completed.
    async fn ping(&self) -> Result<(), StoreError>;

    /// Release every pooled connection. Calling it again is a no-op.
    async fn close(&self) -> Result<(), StoreError>;
}

/// The pool and the user store built on top of it.
pub struct Database {
    pub pool: Arc<dyn ConnectionPool>,
    pub users: Arc<dyn UserStore>,
}

/// Open the configured backend. Postgres must answer a round trip before this returns.
pub async fn open(config: &DatabaseConfig) -> Result<Database, StoreError> {
    match config.backend {
        StorageBackend::Postgres => {
            let pool = PgConnectionPool::connect(config).await?;
            let users = PgUserStore::new(pool.pool().clone());
            Ok(Database {
                pool: Arc::new(pool),
                users: Arc::new(users),
            })
        }
        StorageBackend::Memory => {
            tracing::warn!("Using in-memory user store; data is not persisted");
            let store = Arc::new(MemoryUserStore::new());
            Ok(Database {
                pool: store.clone(),
                users: store,
            })
        }
    }
}

/// Verdict reported by the readiness endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseStatus {
    Ok,
    Unhealthy,
}

impl DatabaseStatus {
    pub fn is_ok(self) -> bool {
        self == DatabaseStatus::Ok
    }
}

/// Ping the pool, folding errors, timeouts and panics into `Unhealthy`.
pub async fn probe(pool: &dyn ConnectionPool, timeout: Duration) -> DatabaseStatus {
    let ping = AssertUnwindSafe(pool.ping()).catch_unwind();
    match tokio::time::timeout(timeout, ping).await {
        Ok(Ok(Ok(()))) => DatabaseStatus::Ok,
        Ok(Ok(Err(e))) => {
            tracing::warn!(error = %e, "Database ping failed");
            DatabaseStatus::Unhealthy
        }
        Ok(Err(_)) => {
            tracing::error!("Database ping panicked");
            DatabaseStatus::Unhealthy
        }
        Err(_) => {
            tracing::warn!(timeout_ms = timeout.as_millis() as u64, "Database ping timed out");
            DatabaseStatus::Unhealthy
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct PanickingPool;

    #[async_trait]
    impl ConnectionPool for PanickingPool {
        async fn ping(&self) -> Result<(), StoreError> {
            panic!("driver bug");
        }

        async fn close(&self) -> Result<(), StoreError> {
            Ok(())
        }
    }

    struct HangingPool;

    #[async_trait]
    impl ConnectionPool for HangingPool {
        async fn ping(&self) -> Result<(), StoreError> {
            std::future::pending().await
        }

        async fn close(&self) -> Result<(), StoreError> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn healthy_pool_probes_ok() {
        let store = MemoryUserStore::new();
        assert_eq!(probe(&store, Duration::from_secs(1)).await, DatabaseStatus::Ok);
    }

    #[tokio::test]
    async fn failing_ping_is_unhealthy() {
        let store = MemoryUserStore::new();
        store.set_available(false);
        assert_eq!(
            probe(&store, Duration::from_secs(1)).await,
            DatabaseStatus::Unhealthy
        );
    }

    #[tokio::test]
    async fn panicking_ping_is_unhealthy() {
        assert_eq!(
            probe(&PanickingPool, Duration::from_secs(1)).await,
            DatabaseStatus::Unhealthy
        );
    }

    #[tokio::test]
    async fn hanging_ping_is_unhealthy() {
        assert_eq!(
            probe(&HangingPool, Duration::from_millis(50)).await,
            DatabaseStatus::Unhealthy
        );
    }

    #[tokio::test]
    async fn memory_backend_shares_one_store() {
        let config = DatabaseConfig {
            backend: StorageBackend::Memory,
            ..DatabaseConfig::default()
        };
        let db = open(&config).await.unwrap();
        db.users.create("ada@example.com", "Ada").await.unwrap();

        assert_eq!(probe(db.pool.as_ref(), Duration::from_secs(1)).await, DatabaseStatus::Ok);
        db.pool.close().await.unwrap();
        assert!(db.users.list(10, 0).await.is_err());
    }

    #[test]
    fn status_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&DatabaseStatus::Ok).unwrap(), r#""ok""#);
        assert_eq!(
            serde_json::to_string(&DatabaseStatus::Unhealthy).unwrap(),
            r#""unhealthy""#
        );
    }
}
