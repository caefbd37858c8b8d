//! Postgres connection pool.

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions, PgSslMode};
use sqlx::{ConnectOptions, Connection};

use crate::config::DatabaseConfig;
use crate::storage::ConnectionPool;
use crate::users::StoreError;

/// A single shared sqlx pool with the configured caps applied.
///
/// sqlx has no ceiling on idle connections. The pool opens nothing up front
/// (no floor), and idle connections are closed after `idle_timeout`, which is
/// what bounds retained-but-unused connections. `max_idle_connections` is
/// validated and logged but has no direct sqlx counterpart.
pub struct PgConnectionPool {
    pool: PgPool,
    closed: AtomicBool,
}

impl PgConnectionPool {
    /// Open the pool and verify one round trip before returning.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, StoreError> {
        let pool = pool_options(config)
            .connect_with(connect_options(config)?)
            .await?;

        sqlx::query("SELECT 1").execute(&pool).await?;

        tracing::info!(
            host = %config.host,
            port = config.port,
            database = %config.dbname,
            max_open = config.max_open_connections,
            max_idle = config.max_idle_connections,
            max_lifetime_secs = config.max_lifetime_secs,
            "Database connection established"
        );

        Ok(Self::from_pool(pool))
    }

    /// Build the pool without connecting; connections open on first use.
    pub fn connect_lazy(config: &DatabaseConfig) -> Result<Self, StoreError> {
        let pool = pool_options(config).connect_lazy_with(connect_options(config)?);
        Ok(Self::from_pool(pool))
    }

    fn from_pool(pool: PgPool) -> Self {
        Self {
            pool,
            closed: AtomicBool::new(false),
        }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn connect_options(config: &DatabaseConfig) -> Result<PgConnectOptions, StoreError> {
    let ssl_mode: PgSslMode = config.sslmode.parse()?;

    Ok(PgConnectOptions::new()
        .host(&config.host)
        .port(config.port)
        .username(&config.user)
        .password(&config.password)
        .database(&config.dbname)
        .ssl_mode(ssl_mode)
        .options([("timezone", config.timezone.as_str())])
        .disable_statement_logging())
}

fn pool_options(config: &DatabaseConfig) -> PgPoolOptions {
    PgPoolOptions::new()
        .max_connections(config.max_open_connections)
        .min_connections(0)
        .max_lifetime(config.max_lifetime())
        .idle_timeout(config.idle_timeout())
        .acquire_timeout(config.acquire_timeout())
}

#[async_trait]
impl ConnectionPool for PgConnectionPool {
    async fn ping(&self) -> Result<(), StoreError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(StoreError::Database(sqlx::Error::PoolClosed));
        }
        let mut conn = self.pool.acquire().await?;
        conn.ping().await?;
        Ok(())
    }

    async fn close(&self) -> Result<(), StoreError> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        self.pool.close().await;
        tracing::info!("Database pool closed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{probe, DatabaseStatus};
    use std::time::Duration;

    fn unreachable_config() -> DatabaseConfig {
        DatabaseConfig {
            host: "127.0.0.1".into(),
            // Nothing listens on the discard port.
            port: 9,
            max_idle_connections: 0,
            acquire_timeout_secs: 1,
            ..DatabaseConfig::default()
        }
    }

    #[test]
    fn invalid_ssl_mode_is_rejected() {
        let config = DatabaseConfig {
            sslmode: "sometimes".into(),
            ..DatabaseConfig::default()
        };
        assert!(matches!(
            connect_options(&config),
            Err(StoreError::Database(_))
        ));
    }

    #[test]
    fn pool_caps_follow_config_without_a_floor() {
        let config = DatabaseConfig {
            max_open_connections: 7,
            max_idle_connections: 3,
            ..DatabaseConfig::default()
        };
        let options = pool_options(&config);
        assert_eq!(options.get_max_connections(), 7);
        assert_eq!(options.get_min_connections(), 0);
        assert_eq!(options.get_idle_timeout(), Some(Duration::from_secs(300)));
        assert_eq!(options.get_max_lifetime(), Some(Duration::from_secs(3600)));
    }

    #[tokio::test]
    async fn unreachable_database_probes_unhealthy() {
        let pool = PgConnectionPool::connect_lazy(&unreachable_config()).unwrap();
        assert_eq!(
            probe(&pool, Duration::from_secs(3)).await,
            DatabaseStatus::Unhealthy
        );
    }

    #[tokio::test]
    async fn close_is_idempotent() {
        let pool = PgConnectionPool::connect_lazy(&unreachable_config()).unwrap();
        pool.close().await.unwrap();
        pool.close().await.unwrap();
        assert!(pool.ping().await.is_err());
    }
}
