//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the service.
//! All types derive Serde traits for deserialization from config files.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Root configuration for the user service.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ServiceConfig {
    /// Service identity reported by the health endpoints.
    pub app: AppConfig,

    /// Listener, timeouts and shutdown grace period.
    pub server: ServerConfig,

    /// Storage backend and connection pool settings.
    pub database: DatabaseConfig,

    /// Logging settings.
    pub observability: ObservabilityConfig,
}

/// Service identity.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AppConfig {
    /// Service name (e.g., "user-service").
    pub name: String,

    /// Version string reported by `/health`.
    pub version: String,

    /// Deployment environment ("development", "production", ...).
    pub environment: String,

    /// Instance identifier reported by `/live`. Empty when unknown.
    pub instance_id: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            name: "user-service".to_string(),
            version: "1.0.0".to_string(),
            environment: "development".to_string(),
            instance_id: String::new(),
        }
    }
}

impl AppConfig {
    pub fn is_production(&self) -> bool {
        self.environment.eq_ignore_ascii_case("production")
    }
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Maximum time to receive request headers, in seconds.
    pub read_timeout_secs: u64,

    /// Maximum time to produce a response, in seconds.
    pub write_timeout_secs: u64,

    /// Grace period for in-flight requests after a termination signal, in seconds.
    pub shutdown_timeout_secs: u64,

    /// Maximum concurrent connections (backpressure).
    pub max_connections: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            read_timeout_secs: 10,
            write_timeout_secs: 10,
            shutdown_timeout_secs: 30,
            max_connections: 10_000,
        }
    }
}

impl ServerConfig {
    pub fn read_timeout(&self) -> Duration {
        Duration::from_secs(self.read_timeout_secs)
    }

    pub fn write_timeout(&self) -> Duration {
        Duration::from_secs(self.write_timeout_secs)
    }

    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout_secs)
    }
}

/// Which `UserStore` implementation backs the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Postgres,
    Memory,
}

impl std::str::FromStr for StorageBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "postgres" => Ok(Self::Postgres),
            "memory" => Ok(Self::Memory),
            other => Err(format!("unknown storage backend '{}'", other)),
        }
    }
}

/// Database connection and pool configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub backend: StorageBackend,
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub dbname: String,
    pub sslmode: String,
    pub timezone: String,

    /// Ceiling on retained-but-unused connections. Must not exceed
    /// `max_open_connections`. The sqlx pool keeps no idle floor and enforces
    /// this only through `idle_timeout_secs` reaping.
    pub max_idle_connections: u32,

    /// Hard ceiling on open connections; callers beyond it queue.
    pub max_open_connections: u32,

    /// Connections older than this are replaced, in seconds.
    pub max_lifetime_secs: u64,

    /// Idle connections are closed after this, in seconds.
    pub idle_timeout_secs: u64,

    /// How long a caller waits for a pooled connection, in seconds.
    pub acquire_timeout_secs: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::Postgres,
            host: "localhost".to_string(),
            port: 5432,
            user: "postgres".to_string(),
            password: String::new(),
            dbname: "users".to_string(),
            sslmode: "disable".to_string(),
            timezone: "UTC".to_string(),
            max_idle_connections: 10,
            max_open_connections: 100,
            max_lifetime_secs: 3600,
            idle_timeout_secs: 300,
            acquire_timeout_secs: 5,
        }
    }
}

impl DatabaseConfig {
    pub fn max_lifetime(&self) -> Duration {
        Duration::from_secs(self.max_lifetime_secs)
    }

    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }

    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_secs(self.acquire_timeout_secs)
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Pretty,
    Json,
}

impl std::str::FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(format!("unknown log format '{}'", other)),
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Output format. Defaults to JSON in production and pretty elsewhere.
    pub log_format: Option<LogFormat>,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: None,
        }
    }
}
