//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, pool caps consistent)
//! - Check the bind address parses
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ServiceConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use crate::config::schema::ServiceConfig;

/// A single semantic problem with a loaded configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

impl std::error::Error for ValidationError {}

/// Validate a configuration, collecting every problem found.
pub fn validate_config(config: &ServiceConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.server.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "server.bind_address",
            format!("'{}' is not a socket address", config.server.bind_address),
        ));
    }

    let timeouts = [
        ("server.read_timeout_secs", config.server.read_timeout_secs),
        ("server.write_timeout_secs", config.server.write_timeout_secs),
        ("server.shutdown_timeout_secs", config.server.shutdown_timeout_secs),
        ("database.max_lifetime_secs", config.database.max_lifetime_secs),
        ("database.idle_timeout_secs", config.database.idle_timeout_secs),
        ("database.acquire_timeout_secs", config.database.acquire_timeout_secs),
    ];
    for (field, value) in timeouts {
        if value == 0 {
            errors.push(ValidationError::new(field, "must be greater than zero"));
        }
    }

    if config.server.max_connections == 0 {
        errors.push(ValidationError::new(
            "server.max_connections",
            "must be greater than zero",
        ));
    }

    let db = &config.database;
    if db.max_open_connections == 0 {
        errors.push(ValidationError::new(
            "database.max_open_connections",
            "must be greater than zero",
        ));
    }
    if db.max_idle_connections > db.max_open_connections {
        errors.push(ValidationError::new(
            "database.max_idle_connections",
            format!(
                "{} exceeds max_open_connections ({})",
                db.max_idle_connections, db.max_open_connections
            ),
        ));
    }

    if config.app.name.trim().is_empty() {
        errors.push(ValidationError::new("app.name", "must not be empty"));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
