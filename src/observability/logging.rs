//! Structured logging.
//!
//! # Responsibilities
//! - Initialize logging subsystem
//! - Pick the output format for the environment
//!
//! # Design Decisions
//! - Uses tracing crate for structured logging
//! - JSON format for production, pretty format for development
//! - `RUST_LOG` wins over the configured level

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::{AppConfig, LogFormat, ObservabilityConfig};

/// Error returned when a global subscriber is already installed.
#[derive(Debug)]
pub struct LoggingError(tracing_subscriber::util::TryInitError);

impl std::fmt::Display for LoggingError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Failed to initialize logging: {}", self.0)
    }
}

impl std::error::Error for LoggingError {}

/// Resolve the effective format: explicit setting, else JSON in production.
pub fn resolve_format(app: &AppConfig, config: &ObservabilityConfig) -> LogFormat {
    config.log_format.unwrap_or(if app.is_production() {
        LogFormat::Json
    } else {
        LogFormat::Pretty
    })
}

/// Install the global tracing subscriber.
pub fn init_logging(app: &AppConfig, config: &ObservabilityConfig) -> Result<(), LoggingError> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("user_service={0},tower_http={0}", config.log_level).into());

    let registry = tracing_subscriber::registry().with(filter);

    match resolve_format(app, config) {
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json().with_current_span(true))
            .try_init(),
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).try_init(),
    }
    .map_err(LoggingError)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn production_defaults_to_json() {
        let mut app = AppConfig::default();
        let config = ObservabilityConfig::default();
        assert_eq!(resolve_format(&app, &config), LogFormat::Pretty);

        app.environment = "production".into();
        assert_eq!(resolve_format(&app, &config), LogFormat::Json);
    }

    #[test]
    fn explicit_format_wins() {
        let mut app = AppConfig::default();
        app.environment = "production".into();
        let config = ObservabilityConfig {
            log_format: Some(LogFormat::Pretty),
            ..ObservabilityConfig::default()
        };
        assert_eq!(resolve_format(&app, &config), LogFormat::Pretty);
    }
}
