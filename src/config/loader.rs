//! Configuration loading from disk and the environment.

use std::fs;
use std::path::Path;
use std::str::FromStr;

use crate::config::schema::ServiceConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(toml::de::Error),
    Env { var: &'static str, value: String },
    Validation(Vec<ValidationError>),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "IO error: {}", e),
            ConfigError::Parse(e) => write!(f, "Parse error: {}", e),
            ConfigError::Env { var, value } => {
                write!(f, "Invalid value for {}: '{}'", var, value)
            }
            ConfigError::Validation(errors) => {
                write!(f, "Validation failed: ")?;
                for (i, err) in errors.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", err)?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// Load configuration: optional TOML file, then environment overrides, then validation.
pub fn load_config(path: Option<&Path>) -> Result<ServiceConfig, ConfigError> {
    let mut config = match path {
        Some(path) => parse_file(path)?,
        None => ServiceConfig::default(),
    };

    apply_overrides(&mut config, |var| std::env::var(var).ok())?;
    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

fn parse_file(path: &Path) -> Result<ServiceConfig, ConfigError> {
    let content = fs::read_to_string(path).map_err(ConfigError::Io)?;
    toml::from_str(&content).map_err(ConfigError::Parse)
}

/// Apply environment overrides using `lookup` to resolve variables.
pub fn apply_overrides<F>(config: &mut ServiceConfig, lookup: F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let text = |var: &str, slot: &mut String| {
        if let Some(value) = lookup(var) {
            *slot = value;
        }
    };

    text("APP_ENV", &mut config.app.environment);
    text("APP_NAME", &mut config.app.name);
    text("APP_VERSION", &mut config.app.version);
    text("INSTANCE_ID", &mut config.app.instance_id);
    text("SERVER_ADDRESS", &mut config.server.bind_address);
    text("DB_HOST", &mut config.database.host);
    text("DB_USER", &mut config.database.user);
    text("DB_PASSWORD", &mut config.database.password);
    text("DB_NAME", &mut config.database.dbname);
    text("DB_SSLMODE", &mut config.database.sslmode);
    text("DB_TIMEZONE", &mut config.database.timezone);
    text("LOG_LEVEL", &mut config.observability.log_level);

    if let Some(value) = parse_var(&lookup, "SHUTDOWN_TIMEOUT_SECS")? {
        config.server.shutdown_timeout_secs = value;
    }
    if let Some(value) = parse_var(&lookup, "DB_PORT")? {
        config.database.port = value;
    }
    if let Some(value) = parse_var(&lookup, "DB_BACKEND")? {
        config.database.backend = value;
    }
    if let Some(value) = parse_var(&lookup, "LOG_FORMAT")? {
        config.observability.log_format = Some(value);
    }

    Ok(())
}

fn parse_var<F, T>(lookup: &F, var: &'static str) -> Result<Option<T>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(var) {
        Some(value) => value
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::Env { var, value }),
        None => Ok(None),
    }
}
