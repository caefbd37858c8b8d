//! User service.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client ──▶ net::listener ──▶ http::server (hyper-util) ──▶ middleware pipeline
//!                                                                     │
//!                                                                     ▼
//!                                 storage (pool) ◀── users::service ◀── routing ──▶ handlers
//!
//!     SIGINT/SIGTERM ──▶ lifecycle::supervisor ──▶ drain connections ──▶ close pool
//! ```

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use user_service::config::load_config;
use user_service::http::{build_app, AppState};
use user_service::lifecycle::{termination, ShutdownReason, Supervisor};
use user_service::observability::{logging, metrics};
use user_service::routing::routes;
use user_service::storage;
use user_service::users::UserService;

const METRICS_UPKEEP_PERIOD: Duration = Duration::from_secs(5);

#[derive(Parser, Debug)]
#[command(name = "user-service", version, about = "User CRUD service")]
struct Cli {
    /// Path to a TOML configuration file. Defaults apply when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = load_config(cli.config.as_deref())?;
    logging::init_logging(&config.app, &config.observability)?;

    tracing::info!(
        service = %config.app.name,
        version = %config.app.version,
        environment = %config.app.environment,
        bind_address = %config.server.bind_address,
        storage = ?config.database.backend,
        "Starting"
    );

    let handle = metrics::init_metrics()?;

    let database = match storage::open(&config.database).await {
        Ok(database) => database,
        Err(e) => {
            tracing::error!(error = %e, "Failed to connect to database");
            return Err(e.into());
        }
    };

    let state = AppState::new(
        UserService::new(database.users),
        database.pool.clone(),
        config.app.clone(),
    );
    let app = build_app(routes(), state, handle.clone(), &config.server);

    let supervisor = Supervisor::new(app, &config.server, database.pool);
    tokio::spawn(metrics::run_upkeep(
        handle,
        METRICS_UPKEEP_PERIOD,
        supervisor.shutdown().subscribe(),
    ));

    let report = supervisor.run(termination()).await?;
    if let ShutdownReason::Fatal(error) = report.reason {
        return Err(error.into());
    }

    Ok(())
}
