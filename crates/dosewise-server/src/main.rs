//! # dosewise-server
//!
//! HTTP backend for the Dosewise medication-adherence app.
//!
//! This binary provides:
//! - **Accounts and sessions**: registration, login and bearer-token sessions
//!   with PBKDF2 password hashing and per-e-mail login throttling
//! - **Patient API** for medications, dose schedules and logs, adherence,
//!   vitals, sharing grants and a PDF history report
//! - **Clinic API** for the shared-patient roster and computed alerts
//! - **Background maintenance** that generates upcoming dose logs and purges
//!   expired sessions
//! - **Per-IP rate limiting** on every route

mod api;
mod auth;
mod clinic;
mod config;
mod error;
mod rate_limit;
mod report;
mod scheduler;

use tracing::info;
use tracing_subscriber::EnvFilter;

use dosewise_store::Database;

use crate::api::AppState;
use crate::config::ServerConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // -----------------------------------------------------------------------
    // 1. Initialize tracing (respects RUST_LOG env var)
    // -----------------------------------------------------------------------
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new("info,dosewise_server=debug,dosewise_store=info")
        }))
        .init();

    info!("Starting Dosewise server v{}", env!("CARGO_PKG_VERSION"));

    // -----------------------------------------------------------------------
    // 2. Load configuration
    // -----------------------------------------------------------------------
    let config = ServerConfig::from_env();
    info!(?config, "Loaded configuration");

    // -----------------------------------------------------------------------
    // 3. Open the database (runs pending migrations)
    // -----------------------------------------------------------------------
    let db_path = match &config.database_path {
        Some(path) => path.clone(),
        None => Database::default_path()?,
    };
    let db = Database::open_at(&db_path)?;
    info!(path = %db_path.display(), "Database opened");

    let http_addr = config.http_addr;
    let app_state = AppState::new(db, config);

    // -----------------------------------------------------------------------
    // 4. Spawn background tasks
    // -----------------------------------------------------------------------
    scheduler::spawn(app_state.clone());
    scheduler::spawn_throttle_cleanup(app_state.clone());

    // -----------------------------------------------------------------------
    // 5. Run the HTTP API server (blocks until shutdown)
    // -----------------------------------------------------------------------
    tokio::select! {
        result = api::serve(app_state, http_addr) => {
            if let Err(e) = result {
                tracing::error!(error = %e, "HTTP server failed");
                return Err(e);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down");
        }
    }

    Ok(())
}
