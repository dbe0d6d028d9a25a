//! mdb-api - content graph service
//!
//! Receives production workflow events from capture stations and the
//! content identification tool, and records them in the archive database.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use mdb_common::config::{find_config_file, load_toml_config, ServiceConfig};
use mdb_common::Registries;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use mdb_api::AppState;

const DEFAULT_LOG_FILTER: &str = "mdb_api=info,mdb_common=info,tower_http=info";

/// Command-line arguments for mdb-api
#[derive(Parser, Debug)]
#[command(name = "mdb-api")]
#[command(about = "Media archive content graph service")]
#[command(version)]
struct Args {
    /// TOML bootstrap config file
    #[arg(short, long, env = "MDB_CONFIG")]
    config: Option<PathBuf>,

    /// SQLite database file
    #[arg(short, long, env = "MDB_DATABASE")]
    database: Option<PathBuf>,

    /// HTTP listen address
    #[arg(short, long, env = "MDB_BIND")]
    bind: Option<String>,
}

fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| {
            if level == "info" {
                EnvFilter::try_new(DEFAULT_LOG_FILTER)
            } else {
                EnvFilter::try_new(level)
            }
        })
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config_path = args.config.clone().or_else(find_config_file);
    let toml_config = match &config_path {
        Some(path) => Some(load_toml_config(path)?),
        None => None,
    };
    let config = ServiceConfig::resolve(args.database, args.bind, toml_config.as_ref());

    init_tracing(&config.log_level);

    info!("Starting mdb-api version {}", env!("CARGO_PKG_VERSION"));
    match &config_path {
        Some(path) => info!("Config: {}", path.display()),
        None => warn!("No config file found, using defaults"),
    }
    info!("Database: {}", config.database_path.display());

    let db = mdb_common::db::init_database(&config.database_path)
        .await
        .context("Failed to initialize database")?;
    let registries = Registries::load(&db)
        .await
        .context("Failed to load registries")?;

    let app = mdb_api::build_router(AppState::new(db, registries));

    let listener = tokio::net::TcpListener::bind(&config.bind_address)
        .await
        .with_context(|| format!("Failed to bind to {}", config.bind_address))?;
    info!("Listening on http://{}", config.bind_address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, shutting down"),
        _ = terminate => info!("Received terminate signal, shutting down"),
    }
}
