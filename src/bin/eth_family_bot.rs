//! eth-family-bot binary
//!
//! Schedules the daily rename cycle with production-grade plumbing:
//! - Structured JSON logging
//! - Fatal exit when credentials are missing, before anything is scheduled
//! - Graceful shutdown between cycles
//!
//! ## Configuration
//!
//! See [`eth_family_bot::config`] for the full list. Logging:
//! - `RUST_LOG`: Log level filter (default: eth_family_bot=info)
//! - `LOG_FORMAT`: "json" for structured logs, "pretty" for development (default: json)
//!
//! ## Usage
//!
//! ```bash
//! DUNE_API_KEY=... NEYNAR_API_KEY=... SIGNER_UUID=... cargo run --bin eth_family_bot
//! ```

use tracing::{error, info};
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

use eth_family_bot::{
    run_daily, run_logged, BotConfig, CycleController, DuneSource, FileSnapshotStore,
    NeynarPublisher, SnapshotStore,
};

/// Initialize the tracing subscriber with JSON or pretty format
fn init_tracing() {
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_else(|_| "json".to_string());

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "eth_family_bot=info".into());

    if log_format == "pretty" {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_span_events(FmtSpan::CLOSE)
            )
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .json()
                    .with_target(true)
                    .with_current_span(true)
                    .with_span_events(FmtSpan::CLOSE)
                    .flatten_event(true)
            )
            .init();
    }
}

#[cfg(feature = "postgres")]
async fn open_store(config: &BotConfig) -> Result<Box<dyn SnapshotStore>, Box<dyn std::error::Error>> {
    if std::env::var("DATABASE_URL").is_ok() {
        let store = eth_family_bot::PostgresSnapshotStore::from_env().await?;
        info!("Held snapshot stored in PostgreSQL");
        return Ok(Box::new(store));
    }
    Ok(Box::new(file_store(config)))
}

#[cfg(not(feature = "postgres"))]
async fn open_store(config: &BotConfig) -> Result<Box<dyn SnapshotStore>, Box<dyn std::error::Error>> {
    Ok(Box::new(file_store(config)))
}

fn file_store(config: &BotConfig) -> FileSnapshotStore {
    info!(path = %config.snapshot_path.display(), "Held snapshot stored on disk");
    FileSnapshotStore::new(config.snapshot_path.clone())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, shutting down after the current cycle"),
        _ = terminate => info!("Received SIGTERM, shutting down after the current cycle"),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let version = env!("CARGO_PKG_VERSION");
    let build_sha = option_env!("BUILD_SHA").unwrap_or("dev");

    info!(
        version = version,
        build_sha = build_sha,
        "Starting eth-family-bot"
    );

    // Missing credentials must stop the bot before anything is scheduled
    let config = match BotConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "Configuration invalid, refusing to schedule");
            return Err(e.into());
        }
    };

    let source = DuneSource::new(config.dune.clone())?;
    let publisher = NeynarPublisher::new(config.neynar.clone())?;
    let store = open_store(&config).await?;

    let controller = CycleController::with_config(source, publisher, store, config.controller.clone());

    info!(
        publish_time = %config.schedule.time().format("%H:%M"),
        tz = %config.schedule.tz(),
        leaderboard_size = config.controller.leaderboard_size,
        "Daily cycle scheduled"
    );

    if config.run_on_start {
        info!("RUN_ON_START set, running a cycle now");
        run_logged(&controller).await;
    }

    run_daily(&controller, &config.schedule, shutdown_signal()).await;

    info!("eth-family-bot shutdown complete");

    Ok(())
}
