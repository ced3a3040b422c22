//! spkiosk-sync - Main entry point
//!
//! Connects to the Spotify-Connect daemon's event stream and serves the
//! kiosk UI: long-poll state, SSE, and player command relay.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use spkiosk_common::config::ConfigResolver;
use spkiosk_sync::config::Overrides;
use spkiosk_sync::{build_router, AppState, CommandRelay, ServiceConfig, SyncService};

/// Command-line arguments for spkiosk-sync
#[derive(Parser, Debug)]
#[command(name = "spkiosk-sync")]
#[command(about = "Spotify-Connect state sync service for the kiosk")]
#[command(version)]
struct Args {
    /// TOML config file (default: SPKIOSK_CONFIG, then platform config dir)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Daemon HTTP API base URL
    #[arg(long, env = "SPKIOSK_DAEMON_URL")]
    daemon_url: Option<String>,

    /// Daemon event stream URL (default: derived from daemon URL)
    #[arg(long, env = "SPKIOSK_EVENTS_URL")]
    events_url: Option<String>,

    /// Address to listen on
    #[arg(short, long, env = "SPKIOSK_BIND")]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Config is read before tracing so its log level can seed the filter
    let toml = ConfigResolver::new(args.config.clone())
        .load()
        .context("Failed to load configuration")?;

    let default_filter = format!(
        "spkiosk_sync={level},spkiosk_common={level},tower_http=debug",
        level = toml.logging.level
    );
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!(
        "Starting spkiosk-sync v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    let config = ServiceConfig::resolve(
        toml,
        Overrides {
            daemon_url: args.daemon_url,
            events_url: args.events_url,
            bind_addr: args.bind,
        },
    )
    .context("Invalid configuration")?;

    info!("Daemon API: {}", config.daemon_url);
    info!("Event stream: {}", config.sync.events_url);

    let sync = Arc::new(SyncService::new(config.sync.clone()));
    sync.start().context("Failed to start sync service")?;

    let relay = CommandRelay::new(config.daemon_url.clone())
        .context("Failed to build daemon HTTP client")?;
    let app = build_router(AppState::new(Arc::clone(&sync), relay));

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", config.bind_addr))?;
    info!("Listening on http://{}", config.bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    sync.stop().await;
    info!("Shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
