//! Multi-table Hanabi Live server.
//!
//! Spawns the Sessions, Chat and Tables workers and serves the WebSocket
//! command stream plus a small read-only REST surface in front of them.

use std::{net::SocketAddr, sync::Arc, time::Duration};

use anyhow::{Context, Error};
use hanabi_live::{Dispatcher, store::MemoryStore};
use hl_server::{api, config::ServerConfig, logging, metrics};
use log::{info, warn};
use pico_args::Arguments;

const HELP: &str = "\
Run a multi-table Hanabi Live server

USAGE:
  hl_server [OPTIONS]

OPTIONS:
  --bind          IP:PORT  Server socket bind address   [default: env SERVER_BIND or 127.0.0.1:8080]
  --metrics-bind  IP:PORT  Prometheus scrape address    [default: env METRICS_BIND, disabled if unset]

FLAGS:
  -h, --help               Print help information

ENVIRONMENT:
  SERVER_BIND              Server bind address (e.g., 0.0.0.0:8080)
  METRICS_BIND             Metrics bind address (e.g., 0.0.0.0:9090)
  CHAT_HISTORY_LENGTH      Messages kept per chat room      [default: 100]
  MAX_CHAT_LENGTH          Longest accepted chat message    [default: 300]
  IDLE_TIMEOUT_SECS        Idle time before a game is ended [default: 1800]
  IDLE_SWEEP_INTERVAL_SECS Seconds between idle sweeps      [default: 60]
  RUST_LOG                 Log filter                       [default: info]
  (A .env file in the working directory is loaded first)
";

struct Args {
    bind: Option<SocketAddr>,
    metrics_bind: Option<SocketAddr>,
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    // Load .env file if it exists
    let _ = dotenvy::dotenv();

    let mut pargs = Arguments::from_env();

    // Help has a higher priority and should be handled separately.
    if pargs.contains(["-h", "--help"]) {
        print!("{HELP}");
        std::process::exit(0);
    }

    let args = Args {
        bind: pargs.opt_value_from_str("--bind")?,
        metrics_bind: pargs.opt_value_from_str("--metrics-bind")?,
    };
    let remaining = pargs.finish();
    if !remaining.is_empty() {
        anyhow::bail!("Unexpected arguments: {remaining:?}");
    }

    logging::init();

    let config = ServerConfig::from_env(args.bind, args.metrics_bind)?;
    config.validate()?;
    info!("Starting Hanabi Live server at {}", config.bind);

    if let Some(addr) = config.metrics_bind {
        metrics::init_metrics(addr).map_err(anyhow::Error::msg)?;
        info!("Serving Prometheus metrics at http://{addr}/metrics");
    }

    let core = config.core();
    let store = Arc::new(MemoryStore::new(core.variants.clone()));
    let dispatcher = Dispatcher::start(core, store);
    dispatcher
        .restore_unfinished()
        .await
        .context("Failed to restore unfinished games")?;

    let sweeper = tokio::spawn(idle_sweep(dispatcher.clone(), config.idle_sweep_interval));

    let app = api::create_router(api::AppState {
        dispatcher: dispatcher.clone(),
    });

    let listener = tokio::net::TcpListener::bind(config.bind)
        .await
        .with_context(|| format!("Failed to bind to {}", config.bind))?;

    info!(
        "Server is running at http://{}. Press Ctrl+C to stop.",
        config.bind
    );

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("Server error")?;

    info!("Shutting down server...");
    sweeper.abort();
    dispatcher.shutdown().await;

    Ok(())
}

/// Ask the Tables worker to end idle games every `interval`, and refresh the
/// lobby gauges while at it.
async fn idle_sweep(dispatcher: Dispatcher, interval: Duration) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    // The first tick completes immediately
    ticker.tick().await;

    loop {
        ticker.tick().await;
        if dispatcher.tables.idle_sweep().is_err() {
            break;
        }

        if let Ok(tables) = dispatcher.tables.get_tables().await {
            let running = tables.iter().filter(|table| table.running).count();
            metrics::tables(tables.len(), running);
        }
        if let Ok(users) = dispatcher.sessions.get_users().await {
            metrics::connected_users(users.len());
        }
    }
}

/// Graceful shutdown signal
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for Ctrl+C, shutting down: {e}");
    }
}
