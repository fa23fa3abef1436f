//! Bluff-poker game server.
//!
//! Spawns one actor per room, with a durable SQLite-backed username
//! registry and a WebSocket gateway speaking the JSON frame protocol.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Error;
use pico_args::Arguments;

use liars_poker::{
    db::{Database, DatabaseConfig},
    registry::RegistryManager,
    room::RoomManager,
};
use lp_server::{api, config::ServerConfig, logging, metrics};

const HELP: &str = "\
Run a bluff-poker game server

USAGE:
  lp_server [OPTIONS]

OPTIONS:
  --bind       IP:PORT     WebSocket bind address      [default: env LP_BIND or 127.0.0.1:8765]
  --data       PATH        SQLite data file            [default: env LP_DATA_PATH or liars_poker.db]

FLAGS:
  -h, --help               Print help information

ENVIRONMENT:
  LP_BIND                  WebSocket bind address (e.g. 0.0.0.0:8765)
  LP_METRICS_BIND          Prometheus scrape address   [default: 127.0.0.1:9090]
  LP_DATA_PATH             SQLite data file path
  LP_MAX_PLAYERS           Seats per room, 2-8         [default: 8]
  LP_MAX_USERNAME_LEN      Username length cap         [default: 20]
  LP_RNG_SEED              Deck/seat RNG seed override (testing only)
  LP_TURN_TIMEOUT_SECS     Per-turn timeout knob (reserved, not enforced)
";

#[tokio::main]
async fn main() -> Result<(), Error> {
    // Note: dotenvy does not override variables already in the environment.
    let _ = dotenvy::dotenv();

    let mut pargs = Arguments::from_env();
    if pargs.contains(["-h", "--help"]) {
        print!("{HELP}");
        std::process::exit(0);
    }
    let bind_override: Option<SocketAddr> = pargs.opt_value_from_str("--bind")?;
    let data_override: Option<String> = pargs.opt_value_from_str("--data")?;

    logging::init();

    let config = ServerConfig::from_env(bind_override, data_override)
        .map_err(|e| anyhow::anyhow!("configuration error: {e}"))?;
    config
        .validate()
        .map_err(|e| anyhow::anyhow!("configuration validation failed: {e}"))?;

    if let Err(e) = metrics::init_metrics(config.metrics_bind) {
        tracing::warn!("failed to initialize metrics: {e}; metrics will not be available");
    } else {
        tracing::info!(
            "metrics endpoint available at http://{}/metrics",
            config.metrics_bind
        );
    }

    tracing::info!("opening data file {}", config.data_path);
    let db = Database::new(&DatabaseConfig::new(config.data_path.as_str()))
        .await
        .map_err(|e| anyhow::anyhow!("failed to open database: {e}"))?;

    let registry = Arc::new(RegistryManager::new(
        db.pool().clone(),
        config.max_username_len,
    ));
    // Creates the users table on first run and marks everyone offline.
    registry
        .initialize()
        .await
        .map_err(|e| anyhow::anyhow!("failed to initialize registry: {e}"))?;

    let rooms = Arc::new(RoomManager::new(registry.clone(), config.room_config()));

    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
    let state = api::AppState {
        registry: registry.clone(),
        rooms: rooms.clone(),
        shutdown: shutdown_rx,
    };
    let app = api::create_router(state);

    let listener = tokio::net::TcpListener::bind(config.bind)
        .await
        .map_err(|e| anyhow::anyhow!("failed to bind to {}: {e}", config.bind))?;

    tracing::info!(
        "server is running at ws://{}/ws; press Ctrl+C to stop",
        config.bind
    );

    // On Ctrl+C the shutdown future drains every room first: queued
    // commands finish, each connection gets a final `error` frame and a
    // close, and the gateway handlers fall out of their read loops, which
    // lets the graceful shutdown complete.
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(rooms.clone(), shutdown_tx))
        .await
        .map_err(|e| anyhow::anyhow!("server error: {e}"))?;

    // Handlers release usernames as their sockets close; sweep whatever is
    // left so nobody stays flagged online across the restart.
    match registry.release_all().await {
        Ok(count) if count > 0 => tracing::info!("released {count} remaining username(s)"),
        Ok(_) => {}
        Err(e) => tracing::warn!("failed to release remaining usernames: {e}"),
    }

    tracing::info!("shutting down");
    Ok(())
}

async fn shutdown_signal(rooms: Arc<RoomManager>, shutdown: tokio::sync::watch::Sender<bool>) {
    tokio::signal::ctrl_c()
        .await
        .expect("failed to install CTRL+C signal handler");
    tracing::info!("shutdown signal received, draining rooms");
    rooms.shutdown_all().await;
    // Rooms only know about joined users; this reaches the connections
    // that never joined one.
    let _ = shutdown.send(true);
}
