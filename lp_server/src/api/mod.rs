//! HTTP/WebSocket surface of the game server.

pub mod rate_limiter;
pub mod websocket;

use std::sync::Arc;

use axum::{routing::get, Router};
use liars_poker::{registry::RegistryManager, room::RoomManager};
use tokio::sync::watch;

/// Shared application state handed to every connection.
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<RegistryManager>,
    pub rooms: Arc<RoomManager>,
    /// Flipped to true on server shutdown so even connections that never
    /// joined a room get a final frame and a close.
    pub shutdown: watch::Receiver<bool>,
}

/// One route: the long-lived bidirectional connection.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/ws", get(websocket::websocket_handler))
        .with_state(state)
}
