//! End-to-end tests over a real WebSocket connection.

use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Value};
use tokio::time::timeout;
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};

use liars_poker::db::{Database, DatabaseConfig};
use liars_poker::registry::RegistryManager;
use liars_poker::room::{RoomConfig, RoomManager};
use lp_server::api::{create_router, AppState};

type WsClient = WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>;

async fn spawn_server() -> (String, tokio::sync::watch::Sender<bool>) {
    let db = Database::new(&DatabaseConfig::in_memory()).await.unwrap();
    let registry = Arc::new(RegistryManager::new(db.pool().clone(), 20));
    registry.initialize().await.unwrap();
    let rooms = Arc::new(RoomManager::new(
        registry.clone(),
        RoomConfig {
            max_players: 8,
            rng_seed: Some(7),
            turn_timeout_secs: None,
        },
    ));

    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
    let app = create_router(AppState {
        registry,
        rooms,
        shutdown: shutdown_rx,
    });
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (format!("ws://{addr}/ws"), shutdown_tx)
}

async fn connect(url: &str) -> WsClient {
    let (socket, _) = connect_async(url).await.expect("connect failed");
    socket
}

async fn send_json(client: &mut WsClient, value: Value) {
    client
        .send(Message::Text(value.to_string().into()))
        .await
        .expect("send failed");
}

async fn recv_json(client: &mut WsClient) -> Value {
    loop {
        let message = timeout(Duration::from_secs(2), client.next())
            .await
            .expect("timed out waiting for a frame")
            .expect("connection closed")
            .expect("read failed");
        match message {
            Message::Text(text) => return serde_json::from_str(text.as_str()).unwrap(),
            _ => continue,
        }
    }
}

/// Skip frames until one of the given type arrives.
async fn recv_of_type(client: &mut WsClient, kind: &str) -> Value {
    for _ in 0..32 {
        let frame = recv_json(client).await;
        if frame["type"] == kind {
            return frame;
        }
    }
    panic!("never received a `{kind}` frame");
}

#[tokio::test]
async fn join_handshake_over_websocket() {
    let (url, _shutdown) = spawn_server().await;
    let mut client = connect(&url).await;

    send_json(
        &mut client,
        json!({"type": "user_join", "data": {"username": "alice"}}),
    )
    .await;

    let response = recv_of_type(&mut client, "user_join").await;
    assert_eq!(response["data"]["success"], true);
    assert_eq!(response["data"]["username"], "alice");
    assert_eq!(response["data"]["is_host"], true);

    let state = recv_of_type(&mut client, "game_state_update").await;
    assert_eq!(state["data"]["game_state"]["phase"], "waiting");
}

#[tokio::test]
async fn bad_usernames_and_duplicates_are_rejected() {
    let (url, _shutdown) = spawn_server().await;

    let mut first = connect(&url).await;
    send_json(
        &mut first,
        json!({"type": "user_join", "data": {"username": "x"}}),
    )
    .await;
    let rejected = recv_of_type(&mut first, "username_error").await;
    assert!(rejected["data"]["message"]
        .as_str()
        .unwrap()
        .contains("2-20 characters"));

    send_json(
        &mut first,
        json!({"type": "user_join", "data": {"username": "alice"}}),
    )
    .await;
    recv_of_type(&mut first, "user_join").await;

    let mut second = connect(&url).await;
    send_json(
        &mut second,
        json!({"type": "user_join", "data": {"username": "alice"}}),
    )
    .await;
    let taken = recv_of_type(&mut second, "username_error").await;
    assert!(taken["data"]["message"].as_str().unwrap().contains("online"));
}

#[tokio::test]
async fn malformed_and_unknown_frames_yield_errors() {
    let (url, _shutdown) = spawn_server().await;
    let mut client = connect(&url).await;

    client
        .send(Message::Text("this is not json".to_string().into()))
        .await
        .unwrap();
    let error = recv_of_type(&mut client, "error").await;
    assert_eq!(error["data"]["message"], "Invalid message format");

    send_json(&mut client, json!({"type": "launch_missiles", "data": {}})).await;
    let error = recv_of_type(&mut client, "error").await;
    assert_eq!(error["data"]["message"], "unknown message type");

    // The connection survives both.
    send_json(
        &mut client,
        json!({"type": "user_join", "data": {"username": "alice"}}),
    )
    .await;
    recv_of_type(&mut client, "user_join").await;
}

#[tokio::test]
async fn commands_before_join_are_rejected() {
    let (url, _shutdown) = spawn_server().await;
    let mut client = connect(&url).await;

    send_json(&mut client, json!({"type": "call_bluff", "data": {}})).await;
    let error = recv_of_type(&mut client, "error").await;
    assert_eq!(error["data"]["message"], "join with a username first");
}

#[tokio::test]
async fn shutdown_sends_a_final_error_and_closes_the_socket() {
    let (url, shutdown) = spawn_server().await;
    // This connection never joins a room; the shutdown signal alone must
    // reach it.
    let mut client = connect(&url).await;

    shutdown.send(true).unwrap();

    let error = recv_of_type(&mut client, "error").await;
    assert_eq!(error["data"]["message"], "server shutting down");

    let mut closed = false;
    for _ in 0..8 {
        match timeout(Duration::from_secs(2), client.next())
            .await
            .expect("timed out waiting for the close")
        {
            Some(Ok(Message::Close(_))) | Some(Err(_)) | None => {
                closed = true;
                break;
            }
            Some(Ok(_)) => continue,
        }
    }
    assert!(closed, "server must close the socket after the final frame");
}

#[tokio::test]
async fn disconnect_releases_the_username() {
    let (url, _shutdown) = spawn_server().await;

    let mut first = connect(&url).await;
    send_json(
        &mut first,
        json!({"type": "user_join", "data": {"username": "alice"}}),
    )
    .await;
    recv_of_type(&mut first, "user_join").await;
    drop(first);

    // Once the disconnect is processed, the name is claimable again.
    tokio::time::sleep(Duration::from_millis(200)).await;
    let mut second = connect(&url).await;
    send_json(
        &mut second,
        json!({"type": "user_join", "data": {"username": "alice"}}),
    )
    .await;
    let response = recv_of_type(&mut second, "user_join").await;
    assert_eq!(response["data"]["success"], true);
}
