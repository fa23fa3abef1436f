//! The session gateway.
//!
//! One long-lived WebSocket per client. The socket is split into a reader
//! loop (this task) and a writer task fed by an unbounded channel, so each
//! connection has at most one in-flight write. The gateway never mutates
//! room state: it claims usernames against the registry and enqueues
//! commands on the owning room's actor, which pushes all outbound frames
//! back through the writer channel.
//!
//! Frames are demultiplexed to rooms by their optional `session_id`;
//! without one the connection lands in the default room.

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::{mpsc, oneshot};
use tracing::{info, warn};

use liars_poker::net::messages::{
    CallHandRequest, KickUserRequest, UserJoinRequest, UsernameErrorPayload,
};
use liars_poker::net::{Frame, MessageType};
use liars_poker::registry::UserId;
use liars_poker::room::{OutboundEvent, RoomHandle, RoomMessage, DEFAULT_ROOM_ID};

use super::rate_limiter::RateLimiter;
use super::AppState;
use crate::metrics;

pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Identity of a connection once its `user_join` succeeded.
struct Session {
    user_id: UserId,
    username: String,
    room: RoomHandle,
}

async fn handle_socket(socket: WebSocket, state: AppState) {
    metrics::connection_opened();
    let (mut sink, mut stream) = socket.split();

    let (tx, mut rx) = mpsc::unbounded_channel::<OutboundEvent>();
    let mut writer = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            match event {
                OutboundEvent::Frame(frame) => {
                    let text = frame.to_text();
                    if sink.send(Message::Text(text.into())).await.is_err() {
                        break;
                    }
                }
                OutboundEvent::Close => {
                    let _ = sink.send(Message::Close(None)).await;
                    break;
                }
            }
        }
    });

    let mut session: Option<Session> = None;
    let mut shutdown = state.shutdown.clone();
    let mut burst = RateLimiter::burst();
    let mut sustained = RateLimiter::sustained();

    loop {
        tokio::select! {
            inbound = stream.next() => match inbound {
                Some(Ok(Message::Text(text))) => {
                    handle_frame(
                        text.as_str(),
                        &state,
                        &tx,
                        &mut session,
                        &mut burst,
                        &mut sustained,
                    )
                    .await;
                }
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => {} // ping/pong/binary
                Some(Err(err)) => {
                    warn!("websocket read failed: {err}");
                    break;
                }
            },
            // The writer stops after a kick's Close event or a failed write;
            // either way this connection is done.
            _ = &mut writer => break,
            // Server shutdown. Joined connections already got their final
            // frames from the room drain; this covers sockets that never
            // joined (a duplicate error frame to the others is harmless).
            _ = shutdown.changed() => {
                send_frame(&tx, Frame::error("server shutting down"));
                let _ = tx.send(OutboundEvent::Close);
            }
        }
    }

    if let Some(session) = session.take() {
        let (reply_tx, reply_rx) = oneshot::channel();
        let leave = RoomMessage::Leave {
            user_id: session.user_id,
            response: Some(reply_tx),
        };
        if session.room.send(leave).await.is_ok() {
            if let Ok(true) = reply_rx.await {
                state.rooms.reap(session.room.room_id()).await;
            }
        }
        if let Err(err) = state.registry.release(session.user_id).await {
            warn!("failed to release username {}: {err}", session.username);
        }
        info!("{} disconnected", session.username);
    }
    writer.abort();
    metrics::connection_closed();
    metrics::rooms_active(state.rooms.active_room_count().await);
}

async fn handle_frame(
    text: &str,
    state: &AppState,
    tx: &mpsc::UnboundedSender<OutboundEvent>,
    session: &mut Option<Session>,
    burst: &mut RateLimiter,
    sustained: &mut RateLimiter,
) {
    if !burst.check() || !sustained.check() {
        metrics::frame_rate_limited();
        send_frame(tx, Frame::error("rate limit exceeded, slow down"));
        return;
    }

    let frame = match Frame::parse(text) {
        Ok(frame) => frame,
        Err(_) => {
            send_frame(tx, Frame::error("Invalid message format"));
            return;
        }
    };
    metrics::frame_handled(frame.kind.as_str());

    match frame.kind {
        MessageType::UserJoin => handle_user_join(frame, state, tx, session).await,
        MessageType::GameStart => {
            forward(session, tx, |user_id| RoomMessage::StartGame { user_id }).await;
        }
        MessageType::GameRestart => {
            forward(session, tx, |user_id| RoomMessage::RestartGame { user_id }).await;
        }
        MessageType::KickUser => {
            // Identity comes from the session, not the payload; a forged
            // host_id changes nothing.
            let Ok(request) = frame.decode::<KickUserRequest>() else {
                send_frame(tx, Frame::error("Invalid message format"));
                return;
            };
            forward(session, tx, |user_id| RoomMessage::KickUser {
                user_id,
                target_username: request.target_username,
            })
            .await;
        }
        MessageType::CallHand => {
            let Ok(request) = frame.decode::<CallHandRequest>() else {
                send_frame(tx, Frame::error("Invalid message format"));
                return;
            };
            forward(session, tx, |user_id| RoomMessage::CallHand {
                user_id,
                hand_spec: request.hand_spec,
            })
            .await;
        }
        MessageType::CallBluff => {
            forward(session, tx, |user_id| RoomMessage::CallBluff { user_id }).await;
        }
        _ => send_frame(tx, Frame::error("unknown message type")),
    }
}

async fn handle_user_join(
    frame: Frame,
    state: &AppState,
    tx: &mpsc::UnboundedSender<OutboundEvent>,
    session: &mut Option<Session>,
) {
    if session.is_some() {
        send_frame(tx, Frame::error("already joined"));
        return;
    }
    let Ok(request) = frame.decode::<UserJoinRequest>() else {
        send_frame(tx, Frame::error("Invalid message format"));
        return;
    };

    let record = match state.registry.claim(&request.username).await {
        Ok(record) => record,
        Err(err) => {
            send_frame(
                tx,
                Frame::new(
                    MessageType::UsernameError,
                    UsernameErrorPayload {
                        message: err.to_string(),
                    },
                ),
            );
            return;
        }
    };

    let room_id = frame
        .session_id
        .clone()
        .unwrap_or_else(|| DEFAULT_ROOM_ID.to_string());

    // Retry once in case the handle belonged to a room that just emptied.
    for _ in 0..2 {
        let room = state.rooms.get_or_create(&room_id).await;
        let (reply_tx, reply_rx) = oneshot::channel();
        let join = RoomMessage::Join {
            user_id: record.id,
            username: record.username.clone(),
            conn: tx.clone(),
            response: reply_tx,
        };
        if room.send(join).await.is_ok() {
            let _ = reply_rx.await;
            info!("{} joined room {room_id}", record.username);
            *session = Some(Session {
                user_id: record.id,
                username: record.username.clone(),
                room,
            });
            metrics::rooms_active(state.rooms.active_room_count().await);
            return;
        }
    }

    warn!("room {room_id} unavailable for {}", record.username);
    if let Err(err) = state.registry.release(record.id).await {
        warn!("failed to release username {}: {err}", record.username);
    }
    send_frame(tx, Frame::error("room unavailable, try again"));
}

/// Forward a gameplay command from an established session to its room.
async fn forward(
    session: &mut Option<Session>,
    tx: &mpsc::UnboundedSender<OutboundEvent>,
    build: impl FnOnce(UserId) -> RoomMessage,
) {
    let Some(session) = session.as_ref() else {
        send_frame(tx, Frame::error("join with a username first"));
        return;
    };
    if session.room.send(build(session.user_id)).await.is_err() {
        send_frame(tx, Frame::error("room is closed"));
    }
}

fn send_frame(tx: &mpsc::UnboundedSender<OutboundEvent>, frame: Frame) {
    let _ = tx.send(OutboundEvent::Frame(frame));
}
