//! Integration tests for the room actor: command round-trips, broadcast
//! ordering, and the private/broadcast projection split.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tokio::time::timeout;

use liars_poker::db::{Database, DatabaseConfig};
use liars_poker::net::{Frame, MessageType};
use liars_poker::registry::{RegistryManager, UserId};
use liars_poker::room::{OutboundEvent, RoomActor, RoomConfig, RoomHandle, RoomMessage};

async fn setup_room() -> (Arc<RegistryManager>, RoomHandle) {
    let db = Database::new(&DatabaseConfig::in_memory()).await.unwrap();
    let registry = Arc::new(RegistryManager::new(db.pool().clone(), 20));
    registry.initialize().await.unwrap();

    let config = RoomConfig {
        max_players: 8,
        rng_seed: Some(99),
        turn_timeout_secs: None,
    };
    let (actor, handle) = RoomActor::new("default".to_string(), config, registry.clone());
    tokio::spawn(actor.run());
    (registry, handle)
}

struct TestClient {
    user_id: UserId,
    rx: mpsc::UnboundedReceiver<OutboundEvent>,
}

impl TestClient {
    async fn next_event(&mut self) -> OutboundEvent {
        timeout(Duration::from_secs(2), self.rx.recv())
            .await
            .expect("timed out waiting for an event")
            .expect("connection channel closed")
    }

    /// Skip frames until one of the given type arrives.
    async fn expect(&mut self, kind: MessageType) -> Frame {
        for _ in 0..32 {
            match self.next_event().await {
                OutboundEvent::Frame(frame) if frame.kind == kind => return frame,
                OutboundEvent::Frame(_) => continue,
                OutboundEvent::Close => panic!("unexpected close while waiting for {kind:?}"),
            }
        }
        panic!("never received a {kind:?} frame");
    }

    /// Skip frames until one of the given type satisfies the predicate.
    async fn expect_where(
        &mut self,
        kind: MessageType,
        predicate: impl Fn(&Frame) -> bool,
    ) -> Frame {
        for _ in 0..32 {
            match self.next_event().await {
                OutboundEvent::Frame(frame) if frame.kind == kind && predicate(&frame) => {
                    return frame
                }
                OutboundEvent::Frame(_) => continue,
                OutboundEvent::Close => panic!("unexpected close while waiting for {kind:?}"),
            }
        }
        panic!("never received a matching {kind:?} frame");
    }

    /// Everything already queued on this connection.
    fn drain(&mut self) -> Vec<OutboundEvent> {
        let mut events = Vec::new();
        while let Ok(event) = self.rx.try_recv() {
            events.push(event);
        }
        events
    }
}

async fn join(registry: &RegistryManager, room: &RoomHandle, username: &str) -> TestClient {
    let record = registry.claim(username).await.unwrap();
    let (tx, rx) = mpsc::unbounded_channel();
    let (reply_tx, reply_rx) = oneshot::channel();
    room.send(RoomMessage::Join {
        user_id: record.id,
        username: record.username.clone(),
        conn: tx,
        response: reply_tx,
    })
    .await
    .unwrap();
    reply_rx.await.unwrap();
    TestClient {
        user_id: record.id,
        rx,
    }
}

/// The current turn holder according to a `game_state_update` frame.
fn current_player(frame: &Frame) -> UserId {
    frame.data["game_state"]["current_player_id"]
        .as_str()
        .expect("current_player_id present")
        .parse()
        .expect("valid uuid")
}

#[tokio::test]
async fn join_handshake_reports_host_and_leaderboard() {
    let (registry, room) = setup_room().await;
    let mut alice = join(&registry, &room, "alice").await;

    let response = alice.expect(MessageType::UserJoin).await;
    assert_eq!(response.data["success"], true);
    assert_eq!(response.data["username"], "alice");
    assert_eq!(response.data["is_host"], true);
    assert!(response.data["leaderboard"].is_array());

    let state = alice.expect(MessageType::GameStateUpdate).await;
    assert_eq!(state.data["game_state"]["phase"], "waiting");
    assert_eq!(state.data["game_state"]["players"].as_array().unwrap().len(), 1);
    assert_eq!(state.data["online_users"], serde_json::json!(["alice"]));

    let mut bob = join(&registry, &room, "bob").await;
    let response = bob.expect(MessageType::UserJoin).await;
    assert_eq!(response.data["is_host"], false);
}

#[tokio::test]
async fn round_start_sends_private_hands_before_public_state() {
    let (registry, room) = setup_room().await;
    let mut alice = join(&registry, &room, "alice").await;
    let mut bob = join(&registry, &room, "bob").await;

    room.send(RoomMessage::StartGame {
        user_id: alice.user_id,
    })
    .await
    .unwrap();

    for client in [&mut alice, &mut bob] {
        let round = client.expect(MessageType::RoundStart).await;
        assert_eq!(round.data["round_number"], 1);

        // The private deal lands before the round's first state update.
        let deal = client.expect(MessageType::PlayerUpdate).await;
        assert_eq!(deal.data["your_cards"].as_array().unwrap().len(), 1);

        let state = client.expect(MessageType::GameStateUpdate).await;
        assert_eq!(state.data["game_state"]["phase"], "playing");
        // Public projection: card counts only, never cards.
        assert!(state.data["current_round_cards"].is_null());
        for player in state.data["game_state"]["players"].as_array().unwrap() {
            assert_eq!(player["card_count"], 1);
            assert!(player.get("cards").is_none());
        }
    }
}

#[tokio::test]
async fn bluff_reveals_cards_to_everyone() {
    let (registry, room) = setup_room().await;
    let mut alice = join(&registry, &room, "alice").await;
    let mut bob = join(&registry, &room, "bob").await;

    room.send(RoomMessage::StartGame {
        user_id: alice.user_id,
    })
    .await
    .unwrap();

    let state = alice
        .expect_where(MessageType::GameStateUpdate, |f| {
            f.data["game_state"]["phase"] == "playing"
        })
        .await;
    let first = current_player(&state);
    let second = if first == alice.user_id {
        bob.user_id
    } else {
        alice.user_id
    };

    room.send(RoomMessage::CallHand {
        user_id: first,
        hand_spec: "three of a kind aces".to_string(),
    })
    .await
    .unwrap();
    room.send(RoomMessage::CallBluff { user_id: second })
        .await
        .unwrap();

    for client in [&mut alice, &mut bob] {
        client.expect(MessageType::ShowCards).await;
        let reveal = client.expect(MessageType::CallBluff).await;
        let revealed = reveal.data["previous_round_cards"].as_array().unwrap();
        assert_eq!(revealed.len(), 2);
        assert!(revealed.iter().all(|entry| {
            !entry["cards"].as_array().unwrap().is_empty()
        }));
        assert!(reveal.data["loser_id"].is_string());
        // The next round follows the reveal.
        client.expect(MessageType::RoundStart).await;
    }
}

#[tokio::test]
async fn waitlisted_joiner_spectates_with_cards() {
    let (registry, room) = setup_room().await;
    let mut alice = join(&registry, &room, "alice").await;
    let mut bob = join(&registry, &room, "bob").await;

    room.send(RoomMessage::StartGame {
        user_id: alice.user_id,
    })
    .await
    .unwrap();
    alice
        .expect_where(MessageType::GameStateUpdate, |f| {
            f.data["game_state"]["phase"] == "playing"
        })
        .await;
    bob.expect_where(MessageType::GameStateUpdate, |f| {
        f.data["game_state"]["phase"] == "playing"
    })
    .await;

    let mut carol = join(&registry, &room, "carol").await;
    carol.expect(MessageType::UserJoin).await;
    carol.expect(MessageType::WaitingForGame).await;

    // The spectator projection reveals the active hands; the players' own
    // broadcast keeps hiding them.
    let carol_state = carol.expect(MessageType::GameStateUpdate).await;
    let revealed = carol_state.data["current_round_cards"].as_array().unwrap();
    assert_eq!(revealed.len(), 2);
    assert_eq!(carol_state.data["game_state"]["waiting_players_count"], 1);

    let alice_state = alice.expect(MessageType::GameStateUpdate).await;
    assert!(alice_state.data["current_round_cards"].is_null());
}

#[tokio::test]
async fn non_host_start_gets_a_private_error() {
    let (registry, room) = setup_room().await;
    let mut alice = join(&registry, &room, "alice").await;
    let mut bob = join(&registry, &room, "bob").await;

    room.send(RoomMessage::StartGame { user_id: bob.user_id })
        .await
        .unwrap();

    let error = bob.expect(MessageType::Error).await;
    assert_eq!(error.data["message"], "only the host can do that");

    // The error is local to the offender: alice sees no error frame.
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(alice
        .drain()
        .iter()
        .all(|event| !matches!(event, OutboundEvent::Frame(f) if f.kind == MessageType::Error)));
}

#[tokio::test]
async fn kick_notifies_target_and_closes_their_connection() {
    let (registry, room) = setup_room().await;
    let mut alice = join(&registry, &room, "alice").await;
    let mut bob = join(&registry, &room, "bob").await;

    room.send(RoomMessage::KickUser {
        user_id: alice.user_id,
        target_username: "bob".to_string(),
    })
    .await
    .unwrap();

    bob.expect(MessageType::UserKicked).await;
    let mut saw_close = false;
    for _ in 0..8 {
        match bob.next_event().await {
            OutboundEvent::Close => {
                saw_close = true;
                break;
            }
            OutboundEvent::Frame(_) => continue,
        }
    }
    assert!(saw_close, "kicked connection must be closed");

    let leave = alice.expect(MessageType::UserLeave).await;
    assert_eq!(leave.data["username"], "bob");
}

#[tokio::test]
async fn host_departure_broadcasts_replacement() {
    let (registry, room) = setup_room().await;
    let mut alice = join(&registry, &room, "alice").await;
    let mut bob = join(&registry, &room, "bob").await;
    let mut carol = join(&registry, &room, "carol").await;

    let (reply_tx, reply_rx) = oneshot::channel();
    room.send(RoomMessage::Leave {
        user_id: alice.user_id,
        response: Some(reply_tx),
    })
    .await
    .unwrap();
    assert!(!reply_rx.await.unwrap(), "room is not empty yet");

    let leave = bob.expect(MessageType::UserLeave).await;
    assert_eq!(leave.data["username"], "alice");
    let changed = bob.expect(MessageType::HostChanged).await;
    let new_host: UserId = changed.data["host_id"].as_str().unwrap().parse().unwrap();
    assert!([bob.user_id, carol.user_id].contains(&new_host));
    carol.expect(MessageType::HostChanged).await;
    let _ = alice.drain();
}

#[tokio::test]
async fn shutdown_flushes_a_final_error_and_close() {
    let (registry, room) = setup_room().await;
    let mut alice = join(&registry, &room, "alice").await;
    let mut bob = join(&registry, &room, "bob").await;

    // A command already queued ahead of the shutdown is still handled.
    room.send(RoomMessage::StartGame {
        user_id: alice.user_id,
    })
    .await
    .unwrap();

    let (tx, rx) = oneshot::channel();
    room.send(RoomMessage::Shutdown { response: tx })
        .await
        .unwrap();
    rx.await.expect("shutdown confirmation");

    for client in [&mut alice, &mut bob] {
        client.expect(MessageType::RoundStart).await;
        let error = client.expect(MessageType::Error).await;
        assert_eq!(error.data["message"], "server shutting down");
        let mut saw_close = false;
        for _ in 0..8 {
            match client.next_event().await {
                OutboundEvent::Close => {
                    saw_close = true;
                    break;
                }
                OutboundEvent::Frame(_) => continue,
            }
        }
        assert!(saw_close, "drained connection must be closed");
    }

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(room.is_closed());
}

#[tokio::test]
async fn last_leave_empties_the_room() {
    let (registry, room) = setup_room().await;
    let alice = join(&registry, &room, "alice").await;

    let (reply_tx, reply_rx) = oneshot::channel();
    room.send(RoomMessage::Leave {
        user_id: alice.user_id,
        response: Some(reply_tx),
    })
    .await
    .unwrap();
    assert!(reply_rx.await.unwrap(), "room should report empty");

    // The actor stops; subsequent sends fail.
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(room.is_closed());
}
