//! Room actor implementation.
//!
//! Each room is a logically single-threaded actor: one task owns the
//! [`GameState`] and processes commands from a bounded inbox in arrival
//! order. The actor is also the sole producer of outbound frames for its
//! room, which keeps broadcasts totally ordered and lets it build the
//! private per-seat projections next to the public ones.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tokio::sync::mpsc;

use super::messages::{ConnectionSender, JoinReply, OutboundEvent, RoomMessage};
use crate::cards::parse_declaration;
use crate::game::{
    BluffOutcome, GameConfig, GameEndOutcome, GameState, PlayerRef, RoundStart, RoundTransition,
};
use crate::net::messages::{
    CallBluffPayload, ErrorPayload, GameEndPayload, GameStateUpdatePayload, HostChangedPayload,
    PlayerUpdatePayload, RoundStartPayload, ShowCardsPayload, UserJoinResponse, UserKickedPayload,
    UserLeavePayload, WaitingForGamePayload, WaitingListPayload,
};
use crate::net::{Frame, MessageType};
use crate::registry::{RegistryManager, UserId};

const LEADERBOARD_LIMIT: u32 = 20;
const INBOX_CAPACITY: usize = 100;

/// Room configuration, passed down from server config.
#[derive(Clone, Debug)]
pub struct RoomConfig {
    pub max_players: usize,
    /// Testing only; production rooms seed from entropy.
    pub rng_seed: Option<u64>,
    /// Accepted but not yet enforced. Reserved for a per-turn action
    /// timeout; the actor loop is where a timer would be armed.
    pub turn_timeout_secs: Option<u64>,
}

impl Default for RoomConfig {
    fn default() -> Self {
        Self {
            max_players: crate::game::MAX_PLAYERS,
            rng_seed: None,
            turn_timeout_secs: None,
        }
    }
}

/// Handle for enqueueing commands on a room.
#[derive(Clone)]
pub struct RoomHandle {
    sender: mpsc::Sender<RoomMessage>,
    room_id: String,
}

impl RoomHandle {
    pub fn room_id(&self) -> &str {
        &self.room_id
    }

    pub async fn send(&self, message: RoomMessage) -> Result<(), String> {
        self.sender
            .send(message)
            .await
            .map_err(|_| "room is closed".to_string())
    }

    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }
}

/// The actor owning one room's state and connections.
pub struct RoomActor {
    room_id: String,
    game: GameState,
    registry: Arc<RegistryManager>,
    conns: HashMap<UserId, ConnectionSender>,
    inbox: mpsc::Receiver<RoomMessage>,
}

impl RoomActor {
    pub fn new(
        room_id: String,
        config: RoomConfig,
        registry: Arc<RegistryManager>,
    ) -> (Self, RoomHandle) {
        let (sender, inbox) = mpsc::channel(INBOX_CAPACITY);
        let game = GameState::new(GameConfig {
            max_players: config.max_players,
            rng_seed: config.rng_seed,
        });
        let actor = Self {
            room_id: room_id.clone(),
            game,
            registry,
            conns: HashMap::new(),
            inbox,
        };
        let handle = RoomHandle { sender, room_id };
        (actor, handle)
    }

    /// Run the actor until its room empties or every handle is dropped.
    pub async fn run(mut self) {
        log::info!("room {} starting", self.room_id);
        while let Some(message) = self.inbox.recv().await {
            if self.handle_message(message).await {
                break;
            }
        }
        log::info!("room {} closed", self.room_id);
    }

    /// Returns true when the room emptied and the actor should stop.
    async fn handle_message(&mut self, message: RoomMessage) -> bool {
        match message {
            RoomMessage::Join {
                user_id,
                username,
                conn,
                response,
            } => {
                self.handle_join(user_id, username, conn, response).await;
                false
            }
            RoomMessage::Leave { user_id, response } => {
                let empty = self.handle_leave(user_id).await;
                if let Some(response) = response {
                    let _ = response.send(empty);
                }
                empty
            }
            RoomMessage::StartGame { user_id } => {
                self.handle_start(user_id).await;
                false
            }
            RoomMessage::RestartGame { user_id } => {
                self.handle_restart(user_id).await;
                false
            }
            RoomMessage::KickUser {
                user_id,
                target_username,
            } => self.handle_kick(user_id, target_username).await,
            RoomMessage::CallHand { user_id, hand_spec } => {
                self.handle_call_hand(user_id, hand_spec).await;
                false
            }
            RoomMessage::CallBluff { user_id } => {
                self.handle_call_bluff(user_id).await;
                false
            }
            RoomMessage::Shutdown { response } => {
                self.handle_shutdown();
                let _ = response.send(());
                true
            }
        }
    }

    // ===== command handlers =====

    async fn handle_join(
        &mut self,
        user_id: UserId,
        username: String,
        conn: ConnectionSender,
        response: tokio::sync::oneshot::Sender<JoinReply>,
    ) {
        let outcome = self.game.join(user_id, &username);
        self.conns.insert(user_id, conn);

        let leaderboard = match self.registry.leaderboard(LEADERBOARD_LIMIT).await {
            Ok(board) => board,
            Err(err) => {
                log::warn!("room {}: leaderboard unavailable: {err}", self.room_id);
                Vec::new()
            }
        };
        self.send_to(
            user_id,
            Frame::new(
                MessageType::UserJoin,
                UserJoinResponse {
                    success: true,
                    user_id,
                    username: username.clone(),
                    is_host: self.game.is_host(user_id),
                    message: "Successfully joined the game".to_string(),
                    leaderboard,
                },
            ),
        );
        if !outcome.seated {
            self.send_to(
                user_id,
                Frame::new(
                    MessageType::WaitingForGame,
                    WaitingForGamePayload {
                        message: "Game in progress, please wait for next round".to_string(),
                    },
                ),
            );
        }
        let _ = response.send(JoinReply {
            seated: outcome.seated,
        });

        log::info!("room {}: {username} joined (seated: {})", self.room_id, outcome.seated);
        self.broadcast_game_state().await;
    }

    async fn handle_leave(&mut self, user_id: UserId) -> bool {
        self.conns.remove(&user_id);
        if let Some(outcome) = self.game.leave(user_id) {
            log::info!("room {}: {} left", self.room_id, outcome.username);
            self.broadcast(Frame::new(
                MessageType::UserLeave,
                UserLeavePayload {
                    username: outcome.username,
                },
            ));
            if let Some(host) = outcome.new_host {
                self.broadcast_host_changed(host);
            }
            if let Some(end) = outcome.game_end {
                self.settle_game_end(end).await;
            }
            self.broadcast_game_state().await;
        }
        self.game.is_empty() && self.conns.is_empty()
    }

    async fn handle_start(&mut self, user_id: UserId) {
        match self.game.start_game(user_id) {
            Ok(round) => {
                log::info!("room {}: game started", self.room_id);
                self.announce_round(round).await;
            }
            Err(err) => self.send_error(user_id, err.to_string()),
        }
    }

    async fn handle_restart(&mut self, user_id: UserId) {
        match self.game.restart_game(user_id) {
            Ok(new_host) => {
                log::info!("room {}: game restarted", self.room_id);
                if let Some(host) = new_host {
                    self.broadcast_host_changed(host);
                }
                self.broadcast_game_state().await;
            }
            Err(err) => self.send_error(user_id, err.to_string()),
        }
    }

    async fn handle_kick(&mut self, user_id: UserId, target_username: String) -> bool {
        if !self.game.is_host(user_id) {
            self.send_error(user_id, "only the host can kick users");
            return false;
        }
        let Some(target) = self.game.user_id_by_username(&target_username) else {
            self.send_error(user_id, format!("no such user: {target_username}"));
            return false;
        };
        if target == user_id {
            self.send_error(user_id, "you cannot kick yourself");
            return false;
        }

        self.send_to(
            target,
            Frame::new(
                MessageType::UserKicked,
                UserKickedPayload {
                    message: "You have been kicked by the host".to_string(),
                },
            ),
        );
        if let Some(conn) = self.conns.get(&target) {
            let _ = conn.send(OutboundEvent::Close);
        }
        // The gateway's disconnect path will send a redundant Leave; leave is
        // idempotent, so settling the departure now keeps the room correct
        // even if that socket lingers.
        self.handle_leave(target).await
    }

    /// Flush a final `error` frame and a close to every connection. By the
    /// time this runs, every command enqueued before the shutdown request
    /// has already been handled.
    fn handle_shutdown(&mut self) {
        log::info!("room {} shutting down", self.room_id);
        self.broadcast(Frame::error("server shutting down"));
        for conn in self.conns.values() {
            let _ = conn.send(OutboundEvent::Close);
        }
        self.conns.clear();
    }

    async fn handle_call_hand(&mut self, user_id: UserId, hand_spec: String) {
        let declaration = match parse_declaration(&hand_spec) {
            Ok(declaration) => declaration,
            Err(err) => {
                self.send_error(user_id, format!("Invalid hand specification: {err}"));
                return;
            }
        };
        match self.game.call_hand(user_id, declaration) {
            Ok(()) => self.broadcast_game_state().await,
            Err(err) => self.send_error(user_id, err.to_string()),
        }
    }

    async fn handle_call_bluff(&mut self, user_id: UserId) {
        let outcome = match self.game.call_bluff(user_id) {
            Ok(outcome) => outcome,
            Err(err) => {
                self.send_error(user_id, err.to_string());
                return;
            }
        };
        self.settle_bluff(outcome).await;
    }

    async fn settle_bluff(&mut self, outcome: BluffOutcome) {
        let BluffOutcome {
            message,
            loser,
            revealed,
            new_host,
            next,
            ..
        } = outcome;

        // The reveal: show_cards primes the overlay, call_bluff carries the
        // actual hands. This is the only place a player's cards are sent to
        // anyone but their owner.
        self.broadcast(Frame::new(MessageType::ShowCards, ShowCardsPayload {}));
        self.broadcast(Frame::new(
            MessageType::CallBluff,
            CallBluffPayload {
                message,
                loser_id: loser.as_ref().map(|l| l.user_id),
                loser: loser.as_ref().map(|l| l.username.clone()),
                previous_round_cards: revealed,
            },
        ));
        if let Some(host) = new_host {
            self.broadcast_host_changed(host);
        }
        match next {
            RoundTransition::NextRound(round) => self.announce_round(round).await,
            RoundTransition::GameOver(end) => {
                self.settle_game_end(end).await;
                self.broadcast_game_state().await;
            }
        }
    }

    /// Round start: `round_start`, then each seat's private deal, then the
    /// public state. Private hands must land before the first state update
    /// that references the new round.
    async fn announce_round(&mut self, round: RoundStart) {
        self.broadcast(Frame::new(
            MessageType::RoundStart,
            RoundStartPayload {
                round_number: round.round_number,
            },
        ));
        for hand in round.hands {
            self.send_to(
                hand.user_id,
                Frame::new(
                    MessageType::PlayerUpdate,
                    PlayerUpdatePayload {
                        your_cards: hand.cards,
                    },
                ),
            );
        }
        self.broadcast_game_state().await;
    }

    /// Credit counters and broadcast the end of the game. Registry failures
    /// are logged and swallowed: the in-memory result stays authoritative
    /// for the session.
    async fn settle_game_end(&mut self, end: GameEndOutcome) {
        if let Some(winner) = &end.winner {
            if let Err(err) = self.registry.record_win(winner.user_id).await {
                log::error!("room {}: failed to record win: {err}", self.room_id);
            }
        }
        for participant in &end.participants {
            if let Err(err) = self.registry.record_game(*participant).await {
                log::error!("room {}: failed to record game: {err}", self.room_id);
            }
        }

        let message = match &end.winner {
            Some(winner) => format!("{} wins the game!", winner.username),
            None => "Game over".to_string(),
        };
        log::info!("room {}: {message}", self.room_id);
        self.broadcast(Frame::new(
            MessageType::GameEnd,
            GameEndPayload {
                winner_id: end.winner.as_ref().map(|w| w.user_id),
                winner: end.winner.as_ref().map(|w| w.username.clone()),
                message,
            },
        ));
        if let Some(host) = end.new_host {
            self.broadcast_host_changed(host);
        }
    }

    // ===== projections =====

    /// Broadcast the public state. Spectators (waitlisted joiners and
    /// eliminated seats) get a variant that additionally reveals the active
    /// hands; active players only ever see card counts.
    async fn broadcast_game_state(&mut self) {
        let game_state = self.game.public_state();
        let online_users = self.registry.online_usernames().await;

        let spectators: HashSet<UserId> = self.game.spectator_ids().into_iter().collect();
        let reveal = if spectators.is_empty() {
            None
        } else {
            let hands = self.game.active_hands();
            hands
                .iter()
                .any(|h| !h.cards.is_empty())
                .then_some(hands)
        };

        let public = Frame::new(
            MessageType::GameStateUpdate,
            GameStateUpdatePayload {
                game_state: game_state.clone(),
                online_users: online_users.clone(),
                current_round_cards: None,
            },
        );
        let spectator_variant = reveal.map(|cards| {
            Frame::new(
                MessageType::GameStateUpdate,
                GameStateUpdatePayload {
                    game_state,
                    online_users,
                    current_round_cards: Some(cards),
                },
            )
        });

        self.conns.retain(|user_id, conn| {
            let frame = match (&spectator_variant, spectators.contains(user_id)) {
                (Some(variant), true) => variant.clone(),
                _ => public.clone(),
            };
            conn.send(OutboundEvent::Frame(frame)).is_ok()
        });

        // The host privately sees who is queued for the next game.
        let waiting_list = self.game.waiting_usernames();
        if !waiting_list.is_empty() {
            if let Some(host) = self.game.host_id() {
                self.send_to(
                    host,
                    Frame::new(MessageType::PlayerUpdate, WaitingListPayload { waiting_list }),
                );
            }
        }
    }

    fn broadcast_host_changed(&mut self, host: PlayerRef) {
        self.broadcast(Frame::new(
            MessageType::HostChanged,
            HostChangedPayload {
                new_host: host.username,
                host_id: host.user_id,
            },
        ));
    }

    fn broadcast(&mut self, frame: Frame) {
        self.conns
            .retain(|_, conn| conn.send(OutboundEvent::Frame(frame.clone())).is_ok());
    }

    fn send_to(&mut self, user_id: UserId, frame: Frame) {
        if let Some(conn) = self.conns.get(&user_id) {
            if conn.send(OutboundEvent::Frame(frame)).is_err() {
                self.conns.remove(&user_id);
            }
        }
    }

    fn send_error(&mut self, user_id: UserId, message: impl Into<String>) {
        self.send_to(
            user_id,
            Frame::new(
                MessageType::Error,
                ErrorPayload {
                    message: message.into(),
                },
            ),
        );
    }
}
