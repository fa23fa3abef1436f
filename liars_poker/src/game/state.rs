//! Game state machine implementation.

use rand::rngs::StdRng;
use serde::Serialize;
use std::collections::VecDeque;
use thiserror::Error;

use super::{ELIMINATION_LOSSES, MAX_PLAYERS, MIN_PLAYERS};
use crate::cards::{game_rng, pick_index, Card, Deck, HandCategory, HandDeclaration};
use crate::registry::UserId;

/// Errors from player commands. None of them mutate state.
#[derive(Debug, Eq, Error, PartialEq)]
pub enum GameError {
    #[error("only the host can do that")]
    NotHost,
    #[error("game already in progress")]
    GameAlreadyStarted,
    #[error("need 2+ players to start")]
    NotEnoughPlayers,
    #[error("no game in progress")]
    NotPlaying,
    #[error("you are not playing this round")]
    NotSeated,
    #[error("not your turn")]
    OutOfTurn,
    #[error("hand call must be higher than the previous call")]
    CallTooLow,
    #[error("a royal flush can only be answered with a bluff call")]
    RoyalFlushStands,
    #[error("no hand call to bluff")]
    NothingToBluff,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum GamePhase {
    Waiting,
    Playing,
    Ended,
}

/// A seated player. `cards` is only ever exposed through the owning seat's
/// private projection or the end-of-round reveal.
#[derive(Clone, Debug)]
pub struct SeatedPlayer {
    pub user_id: UserId,
    pub username: String,
    pub losses: u8,
    pub is_eliminated: bool,
    pub cards: Vec<Card>,
}

impl SeatedPlayer {
    fn new(user_id: UserId, username: String) -> Self {
        Self {
            user_id,
            username,
            losses: 0,
            is_eliminated: false,
            cards: Vec::new(),
        }
    }

    /// Cards dealt next round: one more than the losses so far.
    fn next_round_cards(&self) -> usize {
        self.losses as usize + 1
    }
}

#[derive(Clone, Debug)]
struct WaitingUser {
    user_id: UserId,
    username: String,
}

/// The latest committed call of the round.
#[derive(Clone, Debug)]
pub struct CurrentCall {
    pub player_id: UserId,
    pub declaration: HandDeclaration,
}

/// A user reference carried in outcomes for broadcasting.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct PlayerRef {
    pub user_id: UserId,
    pub username: String,
}

/// One seat's cards, used for private deals and the bluff reveal.
#[derive(Clone, Debug, Serialize)]
pub struct PlayerCards {
    pub user_id: UserId,
    pub cards: Vec<Card>,
}

/// Public projection of one seat.
#[derive(Clone, Debug, Serialize)]
pub struct PublicPlayer {
    pub user_id: UserId,
    pub username: String,
    pub card_count: usize,
    pub losses: u8,
    pub is_eliminated: bool,
}

/// Public projection of the current call.
#[derive(Clone, Debug, Serialize)]
pub struct PublicCall {
    pub player_id: UserId,
    pub hand: String,
}

/// Public projection of the whole room; safe to broadcast to every client.
#[derive(Clone, Debug, Serialize)]
pub struct PublicGameState {
    pub phase: GamePhase,
    pub round_number: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_player_id: Option<UserId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_call: Option<PublicCall>,
    pub players: Vec<PublicPlayer>,
    pub waiting_players_count: usize,
}

#[derive(Debug)]
pub struct JoinOutcome {
    pub seated: bool,
    pub became_host: bool,
}

#[derive(Debug)]
pub struct LeaveOutcome {
    pub username: String,
    pub was_seated: bool,
    pub new_host: Option<PlayerRef>,
    pub game_end: Option<GameEndOutcome>,
}

/// A freshly dealt round.
#[derive(Debug)]
pub struct RoundStart {
    pub round_number: u32,
    pub current_player: UserId,
    pub hands: Vec<PlayerCards>,
}

#[derive(Debug)]
pub struct GameEndOutcome {
    pub winner: Option<PlayerRef>,
    pub participants: Vec<UserId>,
    pub new_host: Option<PlayerRef>,
}

#[derive(Debug)]
pub enum RoundTransition {
    NextRound(RoundStart),
    GameOver(GameEndOutcome),
}

/// The result of a bluff call: the reveal, the loser, and what happens next.
#[derive(Debug)]
pub struct BluffOutcome {
    pub held: bool,
    pub message: String,
    pub loser: Option<PlayerRef>,
    pub eliminated: bool,
    pub revealed: Vec<PlayerCards>,
    pub new_host: Option<PlayerRef>,
    pub next: RoundTransition,
}

#[derive(Clone, Debug)]
pub struct GameConfig {
    pub max_players: usize,
    /// Testing only. Production must leave this unset so deals stay
    /// unpredictable.
    pub rng_seed: Option<u64>,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            max_players: MAX_PLAYERS,
            rng_seed: None,
        }
    }
}

/// The authoritative state of one room.
pub struct GameState {
    phase: GamePhase,
    players: Vec<SeatedPlayer>,
    waiting: VecDeque<WaitingUser>,
    host_id: Option<UserId>,
    round_number: u32,
    starting_player: Option<UserId>,
    current_turn: Option<UserId>,
    current_call: Option<CurrentCall>,
    previous_round_cards: Vec<PlayerCards>,
    max_players: usize,
    rng: StdRng,
}

impl GameState {
    pub fn new(config: GameConfig) -> Self {
        Self {
            phase: GamePhase::Waiting,
            players: Vec::new(),
            waiting: VecDeque::new(),
            host_id: None,
            round_number: 0,
            starting_player: None,
            current_turn: None,
            current_call: None,
            previous_round_cards: Vec::new(),
            max_players: config.max_players.min(MAX_PLAYERS),
            rng: game_rng(config.rng_seed),
        }
    }

    // ===== admission =====

    /// Seat the user if the room is waiting and has space, otherwise put
    /// them on the waiting list. The first seated user becomes host.
    pub fn join(&mut self, user_id: UserId, username: &str) -> JoinOutcome {
        if self.phase == GamePhase::Waiting && self.players.len() < self.max_players {
            self.players
                .push(SeatedPlayer::new(user_id, username.to_string()));
            let became_host = self.host_id.is_none();
            if became_host {
                self.host_id = Some(user_id);
            }
            JoinOutcome {
                seated: true,
                became_host,
            }
        } else {
            if !self.waiting.iter().any(|w| w.user_id == user_id) {
                self.waiting.push_back(WaitingUser {
                    user_id,
                    username: username.to_string(),
                });
            }
            JoinOutcome {
                seated: false,
                became_host: false,
            }
        }
    }

    /// Remove a user. Handles the waiting list, lobby departures, and
    /// mid-round departures (cursor advance, host replacement, game end when
    /// one active player remains). Returns `None` for unknown users.
    pub fn leave(&mut self, user_id: UserId) -> Option<LeaveOutcome> {
        if let Some(pos) = self.waiting.iter().position(|w| w.user_id == user_id) {
            if let Some(waiting) = self.waiting.remove(pos) {
                return Some(LeaveOutcome {
                    username: waiting.username,
                    was_seated: false,
                    new_host: None,
                    game_end: None,
                });
            }
        }

        let seat = self.players.iter().position(|p| p.user_id == user_id)?;
        let username = self.players[seat].username.clone();
        let was_host = self.host_id == Some(user_id);
        let was_active = self.phase == GamePhase::Playing && !self.players[seat].is_eliminated;

        if was_active && self.active_count() <= 2 {
            // The departed seat plus at most one other active player: the
            // survivor wins outright.
            self.players.remove(seat);
            let new_host = if was_host { self.pick_new_host() } else { None };
            let game_end = self.finish_game();
            return Some(LeaveOutcome {
                username,
                was_seated: true,
                new_host,
                game_end: Some(game_end),
            });
        }

        if was_active && self.current_turn == Some(user_id) {
            // Advance past the departing seat before it disappears.
            self.current_turn = self.next_active_after(user_id);
        }
        // A departing caller's call still stands and can be bluffed.
        self.players.remove(seat);
        let new_host = if was_host { self.pick_new_host() } else { None };
        Some(LeaveOutcome {
            username,
            was_seated: true,
            new_host,
            game_end: None,
        })
    }

    // ===== game lifecycle =====

    /// Host starts the game: Waiting → Playing, fresh losses, random
    /// starting seat, round 1.
    pub fn start_game(&mut self, user_id: UserId) -> Result<RoundStart, GameError> {
        if self.host_id != Some(user_id) {
            return Err(GameError::NotHost);
        }
        if self.phase != GamePhase::Waiting {
            return Err(GameError::GameAlreadyStarted);
        }
        if self.players.len() < MIN_PLAYERS {
            return Err(GameError::NotEnoughPlayers);
        }
        self.phase = GamePhase::Playing;
        self.round_number = 0;
        self.starting_player = None;
        for player in &mut self.players {
            player.losses = 0;
            player.is_eliminated = false;
            player.cards.clear();
        }
        Ok(self.start_new_round())
    }

    /// Host resets the room to a fresh waiting state, promoting waitlisted
    /// users into open seats.
    pub fn restart_game(&mut self, user_id: UserId) -> Result<Option<PlayerRef>, GameError> {
        if self.host_id != Some(user_id) {
            return Err(GameError::NotHost);
        }
        Ok(self.reset_to_waiting())
    }

    // ===== turn cycle =====

    /// Commit a hand call for the player at the turn cursor.
    pub fn call_hand(
        &mut self,
        user_id: UserId,
        declaration: HandDeclaration,
    ) -> Result<(), GameError> {
        if self.phase != GamePhase::Playing {
            return Err(GameError::NotPlaying);
        }
        if !self.is_active(user_id) {
            return Err(GameError::NotSeated);
        }
        if self.current_turn != Some(user_id) {
            return Err(GameError::OutOfTurn);
        }
        if let Some(call) = &self.current_call {
            if call.declaration.category() == HandCategory::RoyalFlush {
                return Err(GameError::RoyalFlushStands);
            }
            if !declaration.beats(&call.declaration) {
                return Err(GameError::CallTooLow);
            }
        }
        self.current_call = Some(CurrentCall {
            player_id: user_id,
            declaration,
        });
        self.current_turn = self.next_active_after(user_id);
        Ok(())
    }

    /// Accuse the previous caller of bluffing. Evaluates the declaration
    /// against the union of all dealt cards and ends the round.
    pub fn call_bluff(&mut self, user_id: UserId) -> Result<BluffOutcome, GameError> {
        if self.phase != GamePhase::Playing {
            return Err(GameError::NotPlaying);
        }
        if !self.is_active(user_id) {
            return Err(GameError::NotSeated);
        }
        if self.current_turn != Some(user_id) {
            return Err(GameError::OutOfTurn);
        }
        let call = self.current_call.clone().ok_or(GameError::NothingToBluff)?;

        let union: Vec<Card> = self
            .active_players()
            .flat_map(|p| p.cards.iter().copied())
            .collect();
        let held = call.declaration.holds_in(&union);
        let revealed = self.active_hands();

        // If the declared hand holds, the accuser loses; otherwise the
        // caller does. A caller who already left loses nothing.
        let loser_id = if held { user_id } else { call.player_id };
        let loser = self.player_ref(loser_id);
        let message = format!(
            "Bluff called! {} {}",
            call.declaration,
            if held { "exists" } else { "does not exist" },
        );

        let (eliminated, new_host, next) =
            self.end_round(loser.as_ref().map(|l| l.user_id), revealed.clone());
        Ok(BluffOutcome {
            held,
            message,
            loser,
            eliminated,
            revealed,
            new_host,
            next,
        })
    }

    // ===== round bookkeeping =====

    fn start_new_round(&mut self) -> RoundStart {
        self.round_number += 1;

        let starter = match self.starting_player {
            // Next round starts at the seat clockwise of this round's
            // starting seat, skipping eliminated players.
            Some(previous) => self
                .next_active_after(previous)
                .unwrap_or_else(|| self.players[0].user_id),
            None => {
                let actives: Vec<UserId> = self.active_players().map(|p| p.user_id).collect();
                actives[pick_index(&mut self.rng, actives.len())]
            }
        };

        let mut deck = Deck::shuffled(&mut self.rng);
        let mut hands = Vec::new();
        for player in self.players.iter_mut().filter(|p| !p.is_eliminated) {
            player.cards = deck.deal(player.next_round_cards());
            hands.push(PlayerCards {
                user_id: player.user_id,
                cards: player.cards.clone(),
            });
        }

        self.current_call = None;
        self.starting_player = Some(starter);
        self.current_turn = Some(starter);
        RoundStart {
            round_number: self.round_number,
            current_player: starter,
            hands,
        }
    }

    fn end_round(
        &mut self,
        loser_id: Option<UserId>,
        revealed: Vec<PlayerCards>,
    ) -> (bool, Option<PlayerRef>, RoundTransition) {
        let mut eliminated = false;
        if let Some(loser_id) = loser_id {
            if let Some(loser) = self.players.iter_mut().find(|p| p.user_id == loser_id) {
                loser.losses += 1;
                if loser.losses >= ELIMINATION_LOSSES {
                    loser.is_eliminated = true;
                    eliminated = true;
                }
            }
        }

        // Snapshot from before the elimination, for the reveal overlay.
        self.previous_round_cards = revealed;
        for player in &mut self.players {
            player.cards.clear();
        }

        // An eliminated host hands the room to a random active player.
        let new_host = if eliminated && self.host_id == loser_id && self.active_count() > 0 {
            self.pick_new_host()
        } else {
            None
        };

        let next = if self.active_count() <= 1 {
            RoundTransition::GameOver(self.finish_game())
        } else {
            RoundTransition::NextRound(self.start_new_round())
        };
        (eliminated, new_host, next)
    }

    /// Game over: credit the winner, then fall back to a fresh waiting room
    /// with the waitlist promoted into open seats.
    fn finish_game(&mut self) -> GameEndOutcome {
        self.phase = GamePhase::Ended;
        let winner = self.active_players().next().map(|p| PlayerRef {
            user_id: p.user_id,
            username: p.username.clone(),
        });
        let participants: Vec<UserId> = self.players.iter().map(|p| p.user_id).collect();
        let new_host = self.reset_to_waiting();
        GameEndOutcome {
            winner,
            participants,
            new_host,
        }
    }

    fn reset_to_waiting(&mut self) -> Option<PlayerRef> {
        self.phase = GamePhase::Waiting;
        self.round_number = 0;
        self.current_call = None;
        self.current_turn = None;
        self.starting_player = None;
        self.previous_round_cards.clear();
        for player in &mut self.players {
            player.losses = 0;
            player.is_eliminated = false;
            player.cards.clear();
        }
        while self.players.len() < self.max_players {
            let Some(waiting) = self.waiting.pop_front() else {
                break;
            };
            self.players
                .push(SeatedPlayer::new(waiting.user_id, waiting.username));
        }
        let host_seated = self
            .host_id
            .map(|h| self.players.iter().any(|p| p.user_id == h))
            .unwrap_or(false);
        if !host_seated {
            self.pick_new_host()
        } else {
            None
        }
    }

    fn pick_new_host(&mut self) -> Option<PlayerRef> {
        let candidates: Vec<usize> = self
            .players
            .iter()
            .enumerate()
            .filter(|(_, p)| !p.is_eliminated)
            .map(|(i, _)| i)
            .collect();
        if candidates.is_empty() {
            self.host_id = None;
            return None;
        }
        let chosen = &self.players[candidates[pick_index(&mut self.rng, candidates.len())]];
        self.host_id = Some(chosen.user_id);
        Some(PlayerRef {
            user_id: chosen.user_id,
            username: chosen.username.clone(),
        })
    }

    fn next_active_after(&self, user_id: UserId) -> Option<UserId> {
        if self.players.is_empty() {
            return None;
        }
        let len = self.players.len();
        // A vanished seat scans from the start of the table.
        let start = self
            .players
            .iter()
            .position(|p| p.user_id == user_id)
            .unwrap_or(len - 1);
        for offset in 1..=len {
            let player = &self.players[(start + offset) % len];
            if !player.is_eliminated {
                return Some(player.user_id);
            }
        }
        None
    }

    // ===== queries =====

    pub fn phase(&self) -> GamePhase {
        self.phase
    }

    pub fn round_number(&self) -> u32 {
        self.round_number
    }

    pub fn host_id(&self) -> Option<UserId> {
        self.host_id
    }

    pub fn is_host(&self, user_id: UserId) -> bool {
        self.host_id == Some(user_id)
    }

    pub fn current_turn(&self) -> Option<UserId> {
        self.current_turn
    }

    pub fn current_call(&self) -> Option<&CurrentCall> {
        self.current_call.as_ref()
    }

    /// True when nobody is seated or waiting; the room can be destroyed.
    pub fn is_empty(&self) -> bool {
        self.players.is_empty() && self.waiting.is_empty()
    }

    pub fn seated_count(&self) -> usize {
        self.players.len()
    }

    fn active_count(&self) -> usize {
        self.active_players().count()
    }

    fn active_players(&self) -> impl Iterator<Item = &SeatedPlayer> {
        self.players.iter().filter(|p| !p.is_eliminated)
    }

    fn is_active(&self, user_id: UserId) -> bool {
        self.active_players().any(|p| p.user_id == user_id)
    }

    /// Seated user lookup by id, eliminated or not.
    fn player_ref(&self, user_id: UserId) -> Option<PlayerRef> {
        self.players
            .iter()
            .find(|p| p.user_id == user_id)
            .map(|p| PlayerRef {
                user_id: p.user_id,
                username: p.username.clone(),
            })
    }

    /// Find a seated or waiting user by exact username.
    pub fn user_id_by_username(&self, username: &str) -> Option<UserId> {
        self.players
            .iter()
            .find(|p| p.username == username)
            .map(|p| p.user_id)
            .or_else(|| {
                self.waiting
                    .iter()
                    .find(|w| w.username == username)
                    .map(|w| w.user_id)
            })
    }

    /// The broadcastable projection: card counts, never cards.
    pub fn public_state(&self) -> PublicGameState {
        PublicGameState {
            phase: self.phase,
            round_number: self.round_number,
            current_player_id: self.current_turn,
            current_call: self.current_call.as_ref().map(|call| PublicCall {
                player_id: call.player_id,
                hand: call.declaration.to_string(),
            }),
            players: self
                .players
                .iter()
                .map(|p| PublicPlayer {
                    user_id: p.user_id,
                    username: p.username.clone(),
                    card_count: p.cards.len(),
                    losses: p.losses,
                    is_eliminated: p.is_eliminated,
                })
                .collect(),
            waiting_players_count: self.waiting.len(),
        }
    }

    /// One seat's private hand.
    pub fn player_cards(&self, user_id: UserId) -> Option<&[Card]> {
        self.players
            .iter()
            .find(|p| p.user_id == user_id)
            .map(|p| p.cards.as_slice())
    }

    /// Every active seat's cards. Only for private deals, the reveal, and
    /// the spectator projection.
    pub fn active_hands(&self) -> Vec<PlayerCards> {
        self.active_players()
            .map(|p| PlayerCards {
                user_id: p.user_id,
                cards: p.cards.clone(),
            })
            .collect()
    }

    /// The previous round's dealt cards, kept for the reveal overlay.
    pub fn previous_round_cards(&self) -> &[PlayerCards] {
        &self.previous_round_cards
    }

    /// Usernames on the waiting list, in queue order.
    pub fn waiting_usernames(&self) -> Vec<String> {
        self.waiting.iter().map(|w| w.username.clone()).collect()
    }

    /// Users who may see all cards mid-round: waitlisted joiners and
    /// eliminated seats.
    pub fn spectator_ids(&self) -> Vec<UserId> {
        if self.phase != GamePhase::Playing {
            return Vec::new();
        }
        let mut ids: Vec<UserId> = self.waiting.iter().map(|w| w.user_id).collect();
        ids.extend(
            self.players
                .iter()
                .filter(|p| p.is_eliminated)
                .map(|p| p.user_id),
        );
        ids
    }

    /// Ids of seated, non-eliminated players.
    pub fn active_ids(&self) -> Vec<UserId> {
        self.active_players().map(|p| p.user_id).collect()
    }

    /// Replace dealt hands with fixed cards. Intended for deterministic
    /// tests; the membership predicate sees exactly these cards.
    pub fn force_hands(&mut self, hands: &[(UserId, Vec<Card>)]) {
        for (user_id, cards) in hands {
            if let Some(player) = self.players.iter_mut().find(|p| p.user_id == *user_id) {
                player.cards = cards.clone();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn state() -> GameState {
        GameState::new(GameConfig {
            max_players: MAX_PLAYERS,
            rng_seed: Some(42),
        })
    }

    #[test]
    fn first_joiner_becomes_host() {
        let mut game = state();
        let alice = Uuid::new_v4();
        let bob = Uuid::new_v4();
        assert!(game.join(alice, "alice").became_host);
        assert!(!game.join(bob, "bob").became_host);
        assert!(game.is_host(alice));
    }

    #[test]
    fn ninth_joiner_waits() {
        let mut game = state();
        for i in 0..8 {
            assert!(game.join(Uuid::new_v4(), &format!("p{i}")).seated);
        }
        let ninth = Uuid::new_v4();
        assert!(!game.join(ninth, "ninth").seated);
        assert_eq!(game.public_state().waiting_players_count, 1);
    }

    #[test]
    fn start_requires_host_and_two_players() {
        let mut game = state();
        let alice = Uuid::new_v4();
        game.join(alice, "alice");
        assert_eq!(game.start_game(alice).unwrap_err(), GameError::NotEnoughPlayers);

        let bob = Uuid::new_v4();
        game.join(bob, "bob");
        assert_eq!(game.start_game(bob).unwrap_err(), GameError::NotHost);

        let round = game.start_game(alice).unwrap();
        assert_eq!(round.round_number, 1);
        assert_eq!(game.phase(), GamePhase::Playing);
        // Round 1 deals one card each.
        assert!(round.hands.iter().all(|h| h.cards.len() == 1));
        assert_eq!(game.start_game(alice).unwrap_err(), GameError::GameAlreadyStarted);
    }

    #[test]
    fn lobby_leave_reassigns_host() {
        let mut game = state();
        let alice = Uuid::new_v4();
        let bob = Uuid::new_v4();
        game.join(alice, "alice");
        game.join(bob, "bob");

        let outcome = game.leave(alice).unwrap();
        let new_host = outcome.new_host.expect("host must be replaced");
        assert_eq!(new_host.user_id, bob);
        assert!(game.is_host(bob));
    }

    #[test]
    fn unknown_user_leave_is_none() {
        let mut game = state();
        assert!(game.leave(Uuid::new_v4()).is_none());
    }
}
