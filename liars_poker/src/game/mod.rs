//! The per-room game state machine.
//!
//! One [`GameState`] instance exists per active room, owned by that room's
//! actor. All mutations happen through its methods; every command either
//! commits fully or returns a [`GameError`] leaving the state untouched.

mod state;

pub use state::{
    BluffOutcome, CurrentCall, GameConfig, GameEndOutcome, GameError, GamePhase, GameState,
    JoinOutcome, LeaveOutcome, PlayerCards, PlayerRef, PublicCall, PublicGameState, PublicPlayer,
    RoundStart, RoundTransition, SeatedPlayer,
};

/// Hard cap on seated players per room.
pub const MAX_PLAYERS: usize = 8;

/// Minimum seated players needed to start a game.
pub const MIN_PLAYERS: usize = 2;

/// A player is eliminated when their loss count reaches this.
pub const ELIMINATION_LOSSES: u8 = 5;
