//! # Liars Poker
//!
//! Authoritative server core for a real-time bluff-poker card game. Up to
//! eight players per room are dealt hands from one deck and take turns
//! declaring poker hands about the union of everyone's cards; each call must
//! strictly exceed the previous one, until someone calls bluff and the round
//! resolves against the actual dealt cards.
//!
//! ## Architecture
//!
//! - [`cards`]: suits, ranks, decks, hand declarations with their total
//!   order, the membership predicate, and the declaration parser.
//! - [`registry`]: the durable username registry with online state and the
//!   wins/games-played leaderboard (SQLite via `sqlx`).
//! - [`game`]: the per-room state machine — seating, waitlist, rounds, the
//!   turn cursor, bluff resolution, elimination, and host continuity.
//! - [`room`]: the actor wrapper that serializes commands per room and fans
//!   out public broadcasts and private per-seat projections.
//! - [`net`]: the JSON frame protocol spoken by the gateway.
//!
//! The WebSocket gateway itself lives in the `lp_server` binary crate.
//!
//! ## Example
//!
//! ```
//! use liars_poker::cards::parse_declaration;
//!
//! let call = parse_declaration("pair of kings").unwrap();
//! let raise = parse_declaration("pair of aces").unwrap();
//! assert!(raise.beats(&call));
//! ```

pub mod cards;
pub mod db;
pub mod game;
pub mod net;
pub mod registry;
pub mod room;

pub use cards::{parse_declaration, Card, HandCategory, HandDeclaration, ParseError, Suit};
pub use db::{Database, DatabaseConfig};
pub use game::{GameConfig, GameError, GamePhase, GameState};
pub use registry::{RegistryManager, UserId};
pub use room::{RoomConfig, RoomManager};
