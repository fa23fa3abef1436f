//! Message types for the bidirectional JSON frame protocol.
//!
//! Every frame is a JSON object `{"type": ..., "data": {...}, "session_id":
//! ...}`. `session_id` selects the room; absent means the default room.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::cards::Card;
use crate::game::{PlayerCards, PublicGameState};
use crate::registry::{LeaderboardEntry, UserId};

/// Frame discriminator. Unknown inbound types map to [`MessageType::Unknown`]
/// and are answered with an `error` frame.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageType {
    // Connection messages
    UserJoin,
    UserLeave,
    UserKicked,
    UsernameError,
    // Game lifecycle
    GameStart,
    GameEnd,
    GameRestart,
    WaitingForGame,
    // Round lifecycle
    RoundStart,
    RoundEnd,
    // Player actions
    CallHand,
    CallBluff,
    ShowCards,
    // Host messages
    HostChanged,
    KickUser,
    // General updates
    GameStateUpdate,
    PlayerUpdate,
    Error,
    #[serde(other)]
    Unknown,
}

impl MessageType {
    /// The wire tag, for logs and metrics labels.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::UserJoin => "user_join",
            Self::UserLeave => "user_leave",
            Self::UserKicked => "user_kicked",
            Self::UsernameError => "username_error",
            Self::GameStart => "game_start",
            Self::GameEnd => "game_end",
            Self::GameRestart => "game_restart",
            Self::WaitingForGame => "waiting_for_game",
            Self::RoundStart => "round_start",
            Self::RoundEnd => "round_end",
            Self::CallHand => "call_hand",
            Self::CallBluff => "call_bluff",
            Self::ShowCards => "show_cards",
            Self::HostChanged => "host_changed",
            Self::KickUser => "kick_user",
            Self::GameStateUpdate => "game_state_update",
            Self::PlayerUpdate => "player_update",
            Self::Error => "error",
            Self::Unknown => "unknown",
        }
    }
}

/// The frame envelope.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct Frame {
    #[serde(rename = "type")]
    pub kind: MessageType,
    #[serde(default)]
    pub data: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
}

impl Frame {
    pub fn new(kind: MessageType, data: impl Serialize) -> Self {
        let data = serde_json::to_value(data).unwrap_or_else(|err| {
            log::error!("failed to serialize {kind:?} payload: {err}");
            Value::Null
        });
        Self {
            kind,
            data,
            session_id: None,
        }
    }

    pub fn parse(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    /// Decode the data payload into a typed struct.
    pub fn decode<T: serde::de::DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_value(self.data.clone())
    }

    pub fn to_text(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|err| {
            log::error!("failed to serialize frame: {err}");
            String::from("{\"type\":\"error\",\"data\":{\"message\":\"internal error\"}}")
        })
    }

    /// Shorthand for an `error` frame.
    pub fn error(message: impl Into<String>) -> Self {
        Self::new(
            MessageType::Error,
            ErrorPayload {
                message: message.into(),
            },
        )
    }
}

// ===== inbound payloads (client → server) =====

#[derive(Debug, Deserialize, Serialize)]
pub struct UserJoinRequest {
    pub username: String,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct GameStartRequest {
    pub user_id: UserId,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct GameRestartRequest {
    pub user_id: UserId,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct KickUserRequest {
    pub host_id: UserId,
    pub target_username: String,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct CallHandRequest {
    pub user_id: UserId,
    pub hand_spec: String,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct CallBluffRequest {
    pub user_id: UserId,
}

// ===== outbound payloads (server → client) =====

#[derive(Debug, Serialize)]
pub struct UserJoinResponse {
    pub success: bool,
    pub user_id: UserId,
    pub username: String,
    pub is_host: bool,
    pub message: String,
    pub leaderboard: Vec<LeaderboardEntry>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct UsernameErrorPayload {
    pub message: String,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct WaitingForGamePayload {
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct GameStateUpdatePayload {
    pub game_state: PublicGameState,
    pub online_users: Vec<String>,
    /// Present only on the spectator projection: every active hand.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_round_cards: Option<Vec<PlayerCards>>,
}

#[derive(Debug, Serialize)]
pub struct PlayerUpdatePayload {
    pub your_cards: Vec<Card>,
}

/// `player_update` variant sent privately to the host: who is queued for
/// the next game.
#[derive(Debug, Serialize)]
pub struct WaitingListPayload {
    pub waiting_list: Vec<String>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct RoundStartPayload {
    pub round_number: u32,
}

#[derive(Debug, Serialize)]
pub struct CallBluffPayload {
    pub message: String,
    pub loser_id: Option<UserId>,
    pub loser: Option<String>,
    pub previous_round_cards: Vec<PlayerCards>,
}

/// `show_cards` carries no data; it precedes the reveal.
#[derive(Debug, Deserialize, Serialize)]
pub struct ShowCardsPayload {}

#[derive(Debug, Deserialize, Serialize)]
pub struct HostChangedPayload {
    pub new_host: String,
    pub host_id: UserId,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct UserLeavePayload {
    pub username: String,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct UserKickedPayload {
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct GameEndPayload {
    pub winner_id: Option<UserId>,
    pub winner: Option<String>,
    pub message: String,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct ErrorPayload {
    pub message: String,
}
