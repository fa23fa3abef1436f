//! Room actor command types.

use tokio::sync::{mpsc, oneshot};

use crate::net::Frame;
use crate::registry::UserId;

/// Events pushed to a connection's writer task.
#[derive(Clone, Debug)]
pub enum OutboundEvent {
    Frame(Frame),
    /// Ask the gateway to close the socket (kick).
    Close,
}

/// Per-connection outbound sender, registered with the room at join time.
pub type ConnectionSender = mpsc::UnboundedSender<OutboundEvent>;

/// Commands a gateway can enqueue on a room.
///
/// Gameplay commands carry no reply channel: the actor answers over the
/// sender's registered connection (success as broadcasts, failure as a
/// private `error` frame).
#[derive(Debug)]
pub enum RoomMessage {
    /// Register a connection and seat or waitlist the user.
    Join {
        user_id: UserId,
        username: String,
        conn: ConnectionSender,
        response: oneshot::Sender<JoinReply>,
    },

    /// Remove the user (disconnect or explicit leave). The reply reports
    /// whether the room is now empty and can be dropped.
    Leave {
        user_id: UserId,
        response: Option<oneshot::Sender<bool>>,
    },

    /// Host starts the game.
    StartGame { user_id: UserId },

    /// Host restarts: fresh waiting state, waitlist promoted.
    RestartGame { user_id: UserId },

    /// Host kicks a user by username.
    KickUser {
        user_id: UserId,
        target_username: String,
    },

    /// Declare a hand at the turn cursor.
    CallHand { user_id: UserId, hand_spec: String },

    /// Accuse the previous caller of bluffing.
    CallBluff { user_id: UserId },

    /// Server shutdown: flush a final `error` frame and a close to every
    /// connection, then stop the actor. Queued commands ahead of this
    /// message are still processed first. The reply fires once the room
    /// has drained.
    Shutdown { response: oneshot::Sender<()> },
}

#[derive(Debug)]
pub struct JoinReply {
    /// False means the user went to the waiting list.
    pub seated: bool,
}
