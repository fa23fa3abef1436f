//! Rooms: the actor wrapper around [`crate::game::GameState`] plus the
//! manager that demultiplexes sessions to rooms.
//!
//! All state transitions for a given room are serialized through its actor's
//! inbox; broadcasts for a room are therefore totally ordered. The gateway
//! never mutates room state directly, it only enqueues commands.

mod actor;
mod manager;
mod messages;

pub use actor::{RoomActor, RoomConfig, RoomHandle};
pub use manager::{RoomManager, DEFAULT_ROOM_ID};
pub use messages::{ConnectionSender, JoinReply, OutboundEvent, RoomMessage};
