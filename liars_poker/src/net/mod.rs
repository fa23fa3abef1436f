//! Wire protocol for the session gateway.

pub mod messages;

pub use messages::{Frame, MessageType};
