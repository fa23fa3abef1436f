//! Server-side surface of the bluff-poker game: configuration, logging,
//! metrics, and the WebSocket gateway. The binary in `main.rs` wires these
//! together; integration tests drive the router directly.

pub mod api;
pub mod config;
pub mod logging;
pub mod metrics;
