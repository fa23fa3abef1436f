//! Persistent username registry with online/offline state and the
//! wins/games-played leaderboard.
//!
//! Usernames are unique and case-sensitive. A username may be online in at
//! most one session; offline records are reused on re-claim so counters
//! survive across sessions and server restarts.

mod errors;
mod manager;
mod models;

pub use errors::{RegistryError, RegistryResult};
pub use manager::RegistryManager;
pub use models::{LeaderboardEntry, UserId, UserRecord};
