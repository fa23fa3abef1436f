//! Registry data models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable user identifier. Persisted with the user row and reissued to the
/// session that claims the username.
pub type UserId = Uuid;

/// A persistent user row plus its session-scoped online flag.
#[derive(Clone, Debug, Serialize)]
pub struct UserRecord {
    pub id: UserId,
    pub username: String,
    pub first_seen: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
    pub wins: i64,
    pub games_played: i64,
}

/// One leaderboard row. Ordered by wins descending, then games played
/// ascending, then username.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct LeaderboardEntry {
    pub username: String,
    pub wins: i64,
    pub games_played: i64,
}
