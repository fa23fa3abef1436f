//! Registry manager implementation.

use chrono::Utc;
use sqlx::{Row, SqlitePool};
use std::collections::{HashMap, HashSet};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{
    errors::{RegistryError, RegistryResult},
    models::{LeaderboardEntry, UserId, UserRecord},
};

const CREATE_USERS_TABLE: &str = "
    CREATE TABLE IF NOT EXISTS users (
        id TEXT PRIMARY KEY,
        username TEXT UNIQUE NOT NULL,
        wins INTEGER NOT NULL DEFAULT 0,
        games_played INTEGER NOT NULL DEFAULT 0,
        first_seen TEXT NOT NULL,
        last_seen TEXT NOT NULL,
        is_online INTEGER NOT NULL DEFAULT 0
    )";

/// Online-session bookkeeping. Claims and releases go through the write
/// lock, so registry writes are serialized while reads stay concurrent.
#[derive(Default)]
struct OnlineUsers {
    by_id: HashMap<UserId, String>,
    names: HashSet<String>,
}

/// Durable username registry with online/offline state and leaderboard
/// counters. Shared across rooms.
pub struct RegistryManager {
    pool: SqlitePool,
    online: RwLock<OnlineUsers>,
    max_username_len: usize,
}

impl RegistryManager {
    pub fn new(pool: SqlitePool, max_username_len: usize) -> Self {
        Self {
            pool,
            online: RwLock::new(OnlineUsers::default()),
            max_username_len,
        }
    }

    /// Create the users table if needed and reset every online flag.
    /// Called once at startup; a crashed server must not leave ghosts online.
    pub async fn initialize(&self) -> RegistryResult<()> {
        sqlx::query(CREATE_USERS_TABLE).execute(&self.pool).await?;
        sqlx::query("UPDATE users SET is_online = 0")
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    fn validate_username(&self, username: &str) -> RegistryResult<()> {
        let len = username.chars().count();
        if len < 2 || len > self.max_username_len {
            return Err(RegistryError::InvalidUsername);
        }
        if !username
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        {
            return Err(RegistryError::InvalidUsername);
        }
        Ok(())
    }

    /// Claim a username for this session.
    ///
    /// Fails with [`RegistryError::InvalidUsername`] on malformed names and
    /// [`RegistryError::UsernameTaken`] when the name is already online. An
    /// offline persistent record is reused, preserving its counters.
    pub async fn claim(&self, username: &str) -> RegistryResult<UserRecord> {
        self.validate_username(username)?;

        let mut online = self.online.write().await;
        if online.names.contains(username) {
            return Err(RegistryError::UsernameTaken);
        }

        let now = Utc::now();
        let existing = sqlx::query(
            "SELECT id, first_seen, wins, games_played FROM users WHERE username = ?1",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;

        let record = match existing {
            Some(row) => {
                let id_text: String = row.get("id");
                let id = Uuid::parse_str(&id_text)
                    .map_err(|_| RegistryError::CorruptRecord(username.to_string()))?;
                let go_online = || {
                    sqlx::query("UPDATE users SET is_online = 1, last_seen = ?1 WHERE id = ?2")
                        .bind(now)
                        .bind(&id_text)
                        .execute(&self.pool)
                };
                if let Err(err) = go_online().await {
                    log::warn!("registry write failed, retrying once: {err}");
                    go_online().await?;
                }
                UserRecord {
                    id,
                    username: username.to_string(),
                    first_seen: row.get("first_seen"),
                    last_seen: now,
                    wins: row.get("wins"),
                    games_played: row.get("games_played"),
                }
            }
            None => {
                let id = Uuid::new_v4();
                let id_text = id.to_string();
                let insert = || {
                    sqlx::query(
                        "INSERT INTO users (id, username, wins, games_played, first_seen, last_seen, is_online)
                         VALUES (?1, ?2, 0, 0, ?3, ?3, 1)",
                    )
                    .bind(&id_text)
                    .bind(username)
                    .bind(now)
                    .execute(&self.pool)
                };
                if let Err(err) = insert().await {
                    log::warn!("registry write failed, retrying once: {err}");
                    insert().await?;
                }
                UserRecord {
                    id,
                    username: username.to_string(),
                    first_seen: now,
                    last_seen: now,
                    wins: 0,
                    games_played: 0,
                }
            }
        };

        online.names.insert(username.to_string());
        online.by_id.insert(record.id, username.to_string());
        log::info!("{username} claimed ({})", record.id);
        Ok(record)
    }

    /// Mark the user offline. Persistent counters are preserved. Idempotent:
    /// releasing an unknown or already-offline id is a no-op.
    pub async fn release(&self, user_id: UserId) -> RegistryResult<Option<String>> {
        let mut online = self.online.write().await;
        let Some(username) = online.by_id.remove(&user_id) else {
            return Ok(None);
        };
        online.names.remove(&username);

        let now = Utc::now();
        let id_text = user_id.to_string();
        let go_offline = || {
            sqlx::query("UPDATE users SET is_online = 0, last_seen = ?1 WHERE id = ?2")
                .bind(now)
                .bind(&id_text)
                .execute(&self.pool)
        };
        if let Err(err) = go_offline().await {
            log::warn!("registry write failed, retrying once: {err}");
            go_offline().await?;
        }
        log::info!("{username} released");
        Ok(Some(username))
    }

    /// Release every online user at once. Used during server shutdown,
    /// after the rooms have drained; individual disconnect paths may have
    /// released most names already, so this is a final sweep. Returns how
    /// many users were still online.
    pub async fn release_all(&self) -> RegistryResult<usize> {
        let mut online = self.online.write().await;
        let count = online.by_id.len();
        online.by_id.clear();
        online.names.clear();
        if count == 0 {
            return Ok(0);
        }

        let now = Utc::now();
        let all_offline = || {
            sqlx::query("UPDATE users SET is_online = 0, last_seen = ?1 WHERE is_online = 1")
                .bind(now)
                .execute(&self.pool)
        };
        if let Err(err) = all_offline().await {
            log::warn!("registry write failed, retrying once: {err}");
            all_offline().await?;
        }
        log::info!("released {count} online user(s)");
        Ok(count)
    }

    /// Increment the winner's win counter. Called by a room on game end.
    pub async fn record_win(&self, user_id: UserId) -> RegistryResult<()> {
        self.bump_counter("wins", user_id).await
    }

    /// Increment a participant's games-played counter.
    pub async fn record_game(&self, user_id: UserId) -> RegistryResult<()> {
        self.bump_counter("games_played", user_id).await
    }

    async fn bump_counter(&self, column: &'static str, user_id: UserId) -> RegistryResult<()> {
        let id_text = user_id.to_string();
        let sql = format!("UPDATE users SET {column} = {column} + 1 WHERE id = ?1");
        let bump = || sqlx::query(&sql).bind(&id_text).execute(&self.pool);
        if let Err(err) = bump().await {
            log::warn!("registry write failed, retrying once: {err}");
            bump().await?;
        }
        Ok(())
    }

    /// Leaderboard snapshot: wins descending, then fewest games played, then
    /// username. Users who never finished a game are omitted.
    pub async fn leaderboard(&self, limit: u32) -> RegistryResult<Vec<LeaderboardEntry>> {
        let rows = sqlx::query(
            "SELECT username, wins, games_played FROM users WHERE games_played <> 0
             ORDER BY wins DESC, games_played ASC, username ASC LIMIT ?1",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows
            .into_iter()
            .map(|row| LeaderboardEntry {
                username: row.get("username"),
                wins: row.get("wins"),
                games_played: row.get("games_played"),
            })
            .collect())
    }

    /// Usernames currently online, sorted for stable output.
    pub async fn online_usernames(&self) -> Vec<String> {
        let online = self.online.read().await;
        let mut names: Vec<String> = online.names.iter().cloned().collect();
        names.sort();
        names
    }
}
