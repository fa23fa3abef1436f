//! Database configuration.

/// SQLite connection settings for the durable user registry.
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// Path to the database file. `:memory:` yields a private in-memory
    /// database, useful for tests.
    pub path: String,
    /// Maximum connections in the pool.
    pub max_connections: u32,
    /// Seconds to wait when acquiring a connection.
    pub connection_timeout_secs: u64,
}

impl DatabaseConfig {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            ..Self::default()
        }
    }

    /// Configuration for a private in-memory database.
    pub fn in_memory() -> Self {
        Self {
            path: ":memory:".to_string(),
            // A second connection would see a different empty database.
            max_connections: 1,
            connection_timeout_secs: 5,
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: "liars_poker.db".to_string(),
            max_connections: 5,
            connection_timeout_secs: 5,
        }
    }
}
