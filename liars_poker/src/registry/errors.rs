//! Registry error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("username must be 2-20 characters of letters, digits, `_`, or `-`")]
    InvalidUsername,
    #[error("this username exists and is online, choose another username")]
    UsernameTaken,
    #[error("corrupt user record for `{0}`")]
    CorruptRecord(String),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

pub type RegistryResult<T> = Result<T, RegistryError>;
