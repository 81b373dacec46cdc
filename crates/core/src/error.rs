//! Error types for OffChat Core

use std::io;

use thiserror::Error;

use crate::config::ConfigError;
use crate::models::{ModerationAction, UserStatus};

/// Outcome of every account, session and moderation operation
#[derive(Error, Debug)]
pub enum Error {
    #[error("Username already exists.")]
    DuplicateUsername(String),

    #[error("User does not exist.")]
    UserNotFound(String),

    #[error("Your account is not approved yet.")]
    AccountPending,

    #[error("Your account was banned by admin.")]
    AccountBanned,

    #[error("Your account is suspended.")]
    AccountSuspended,

    #[error("Incorrect password.")]
    IncorrectPassword,

    #[error("Cannot {action} user '{id}' while {from}")]
    InvalidTransition {
        id: String,
        from: UserStatus,
        action: ModerationAction,
    },

    #[error("Persistence failure: {0}")]
    PersistenceFailure(#[from] StoreError),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Credential error: {0}")]
    Credential(String),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// Discriminant of [`Error`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    DuplicateUsername,
    UserNotFound,
    AccountPending,
    AccountBanned,
    AccountSuspended,
    IncorrectPassword,
    InvalidTransition,
    PersistenceFailure,
    InvalidInput,
    Credential,
    Config,
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::DuplicateUsername(_) => ErrorKind::DuplicateUsername,
            Error::UserNotFound(_) => ErrorKind::UserNotFound,
            Error::AccountPending => ErrorKind::AccountPending,
            Error::AccountBanned => ErrorKind::AccountBanned,
            Error::AccountSuspended => ErrorKind::AccountSuspended,
            Error::IncorrectPassword => ErrorKind::IncorrectPassword,
            Error::InvalidTransition { .. } => ErrorKind::InvalidTransition,
            Error::PersistenceFailure(_) => ErrorKind::PersistenceFailure,
            Error::InvalidInput(_) => ErrorKind::InvalidInput,
            Error::Credential(_) => ErrorKind::Credential,
            Error::Config(_) => ErrorKind::Config,
        }
    }

    /// Whether the failure aborts the operation rather than being a user-facing outcome
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Error::PersistenceFailure(_) | Error::Credential(_) | Error::Config(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// Durable store errors
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Store is read-only")]
    ReadOnly,

    #[error("Corrupt record: {0}")]
    Corrupt(String),
}

impl StoreError {
    /// Whether retrying the same write may succeed
    pub fn is_transient(&self) -> bool {
        match self {
            StoreError::Database(rusqlite::Error::SqliteFailure(e, _)) => matches!(
                e.code,
                rusqlite::ErrorCode::DatabaseBusy | rusqlite::ErrorCode::DatabaseLocked
            ),
            StoreError::Io(e) => matches!(
                e.kind(),
                io::ErrorKind::Interrupted | io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut
            ),
            _ => false,
        }
    }
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;
