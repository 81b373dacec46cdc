//! OffChat Core Library
//!
//! Account lifecycle and session authentication for the OffChat admin
//! console: signup and login, admin moderation of account status, and a
//! single current session, all written through to a durable store.

pub mod auth;
pub mod config;
pub mod console;
pub mod credentials;
pub mod error;
pub mod invariants;
pub mod models;
pub mod moderation;
pub mod repository;
mod seed;
pub mod session;
pub mod storage;

pub use auth::AuthService;
pub use config::{Config, ConfigError, CredentialScheme, StorageBackend};
pub use console::Console;
pub use credentials::{Argon2Credentials, CredentialVerifier, PlainCredentials};
pub use error::{Error, ErrorKind, Result, StoreError};
pub use models::*;
pub use moderation::{Deletion, ForceLogout, Moderation};
pub use repository::UserRepository;
pub use session::SessionManager;
pub use storage::{
    DurableStore, FileStore, KeyValueStore, MemoryStore, RetryPolicy, Retrying, Snapshot,
    SqliteStore,
};
