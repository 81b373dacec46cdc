//! Durable storage for OffChat
//!
//! Two records live under the `offchat` namespace: the full user collection
//! and the current session. Backends only move raw JSON strings by key; the
//! [`DurableStore`] port on top of them is shared through a blanket impl.

mod file;
mod memory;
mod migrations;
mod parse;
mod retry;
mod sqlite;

use std::sync::Arc;

use tracing::instrument;

use crate::config::{Config, StorageBackend};
use crate::error::{Result, StoreResult};
use crate::models::{Session, User};

pub use file::FileStore;
pub use memory::MemoryStore;
pub use retry::{RetryPolicy, Retrying};
pub use sqlite::SqliteStore;

/// Namespace shared by all records
pub const NAMESPACE: &str = "offchat";

/// Key of the user collection record
pub const USERS_KEY: &str = "offchat-users";

/// Key of the current session record
pub const SESSION_KEY: &str = "offchat-current-user";

/// Everything the store holds
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    /// `None` when the users record has never been written
    pub users: Option<Vec<User>>,
    pub current_session: Option<Session>,
}

/// Raw key-value backend
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> StoreResult<Option<String>>;

    fn put(&self, key: &str, value: &str) -> StoreResult<()>;

    /// Removing an absent key is not an error
    fn remove(&self, key: &str) -> StoreResult<()>;
}

/// Persistence port used by the repository and session manager
pub trait DurableStore: Send + Sync {
    /// Read both records
    fn load(&self) -> StoreResult<Snapshot>;

    /// Replace the user collection record
    fn save_users(&self, users: &[User]) -> StoreResult<()>;

    /// Replace the session record; `None` removes it
    fn save_session(&self, session: Option<&Session>) -> StoreResult<()>;

    /// Write a whole snapshot
    fn save(&self, snapshot: &Snapshot) -> StoreResult<()> {
        if let Some(users) = &snapshot.users {
            self.save_users(users)?;
        }
        self.save_session(snapshot.current_session.as_ref())
    }
}

// Blanket implementation: any key-value backend is a durable store
impl<T: KeyValueStore> DurableStore for T {
    #[instrument(skip(self))]
    fn load(&self) -> StoreResult<Snapshot> {
        let users = self
            .get(USERS_KEY)?
            .map(|raw| parse::parse_record::<Vec<User>>(USERS_KEY, &raw))
            .transpose()?;
        let current_session = self
            .get(SESSION_KEY)?
            .map(|raw| parse::parse_record::<Session>(SESSION_KEY, &raw))
            .transpose()?;

        tracing::debug!(
            users = users.as_ref().map(Vec::len),
            has_session = current_session.is_some(),
            "Loaded snapshot"
        );

        Ok(Snapshot {
            users,
            current_session,
        })
    }

    #[instrument(skip(self, users), fields(count = users.len()))]
    fn save_users(&self, users: &[User]) -> StoreResult<()> {
        let raw = serde_json::to_string(users)?;
        self.put(USERS_KEY, &raw)
    }

    #[instrument(skip(self, session), fields(user_id = session.map(|s| s.id.as_str())))]
    fn save_session(&self, session: Option<&Session>) -> StoreResult<()> {
        match session {
            Some(session) => {
                let raw = serde_json::to_string(session)?;
                self.put(SESSION_KEY, &raw)
            }
            None => self.remove(SESSION_KEY),
        }
    }
}

/// Open the backend named by the configuration, wrapped in its retry policy
pub fn open_store(config: &Config) -> Result<Arc<dyn DurableStore>> {
    let policy = RetryPolicy::from(&config.storage.retry);

    let store: Arc<dyn DurableStore> = match config.storage.backend {
        StorageBackend::Sqlite => {
            let path = config.storage_path()?;
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent).map_err(crate::error::StoreError::from)?;
            }
            Arc::new(Retrying::new(SqliteStore::open(&path)?, policy))
        }
        StorageBackend::File => {
            let path = config.storage_path()?;
            Arc::new(Retrying::new(FileStore::open(path)?, policy))
        }
        StorageBackend::Memory => Arc::new(Retrying::new(MemoryStore::new(), policy)),
    };

    Ok(store)
}
