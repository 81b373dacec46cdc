//! SQLite backend
//!
//! Records live in the `kv_records` table keyed by (namespace, key).

use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::Utc;
use rusqlite::{params, Connection};
use tracing::instrument;

use super::migrations;
use super::parse::OptionalExt;
use super::{KeyValueStore, NAMESPACE};
use crate::error::StoreResult;

/// SQLite-backed record store
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open or create a database at the given path
    #[instrument(skip(path), fields(path = %path.as_ref().display()))]
    pub fn open<P: AsRef<Path>>(path: P) -> StoreResult<Self> {
        let conn = Connection::open(path)?;
        conn.busy_timeout(std::time::Duration::from_millis(250))?;
        Self::init(conn)
    }

    /// Open an in-memory database (for testing)
    #[instrument]
    pub fn open_in_memory() -> StoreResult<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(mut conn: Connection) -> StoreResult<Self> {
        migrations::run_migrations(&mut conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Get current schema version
    pub fn schema_version(&self) -> u32 {
        migrations::current_version(&self.conn()).unwrap_or(0)
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl KeyValueStore for SqliteStore {
    fn get(&self, key: &str) -> StoreResult<Option<String>> {
        let conn = self.conn();
        let value = conn
            .query_row(
                "SELECT value FROM kv_records WHERE namespace = ?1 AND key = ?2",
                params![NAMESPACE, key],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(value)
    }

    #[instrument(skip(self, value), fields(bytes = value.len()))]
    fn put(&self, key: &str, value: &str) -> StoreResult<()> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;
        tx.execute(
            "INSERT INTO kv_records (namespace, key, value, updated_at) VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(namespace, key) DO UPDATE SET value = ?3, updated_at = ?4",
            params![NAMESPACE, key, value, Utc::now().to_rfc3339()],
        )?;
        tx.commit()?;
        Ok(())
    }

    #[instrument(skip(self))]
    fn remove(&self, key: &str) -> StoreResult<()> {
        self.conn().execute(
            "DELETE FROM kv_records WHERE namespace = ?1 AND key = ?2",
            params![NAMESPACE, key],
        )?;
        Ok(())
    }
}
