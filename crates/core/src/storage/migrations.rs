//! SQLite schema migrations
//!
//! Tracks schema versions and applies migrations in order.

use rusqlite::Connection;
use tracing::{info, instrument};

use crate::error::StoreResult;

/// A database migration
pub struct Migration {
    /// Version number (must be sequential starting from 1)
    pub version: u32,
    /// Description of what this migration does
    pub description: &'static str,
    /// SQL to run for this migration
    pub sql: &'static str,
}

/// All migrations in order
const MIGRATIONS: &[Migration] = &[Migration {
    version: 1,
    description: "Key-value record table",
    sql: r#"
            CREATE TABLE IF NOT EXISTS kv_records (
                namespace TEXT NOT NULL,
                key TEXT NOT NULL,
                value TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                PRIMARY KEY (namespace, key)
            );
        "#,
}];

/// Initialize the migrations table
fn init_migrations_table(conn: &Connection) -> StoreResult<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version INTEGER PRIMARY KEY,
            description TEXT NOT NULL,
            applied_at TEXT NOT NULL
        )",
        [],
    )?;
    Ok(())
}

/// Get the current schema version
pub(crate) fn current_version(conn: &Connection) -> StoreResult<u32> {
    let version: Option<u32> =
        conn.query_row("SELECT MAX(version) FROM schema_migrations", [], |row| {
            row.get(0)
        })?;
    Ok(version.unwrap_or(0))
}

/// Run all pending migrations, each in its own transaction
#[instrument(skip(conn))]
pub fn run_migrations(conn: &mut Connection) -> StoreResult<()> {
    init_migrations_table(conn)?;

    let from = current_version(conn)?;

    for migration in MIGRATIONS.iter().filter(|m| m.version > from) {
        info!(
            version = migration.version,
            description = migration.description,
            "Applying migration"
        );

        let tx = conn.transaction()?;
        tx.execute_batch(migration.sql)?;
        tx.execute(
            "INSERT INTO schema_migrations (version, description, applied_at) VALUES (?1, ?2, ?3)",
            rusqlite::params![
                migration.version,
                migration.description,
                chrono::Utc::now().to_rfc3339()
            ],
        )?;
        tx.commit()?;
    }

    let to = current_version(conn)?;
    if to > from {
        info!(from, to, "Store schema updated");
    }

    Ok(())
}
