//! SQLite storage bootstrap, schema migrations and transaction scoping.
//!
//! # Responsibility
//! - Open and configure SQLite connections for the tracking core.
//! - Apply schema migrations in deterministic order.
//! - Own the shared connection and hand out atomic transaction scopes.
//!
//! # Invariants
//! - Migration version is tracked via `PRAGMA user_version`.
//! - Core code must not read/write application data before migrations succeed.
//! - Writes only become visible when a whole transaction block succeeds.

pub mod migrations;
mod open;
mod store;

pub use open::{open_db, open_db_in_memory};
pub use store::Store;

pub type DbResult<T> = Result<T, DbError>;

#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("{0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error(
        "database schema version {db_version} is newer than supported {latest_supported}"
    )]
    UnsupportedSchemaVersion {
        db_version: u32,
        latest_supported: u32,
    },
    /// A writer panicked while holding the connection.
    #[error("database connection is poisoned by an earlier panic")]
    ConnectionPoisoned,
}
