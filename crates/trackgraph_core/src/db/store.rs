//! Entity store handle with explicit transaction scoping.
//!
//! # Responsibility
//! - Own the single migrated SQLite connection shared by readers and writers.
//! - Provide `run_in_transaction` as the only multi-statement write primitive.
//!
//! # Invariants
//! - A transaction commits only when its whole block returns `Ok`.
//! - Any `Err`, early return or unwind rolls the transaction back on drop.
//! - Operations on the connection are serialized by the store mutex.
//! - Post-commit hooks run before the next transaction can begin.

use super::{open_db, open_db_in_memory, DbError, DbResult};
use rusqlite::{Connection, Transaction, TransactionBehavior};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

/// Shared SQLite entity store.
pub struct Store {
    conn: Mutex<Connection>,
}

impl Store {
    /// Opens a file-backed store, applying migrations.
    pub fn open(path: impl AsRef<Path>) -> DbResult<Self> {
        Ok(Self::from_connection(open_db(path)?))
    }

    /// Opens an empty in-memory store, applying migrations.
    pub fn open_in_memory() -> DbResult<Self> {
        Ok(Self::from_connection(open_db_in_memory()?))
    }

    /// Wraps an already migrated connection.
    pub fn from_connection(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
        }
    }

    /// Runs a read-only block against the connection.
    pub fn read<T, E>(&self, block: impl FnOnce(&Connection) -> Result<T, E>) -> Result<T, E>
    where
        E: From<DbError>,
    {
        let conn = self.lock()?;
        block(&conn)
    }

    /// Runs `block` inside one IMMEDIATE transaction.
    ///
    /// The transaction is committed when `block` returns `Ok`; otherwise it is
    /// dropped, which rolls every statement back.
    pub fn run_in_transaction<T, E>(
        &self,
        block: impl FnOnce(&Transaction<'_>) -> Result<T, E>,
    ) -> Result<T, E>
    where
        E: From<DbError>,
    {
        self.run_in_transaction_then(block, |_| {})
    }

    /// Like [`Store::run_in_transaction`], then runs `after_commit` on the
    /// committed value before the connection is released.
    ///
    /// No other transaction can commit between this commit and the end of
    /// `after_commit`.
    pub fn run_in_transaction_then<T, E>(
        &self,
        block: impl FnOnce(&Transaction<'_>) -> Result<T, E>,
        after_commit: impl FnOnce(&T),
    ) -> Result<T, E>
    where
        E: From<DbError>,
    {
        let conn = self.lock()?;
        let tx = Transaction::new_unchecked(&conn, TransactionBehavior::Immediate)
            .map_err(DbError::from)?;
        let value = block(&tx)?;
        tx.commit().map_err(DbError::from)?;
        after_commit(&value);
        Ok(value)
    }

    fn lock(&self) -> DbResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| DbError::ConnectionPoisoned)
    }
}

#[cfg(test)]
mod tests {
    use super::Store;
    use crate::db::DbError;

    fn count_groups(store: &Store) -> i64 {
        store
            .read(|conn| {
                conn.query_row("SELECT COUNT(*) FROM groups;", [], |row| row.get(0))
                    .map_err(DbError::from)
            })
            .unwrap()
    }

    #[test]
    fn committed_block_is_visible() {
        let store = Store::open_in_memory().unwrap();
        store
            .run_in_transaction(|tx| {
                tx.execute(
                    "INSERT INTO groups (name, parent_group_id) VALUES ('a', 0);",
                    [],
                )
                .map_err(DbError::from)
            })
            .unwrap();
        assert_eq!(count_groups(&store), 2);
    }

    #[test]
    fn after_commit_sees_committed_state_only_on_success() {
        let store = Store::open_in_memory().unwrap();
        let mut seen = None;
        let inserted = store
            .run_in_transaction_then(
                |tx| {
                    tx.execute(
                        "INSERT INTO groups (name, parent_group_id) VALUES ('a', 0);",
                        [],
                    )
                    .map_err(DbError::from)
                },
                |rows| seen = Some(*rows),
            )
            .unwrap();
        assert_eq!(inserted, 1);
        assert_eq!(seen, Some(1));

        let mut called = false;
        let result: Result<(), DbError> = store.run_in_transaction_then(
            |tx| {
                tx.execute("INSERT INTO missing_table VALUES (1);", [])?;
                Ok(())
            },
            |_| called = true,
        );
        assert!(result.is_err());
        assert!(!called);
    }

    #[test]
    fn failed_block_rolls_back() {
        let store = Store::open_in_memory().unwrap();
        let result: Result<(), DbError> = store.run_in_transaction(|tx| {
            tx.execute(
                "INSERT INTO groups (name, parent_group_id) VALUES ('a', 0);",
                [],
            )?;
            tx.execute("INSERT INTO missing_table VALUES (1);", [])?;
            Ok(())
        });
        assert!(result.is_err());
        assert_eq!(count_groups(&store), 1);
    }
}
