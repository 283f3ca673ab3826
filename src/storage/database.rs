// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Embedded database backed by redb (pure Rust, ACID).
//!
//! ## Table Layout
//!
//! - `users`: user_id → serialized User
//! - `users_by_subject`: external subject id → user_id (uniqueness index)
//! - `stored_files`: file_id → serialized StoredFile
//! - `owner_files`: composite key (owner_id|seq_be|file_id) → file_id
//! - `counters`: name → u64 (insertion sequence)
//!
//! redb allows a single write transaction at a time, so any check-then-insert
//! performed inside one write transaction is atomic with respect to every
//! other writer.

use std::path::Path;
use std::sync::Arc;

use redb::{Database, ReadableDatabase, TableDefinition};

use super::repository::{FileRepository, UserRepository};

// =============================================================================
// Table Definitions
// =============================================================================

/// Primary user table: user_id → serialized User (JSON bytes).
pub(crate) const USERS: TableDefinition<&str, &[u8]> = TableDefinition::new("users");

/// Unique index: external subject id → user_id.
pub(crate) const USERS_BY_SUBJECT: TableDefinition<&str, &str> =
    TableDefinition::new("users_by_subject");

/// Primary file table: file_id → serialized StoredFile (JSON bytes).
pub(crate) const STORED_FILES: TableDefinition<&str, &[u8]> = TableDefinition::new("stored_files");

/// Index: `owner_id|seq_be|file_id` → file_id, scanned in insertion order.
pub(crate) const OWNER_FILES: TableDefinition<&[u8], &str> = TableDefinition::new("owner_files");

/// Monotonic counters: name → value.
pub(crate) const COUNTERS: TableDefinition<&str, u64> = TableDefinition::new("counters");

// =============================================================================
// Error Type
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("redb error: {0}")]
    Redb(#[from] redb::Error),

    #[error("redb database error: {0}")]
    RedbDatabase(#[from] redb::DatabaseError),

    #[error("redb transaction error: {0}")]
    RedbTransaction(#[from] redb::TransactionError),

    #[error("redb table error: {0}")]
    RedbTable(#[from] redb::TableError),

    #[error("redb storage error: {0}")]
    RedbStorage(#[from] redb::StorageError),

    #[error("redb commit error: {0}")]
    RedbCommit(#[from] redb::CommitError),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("storage task failed: {0}")]
    Task(String),

    /// A uniqueness constraint rejected the write.
    #[error("already exists: {0}")]
    Conflict(String),

    /// The owning user referenced by a new record does not exist.
    #[error("unknown owner: {0}")]
    UnknownOwner(String),
}

impl StorageError {
    /// Whether the failure comes from the persistence layer itself and the
    /// request may succeed if retried.
    pub fn is_unavailable(&self) -> bool {
        !matches!(self, StorageError::Conflict(_) | StorageError::UnknownOwner(_))
    }
}

pub type StorageResult<T> = Result<T, StorageError>;

// =============================================================================
// Store
// =============================================================================

/// Handle to the persistence store.
///
/// Constructed once at process start with [`Store::connect`] and shared with
/// request handlers through `AppState`. Cloning is cheap.
#[derive(Clone)]
pub struct Store {
    db: Arc<Database>,
}

impl Store {
    /// Open (or create) the database at the given path.
    pub fn connect(path: &Path) -> StorageResult<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let db = Database::create(path)?;

        // Pre-create all tables so later read transactions don't fail
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(USERS)?;
            let _ = write_txn.open_table(USERS_BY_SUBJECT)?;
            let _ = write_txn.open_table(STORED_FILES)?;
            let _ = write_txn.open_table(OWNER_FILES)?;
            let _ = write_txn.open_table(COUNTERS)?;
        }
        write_txn.commit()?;

        tracing::info!(path = %path.display(), "Database connected");
        Ok(Self { db: Arc::new(db) })
    }

    /// Release the database.
    ///
    /// Every committed transaction is already durable; this only closes the
    /// file once the last handle is gone.
    pub fn disconnect(self) {
        match Arc::try_unwrap(self.db) {
            Ok(db) => {
                drop(db);
                tracing::info!("Database disconnected");
            }
            Err(_) => {
                tracing::warn!("Database still referenced at shutdown; closing on last drop");
            }
        }
    }

    /// Check that a read transaction can be opened.
    pub fn ping(&self) -> StorageResult<()> {
        let read_txn = self.db.begin_read()?;
        let _ = read_txn.open_table(USERS)?;
        Ok(())
    }

    pub fn users(&self) -> UserRepository<'_> {
        UserRepository::new(&self.db)
    }

    pub fn files(&self) -> FileRepository<'_> {
        FileRepository::new(&self.db)
    }

    /// Run a storage closure on the blocking thread pool.
    ///
    /// The closure runs to completion even if the awaiting request is
    /// dropped, so a write transaction always either commits or rolls back.
    pub async fn run<T, F>(&self, f: F) -> StorageResult<T>
    where
        F: FnOnce(&Store) -> StorageResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let store = self.clone();
        tokio::task::spawn_blocking(move || f(&store))
            .await
            .map_err(|e| StorageError::Task(e.to_string()))?
    }

    /// Overwrite a stored file row with arbitrary bytes.
    #[cfg(test)]
    pub(crate) fn put_raw_file(&self, file_id: &str, bytes: &[u8]) -> StorageResult<()> {
        let write_txn = self.db.begin_write()?;
        {
            let mut files = write_txn.open_table(STORED_FILES)?;
            files.insert(file_id, bytes)?;
        }
        write_txn.commit()?;
        Ok(())
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connect_creates_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("db.redb");
        let store = Store::connect(&path).unwrap();
        assert!(path.exists());
        store.ping().unwrap();
        store.disconnect();
    }

    #[test]
    fn reopen_keeps_data() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("db.redb");

        let store = Store::connect(&path).unwrap();
        let user = store.users().resolve("auth0|1", "a@example.com", None).unwrap();
        store.disconnect();

        let store = Store::connect(&path).unwrap();
        let found = store.users().find_by_subject("auth0|1").unwrap().unwrap();
        assert_eq!(found.id, user.id);
    }

    #[tokio::test]
    async fn run_executes_on_blocking_pool() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::connect(&dir.path().join("db.redb")).unwrap();
        let user = store
            .run(|s| s.users().resolve("auth0|2", "b@example.com", Some("Bee")))
            .await
            .unwrap();
        assert_eq!(user.name, "Bee");
    }

    #[test]
    fn undecodable_row_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::connect(&dir.path().join("db.redb")).unwrap();
        store.put_raw_file("broken", b"{not json").unwrap();

        let err = store.files().get_owned("broken", "anyone").unwrap_err();
        assert!(matches!(err, StorageError::Serde(_)));
        assert!(err.is_unavailable());
    }

    #[test]
    fn conflict_is_not_unavailable() {
        assert!(!StorageError::Conflict("x".into()).is_unavailable());
        assert!(!StorageError::UnknownOwner("x".into()).is_unavailable());
        assert!(StorageError::Task("boom".into()).is_unavailable());
    }
}
