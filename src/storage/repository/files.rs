// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Stored CSV file repository.
//!
//! Every read, update and delete takes the owner's local user id and filters
//! on `(file_id, owner_id)`. A file that exists under another owner is
//! reported exactly like a file that does not exist.
//!
//! ## Index Layout
//!
//! `owner_files` keys are `owner_id | seq_be | file_id`, where `seq` comes
//! from a counter bumped in the same write transaction as the insert. A
//! forward range scan over an owner's prefix yields insertion order.

use chrono::{DateTime, Utc};
use redb::{Database, ReadableDatabase, ReadableTable};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::super::database::{COUNTERS, OWNER_FILES, STORED_FILES, USERS};
use super::super::{OwnedResource, StorageError, StorageResult};

const FILE_SEQUENCE: &str = "stored_file_seq";

/// Chart configuration attached to a stored file.
///
/// Used both for the initial configuration at upload time and for partial
/// updates: only `Some` fields are applied, `None` leaves the stored value
/// unchanged.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema, PartialEq)]
pub struct FileConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x_column: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y_column: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_rows: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x_range_min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x_range_max: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y_range_min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y_range_max: Option<f64>,
}

impl FileConfig {
    /// True when no field is supplied.
    pub fn is_empty(&self) -> bool {
        *self == FileConfig::default()
    }

    /// Overlay the supplied fields onto `target`.
    fn apply_to(&self, target: &mut FileConfig) {
        fn set<T: Clone>(slot: &mut Option<T>, value: &Option<T>) {
            if value.is_some() {
                slot.clone_from(value);
            }
        }

        set(&mut target.description, &self.description);
        set(&mut target.x_column, &self.x_column);
        set(&mut target.y_column, &self.y_column);
        set(&mut target.max_rows, &self.max_rows);
        set(&mut target.x_range_min, &self.x_range_min);
        set(&mut target.x_range_max, &self.x_range_max);
        set(&mut target.y_range_min, &self.y_range_min);
        set(&mut target.y_range_max, &self.y_range_max);
    }
}

/// One uploaded CSV file and its chart configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StoredFile {
    /// Unique file identifier (UUID)
    pub id: String,
    /// Local user id of the owner, fixed at creation
    pub owner_id: String,
    /// Collision-resistant internal name (`{uuid}_{original_name}`)
    pub storage_name: String,
    /// File name as submitted by the client
    pub original_name: String,
    /// Full text payload, stored opaquely
    pub content: String,
    pub size_bytes: u64,
    /// Header row fields, in order
    pub columns: Vec<String>,
    /// Data rows, header excluded
    pub total_rows: u64,
    #[serde(flatten)]
    pub config: FileConfig,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Insertion sequence, used for the owner index key
    pub sequence: u64,
}

impl OwnedResource for StoredFile {
    fn owner_id(&self) -> &str {
        &self.owner_id
    }
}

/// Fields supplied when creating a stored file.
#[derive(Debug, Clone)]
pub struct NewStoredFile {
    pub storage_name: String,
    pub original_name: String,
    pub content: String,
    pub size_bytes: u64,
    pub columns: Vec<String>,
    pub total_rows: u64,
    pub config: FileConfig,
}

/// Build the owner index key: `owner_id | seq_be | file_id`.
fn make_index_key(owner_id: &str, sequence: u64, file_id: &str) -> Vec<u8> {
    let mut key = Vec::with_capacity(owner_id.len() + 1 + 8 + 1 + file_id.len());
    key.extend_from_slice(owner_id.as_bytes());
    key.push(b'|');
    key.extend_from_slice(&sequence.to_be_bytes());
    key.push(b'|');
    key.extend_from_slice(file_id.as_bytes());
    key
}

/// Owner prefix range: `owner_id|` up to (excluding) `owner_id}`.
fn owner_range(owner_id: &str) -> (Vec<u8>, Vec<u8>) {
    let mut start = Vec::with_capacity(owner_id.len() + 1);
    start.extend_from_slice(owner_id.as_bytes());
    let mut end = start.clone();
    start.push(b'|');
    end.push(b'|' + 1);
    (start, end)
}

/// Repository for stored file operations.
pub struct FileRepository<'a> {
    db: &'a Database,
}

impl<'a> FileRepository<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Load a file by id without an ownership filter.
    fn get(&self, file_id: &str) -> StorageResult<Option<StoredFile>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(STORED_FILES)?;
        match table.get(file_id)? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    /// Insert a new file for `owner_id`.
    ///
    /// # Errors
    /// Returns `StorageError::UnknownOwner` if no user has that id.
    pub fn create(&self, owner_id: &str, new_file: NewStoredFile) -> StorageResult<StoredFile> {
        let now = Utc::now();
        let write_txn = self.db.begin_write()?;
        let file = {
            let users = write_txn.open_table(USERS)?;
            if users.get(owner_id)?.is_none() {
                return Err(StorageError::UnknownOwner(owner_id.to_string()));
            }

            let mut counters = write_txn.open_table(COUNTERS)?;
            let sequence = counters
                .get(FILE_SEQUENCE)?
                .map(|v| v.value())
                .unwrap_or(0)
                + 1;
            counters.insert(FILE_SEQUENCE, sequence)?;

            let file = StoredFile {
                id: uuid::Uuid::new_v4().to_string(),
                owner_id: owner_id.to_string(),
                storage_name: new_file.storage_name,
                original_name: new_file.original_name,
                content: new_file.content,
                size_bytes: new_file.size_bytes,
                columns: new_file.columns,
                total_rows: new_file.total_rows,
                config: new_file.config,
                created_at: now,
                updated_at: now,
                sequence,
            };
            let json = serde_json::to_vec(&file)?;

            let mut files = write_txn.open_table(STORED_FILES)?;
            if files.get(file.id.as_str())?.is_some() {
                return Err(StorageError::Conflict(format!("File {}", file.id)));
            }
            files.insert(file.id.as_str(), json.as_slice())?;

            let mut index = write_txn.open_table(OWNER_FILES)?;
            let key = make_index_key(owner_id, sequence, &file.id);
            index.insert(key.as_slice(), file.id.as_str())?;

            file
        };
        write_txn.commit()?;

        tracing::info!(
            file_id = %file.id,
            owner_id = %file.owner_id,
            size_bytes = file.size_bytes,
            "Stored CSV file"
        );
        Ok(file)
    }

    /// All files owned by `owner_id`, oldest first.
    pub fn list_by_owner(&self, owner_id: &str) -> StorageResult<Vec<StoredFile>> {
        let read_txn = self.db.begin_read()?;
        let index = read_txn.open_table(OWNER_FILES)?;
        let files = read_txn.open_table(STORED_FILES)?;

        let (start, end) = owner_range(owner_id);
        let mut results = Vec::new();
        for entry in index.range(start.as_slice()..end.as_slice())? {
            let (_, file_id) = entry?;
            if let Some(value) = files.get(file_id.value())? {
                let file: StoredFile = serde_json::from_slice(value.value())?;
                if file.is_owned_by(owner_id) {
                    results.push(file);
                }
            }
        }

        Ok(results)
    }

    /// A single file, only if `owner_id` owns it.
    pub fn get_owned(&self, file_id: &str, owner_id: &str) -> StorageResult<Option<StoredFile>> {
        Ok(self.get(file_id)?.filter(|file| file.is_owned_by(owner_id)))
    }

    /// Apply a partial configuration update to an owned file.
    ///
    /// Returns `None` when the file does not exist or belongs to someone
    /// else. An update with no fields also returns `None` and writes nothing.
    pub fn update_owned(
        &self,
        file_id: &str,
        owner_id: &str,
        update: &FileConfig,
    ) -> StorageResult<Option<StoredFile>> {
        if update.is_empty() {
            return Ok(None);
        }

        let write_txn = self.db.begin_write()?;
        let file = {
            let mut files = write_txn.open_table(STORED_FILES)?;

            let existing_bytes = match files.get(file_id)? {
                Some(existing) => existing.value().to_vec(),
                None => return Ok(None),
            };

            let mut file: StoredFile = serde_json::from_slice(&existing_bytes)?;
            if !file.is_owned_by(owner_id) {
                return Ok(None);
            }

            update.apply_to(&mut file.config);
            file.updated_at = Utc::now();

            let json = serde_json::to_vec(&file)?;
            files.insert(file_id, json.as_slice())?;
            file
        };
        write_txn.commit()?;

        tracing::info!(file_id = %file.id, "Updated file configuration");
        Ok(Some(file))
    }

    /// Delete an owned file. Returns `false` if no owned file matched.
    pub fn delete_owned(&self, file_id: &str, owner_id: &str) -> StorageResult<bool> {
        let write_txn = self.db.begin_write()?;
        {
            let mut files = write_txn.open_table(STORED_FILES)?;

            let existing_bytes = match files.get(file_id)? {
                Some(existing) => existing.value().to_vec(),
                None => return Ok(false),
            };

            let file: StoredFile = serde_json::from_slice(&existing_bytes)?;
            if !file.is_owned_by(owner_id) {
                return Ok(false);
            }

            files.remove(file_id)?;

            let mut index = write_txn.open_table(OWNER_FILES)?;
            let key = make_index_key(owner_id, file.sequence, file_id);
            index.remove(key.as_slice())?;
        }
        write_txn.commit()?;

        tracing::info!(file_id = %file_id, owner_id = %owner_id, "Deleted CSV file");
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::Store;

    fn temp_store() -> (Store, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::connect(&dir.path().join("test.redb")).unwrap();
        (store, dir)
    }

    fn new_file(name: &str) -> NewStoredFile {
        NewStoredFile {
            storage_name: format!("{}_{name}", uuid::Uuid::new_v4()),
            original_name: name.to_string(),
            content: "a,b\n1,2".to_string(),
            size_bytes: 7,
            columns: vec!["a".to_string(), "b".to_string()],
            total_rows: 1,
            config: FileConfig::default(),
        }
    }

    fn two_users(store: &Store) -> (String, String) {
        let a = store.users().resolve("auth0|a", "a@example.com", None).unwrap();
        let b = store.users().resolve("auth0|b", "b@example.com", None).unwrap();
        (a.id, b.id)
    }

    #[test]
    fn create_and_get_owned() {
        let (store, _dir) = temp_store();
        let (alice, _) = two_users(&store);
        let repo = store.files();

        let file = repo.create(&alice, new_file("data.csv")).unwrap();
        let loaded = repo.get_owned(&file.id, &alice).unwrap().unwrap();
        assert_eq!(loaded, file);
        assert_eq!(loaded.created_at, loaded.updated_at);
    }

    #[test]
    fn create_rejects_unknown_owner() {
        let (store, _dir) = temp_store();
        let result = store.files().create("no-such-user", new_file("x.csv"));
        assert!(matches!(result, Err(StorageError::UnknownOwner(_))));
    }

    #[test]
    fn ownership_isolation() {
        let (store, _dir) = temp_store();
        let (alice, bob) = two_users(&store);
        let repo = store.files();

        let file = repo.create(&alice, new_file("secret.csv")).unwrap();
        let update = FileConfig {
            x_column: Some("b".into()),
            ..Default::default()
        };

        assert!(repo.get_owned(&file.id, &bob).unwrap().is_none());
        assert!(repo.list_by_owner(&bob).unwrap().is_empty());
        assert!(repo.update_owned(&file.id, &bob, &update).unwrap().is_none());
        assert!(!repo.delete_owned(&file.id, &bob).unwrap());

        // Alice's file is untouched
        let still = repo.get_owned(&file.id, &alice).unwrap().unwrap();
        assert_eq!(still.config.x_column, None);
    }

    #[test]
    fn list_by_owner_keeps_insertion_order() {
        let (store, _dir) = temp_store();
        let (alice, bob) = two_users(&store);
        let repo = store.files();

        let first = repo.create(&alice, new_file("1.csv")).unwrap();
        repo.create(&bob, new_file("other.csv")).unwrap();
        let second = repo.create(&alice, new_file("2.csv")).unwrap();
        let third = repo.create(&alice, new_file("3.csv")).unwrap();

        let ids: Vec<String> = repo
            .list_by_owner(&alice)
            .unwrap()
            .into_iter()
            .map(|f| f.id)
            .collect();
        assert_eq!(ids, vec![first.id, second.id, third.id]);
        assert_eq!(repo.list_by_owner(&bob).unwrap().len(), 1);
    }

    #[test]
    fn partial_update_keeps_other_fields() {
        let (store, _dir) = temp_store();
        let (alice, _) = two_users(&store);
        let repo = store.files();

        let mut seed = new_file("plot.csv");
        seed.config.x_column = Some("a".into());
        let file = repo.create(&alice, seed).unwrap();

        let update = FileConfig {
            y_column: Some("b".into()),
            ..Default::default()
        };
        let updated = repo.update_owned(&file.id, &alice, &update).unwrap().unwrap();

        assert_eq!(updated.config.x_column.as_deref(), Some("a"));
        assert_eq!(updated.config.y_column.as_deref(), Some("b"));
        assert!(updated.updated_at >= file.updated_at);
        assert_eq!(updated.created_at, file.created_at);
    }

    #[test]
    fn empty_update_is_not_found() {
        let (store, _dir) = temp_store();
        let (alice, bob) = two_users(&store);
        let repo = store.files();
        let file = repo.create(&alice, new_file("a.csv")).unwrap();

        for owner in [&alice, &bob] {
            assert!(repo
                .update_owned(&file.id, owner, &FileConfig::default())
                .unwrap()
                .is_none());
        }
        assert!(repo
            .update_owned("missing", &alice, &FileConfig::default())
            .unwrap()
            .is_none());

        // Nothing was written
        let unchanged = repo.get_owned(&file.id, &alice).unwrap().unwrap();
        assert_eq!(unchanged, file);
    }

    #[test]
    fn delete_is_terminal() {
        let (store, _dir) = temp_store();
        let (alice, _) = two_users(&store);
        let repo = store.files();
        let file = repo.create(&alice, new_file("gone.csv")).unwrap();

        assert!(repo.delete_owned(&file.id, &alice).unwrap());
        assert!(repo.get_owned(&file.id, &alice).unwrap().is_none());
        assert!(repo.list_by_owner(&alice).unwrap().is_empty());
        assert!(!repo.delete_owned(&file.id, &alice).unwrap());
    }

    #[test]
    fn concurrent_disjoint_updates_both_apply() {
        let (store, _dir) = temp_store();
        let (alice, _) = two_users(&store);
        let file = store.files().create(&alice, new_file("c.csv")).unwrap();

        let handles: Vec<_> = [("x", true), ("y", false)]
            .into_iter()
            .map(|(column, is_x)| {
                let store = store.clone();
                let alice = alice.clone();
                let id = file.id.clone();
                std::thread::spawn(move || {
                    let update = if is_x {
                        FileConfig { x_column: Some(column.into()), ..Default::default() }
                    } else {
                        FileConfig { y_column: Some(column.into()), ..Default::default() }
                    };
                    store.files().update_owned(&id, &alice, &update).unwrap()
                })
            })
            .collect();
        for handle in handles {
            assert!(handle.join().unwrap().is_some());
        }

        let merged = store.files().get_owned(&file.id, &alice).unwrap().unwrap();
        assert_eq!(merged.config.x_column.as_deref(), Some("x"));
        assert_eq!(merged.config.y_column.as_deref(), Some("y"));
    }

    #[test]
    fn index_key_orders_by_sequence() {
        let a = make_index_key("owner", 1, "zzz");
        let b = make_index_key("owner", 2, "aaa");
        assert!(a < b);

        let (start, end) = owner_range("owner");
        assert!(a.as_slice() >= start.as_slice() && a.as_slice() < end.as_slice());
        let other = make_index_key("owner2", 1, "x");
        assert!(!(other.as_slice() >= start.as_slice() && other.as_slice() < end.as_slice()));
    }
}
