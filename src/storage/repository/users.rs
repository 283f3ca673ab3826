// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! User repository: maps external identity provider subjects to durable
//! local users.
//!
//! The `users_by_subject` table is the uniqueness index on the external
//! subject id. It is checked and written in the same write transaction that
//! inserts the user, so two concurrent first logins for the same subject
//! cannot both create a record.

use chrono::{DateTime, Utc};
use redb::{Database, ReadableDatabase, ReadableTable};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::super::database::{USERS, USERS_BY_SUBJECT};
use super::super::{StorageError, StorageResult};

/// Durable local user bound one-to-one to an external subject id.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct User {
    /// Locally generated identifier (UUID)
    pub id: String,
    /// Identity provider `sub` claim
    pub external_subject_id: String,
    pub email: String,
    /// Display name, defaults to the email
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Repository for user records.
pub struct UserRepository<'a> {
    db: &'a Database,
}

impl<'a> UserRepository<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Get a user by local ID.
    #[cfg(test)]
    pub(crate) fn get(&self, user_id: &str) -> StorageResult<Option<User>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(USERS)?;
        match table.get(user_id)? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    /// Look up a user by external subject id. Never creates.
    pub fn find_by_subject(&self, subject_id: &str) -> StorageResult<Option<User>> {
        let read_txn = self.db.begin_read()?;
        let index = read_txn.open_table(USERS_BY_SUBJECT)?;
        let user_id = match index.get(subject_id)? {
            Some(value) => value.value().to_string(),
            None => return Ok(None),
        };

        let users = read_txn.open_table(USERS)?;
        match users.get(user_id.as_str())? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    /// Insert a new user.
    ///
    /// # Errors
    /// Returns `StorageError::Conflict` if the subject id is already bound.
    pub fn create(&self, subject_id: &str, email: &str, name: &str) -> StorageResult<User> {
        let now = Utc::now();
        let user = User {
            id: uuid::Uuid::new_v4().to_string(),
            external_subject_id: subject_id.to_string(),
            email: email.to_string(),
            name: name.to_string(),
            created_at: now,
            updated_at: now,
        };
        let json = serde_json::to_vec(&user)?;

        let write_txn = self.db.begin_write()?;
        {
            let mut index = write_txn.open_table(USERS_BY_SUBJECT)?;
            if index.get(subject_id)?.is_some() {
                // Dropping the transaction without commit rolls it back
                return Err(StorageError::Conflict(format!("User for subject {subject_id}")));
            }
            index.insert(subject_id, user.id.as_str())?;

            let mut users = write_txn.open_table(USERS)?;
            users.insert(user.id.as_str(), json.as_slice())?;
        }
        write_txn.commit()?;

        tracing::info!(user_id = %user.id, "Created local user");
        Ok(user)
    }

    /// Resolve an identity provider subject to a local user.
    ///
    /// Creates the user on first sight (name defaults to email) and refreshes
    /// email/name when the claims changed. Identical claims never write.
    pub fn resolve(&self, subject_id: &str, email: &str, name: Option<&str>) -> StorageResult<User> {
        let name = name.filter(|n| !n.is_empty()).unwrap_or(email);

        let existing = match self.find_by_subject(subject_id)? {
            Some(user) => user,
            None => match self.create(subject_id, email, name) {
                Ok(user) => return Ok(user),
                // Lost a race with a concurrent first login: attach to the winner
                Err(StorageError::Conflict(_)) => self.find_by_subject(subject_id)?.ok_or_else(
                    || StorageError::Conflict(format!("User for subject {subject_id}")),
                )?,
                Err(e) => return Err(e),
            },
        };

        if existing.email == email && existing.name == name {
            tracing::debug!(user_id = %existing.id, "Identity claims unchanged");
            return Ok(existing);
        }

        self.refresh_claims(&existing.id, email, name)
    }

    /// Update email/name of an existing user inside one write transaction.
    fn refresh_claims(&self, user_id: &str, email: &str, name: &str) -> StorageResult<User> {
        let write_txn = self.db.begin_write()?;
        let user = {
            let mut users = write_txn.open_table(USERS)?;

            // Read existing value and deserialize before mutating
            let existing_bytes = {
                let existing = users
                    .get(user_id)?
                    .ok_or_else(|| StorageError::UnknownOwner(user_id.to_string()))?;
                existing.value().to_vec()
            };

            let mut user: User = serde_json::from_slice(&existing_bytes)?;
            user.email = email.to_string();
            user.name = name.to_string();
            user.updated_at = Utc::now();

            let json = serde_json::to_vec(&user)?;
            users.insert(user_id, json.as_slice())?;
            user
        };
        write_txn.commit()?;

        tracing::info!(user_id = %user.id, "Refreshed identity claims");
        Ok(user)
    }

    /// Number of stored users.
    #[cfg(test)]
    pub(crate) fn count(&self) -> StorageResult<u64> {
        use redb::ReadableTableMetadata;

        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(USERS)?;
        Ok(table.len()?)
    }
}
