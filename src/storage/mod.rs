// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Storage Module
//!
//! Persistent storage for users and uploaded CSV files, backed by a single
//! redb database file. The database is the only shared mutable state in the
//! service; sessions live in the auth module and never reach it.
//!
//! ## Layout
//!
//! ```text
//! users              user_id -> User (JSON)
//! users_by_subject   external subject id -> user_id   (unique)
//! stored_files       file_id -> StoredFile (JSON)
//! owner_files        owner_id|seq|file_id -> file_id
//! counters           name -> u64
//! ```
//!
//! ## Ownership
//!
//! Repositories filter every file access on `(file_id, owner_id)`. The
//! [`OwnershipGate`] sits in front of them and turns a session identity into
//! an owner id without ever creating users.

pub mod database;
pub mod ownership;
pub mod repository;

pub use database::{StorageError, StorageResult, Store};
pub use ownership::{OwnedResource, OwnershipGate};
pub use repository::{FileConfig, FileRepository, NewStoredFile, StoredFile, User, UserRepository};
