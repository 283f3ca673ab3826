// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Repository layer providing typed access to the embedded database.
//!
//! Each repository borrows the redb `Database` and provides the operations
//! for one entity type. Every mutation is a single write transaction.

pub mod files;
pub mod users;

pub use files::{FileConfig, FileRepository, NewStoredFile, StoredFile};
pub use users::{User, UserRepository};
