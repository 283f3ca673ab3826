// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Ownership enforcement for all file access.
//!
//! Every resource operation passes through the [`OwnershipGate`]:
//!
//! 1. No session identity → `Unauthenticated`, before any lookup
//! 2. Session subject → local user, by lookup only (the gate never creates)
//! 3. Resource must belong to that user; a foreign resource is reported as
//!    `NotFound`, exactly like a missing one
//!
//! The gate has no side effects. Mutations take the owner id it produces.

use crate::auth::SessionIdentity;
use crate::error::AccessError;

use super::{StoredFile, Store, User};

/// Trait for resources that have a single owner.
pub trait OwnedResource {
    /// Local user id of the owner.
    fn owner_id(&self) -> &str;

    fn is_owned_by(&self, user_id: &str) -> bool {
        self.owner_id() == user_id
    }
}

/// Authorization filter in front of the file repository.
pub struct OwnershipGate<'a> {
    store: &'a Store,
}

impl<'a> OwnershipGate<'a> {
    pub fn new(store: &'a Store) -> Self {
        Self { store }
    }

    /// Require a session identity.
    pub fn authenticate<'s>(
        &self,
        session: Option<&'s SessionIdentity>,
    ) -> Result<&'s SessionIdentity, AccessError> {
        session.ok_or(AccessError::Unauthenticated)
    }

    /// Local user for the session, if one was ever resolved.
    pub fn caller(&self, session: Option<&SessionIdentity>) -> Result<Option<User>, AccessError> {
        let identity = self.authenticate(session)?;
        Ok(self.store.users().find_by_subject(&identity.subject_id)?)
    }

    /// Owner id for a single-resource operation. Callers without a local
    /// user own nothing, so this is `NotFound`.
    pub fn owner(&self, session: Option<&SessionIdentity>) -> Result<User, AccessError> {
        self.caller(session)?.ok_or(AccessError::NotFound)
    }

    /// A single file owned by the caller.
    pub fn owned_file(
        &self,
        session: Option<&SessionIdentity>,
        file_id: &str,
    ) -> Result<StoredFile, AccessError> {
        let user = self.owner(session)?;
        self.store
            .files()
            .get_owned(file_id, &user.id)?
            .ok_or(AccessError::NotFound)
    }

    /// Every file owned by the caller; empty if no local user exists yet.
    pub fn owned_files(&self, session: Option<&SessionIdentity>) -> Result<Vec<StoredFile>, AccessError> {
        match self.caller(session)? {
            Some(user) => Ok(self.store.files().list_by_owner(&user.id)?),
            None => Ok(Vec::new()),
        }
    }
}
