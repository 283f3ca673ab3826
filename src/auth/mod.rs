// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Authentication Module
//!
//! Session-based authentication backed by an external OIDC identity
//! provider.
//!
//! ## Auth Flow
//!
//! 1. The frontend completes the provider login and receives an id token
//! 2. It posts the id token (and optionally the access token) to
//!    `POST /auth/session`
//! 3. The server:
//!    - Verifies the id token (JWKS in production)
//!    - Extracts `sub`, `email`, `name`
//!    - Resolves the local user (create on first sight, refresh claims)
//!    - Stores a [`SessionIdentity`] and sets an `HttpOnly` session cookie
//! 4. Later requests carry only the cookie; the session identity is looked
//!    up per request
//!
//! The session is a cache of the external identity. The local user record
//! in storage is the source of truth.

pub mod claims;
pub mod error;
pub mod extractor;
pub mod jwks;
pub mod session;
pub mod verify;

pub use claims::{IdTokenClaims, SessionIdentity};
pub use error::AuthError;
pub use extractor::{OptionalAuth, SessionCookie};
pub use jwks::JwksCache;
pub use session::SessionStore;
pub use verify::verify_id_token;
