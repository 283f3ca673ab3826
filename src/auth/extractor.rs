// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Axum extractors for the session identity.
//!
//! Handlers take `OptionalAuth` and hand it to the ownership gate, which
//! decides what an absent session means:
//!
//! ```rust,ignore
//! async fn my_handler(OptionalAuth(identity): OptionalAuth) -> Result<Json<T>, ApiError> {
//!     let user = OwnershipGate::new(&store).owner(identity.as_ref())?;
//! }
//! ```

use axum::{extract::FromRequestParts, http::request::Parts};

use super::session::{extract_cookie_value, SESSION_COOKIE_NAME};
use super::SessionIdentity;
use crate::state::AppState;

/// Session id from the request cookie, if any.
pub struct SessionCookie(pub Option<String>);

impl FromRequestParts<AppState> for SessionCookie {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &AppState) -> Result<Self, Self::Rejection> {
        Ok(SessionCookie(extract_cookie_value(
            &parts.headers,
            SESSION_COOKIE_NAME,
        )))
    }
}

/// Optional session identity.
///
/// Never rejects; `None` means the caller is unauthenticated.
pub struct OptionalAuth(pub Option<SessionIdentity>);

impl FromRequestParts<AppState> for OptionalAuth {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        // Tests and middleware may inject the identity directly
        if let Some(identity) = parts.extensions.get::<SessionIdentity>().cloned() {
            return Ok(OptionalAuth(Some(identity)));
        }

        let SessionCookie(session_id) = SessionCookie::from_request_parts(parts, state).await?;
        let identity = match session_id {
            Some(id) => state.sessions.get(&id).await,
            None => None,
        };

        Ok(OptionalAuth(identity))
    }
}
