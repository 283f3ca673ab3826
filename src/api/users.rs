// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! User endpoints.

use axum::{extract::State, Json};

use crate::auth::OptionalAuth;
use crate::error::{AccessError, ApiError};
use crate::models::UserResponse;
use crate::state::AppState;
use crate::storage::OwnershipGate;

/// Get the local user record for the current session.
///
/// Never creates a user; a session whose user was never resolved gets 404.
#[utoipa::path(
    get,
    path = "/api/users/me",
    tag = "Users",
    responses(
        (status = 200, description = "User information", body = UserResponse),
        (status = 401, description = "No session"),
        (status = 404, description = "No local user for this session")
    )
)]
pub async fn get_current_user(
    State(state): State<AppState>,
    OptionalAuth(identity): OptionalAuth,
) -> Result<Json<UserResponse>, ApiError> {
    let outcome = state
        .store
        .run(move |store| Ok(OwnershipGate::new(store).owner(identity.as_ref())))
        .await?;

    match outcome {
        Ok(user) => Ok(Json(user.into())),
        Err(AccessError::NotFound) => Err(ApiError::not_found("User not found")),
        Err(e) => Err(e.into()),
    }
}
