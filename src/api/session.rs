// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Session endpoints.
//!
//! The provider login itself happens in the frontend. These handlers turn
//! the resulting tokens into a server-side session and report on it.

use axum::{
    extract::State,
    http::header::SET_COOKIE,
    response::IntoResponse,
    Json,
};

use crate::auth::session::{clear_session_cookie, session_cookie};
use crate::auth::{verify_id_token, OptionalAuth, SessionCookie, SessionIdentity};
use crate::error::ApiError;
use crate::models::{AuthStatusResponse, EstablishSessionRequest, MessageResponse};
use crate::state::AppState;

/// Exchange provider tokens for a session cookie.
///
/// Verifies the id token, resolves (or creates) the local user and only
/// then stores the session. If the user cannot be resolved no session is
/// created. Any session the browser already held is discarded.
#[utoipa::path(
    post,
    path = "/auth/session",
    tag = "Session",
    request_body = EstablishSessionRequest,
    responses(
        (status = 200, description = "Session established", body = AuthStatusResponse),
        (status = 401, description = "Token invalid or missing required claims"),
        (status = 503, description = "Storage or JWKS unavailable")
    )
)]
pub async fn establish_session(
    State(state): State<AppState>,
    SessionCookie(previous): SessionCookie,
    Json(request): Json<EstablishSessionRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let claims = verify_id_token(&request.id_token, &state.auth_config).await?;
    let identity = SessionIdentity::from_claims(claims, request.id_token, request.access_token)?;

    let subject_id = identity.subject_id.clone();
    let email = identity.email.clone();
    let name = identity.name.clone();
    let user = state
        .store
        .run(move |store| store.users().resolve(&subject_id, &email, name.as_deref()))
        .await?;

    if let Some(previous) = previous {
        state.sessions.clear(&previous).await;
    }
    let session_id = state.sessions.set(identity.clone()).await;

    tracing::info!(user_id = %user.id, subject_id = %identity.subject_id, "Session established");

    let cookie = session_cookie(&session_id, state.sessions.ttl());
    Ok((
        [(SET_COOKIE, cookie)],
        Json(AuthStatusResponse {
            authenticated: true,
            user: Some(identity),
        }),
    ))
}

/// Clear the session and its cookie. Succeeds without a session too.
#[utoipa::path(
    post,
    path = "/auth/logout",
    tag = "Session",
    responses(
        (status = 200, description = "Logged out", body = MessageResponse)
    )
)]
pub async fn logout(
    State(state): State<AppState>,
    SessionCookie(session_id): SessionCookie,
) -> impl IntoResponse {
    if let Some(session_id) = session_id {
        if state.sessions.clear(&session_id).await {
            tracing::info!("Session cleared");
        }
    }

    (
        [(SET_COOKIE, clear_session_cookie())],
        Json(MessageResponse::ok("Logged out")),
    )
}

/// Whether the caller has a session, and the identity it holds.
#[utoipa::path(
    get,
    path = "/api/auth/status",
    tag = "Session",
    responses(
        (status = 200, description = "Session status", body = AuthStatusResponse)
    )
)]
pub async fn auth_status(OptionalAuth(identity): OptionalAuth) -> Json<AuthStatusResponse> {
    Json(AuthStatusResponse {
        authenticated: identity.is_some(),
        user: identity,
    })
}
