// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Id token verification failures.
//!
//! Only `POST /auth/session` verifies tokens; every other route works from
//! the session cookie and reports a missing session as
//! [`AccessError::Unauthenticated`](crate::error::AccessError).

use axum::http::StatusCode;

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("id token is malformed")]
    MalformedToken,

    #[error("id token signature does not verify")]
    InvalidSignature,

    #[error("id token has expired")]
    TokenExpired,

    #[error("id token was issued by an unexpected issuer")]
    InvalidIssuer,

    #[error("id token was issued for another audience")]
    InvalidAudience,

    #[error("id token is not valid yet")]
    TokenNotYetValid,

    #[error("id token has no usable '{0}' claim")]
    MissingClaim(&'static str),

    /// The provider's key set could not be fetched. Retrying may succeed.
    #[error("identity provider keys unavailable: {0}")]
    KeysUnavailable(String),

    #[error("no identity provider key matches the token")]
    UnknownSigningKey,

    #[error("token verification is not configured: {0}")]
    NotConfigured(&'static str),
}

impl AuthError {
    /// Machine-readable code carried in the error body.
    pub fn error_code(&self) -> &'static str {
        match self {
            AuthError::MalformedToken => "malformed_token",
            AuthError::InvalidSignature => "invalid_signature",
            AuthError::TokenExpired => "token_expired",
            AuthError::InvalidIssuer => "invalid_issuer",
            AuthError::InvalidAudience => "invalid_audience",
            AuthError::TokenNotYetValid => "token_not_yet_valid",
            AuthError::MissingClaim(_) => "missing_claim",
            AuthError::KeysUnavailable(_) => "identity_provider_unavailable",
            AuthError::UnknownSigningKey => "unknown_signing_key",
            AuthError::NotConfigured(_) => "auth_not_configured",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AuthError::KeysUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AuthError::NotConfigured(_) => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::UNAUTHORIZED,
        }
    }
}
