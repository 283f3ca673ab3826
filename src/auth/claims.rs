// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Identity provider claims and the session identity built from them.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::AuthError;

/// Claims read from an OIDC id token.
///
/// Only `sub`, `email` and `name` feed the identity; the time and issuer
/// claims are validated by `jsonwebtoken` in production mode.
#[derive(Debug, Clone, Deserialize)]
pub struct IdTokenClaims {
    /// Subject (user ID) - the canonical provider identifier
    pub sub: String,

    #[serde(default)]
    pub email: Option<String>,

    #[serde(default)]
    pub name: Option<String>,

    /// Expiration timestamp
    #[serde(default)]
    pub exp: i64,

    /// Issuer
    #[serde(default)]
    pub iss: String,

    /// Audience (validated by jsonwebtoken crate, not read directly)
    #[serde(default)]
    #[allow(dead_code)]
    pub aud: Option<serde_json::Value>,
}

/// The authenticated external identity held in a session.
///
/// Tokens are kept so they can be forwarded later but are never serialized
/// back to clients.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct SessionIdentity {
    /// Provider `sub` claim
    pub subject_id: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing, default)]
    pub access_token: Option<String>,
    #[serde(skip_serializing, default)]
    pub id_token: String,
}

impl SessionIdentity {
    /// Build a session identity from verified id token claims.
    ///
    /// # Errors
    /// Returns `AuthError::MissingClaim` if `sub` or `email` is absent.
    pub fn from_claims(
        claims: IdTokenClaims,
        id_token: impl Into<String>,
        access_token: Option<String>,
    ) -> Result<Self, AuthError> {
        if claims.sub.trim().is_empty() {
            return Err(AuthError::MissingClaim("sub"));
        }
        let email = claims
            .email
            .filter(|e| !e.trim().is_empty())
            .ok_or(AuthError::MissingClaim("email"))?;

        Ok(Self {
            subject_id: claims.sub,
            email,
            name: claims.name.filter(|n| !n.trim().is_empty()),
            access_token,
            id_token: id_token.into(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_claims() -> IdTokenClaims {
        IdTokenClaims {
            sub: "auth0|123".to_string(),
            email: Some("ada@example.com".to_string()),
            name: Some("Ada".to_string()),
            exp: 1700003600,
            iss: "https://id.example.com/".to_string(),
            aud: None,
        }
    }

    #[test]
    fn from_claims_extracts_identity() {
        let identity = SessionIdentity::from_claims(sample_claims(), "tok", None).unwrap();
        assert_eq!(identity.subject_id, "auth0|123");
        assert_eq!(identity.email, "ada@example.com");
        assert_eq!(identity.name.as_deref(), Some("Ada"));
        assert_eq!(identity.id_token, "tok");
    }

    #[test]
    fn blank_name_is_absent() {
        let mut claims = sample_claims();
        claims.name = Some("  ".to_string());
        let identity = SessionIdentity::from_claims(claims, "tok", None).unwrap();
        assert_eq!(identity.name, None);
        assert_eq!(identity.email, "ada@example.com");
    }

    #[test]
    fn from_claims_requires_email() {
        let mut claims = sample_claims();
        claims.email = None;
        let result = SessionIdentity::from_claims(claims, "tok", None);
        assert!(matches!(result, Err(AuthError::MissingClaim("email"))));
    }

    #[test]
    fn tokens_are_not_serialized() {
        let identity =
            SessionIdentity::from_claims(sample_claims(), "secret-id", Some("secret-access".into()))
                .unwrap();
        let json = serde_json::to_string(&identity).unwrap();
        assert!(!json.contains("secret"));
    }
}
