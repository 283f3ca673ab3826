// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Id token verification.
//!
//! ## Modes
//!
//! - **Production** (`OIDC_JWKS_URL` set): signature, expiry, issuer and
//!   audience are verified against the provider JWKS.
//! - **Development** (no JWKS, `dev` feature or tests only): the token is
//!   decoded without signature verification; expiry is still checked.

use jsonwebtoken::{decode, decode_header, Validation};

use super::{AuthError, IdTokenClaims, JwksCache};
use crate::state::AuthConfig;

/// Clock skew tolerance (60 seconds).
const CLOCK_SKEW_LEEWAY: u64 = 60;

/// Verify an id token and return its claims.
pub async fn verify_id_token(token: &str, auth_config: &AuthConfig) -> Result<IdTokenClaims, AuthError> {
    if let Some(ref jwks) = auth_config.jwks {
        verify_production(token, jwks, auth_config).await
    } else {
        verify_development(token)
    }
}

async fn verify_production(
    token: &str,
    jwks: &JwksCache,
    auth_config: &AuthConfig,
) -> Result<IdTokenClaims, AuthError> {
    let header = decode_header(token).map_err(|_| AuthError::MalformedToken)?;
    let signing = jwks.key_for(header.kid.as_deref()).await?;

    let mut validation = Validation::new(signing.algorithm);
    validation.leeway = CLOCK_SKEW_LEEWAY;

    if let Some(ref issuer) = auth_config.issuer {
        validation.set_issuer(&[issuer]);
    }

    if let Some(ref audience) = auth_config.audience {
        validation.set_audience(&[audience]);
    } else {
        validation.validate_aud = false;
    }

    let token_data = decode::<IdTokenClaims>(token, &signing.key, &validation).map_err(|e| {
        match e.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::TokenExpired,
            jsonwebtoken::errors::ErrorKind::InvalidSignature => AuthError::InvalidSignature,
            jsonwebtoken::errors::ErrorKind::InvalidIssuer => AuthError::InvalidIssuer,
            jsonwebtoken::errors::ErrorKind::InvalidAudience => AuthError::InvalidAudience,
            jsonwebtoken::errors::ErrorKind::ImmatureSignature => AuthError::TokenNotYetValid,
            _ => AuthError::MalformedToken,
        }
    })?;

    Ok(token_data.claims)
}

/// Development verification (no signature check).
#[cfg(any(test, feature = "dev"))]
fn verify_development(token: &str) -> Result<IdTokenClaims, AuthError> {
    let token_data = jsonwebtoken::dangerous::insecure_decode::<IdTokenClaims>(token)
        .map_err(|_| AuthError::MalformedToken)?;

    let claims = token_data.claims;
    let now = chrono::Utc::now().timestamp();
    if claims.exp > 0 && claims.exp < now - CLOCK_SKEW_LEEWAY as i64 {
        return Err(AuthError::TokenExpired);
    }

    Ok(claims)
}

#[cfg(not(any(test, feature = "dev")))]
fn verify_development(_token: &str) -> Result<IdTokenClaims, AuthError> {
    Err(AuthError::NotConfigured("OIDC_JWKS_URL is not set"))
}

/// Unsigned JWT builder for tests running in development mode.
#[cfg(test)]
pub(crate) fn unsigned_test_token(sub: &str, email: Option<&str>, name: Option<&str>) -> String {
    use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};

    let header = r#"{"alg":"RS256","typ":"JWT"}"#;
    let mut claims = serde_json::json!({
        "sub": sub,
        "iat": 1609459200,
        "exp": 9999999999i64,
        "iss": "test",
    });
    if let Some(email) = email {
        claims["email"] = email.into();
    }
    if let Some(name) = name {
        claims["name"] = name.into();
    }

    let header_b64 = URL_SAFE_NO_PAD.encode(header.as_bytes());
    let claims_b64 = URL_SAFE_NO_PAD.encode(claims.to_string().as_bytes());
    format!("{header_b64}.{claims_b64}.fake_signature")
}
