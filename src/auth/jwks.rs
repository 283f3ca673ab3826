// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Identity provider signing keys.
//!
//! The provider publishes its keys at `OIDC_JWKS_URL`. [`JwksCache`] fetches
//! them, converts every usable key to a [`DecodingKey`] once, and indexes
//! them by `kid`. Entries expire after [`KEY_TTL`].
//!
//! A token signed with a `kid` the cache has never seen usually means the
//! provider rotated its keys, so the set is refetched early, at most once per
//! [`MIN_REFETCH_INTERVAL`].

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use jsonwebtoken::jwk::{AlgorithmParameters, Jwk, JwkSet, KeyAlgorithm};
use jsonwebtoken::{Algorithm, DecodingKey};
use tokio::sync::RwLock;

use super::error::AuthError;

pub const KEY_TTL: Duration = Duration::from_secs(300);
pub const MIN_REFETCH_INTERVAL: Duration = Duration::from_secs(30);
const FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// A provider key ready for signature checks.
#[derive(Clone)]
pub struct VerifyingKey {
    pub key: DecodingKey,
    pub algorithm: Algorithm,
}

struct KeyIndex {
    by_kid: HashMap<String, VerifyingKey>,
    /// Used for tokens whose header carries no `kid`.
    first: Option<VerifyingKey>,
    fetched_at: Instant,
}

impl KeyIndex {
    fn build(set: &JwkSet) -> Self {
        let mut by_kid = HashMap::new();
        let mut first = None;

        for jwk in &set.keys {
            let Some(key) = verifying_key(jwk) else {
                tracing::debug!(kid = ?jwk.common.key_id, "Skipping unusable JWKS entry");
                continue;
            };
            if first.is_none() {
                first = Some(key.clone());
            }
            if let Some(kid) = &jwk.common.key_id {
                by_kid.insert(kid.clone(), key);
            }
        }

        Self {
            by_kid,
            first,
            fetched_at: Instant::now(),
        }
    }

    fn lookup(&self, kid: Option<&str>) -> Option<VerifyingKey> {
        match kid {
            Some(kid) => self.by_kid.get(kid).cloned(),
            None => self.first.clone(),
        }
    }
}

/// Shared, lazily filled cache of the provider's signing keys.
#[derive(Clone)]
pub struct JwksCache {
    url: Arc<str>,
    client: reqwest::Client,
    index: Arc<RwLock<Option<KeyIndex>>>,
}

impl JwksCache {
    pub fn new(url: impl AsRef<str>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(FETCH_TIMEOUT)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            url: Arc::from(url.as_ref()),
            client,
            index: Arc::new(RwLock::new(None)),
        }
    }

    /// Key for a token header's `kid`, fetching the key set when needed.
    pub async fn key_for(&self, kid: Option<&str>) -> Result<VerifyingKey, AuthError> {
        {
            let index = self.index.read().await;
            if let Some(index) = index.as_ref() {
                let age = index.fetched_at.elapsed();
                if age < KEY_TTL {
                    if let Some(key) = index.lookup(kid) {
                        return Ok(key);
                    }
                    if age < MIN_REFETCH_INTERVAL {
                        return Err(AuthError::UnknownSigningKey);
                    }
                }
            }
        }

        self.refresh().await?;

        let index = self.index.read().await;
        index
            .as_ref()
            .and_then(|index| index.lookup(kid))
            .ok_or(AuthError::UnknownSigningKey)
    }

    /// Fetch the key set now and replace the cache.
    pub async fn refresh(&self) -> Result<(), AuthError> {
        let set = self.fetch().await?;
        let fresh = KeyIndex::build(&set);
        tracing::debug!(keys = fresh.by_kid.len(), "Refreshed identity provider keys");

        *self.index.write().await = Some(fresh);
        Ok(())
    }

    /// Whether a fetched key set is still within its TTL.
    pub async fn is_fresh(&self) -> bool {
        self.index
            .read()
            .await
            .as_ref()
            .is_some_and(|index| index.fetched_at.elapsed() < KEY_TTL)
    }

    async fn fetch(&self) -> Result<JwkSet, AuthError> {
        let unavailable = |e: reqwest::Error| {
            tracing::warn!(url = %self.url, error = %e, "JWKS fetch failed");
            AuthError::KeysUnavailable(e.to_string())
        };

        self.client
            .get(self.url.as_ref())
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(unavailable)?
            .json()
            .await
            .map_err(unavailable)
    }
}

/// Convert an RSA or EC key; other key types cannot verify id tokens.
fn verifying_key(jwk: &Jwk) -> Option<VerifyingKey> {
    let (key, algorithm) = match &jwk.algorithm {
        AlgorithmParameters::RSA(rsa) => (
            DecodingKey::from_rsa_components(&rsa.n, &rsa.e).ok()?,
            match jwk.common.key_algorithm {
                Some(KeyAlgorithm::RS384) => Algorithm::RS384,
                Some(KeyAlgorithm::RS512) => Algorithm::RS512,
                _ => Algorithm::RS256,
            },
        ),
        AlgorithmParameters::EllipticCurve(ec) => (
            DecodingKey::from_ec_components(&ec.x, &ec.y).ok()?,
            match jwk.common.key_algorithm {
                Some(KeyAlgorithm::ES384) => Algorithm::ES384,
                _ => Algorithm::ES256,
            },
        ),
        _ => return None,
    };
    Some(VerifyingKey { key, algorithm })
}
