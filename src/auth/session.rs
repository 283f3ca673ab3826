// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Server-side session store.
//!
//! Sessions are a cache of the external identity for one browser: the
//! database, not the session, is the source of truth for users. Each entry
//! is keyed by a random session id carried in an `HttpOnly` cookie and
//! expires after the configured TTL.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::http::{header::COOKIE, HeaderMap};
use tokio::sync::RwLock;

use super::SessionIdentity;

/// Cookie carrying the session id.
pub const SESSION_COOKIE_NAME: &str = "csvplot_session";

struct SessionEntry {
    identity: SessionIdentity,
    expires_at: Instant,
}

/// In-memory session store keyed by session id.
#[derive(Clone)]
pub struct SessionStore {
    ttl: Duration,
    entries: Arc<RwLock<HashMap<String, SessionEntry>>>,
}

impl SessionStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Identity for a session id, or `None` if unknown or expired.
    pub async fn get(&self, session_id: &str) -> Option<SessionIdentity> {
        let entries = self.entries.read().await;
        entries
            .get(session_id)
            .filter(|entry| entry.expires_at > Instant::now())
            .map(|entry| entry.identity.clone())
    }

    /// Store an identity under a fresh session id and return the id.
    pub async fn set(&self, identity: SessionIdentity) -> String {
        let session_id = uuid::Uuid::new_v4().simple().to_string();
        let entry = SessionEntry {
            identity,
            expires_at: Instant::now() + self.ttl,
        };
        self.entries.write().await.insert(session_id.clone(), entry);
        session_id
    }

    /// Remove a session. Returns whether it existed.
    pub async fn clear(&self, session_id: &str) -> bool {
        self.entries.write().await.remove(session_id).is_some()
    }

    /// Drop every expired session and return how many were removed.
    pub async fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, entry| entry.expires_at > now);
        before - entries.len()
    }

    #[cfg(test)]
    pub(crate) async fn len(&self) -> usize {
        self.entries.read().await.len()
    }
}

/// `Set-Cookie` value establishing a session.
pub fn session_cookie(session_id: &str, max_age: Duration) -> String {
    format!(
        "{SESSION_COOKIE_NAME}={session_id}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
        max_age.as_secs()
    )
}

/// `Set-Cookie` value removing the session cookie.
pub fn clear_session_cookie() -> String {
    format!("{SESSION_COOKIE_NAME}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0")
}

/// Read a cookie value from the request headers.
pub fn extract_cookie_value(headers: &HeaderMap, cookie_name: &str) -> Option<String> {
    for header in headers.get_all(COOKIE) {
        let Ok(raw) = header.to_str() else {
            continue;
        };
        for part in raw.split(';') {
            let mut pieces = part.trim().splitn(2, '=');
            let (Some(key), Some(value)) = (pieces.next(), pieces.next()) else {
                continue;
            };
            let value = value.trim();
            if key.trim() == cookie_name && !value.is_empty() {
                return Some(value.to_string());
            }
        }
    }

    None
}
