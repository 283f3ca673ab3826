// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use crate::auth::{JwksCache, SessionStore};
use crate::config::{AppConfig, DEFAULT_MAX_UPLOAD_BYTES};
use crate::storage::Store;

/// Id token verification settings.
///
/// `jwks: None` selects development mode (see `auth::verify`).
#[derive(Clone, Default)]
pub struct AuthConfig {
    pub jwks: Option<JwksCache>,
    pub issuer: Option<String>,
    pub audience: Option<String>,
}

impl AuthConfig {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            jwks: config.jwks_url.as_ref().map(JwksCache::new),
            issuer: config.issuer.clone(),
            audience: config.audience.clone(),
        }
    }
}

/// Shared handles passed to every request handler.
#[derive(Clone)]
pub struct AppState {
    pub store: Store,
    pub sessions: SessionStore,
    pub auth_config: AuthConfig,
    pub max_upload_bytes: usize,
}

impl AppState {
    pub fn new(store: Store, sessions: SessionStore) -> Self {
        Self {
            store,
            sessions,
            auth_config: AuthConfig::default(),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }

    pub fn with_auth_config(mut self, auth_config: AuthConfig) -> Self {
        self.auth_config = auth_config;
        self
    }

    pub fn with_max_upload_bytes(mut self, max_upload_bytes: usize) -> Self {
        self.max_upload_bytes = max_upload_bytes;
        self
    }

    /// State over a temporary database, in development auth mode.
    #[cfg(test)]
    pub(crate) fn for_tests() -> (Self, tempfile::TempDir) {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let store = Store::connect(&dir.path().join("test.redb")).expect("Failed to open store");
        let sessions = SessionStore::new(std::time::Duration::from_secs(3600));
        (Self::new(store, sessions), dir)
    }
}
