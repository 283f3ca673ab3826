// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! This module defines environment variable names and default values used
//! throughout the application. Configuration is loaded from the environment
//! once at startup into [`AppConfig`].
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `HOST` | Server bind address | `0.0.0.0` |
//! | `PORT` | Server bind port | `4040` |
//! | `DATABASE_PATH` | redb database file | `./data/csvplot.redb` |
//! | `OIDC_JWKS_URL` | Identity provider JWKS endpoint | Required for production |
//! | `OIDC_ISSUER` | Expected id token issuer claim | Optional |
//! | `OIDC_AUDIENCE` | Expected id token audience claim | Optional |
//! | `SESSION_TTL_SECS` | Session lifetime in seconds | `86400` |
//! | `MAX_UPLOAD_BYTES` | Largest accepted request body | `10485760` |
//! | `CORS_ALLOWED_ORIGINS` | Comma separated browser origins | `http://localhost:3000,http://127.0.0.1:3000` |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info,tower_http=debug` |

use std::env;
use std::path::PathBuf;
use std::time::Duration;

pub const HOST_ENV: &str = "HOST";
pub const PORT_ENV: &str = "PORT";
pub const DATABASE_PATH_ENV: &str = "DATABASE_PATH";
pub const OIDC_JWKS_URL_ENV: &str = "OIDC_JWKS_URL";
pub const OIDC_ISSUER_ENV: &str = "OIDC_ISSUER";
pub const OIDC_AUDIENCE_ENV: &str = "OIDC_AUDIENCE";
pub const SESSION_TTL_ENV: &str = "SESSION_TTL_SECS";
pub const MAX_UPLOAD_BYTES_ENV: &str = "MAX_UPLOAD_BYTES";
pub const CORS_ALLOWED_ORIGINS_ENV: &str = "CORS_ALLOWED_ORIGINS";
pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";

const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 4040;
const DEFAULT_DATABASE_PATH: &str = "./data/csvplot.redb";
const DEFAULT_SESSION_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Default request body limit (10 MiB).
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

const DEFAULT_CORS_ORIGINS: &[&str] = &["http://localhost:3000", "http://127.0.0.1:3000"];

/// Process-wide configuration, read once in `main`.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub database_path: PathBuf,
    pub jwks_url: Option<String>,
    pub issuer: Option<String>,
    pub audience: Option<String>,
    pub session_ttl: Duration,
    pub max_upload_bytes: usize,
    pub cors_origins: Vec<String>,
    pub json_logs: bool,
}

impl AppConfig {
    /// Load configuration from the process environment.
    ///
    /// Unparseable numeric values fall back to their defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let cors_origins = non_empty(CORS_ALLOWED_ORIGINS_ENV)
            .map(|raw| {
                raw.split(',')
                    .map(|origin| origin.trim().to_string())
                    .filter(|origin| !origin.is_empty())
                    .collect()
            })
            .unwrap_or_else(|| DEFAULT_CORS_ORIGINS.iter().map(|o| o.to_string()).collect());

        Self {
            host: non_empty(HOST_ENV).unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port: non_empty(PORT_ENV)
                .and_then(|p| p.parse().ok())
                .unwrap_or(DEFAULT_PORT),
            database_path: non_empty(DATABASE_PATH_ENV)
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_DATABASE_PATH)),
            jwks_url: non_empty(OIDC_JWKS_URL_ENV),
            issuer: non_empty(OIDC_ISSUER_ENV),
            audience: non_empty(OIDC_AUDIENCE_ENV),
            session_ttl: non_empty(SESSION_TTL_ENV)
                .and_then(|s| s.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(DEFAULT_SESSION_TTL),
            max_upload_bytes: non_empty(MAX_UPLOAD_BYTES_ENV)
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_MAX_UPLOAD_BYTES),
            cors_origins,
            json_logs: non_empty(LOG_FORMAT_ENV)
                .map(|f| f.eq_ignore_ascii_case("json"))
                .unwrap_or(false),
        }
    }

    /// Socket address string for the listener.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> AppConfig {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn defaults_apply_when_unset() {
        let config = load(&[]);
        assert_eq!(config.bind_addr(), "0.0.0.0:4040");
        assert_eq!(config.database_path, PathBuf::from("./data/csvplot.redb"));
        assert!(config.jwks_url.is_none());
        assert_eq!(config.session_ttl, DEFAULT_SESSION_TTL);
        assert_eq!(config.max_upload_bytes, DEFAULT_MAX_UPLOAD_BYTES);
        assert_eq!(config.cors_origins.len(), 2);
        assert!(!config.json_logs);
    }

    #[test]
    fn overrides_are_parsed() {
        let config = load(&[
            (PORT_ENV, "9000"),
            (OIDC_JWKS_URL_ENV, "https://id.example.com/.well-known/jwks.json"),
            (SESSION_TTL_ENV, "60"),
            (CORS_ALLOWED_ORIGINS_ENV, "https://a.example, ,https://b.example"),
            (LOG_FORMAT_ENV, "JSON"),
        ]);
        assert_eq!(config.port, 9000);
        assert_eq!(
            config.jwks_url.as_deref(),
            Some("https://id.example.com/.well-known/jwks.json")
        );
        assert_eq!(config.session_ttl, Duration::from_secs(60));
        assert_eq!(config.cors_origins, vec!["https://a.example", "https://b.example"]);
        assert!(config.json_logs);
    }

    #[test]
    fn invalid_numbers_fall_back() {
        let config = load(&[(PORT_ENV, "not-a-port"), (MAX_UPLOAD_BYTES_ENV, "-1")]);
        assert_eq!(config.port, DEFAULT_PORT);
        assert_eq!(config.max_upload_bytes, DEFAULT_MAX_UPLOAD_BYTES);
    }
}
