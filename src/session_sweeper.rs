// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Session Sweeper
//!
//! Background task that drops expired sessions. Lookups already ignore
//! expired entries; the sweep only reclaims their memory.
//!
//! ## Shutdown
//!
//! Uses `tokio_util::sync::CancellationToken`, cancelled from `main` once the
//! server has stopped accepting requests.

use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::auth::SessionStore;

/// Default interval between sweeps.
const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

pub struct SessionSweeper {
    sessions: SessionStore,
    sweep_interval: Duration,
}

impl SessionSweeper {
    pub fn new(sessions: SessionStore) -> Self {
        Self {
            sessions,
            sweep_interval: DEFAULT_SWEEP_INTERVAL,
        }
    }

    #[cfg(test)]
    fn with_interval(mut self, sweep_interval: Duration) -> Self {
        self.sweep_interval = sweep_interval;
        self
    }

    /// Run the sweep loop until the cancellation token is triggered.
    ///
    /// ```rust,ignore
    /// tokio::spawn(sweeper.run(shutdown.clone()));
    /// ```
    pub async fn run(self, shutdown: CancellationToken) {
        info!(
            interval_secs = self.sweep_interval.as_secs(),
            "Session sweeper starting"
        );

        loop {
            tokio::select! {
                _ = tokio::time::sleep(self.sweep_interval) => {},
                _ = shutdown.cancelled() => {
                    info!("Session sweeper shutting down");
                    return;
                }
            }

            self.sweep_step().await;
        }
    }

    async fn sweep_step(&self) -> usize {
        let removed = self.sessions.purge_expired().await;
        if removed > 0 {
            debug!(removed, "Purged expired sessions");
        }
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::SessionIdentity;

    fn identity() -> SessionIdentity {
        SessionIdentity {
            subject_id: "auth0|sweep".to_string(),
            email: "sweep@example.com".to_string(),
            name: None,
            access_token: None,
            id_token: "id".to_string(),
        }
    }

    #[tokio::test]
    async fn sweep_removes_expired_sessions() {
        let sessions = SessionStore::new(Duration::from_millis(10));
        sessions.set(identity()).await;
        tokio::time::sleep(Duration::from_millis(30)).await;

        let sweeper = SessionSweeper::new(sessions.clone());
        assert_eq!(sweeper.sweep_step().await, 1);
        assert_eq!(sessions.len().await, 0);
    }

    #[tokio::test]
    async fn run_stops_on_cancel() {
        let sweeper = SessionSweeper::new(SessionStore::new(Duration::from_secs(60)))
            .with_interval(Duration::from_millis(5));
        let shutdown = CancellationToken::new();
        let handle = tokio::spawn(sweeper.run(shutdown.clone()));

        tokio::time::sleep(Duration::from_millis(20)).await;
        shutdown.cancel();

        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("sweeper did not stop")
            .unwrap();
    }
}
