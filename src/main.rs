// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use csvplot_server::api::router;
use csvplot_server::auth::SessionStore;
use csvplot_server::config::AppConfig;
use csvplot_server::session_sweeper::SessionSweeper;
use csvplot_server::state::{AppState, AuthConfig};
use csvplot_server::storage::Store;

fn init_tracing(json_logs: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,tower_http=debug"));
    let registry = tracing_subscriber::registry().with(filter);

    if json_logs {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}

#[tokio::main]
async fn main() {
    let config = AppConfig::from_env();
    init_tracing(config.json_logs);

    let store = Store::connect(&config.database_path).expect("Failed to open database");
    let sessions = SessionStore::new(config.session_ttl);

    if config.jwks_url.is_none() {
        tracing::warn!("OIDC_JWKS_URL not set; running in development auth mode");
    }

    let state = AppState::new(store.clone(), sessions.clone())
        .with_auth_config(AuthConfig::from_config(&config))
        .with_max_upload_bytes(config.max_upload_bytes);
    let app = router(state, &config.cors_origins);

    let shutdown = CancellationToken::new();
    let sweeper = tokio::spawn(SessionSweeper::new(sessions).run(shutdown.clone()));

    let addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .unwrap_or_else(|e| panic!("Failed to bind {addr}: {e}"));

    tracing::info!(%addr, "csvplot server listening (docs at /docs)");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("HTTP server failed");

    shutdown.cancel();
    if let Err(e) = sweeper.await {
        tracing::warn!(error = %e, "Session sweeper task failed");
    }

    store.disconnect();
    tracing::info!("Server stopped");
}
