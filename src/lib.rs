// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! csvplot server - session-authenticated CSV storage
//!
//! Users sign in with an external OIDC provider, upload CSV files and keep
//! chart configuration next to them. Every stored file belongs to exactly
//! one local user and is invisible to everyone else.
//!
//! ## Modules
//!
//! - `api` - HTTP API handlers (Axum)
//! - `auth` - Id token verification and server-side sessions
//! - `ingest` - Upload parsing and persistence
//! - `storage` - redb-backed users, files and the ownership gate

pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod ingest;
pub mod models;
pub mod session_sweeper;
pub mod state;
pub mod storage;
