// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Error types shared by the core and the HTTP layer.
//!
//! [`AccessError`] is the typed outcome of the ownership gate and upload
//! ingestion. [`ApiError`] is what handlers return; it carries a status code
//! and renders as a JSON body.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::auth::AuthError;
use crate::storage::StorageError;

/// Outcome of a failed resource access.
#[derive(Debug, thiserror::Error)]
pub enum AccessError {
    /// No session identity is present.
    #[error("not authenticated")]
    Unauthenticated,

    /// The resource is absent or owned by someone else.
    #[error("resource not found")]
    NotFound,

    /// The upload could not be decoded or was empty.
    #[error("malformed input: {0}")]
    MalformedInput(String),

    /// The persistence layer failed; the request may be retried.
    #[error("storage unavailable: {0}")]
    StorageUnavailable(StorageError),

    /// A uniqueness constraint was violated and could not be absorbed.
    #[error("conflict: {0}")]
    Conflict(String),
}

impl From<StorageError> for AccessError {
    fn from(e: StorageError) -> Self {
        match e {
            StorageError::Conflict(msg) => AccessError::Conflict(msg),
            // The owner vanished between lookup and write
            StorageError::UnknownOwner(_) => AccessError::NotFound,
            other => AccessError::StorageUnavailable(other),
        }
    }
}

#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub code: &'static str,
    pub message: String,
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
    error_code: &'static str,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    retryable: bool,
}

impl ApiError {
    pub fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            code,
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, "not_found", message)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "malformed_input", message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, "not_authenticated", message)
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::new(StatusCode::SERVICE_UNAVAILABLE, "storage_unavailable", message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(StatusCode::CONFLICT, "conflict", message)
    }

    fn is_retryable(&self) -> bool {
        self.status == StatusCode::SERVICE_UNAVAILABLE
    }
}

impl From<AccessError> for ApiError {
    fn from(e: AccessError) -> Self {
        match e {
            AccessError::Unauthenticated => ApiError::unauthorized("Not authenticated"),
            AccessError::NotFound => ApiError::not_found("CSV file not found"),
            AccessError::MalformedInput(msg) => ApiError::bad_request(msg),
            AccessError::StorageUnavailable(inner) => {
                tracing::error!(error = %inner, "Storage failure");
                ApiError::unavailable("Storage is temporarily unavailable")
            }
            AccessError::Conflict(msg) => ApiError::conflict(msg),
        }
    }
}

impl From<StorageError> for ApiError {
    fn from(e: StorageError) -> Self {
        AccessError::from(e).into()
    }
}

impl From<AuthError> for ApiError {
    fn from(e: AuthError) -> Self {
        ApiError::new(e.status_code(), e.error_code(), e.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let retryable = self.is_retryable();
        let body = Json(ErrorBody {
            error: self.message,
            error_code: self.code,
            retryable,
        });
        (self.status, body).into_response()
    }
}
