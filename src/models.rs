// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # API Data Models
//!
//! Request and response bodies for the REST API. Field names are camelCase
//! on the wire to match what the plotting frontend reads.
//!
//! ## Model Categories
//!
//! - **Session**: establishing a session and reporting its status
//! - **Files**: upload results, summaries (no content) and full details

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::auth::SessionIdentity;
use crate::storage::{FileConfig, StoredFile, User};

// =============================================================================
// Session
// =============================================================================

/// Tokens received from the identity provider after login.
#[derive(Debug, Deserialize, ToSchema)]
pub struct EstablishSessionRequest {
    pub id_token: String,
    #[serde(default)]
    pub access_token: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AuthStatusResponse {
    pub authenticated: bool,
    pub user: Option<SessionIdentity>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub id: String,
    pub email: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            name: user.name,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

// =============================================================================
// Files
// =============================================================================

/// Generic success acknowledgement.
#[derive(Debug, Serialize, ToSchema)]
pub struct MessageResponse {
    pub success: bool,
    pub message: String,
}

impl MessageResponse {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct UploadResponse {
    pub success: bool,
    pub message: String,
    pub file_id: String,
    /// Original upload filename
    pub filename: String,
}

/// A stored file without its content.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FileSummary {
    pub id: String,
    pub filename: String,
    pub description: Option<String>,
    pub columns: Vec<String>,
    pub total_rows: u64,
    pub file_size: u64,
    pub x_column: Option<String>,
    pub y_column: Option<String>,
    pub max_rows: Option<u64>,
    pub x_range_min: Option<f64>,
    pub x_range_max: Option<f64>,
    pub y_range_min: Option<f64>,
    pub y_range_max: Option<f64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<StoredFile> for FileSummary {
    fn from(file: StoredFile) -> Self {
        let FileConfig {
            description,
            x_column,
            y_column,
            max_rows,
            x_range_min,
            x_range_max,
            y_range_min,
            y_range_max,
        } = file.config;

        Self {
            id: file.id,
            filename: file.original_name,
            description,
            columns: file.columns,
            total_rows: file.total_rows,
            file_size: file.size_bytes,
            x_column,
            y_column,
            max_rows,
            x_range_min,
            x_range_max,
            y_range_min,
            y_range_max,
            created_at: file.created_at,
            updated_at: file.updated_at,
        }
    }
}

/// A stored file including its content.
#[derive(Debug, Serialize, ToSchema)]
pub struct FileDetail {
    #[serde(flatten)]
    pub summary: FileSummary,
    pub content: String,
}

impl From<StoredFile> for FileDetail {
    fn from(mut file: StoredFile) -> Self {
        let content = std::mem::take(&mut file.content);
        Self {
            summary: file.into(),
            content,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct FileListResponse {
    pub success: bool,
    pub files: Vec<FileSummary>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct FileDetailResponse {
    pub success: bool,
    pub file: FileDetail,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stored_file() -> StoredFile {
        let now = Utc::now();
        StoredFile {
            id: "f1".to_string(),
            owner_id: "u1".to_string(),
            storage_name: "abc_data.csv".to_string(),
            original_name: "data.csv".to_string(),
            content: "x,y\n1,2".to_string(),
            size_bytes: 7,
            columns: vec!["x".to_string(), "y".to_string()],
            total_rows: 1,
            config: FileConfig {
                x_column: Some("x".to_string()),
                y_range_max: Some(10.0),
                ..Default::default()
            },
            created_at: now,
            updated_at: now,
            sequence: 1,
        }
    }

    #[test]
    fn summary_uses_camel_case_and_omits_content() {
        let json = serde_json::to_value(FileSummary::from(stored_file())).unwrap();
        assert_eq!(json["filename"], "data.csv");
        assert_eq!(json["totalRows"], 1);
        assert_eq!(json["fileSize"], 7);
        assert_eq!(json["xColumn"], "x");
        assert_eq!(json["yRangeMax"], 10.0);
        assert!(json["yColumn"].is_null());
        assert!(json.get("content").is_none());
        assert!(json.get("ownerId").is_none());
    }

    #[test]
    fn detail_includes_content() {
        let json = serde_json::to_value(FileDetail::from(stored_file())).unwrap();
        assert_eq!(json["content"], "x,y\n1,2");
        assert_eq!(json["id"], "f1");
        assert_eq!(json["columns"], serde_json::json!(["x", "y"]));
    }

    #[test]
    fn status_response_never_leaks_tokens() {
        let response = AuthStatusResponse {
            authenticated: true,
            user: Some(SessionIdentity {
                subject_id: "auth0|1".to_string(),
                email: "a@example.com".to_string(),
                name: None,
                access_token: Some("secret-access".to_string()),
                id_token: "secret-id".to_string(),
            }),
        };
        let body = serde_json::to_string(&response).unwrap();
        assert!(!body.contains("secret"));
        assert!(body.contains("a@example.com"));
    }
}
