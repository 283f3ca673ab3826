// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! CSV file endpoints.
//!
//! ## Access Control
//!
//! Every handler takes the optional session identity and passes it to the
//! [`OwnershipGate`] before touching storage:
//! - No session → 401
//! - File missing or owned by someone else → 404
//!
//! Upload is the one path that resolves (and may create) the local user.

use axum::{
    body::Bytes,
    extract::{multipart::MultipartError, Multipart, Path, State},
    http::StatusCode,
    Json,
};

use crate::auth::{OptionalAuth, SessionIdentity};
use crate::error::{AccessError, ApiError};
use crate::ingest::ingest;
use crate::models::{FileDetailResponse, FileListResponse, MessageResponse, UploadResponse};
use crate::state::AppState;
use crate::storage::{FileConfig, OwnershipGate};

/// Filename used when the upload part carries none.
const DEFAULT_FILENAME: &str = "upload.csv";

/// Multipart form for `POST /api/csv/save-csv`.
#[derive(utoipa::ToSchema)]
pub struct UploadForm {
    #[schema(value_type = String, format = Binary)]
    pub file: Vec<u8>,
    pub description: Option<String>,
    pub x_column: Option<String>,
    pub y_column: Option<String>,
    pub max_rows: Option<u64>,
    pub x_range_min: Option<f64>,
    pub x_range_max: Option<f64>,
    pub y_range_min: Option<f64>,
    pub y_range_max: Option<f64>,
}

struct Upload {
    filename: String,
    bytes: Bytes,
    config: FileConfig,
}

fn multipart_error(e: MultipartError) -> ApiError {
    let status = e.status();
    let code = if status == StatusCode::PAYLOAD_TOO_LARGE {
        "payload_too_large"
    } else {
        "malformed_input"
    };
    ApiError::new(status, code, e.body_text())
}

fn parse_number<T: std::str::FromStr>(field: &str, raw: &str) -> Result<Option<T>, ApiError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }
    raw.parse()
        .map(Some)
        .map_err(|_| ApiError::bad_request(format!("'{field}' must be a number")))
}

/// Axis bounds must be finite; NaN and infinities cannot be stored.
fn parse_bound(field: &str, raw: &str) -> Result<Option<f64>, ApiError> {
    match parse_number::<f64>(field, raw)? {
        Some(value) if !value.is_finite() => Err(ApiError::bad_request(format!(
            "'{field}' must be a finite number"
        ))),
        bound => Ok(bound),
    }
}

fn non_empty(raw: String) -> Option<String> {
    if raw.trim().is_empty() {
        None
    } else {
        Some(raw)
    }
}

async fn read_upload(mut multipart: Multipart) -> Result<Upload, ApiError> {
    let mut file = None;
    let mut config = FileConfig::default();

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().unwrap_or_default().to_string();
        if name == "file" {
            let filename = field
                .file_name()
                .filter(|f| !f.is_empty())
                .unwrap_or(DEFAULT_FILENAME)
                .to_string();
            let bytes = field.bytes().await.map_err(multipart_error)?;
            file = Some((filename, bytes));
            continue;
        }

        let value = field.text().await.map_err(multipart_error)?;
        match name.as_str() {
            "description" => config.description = non_empty(value),
            "x_column" => config.x_column = non_empty(value),
            "y_column" => config.y_column = non_empty(value),
            "max_rows" => config.max_rows = parse_number(&name, &value)?,
            "x_range_min" => config.x_range_min = parse_bound(&name, &value)?,
            "x_range_max" => config.x_range_max = parse_bound(&name, &value)?,
            "y_range_min" => config.y_range_min = parse_bound(&name, &value)?,
            "y_range_max" => config.y_range_max = parse_bound(&name, &value)?,
            other => tracing::debug!(field = %other, "Ignoring unknown upload field"),
        }
    }

    let (filename, bytes) = file.ok_or_else(|| ApiError::bad_request("missing 'file' field"))?;
    Ok(Upload {
        filename,
        bytes,
        config,
    })
}

/// Upload a CSV file with optional chart configuration.
#[utoipa::path(
    post,
    path = "/api/csv/save-csv",
    tag = "Files",
    request_body(content = UploadForm, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "File stored", body = UploadResponse),
        (status = 400, description = "Malformed or empty upload"),
        (status = 401, description = "No session"),
        (status = 413, description = "Upload too large"),
        (status = 503, description = "Storage unavailable")
    )
)]
pub async fn upload_file(
    State(state): State<AppState>,
    OptionalAuth(identity): OptionalAuth,
    multipart: Multipart,
) -> Result<Json<UploadResponse>, ApiError> {
    let identity: SessionIdentity = identity.ok_or(AccessError::Unauthenticated)?;
    let upload = read_upload(multipart).await?;

    let stored = state
        .store
        .run(move |store| {
            let user = store.users().resolve(
                &identity.subject_id,
                &identity.email,
                identity.name.as_deref(),
            )?;
            Ok(ingest(
                &store.files(),
                &user.id,
                &upload.bytes,
                &upload.filename,
                upload.config,
            ))
        })
        .await??;

    Ok(Json(UploadResponse {
        success: true,
        message: "CSV file saved successfully".to_string(),
        file_id: stored.id,
        filename: stored.original_name,
    }))
}

/// List the caller's files without content, oldest first.
#[utoipa::path(
    get,
    path = "/api/csv/csv-files",
    tag = "Files",
    responses(
        (status = 200, description = "Caller's files", body = FileListResponse),
        (status = 401, description = "No session")
    )
)]
pub async fn list_files(
    State(state): State<AppState>,
    OptionalAuth(identity): OptionalAuth,
) -> Result<Json<FileListResponse>, ApiError> {
    let files = state
        .store
        .run(move |store| Ok(OwnershipGate::new(store).owned_files(identity.as_ref())))
        .await??;

    Ok(Json(FileListResponse {
        success: true,
        files: files.into_iter().map(Into::into).collect(),
    }))
}

/// Get one file including its content.
#[utoipa::path(
    get,
    path = "/api/csv/csv-file/{file_id}",
    tag = "Files",
    params(("file_id" = String, Path, description = "File ID")),
    responses(
        (status = 200, description = "File with content", body = FileDetailResponse),
        (status = 401, description = "No session"),
        (status = 404, description = "File not found")
    )
)]
pub async fn get_file(
    State(state): State<AppState>,
    OptionalAuth(identity): OptionalAuth,
    Path(file_id): Path<String>,
) -> Result<Json<FileDetailResponse>, ApiError> {
    let file = state
        .store
        .run(move |store| Ok(OwnershipGate::new(store).owned_file(identity.as_ref(), &file_id)))
        .await??;

    Ok(Json(FileDetailResponse {
        success: true,
        file: file.into(),
    }))
}

/// Partially update a file's chart configuration.
///
/// Only supplied fields change. A body with no fields is reported as not
/// found, even for an owned file. The body is parsed only after the session
/// check, so a caller without a session always gets 401.
#[utoipa::path(
    put,
    path = "/api/csv/csv-file/{file_id}/configuration",
    tag = "Files",
    params(("file_id" = String, Path, description = "File ID")),
    request_body = FileConfig,
    responses(
        (status = 200, description = "Configuration updated", body = MessageResponse),
        (status = 400, description = "Body is not a configuration object"),
        (status = 401, description = "No session"),
        (status = 404, description = "File not found or no fields supplied")
    )
)]
pub async fn update_configuration(
    State(state): State<AppState>,
    OptionalAuth(identity): OptionalAuth,
    Path(file_id): Path<String>,
    body: Bytes,
) -> Result<Json<MessageResponse>, ApiError> {
    let identity = identity.ok_or(AccessError::Unauthenticated)?;
    let update: FileConfig = serde_json::from_slice(&body)
        .map_err(|e| ApiError::bad_request(format!("invalid configuration: {e}")))?;

    state
        .store
        .run(move |store| {
            let user = match OwnershipGate::new(store).owner(Some(&identity)) {
                Ok(user) => user,
                Err(e) => return Ok(Err(e)),
            };
            let updated = store.files().update_owned(&file_id, &user.id, &update)?;
            Ok(updated.ok_or(AccessError::NotFound))
        })
        .await??;

    Ok(Json(MessageResponse::ok("Configuration updated successfully")))
}

/// Delete a file.
#[utoipa::path(
    delete,
    path = "/api/csv/csv-file/{file_id}",
    tag = "Files",
    params(("file_id" = String, Path, description = "File ID")),
    responses(
        (status = 200, description = "File deleted", body = MessageResponse),
        (status = 401, description = "No session"),
        (status = 404, description = "File not found")
    )
)]
pub async fn delete_file(
    State(state): State<AppState>,
    OptionalAuth(identity): OptionalAuth,
    Path(file_id): Path<String>,
) -> Result<Json<MessageResponse>, ApiError> {
    let deleted = state
        .store
        .run(move |store| {
            let user = match OwnershipGate::new(store).caller(identity.as_ref()) {
                Ok(Some(user)) => user,
                Ok(None) => return Ok(Ok(false)),
                Err(e) => return Ok(Err(e)),
            };
            Ok(Ok(store.files().delete_owned(&file_id, &user.id)?))
        })
        .await??;

    if !deleted {
        return Err(AccessError::NotFound.into());
    }
    Ok(Json(MessageResponse::ok("CSV file deleted successfully")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::NewStoredFile;

    fn identity(sub: &str) -> SessionIdentity {
        SessionIdentity {
            subject_id: sub.to_string(),
            email: format!("{sub}@example.com"),
            name: None,
            access_token: None,
            id_token: "id".to_string(),
        }
    }

    fn seed(state: &AppState, sub: &str) -> String {
        let user = state
            .store
            .users()
            .resolve(sub, &format!("{sub}@example.com"), None)
            .unwrap();
        state
            .store
            .files()
            .create(
                &user.id,
                NewStoredFile {
                    storage_name: "id_data.csv".to_string(),
                    original_name: "data.csv".to_string(),
                    content: "x,y\n1,2".to_string(),
                    size_bytes: 7,
                    columns: vec!["x".to_string(), "y".to_string()],
                    total_rows: 1,
                    config: FileConfig::default(),
                },
            )
            .unwrap()
            .id
    }

    fn config_body(update: &FileConfig) -> Bytes {
        Bytes::from(serde_json::to_vec(update).unwrap())
    }

    #[test]
    fn parse_number_treats_blank_as_absent() {
        assert_eq!(parse_number::<u64>("max_rows", "  ").unwrap(), None);
        assert_eq!(parse_number::<u64>("max_rows", "25").unwrap(), Some(25));
        assert_eq!(parse_number::<f64>("x_range_min", "-1.5").unwrap(), Some(-1.5));
        assert_eq!(
            parse_number::<u64>("max_rows", "many").unwrap_err().status,
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn bounds_must_be_finite() {
        assert_eq!(parse_bound("x_range_min", "").unwrap(), None);
        assert_eq!(parse_bound("x_range_min", "2.5").unwrap(), Some(2.5));
        for raw in ["NaN", "nan", "inf", "-inf", "infinity"] {
            let err = parse_bound("x_range_min", raw).unwrap_err();
            assert_eq!(err.status, StatusCode::BAD_REQUEST, "{raw}");
            assert!(err.message.contains("finite"), "{raw}");
        }
    }

    #[tokio::test]
    async fn list_requires_session() {
        let (state, _dir) = AppState::for_tests();
        let err = list_files(State(state), OptionalAuth(None)).await.err().unwrap();
        assert_eq!(err.status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn owner_can_read_update_and_delete() {
        let (state, _dir) = AppState::for_tests();
        let file_id = seed(&state, "alice");
        let alice = || OptionalAuth(Some(identity("alice")));

        let Json(list) = list_files(State(state.clone()), alice()).await.unwrap();
        assert_eq!(list.files.len(), 1);

        let Json(detail) = get_file(State(state.clone()), alice(), Path(file_id.clone()))
            .await
            .unwrap();
        assert_eq!(detail.file.content, "x,y\n1,2");

        let update = FileConfig {
            x_column: Some("x".to_string()),
            ..Default::default()
        };
        let Json(updated) =
            update_configuration(State(state.clone()), alice(), Path(file_id.clone()), config_body(&update))
                .await
                .unwrap();
        assert!(updated.success);
        let Json(detail) = get_file(State(state.clone()), alice(), Path(file_id.clone()))
            .await
            .unwrap();
        assert_eq!(detail.file.summary.x_column.as_deref(), Some("x"));

        let Json(deleted) = delete_file(State(state.clone()), alice(), Path(file_id.clone()))
            .await
            .unwrap();
        assert_eq!(deleted.message, "CSV file deleted successfully");
        let err = get_file(State(state.clone()), alice(), Path(file_id))
            .await
            .err()
            .unwrap();
        assert_eq!(err.status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn other_users_see_not_found() {
        let (state, _dir) = AppState::for_tests();
        let file_id = seed(&state, "alice");
        seed(&state, "bob");
        let bob = || OptionalAuth(Some(identity("bob")));

        let Json(list) = list_files(State(state.clone()), bob()).await.unwrap();
        assert_eq!(list.files.len(), 1);
        assert_ne!(list.files[0].id, file_id);

        let err = get_file(State(state.clone()), bob(), Path(file_id.clone()))
            .await
            .err()
            .unwrap();
        assert_eq!(err.status, StatusCode::NOT_FOUND);

        let update = FileConfig {
            description: Some("hijack".to_string()),
            ..Default::default()
        };
        let err = update_configuration(State(state.clone()), bob(), Path(file_id.clone()), config_body(&update))
            .await
            .err()
            .unwrap();
        assert_eq!(err.status, StatusCode::NOT_FOUND);

        let err = delete_file(State(state.clone()), bob(), Path(file_id.clone()))
            .await
            .err()
            .unwrap();
        assert_eq!(err.status, StatusCode::NOT_FOUND);

        let alice = identity("alice");
        let still_there = OwnershipGate::new(&state.store)
            .owned_file(Some(&alice), &file_id)
            .unwrap();
        assert!(still_there.config.description.is_none());
    }

    #[tokio::test]
    async fn empty_update_is_not_found_for_owner() {
        let (state, _dir) = AppState::for_tests();
        let file_id = seed(&state, "alice");

        let err = update_configuration(
            State(state.clone()),
            OptionalAuth(Some(identity("alice"))),
            Path(file_id),
            Bytes::from_static(b"{}"),
        )
        .await
        .err()
        .unwrap();
        assert_eq!(err.status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn update_checks_session_before_body() {
        let (state, _dir) = AppState::for_tests();
        let file_id = seed(&state, "alice");

        let err = update_configuration(
            State(state.clone()),
            OptionalAuth(None),
            Path(file_id.clone()),
            Bytes::from_static(b"not json"),
        )
        .await
        .err()
        .unwrap();
        assert_eq!(err.status, StatusCode::UNAUTHORIZED);

        let err = update_configuration(
            State(state),
            OptionalAuth(Some(identity("alice"))),
            Path(file_id),
            Bytes::from_static(b"not json"),
        )
        .await
        .err()
        .unwrap();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn unresolved_session_deletes_nothing() {
        let (state, _dir) = AppState::for_tests();
        let file_id = seed(&state, "alice");

        let err = delete_file(State(state.clone()), OptionalAuth(Some(identity("ghost"))), Path(file_id))
            .await
            .err()
            .unwrap();
        assert_eq!(err.status, StatusCode::NOT_FOUND);
        assert_eq!(state.store.users().count().unwrap(), 1);
    }
}
