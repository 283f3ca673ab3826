// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderValue, Method},
    routing::{get, post, put},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{
    cors::CorsLayer,
    limit::RequestBodyLimitLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    auth::SessionIdentity,
    models::{
        AuthStatusResponse, EstablishSessionRequest, FileDetail, FileDetailResponse,
        FileListResponse, FileSummary, MessageResponse, UploadResponse, UserResponse,
    },
    state::AppState,
    storage::FileConfig,
};

pub mod files;
pub mod health;
pub mod session;
pub mod users;

/// Build the application router.
///
/// `cors_origins` lists the browser origins allowed to send credentialed
/// requests; invalid entries are skipped.
pub fn router(state: AppState, cors_origins: &[String]) -> Router {
    let max_upload_bytes = state.max_upload_bytes;

    let csv_routes = Router::new()
        .route("/save-csv", post(files::upload_file))
        .route("/csv-files", get(files::list_files))
        .route(
            "/csv-file/{file_id}",
            get(files::get_file).delete(files::delete_file),
        )
        .route(
            "/csv-file/{file_id}/configuration",
            put(files::update_configuration),
        )
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(max_upload_bytes));

    let app_routes = Router::new()
        .route("/health", get(health::liveness))
        .route("/health/ready", get(health::readiness))
        .route("/auth/session", post(session::establish_session))
        .route("/auth/logout", post(session::logout))
        .route("/api/auth/status", get(session::auth_status))
        .route("/api/users/me", get(users::get_current_user))
        .nest("/api/csv", csv_routes)
        .with_state(state);

    Router::new()
        .merge(app_routes)
        .merge(SwaggerUi::new("/docs").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .layer(cors_layer(cors_origins))
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                .layer(PropagateRequestIdLayer::x_request_id())
                .layer(TraceLayer::new_for_http()),
        )
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "Skipping invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::liveness,
        health::readiness,
        session::establish_session,
        session::logout,
        session::auth_status,
        users::get_current_user,
        files::upload_file,
        files::list_files,
        files::get_file,
        files::update_configuration,
        files::delete_file
    ),
    components(
        schemas(
            EstablishSessionRequest,
            AuthStatusResponse,
            SessionIdentity,
            UserResponse,
            MessageResponse,
            UploadResponse,
            FileSummary,
            FileDetail,
            FileListResponse,
            FileDetailResponse,
            FileConfig,
            files::UploadForm,
            health::ReadyResponse,
            health::HealthChecks,
            health::HealthResponse
        )
    ),
    tags(
        (name = "Health", description = "Liveness and readiness probes"),
        (name = "Session", description = "Session establishment and status"),
        (name = "Users", description = "Local user records"),
        (name = "Files", description = "CSV upload, retrieval and chart configuration")
    )
)]
struct ApiDoc;
