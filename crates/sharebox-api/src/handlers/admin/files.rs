//! Admin file browser: listing, uploads, directories, moves, and raw fetch.

use axum::Json;
use axum::extract::{Multipart, Path, Query, State};
use axum::http::{HeaderMap, Method, StatusCode};
use axum::response::Response;
use validator::Validate;

use sharebox_core::error::AppError;
use sharebox_core::traits::storage::DirectoryListing;
use sharebox_service::file::{Selection, file_etag};

use crate::dto::request::{CreateDirectoryRequest, KeyQuery, MoveRequest, PathQuery};
use crate::dto::response::{
    AdminUploadResponse, ApiResponse, DirectoryCreatedResponse, DirectoryDeletedResponse,
    MoveResponse,
};
use crate::error::ApiResult;
use crate::extractors::{AdminToken, read_upload_form};
use crate::http::RangeResponder;
use crate::state::AppState;

/// Multipart text field naming the target directory.
const PATH_FIELD: &str = "path";

/// GET /api/admin/files?path=
pub async fn list_directory(
    _admin: AdminToken,
    State(state): State<AppState>,
    Query(query): Query<PathQuery>,
) -> ApiResult<Json<ApiResponse<DirectoryListing>>> {
    let listing = state.file_service.list_directory(&query.path).await?;
    Ok(Json(ApiResponse::ok(listing)))
}

/// POST /api/admin/files
pub async fn upload_files(
    _admin: AdminToken,
    State(state): State<AppState>,
    multipart: Multipart,
) -> ApiResult<(StatusCode, Json<ApiResponse<AdminUploadResponse>>)> {
    let form = read_upload_form(multipart).await?;
    let directory = form.fields.get(PATH_FIELD).map(String::as_str).unwrap_or("");

    let upload = state.file_service.upload_files(directory, form.parts).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok(AdminUploadResponse {
            keys: upload.keys,
            skipped: upload.skipped,
        })),
    ))
}

/// DELETE /api/admin/files?key=
pub async fn delete_file(
    _admin: AdminToken,
    State(state): State<AppState>,
    Query(query): Query<KeyQuery>,
) -> ApiResult<StatusCode> {
    state.file_service.delete_file(&query.key).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/admin/directories
pub async fn create_directory(
    _admin: AdminToken,
    State(state): State<AppState>,
    Json(req): Json<CreateDirectoryRequest>,
) -> ApiResult<(StatusCode, Json<ApiResponse<DirectoryCreatedResponse>>)> {
    req.validate()?;
    let path = state
        .file_service
        .create_directory(&req.path, &req.name)
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok(DirectoryCreatedResponse { path })),
    ))
}

/// DELETE /api/admin/directories?path=
pub async fn delete_directory(
    _admin: AdminToken,
    State(state): State<AppState>,
    Query(query): Query<PathQuery>,
) -> ApiResult<Json<ApiResponse<DirectoryDeletedResponse>>> {
    let removed_files = state.file_service.delete_directory(&query.path).await?;
    Ok(Json(ApiResponse::ok(DirectoryDeletedResponse {
        path: query.path,
        removed_files,
    })))
}

/// POST /api/admin/move
pub async fn move_entries(
    _admin: AdminToken,
    State(state): State<AppState>,
    Json(req): Json<MoveRequest>,
) -> ApiResult<Json<ApiResponse<MoveResponse>>> {
    req.validate()?;
    let selections: Vec<Selection> = req
        .entries
        .iter()
        .filter_map(|entry| Selection::parse(entry))
        .collect();

    let moved = state
        .file_service
        .move_entries(&selections, &req.destination)
        .await?;
    Ok(Json(ApiResponse::ok(MoveResponse { moved })))
}

/// GET /api/admin/raw/{*key}
pub async fn raw_file(
    _admin: AdminToken,
    State(state): State<AppState>,
    Path(key): Path<String>,
    method: Method,
    headers: HeaderMap,
) -> ApiResult<Response> {
    let file = state
        .storage
        .stat(&key)
        .await?
        .ok_or_else(|| AppError::not_found("File not found"))?;

    let responder = RangeResponder::new(file.size)
        .content_type(&file.mime_type)
        .attachment(&file.name)
        .etag(&file_etag(&file))
        .last_modified(file.last_modified)
        .cache_control("private, no-store")
        .resolve(&method, &headers)?;

    if method == Method::HEAD {
        return Ok(responder.head());
    }
    let body = state.storage.read(&file.key, responder.range()).await?;
    Ok(responder.body(body))
}
