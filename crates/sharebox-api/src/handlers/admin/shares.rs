//! Admin share management.

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use validator::Validate;

use sharebox_core::error::AppError;
use sharebox_service::file::Selection;

use crate::dto::request::{CreateDownloadShareRequest, CreateUploadShareRequest};
use crate::dto::response::{ApiResponse, RevokeResponse, ShareResponse};
use crate::error::ApiResult;
use crate::extractors::AdminToken;
use crate::state::AppState;

/// GET /api/admin/shares
pub async fn list_shares(
    _admin: AdminToken,
    State(state): State<AppState>,
) -> ApiResult<Json<ApiResponse<Vec<ShareResponse>>>> {
    let shares = state.registry.list().await?;
    Ok(Json(ApiResponse::ok(
        shares.iter().map(ShareResponse::from).collect(),
    )))
}

/// POST /api/admin/shares/download
pub async fn create_download_share(
    _admin: AdminToken,
    State(state): State<AppState>,
    Json(req): Json<CreateDownloadShareRequest>,
) -> ApiResult<(StatusCode, Json<ApiResponse<ShareResponse>>)> {
    req.validate()?;

    let selections: Vec<Selection> = req
        .entries
        .iter()
        .filter_map(|entry| Selection::parse(entry))
        .collect();
    if selections.is_empty() {
        return Err(AppError::invalid_argument(
            "Select at least one valid file or folder to share.",
        )
        .into());
    }

    let keys = state
        .file_service
        .collect_download_share_keys(&selections)
        .await?;
    let share = state
        .registry
        .create_download_share(keys, req.expires_in_minutes)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok(ShareResponse::from(&share))),
    ))
}

/// POST /api/admin/shares/upload
pub async fn create_upload_share(
    _admin: AdminToken,
    State(state): State<AppState>,
    Json(req): Json<CreateUploadShareRequest>,
) -> ApiResult<(StatusCode, Json<ApiResponse<ShareResponse>>)> {
    req.validate()?;

    let share = state
        .registry
        .create_upload_share(req.expires_in_minutes, req.max_bytes, &req.target_directory)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok(ShareResponse::from(&share))),
    ))
}

/// DELETE /api/admin/shares/{token}
pub async fn revoke_share(
    _admin: AdminToken,
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> ApiResult<Json<ApiResponse<RevokeResponse>>> {
    if !state.registry.revoke(&token).await? {
        return Err(AppError::not_found("Unknown share token.").into());
    }
    Ok(Json(ApiResponse::ok(RevokeResponse { token })))
}
