//! Public share handlers: listings, downloads, folder archives, and uploads.

use axum::Json;
use axum::body::to_bytes;
use axum::extract::{FromRequest, Multipart, Path, Query, Request, State};
use axum::http::{HeaderMap, HeaderValue, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use tracing::{debug, info};

use sharebox_core::error::AppError;
use sharebox_entity::share::DownloadShare;
use sharebox_service::file::{ChunkReply, file_etag};

use crate::dto::request::DownloadQuery;
use crate::dto::response::{DownloadShareView, UploadShareView};
use crate::error::ApiResult;
use crate::extractors::read_upload_form;
use crate::http::{RangeResponder, UPLOAD_ID_HEADER, chunk_request};
use crate::state::AppState;

const ARCHIVE_CONTENT_TYPE: &str = "application/zip";

/// GET|HEAD /share/download/{token}
///
/// Without a query this lists the share. `?file=<key>` downloads one file
/// and `?folder=<path>` downloads a folder as a ZIP archive (an empty path
/// archives the whole share). File and archive downloads honor `Range`.
pub async fn download(
    State(state): State<AppState>,
    Path(token): Path<String>,
    Query(query): Query<DownloadQuery>,
    method: Method,
    headers: HeaderMap,
) -> ApiResult<Response> {
    let share = state.download_service.share(&token).await?;

    if let Some(folder) = query.folder {
        return download_folder(&state, &share, &folder, &method, &headers).await;
    }

    match query.file.as_deref().map(str::trim).filter(|k| !k.is_empty()) {
        Some(key) => download_file(&state, &share, key, &method, &headers).await,
        None => {
            let files = state.download_service.list_files(&share).await?;
            Ok(Json(DownloadShareView::new(&share, files)).into_response())
        }
    }
}

async fn download_file(
    state: &AppState,
    share: &DownloadShare,
    key: &str,
    method: &Method,
    headers: &HeaderMap,
) -> ApiResult<Response> {
    let file = state.download_service.shared_file(share, key).await?;
    let responder = RangeResponder::new(file.size)
        .content_type(&file.mime_type)
        .attachment(&file.name)
        .etag(&file_etag(&file))
        .last_modified(file.last_modified)
        .resolve(method, headers)?;

    if method == Method::HEAD {
        return Ok(responder.head());
    }

    let range = responder.range();
    let body = state.download_service.open(&file.key, range).await?;
    info!(token = %share.token, key = %file.key, range = ?range, "Serving shared file");
    Ok(responder.body(body))
}

async fn download_folder(
    state: &AppState,
    share: &DownloadShare,
    folder: &str,
    method: &Method,
    headers: &HeaderMap,
) -> ApiResult<Response> {
    let archive = state.download_service.folder_archive(share, folder).await?;
    let responder = RangeResponder::new(archive.streamer.total_size())
        .content_type(ARCHIVE_CONTENT_TYPE)
        .attachment(&archive.file_name)
        .etag(&archive.etag)
        .resolve(method, headers)?;

    if method == Method::HEAD {
        return Ok(responder.head());
    }

    let range = responder.range();
    let body = match range {
        Some(range) => archive.streamer.stream_range(range),
        None => archive.streamer.stream(),
    };
    info!(
        token = %share.token,
        folder = %folder,
        range = ?range,
        "Serving folder archive"
    );
    Ok(responder.body(body))
}

/// GET /share/upload/{token}
pub async fn upload_info(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> ApiResult<Json<UploadShareView>> {
    let share = state.upload_service.share(&token).await?;
    Ok(Json(UploadShareView::from(&share)))
}

/// POST /share/upload/{token}
///
/// A request with `X-Upload-Id` is one chunk of a resumable upload and
/// its body is the raw chunk. Anything else is a multipart batch of
/// `files` parts.
pub async fn upload(
    State(state): State<AppState>,
    Path(token): Path<String>,
    headers: HeaderMap,
    request: Request,
) -> ApiResult<Response> {
    let share = state.upload_service.share(&token).await?;

    if headers.contains_key(UPLOAD_ID_HEADER) {
        let chunk = chunk_request(&headers)?;
        let limit = usize::try_from(state.config.storage.max_upload_size_bytes).unwrap_or(usize::MAX);
        let payload = to_bytes(request.into_body(), limit)
            .await
            .map_err(|e| AppError::invalid_argument(format!("Failed to read upload body: {e}")))?;

        let upload_id = chunk.upload_id.clone();
        return match state.upload_service.ingest_chunk(&share, chunk, payload).await? {
            ChunkReply::Continue {
                next_offset,
                staged,
            } => {
                debug!(token = %share.token, upload_id = %upload_id, next_offset, "Awaiting next chunk");
                Ok(continue_response(next_offset, staged))
            }
            ChunkReply::Completed(summary) => Ok(Json(summary).into_response()),
        };
    }

    let multipart = Multipart::from_request(request, &state)
        .await
        .map_err(|e| AppError::invalid_argument(format!("Expected a multipart upload: {e}")))?;
    let form = read_upload_form(multipart).await?;
    let summary = state.upload_service.ingest_batch(&share, form.parts).await?;
    Ok(Json(summary).into_response())
}

/// `204` telling the client where to resume.
fn continue_response(next_offset: u64, staged: u64) -> Response {
    let mut response = StatusCode::NO_CONTENT.into_response();
    let headers = response.headers_mut();
    headers.insert("upload-offset", HeaderValue::from(next_offset));
    headers.insert("upload-length", HeaderValue::from(staged));
    response
}
