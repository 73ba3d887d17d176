//! Request headers of the resumable upload protocol.

use axum::http::{HeaderMap, header};
use chrono::{DateTime, Utc};
use percent_encoding::percent_decode_str;

use sharebox_entity::upload::ResumableMeta;
use sharebox_service::file::ChunkRequest;
use sharebox_storage::chunked::{ResumableError, parse_content_range, sanitize_segment};

/// Marks a request as a resumable chunk rather than a multipart batch.
pub const UPLOAD_ID_HEADER: &str = "x-upload-id";
const FILE_SIZE_HEADER: &str = "x-file-size";
const FILE_NAME_HEADER: &str = "x-file-name";
const FILE_TYPE_HEADER: &str = "x-file-type";
const RELATIVE_PATH_HEADER: &str = "x-file-relative-path";
const LAST_MODIFIED_HEADER: &str = "x-file-last-modified";

const DEFAULT_FILE_NAME: &str = "upload.bin";
const DEFAULT_FILE_TYPE: &str = "application/octet-stream";

/// Read the chunk declaration carried by `headers`.
///
/// Name, type and relative path are percent-decoded. A `Content-Range`
/// that does not parse is reported as missing.
pub fn chunk_request(headers: &HeaderMap) -> Result<ChunkRequest, ResumableError> {
    let upload_id = header_str(headers, UPLOAD_ID_HEADER)
        .map(sanitize_segment)
        .unwrap_or_default();
    if upload_id.is_empty() {
        return Err(ResumableError::MissingUploadId);
    }

    let declared_size = header_str(headers, FILE_SIZE_HEADER)
        .and_then(|v| v.trim().parse::<u64>().ok())
        .filter(|size| *size > 0)
        .ok_or(ResumableError::InvalidFileSize)?;

    let name = decoded(headers, FILE_NAME_HEADER).unwrap_or_else(|| DEFAULT_FILE_NAME.to_string());
    let mime_type =
        decoded(headers, FILE_TYPE_HEADER).unwrap_or_else(|| DEFAULT_FILE_TYPE.to_string());
    let relative_path = decoded(headers, RELATIVE_PATH_HEADER);

    let last_modified = header_str(headers, LAST_MODIFIED_HEADER)
        .and_then(|v| v.trim().parse::<i64>().ok())
        .filter(|ms| *ms > 0)
        .and_then(DateTime::<Utc>::from_timestamp_millis)
        .unwrap_or_else(Utc::now);

    let range = match header_str(headers, header::CONTENT_RANGE.as_str()) {
        Some(value) => Some(parse_content_range(value).ok_or(ResumableError::MissingContentRange)?),
        None => None,
    };

    Ok(ChunkRequest {
        upload_id,
        meta: ResumableMeta {
            name,
            mime_type,
            declared_size,
            relative_path,
            last_modified,
            completed: false,
        },
        range,
    })
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

/// Percent-decoded, trimmed, non-empty header value. Undecodable input is
/// used as sent.
fn decoded(headers: &HeaderMap, name: &str) -> Option<String> {
    let raw = header_str(headers, name)?;
    let value = match percent_decode_str(raw).decode_utf8() {
        Ok(value) => value.into_owned(),
        Err(_) => raw.to_string(),
    };
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}
