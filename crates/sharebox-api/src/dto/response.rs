//! Response DTOs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use sharebox_core::traits::storage::{KeyRename, StoredFile};
use sharebox_core::types::size::format_bytes;
use sharebox_entity::share::{DownloadShare, ShareKind, ShareRecord, UploadShare};

use crate::http::query_component;

/// Standard success response wrapper used by the admin API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T: Serialize> {
    /// Whether the request was successful.
    pub success: bool,
    /// Response data.
    pub data: T,
}

impl<T: Serialize> ApiResponse<T> {
    /// Creates a successful response.
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data,
        }
    }
}

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// `"ok"` or `"degraded"`.
    pub status: String,
    /// Server version.
    pub version: String,
    /// Storage provider type.
    pub storage: String,
    /// Whether the storage root is reachable.
    pub storage_healthy: bool,
}

/// A share as listed in the admin API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShareResponse {
    /// Share token.
    pub token: String,
    /// Download or upload.
    pub kind: ShareKind,
    /// Public path of the share.
    pub url: String,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Expiry, `null` for none.
    pub expires_at: Option<DateTime<Utc>>,
    /// Shared keys (download shares).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_keys: Option<Vec<String>>,
    /// Target directory (upload shares).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_directory: Option<String>,
    /// Byte quota (upload shares).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_bytes: Option<u64>,
    /// Bytes received so far (upload shares).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uploaded_bytes: Option<u64>,
}

impl From<&ShareRecord> for ShareResponse {
    fn from(record: &ShareRecord) -> Self {
        match record {
            ShareRecord::Download(share) => Self::from(share),
            ShareRecord::Upload(share) => Self::from(share),
        }
    }
}

impl From<&DownloadShare> for ShareResponse {
    fn from(share: &DownloadShare) -> Self {
        Self {
            token: share.token.clone(),
            kind: ShareKind::Download,
            url: download_path(&share.token),
            created_at: share.created_at,
            expires_at: share.expires_at,
            file_keys: Some(share.file_keys.clone()),
            target_directory: None,
            max_bytes: None,
            uploaded_bytes: None,
        }
    }
}

impl From<&UploadShare> for ShareResponse {
    fn from(share: &UploadShare) -> Self {
        Self {
            token: share.token.clone(),
            kind: ShareKind::Upload,
            url: format!("/share/upload/{}", share.token),
            created_at: share.created_at,
            expires_at: share.expires_at,
            file_keys: None,
            target_directory: Some(share.target_directory.clone()),
            max_bytes: share.max_bytes,
            uploaded_bytes: Some(share.uploaded_bytes),
        }
    }
}

/// One file of a download share listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SharedFileResponse {
    /// Storage key.
    pub key: String,
    /// File name.
    pub name: String,
    /// Size in bytes.
    pub size: u64,
    /// Human-readable size.
    pub size_label: String,
    /// MIME type.
    pub mime_type: String,
    /// Last modification time.
    pub last_modified: DateTime<Utc>,
    /// Path that downloads this file.
    pub download_url: String,
}

/// Listing of a download share.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DownloadShareView {
    /// Share token.
    pub token: String,
    /// Expiry, `null` for none.
    pub expires_at: Option<DateTime<Utc>>,
    /// Files still present in storage.
    pub files: Vec<SharedFileResponse>,
    /// Sum of the file sizes.
    pub total_size: u64,
    /// Path that downloads the whole share as a ZIP archive.
    pub archive_url: String,
}

impl DownloadShareView {
    /// Build the listing for `files` of `share`.
    pub fn new(share: &DownloadShare, files: Vec<StoredFile>) -> Self {
        let base = download_path(&share.token);
        let total_size = files.iter().map(|f| f.size).sum();
        let files = files
            .into_iter()
            .map(|file| SharedFileResponse {
                download_url: format!("{base}?file={}", query_component(&file.key)),
                size_label: format_bytes(file.size),
                key: file.key,
                name: file.name,
                size: file.size,
                mime_type: file.mime_type,
                last_modified: file.last_modified,
            })
            .collect();

        Self {
            token: share.token.clone(),
            expires_at: share.expires_at,
            files,
            total_size,
            archive_url: format!("{base}?folder="),
        }
    }
}

/// Details of an upload share shown to uploaders.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadShareView {
    /// Share token.
    pub token: String,
    /// Directory receiving uploads.
    pub target_directory: String,
    /// Expiry, `null` for none.
    pub expires_at: Option<DateTime<Utc>>,
    /// Byte quota, `null` for unlimited.
    pub max_bytes: Option<u64>,
    /// Bytes received so far.
    pub uploaded_bytes: u64,
    /// Bytes left, `null` for unlimited.
    pub remaining_bytes: Option<u64>,
}

impl From<&UploadShare> for UploadShareView {
    fn from(share: &UploadShare) -> Self {
        Self {
            token: share.token.clone(),
            target_directory: share.target_directory.clone(),
            expires_at: share.expires_at,
            max_bytes: share.max_bytes,
            uploaded_bytes: share.uploaded_bytes,
            remaining_bytes: share.remaining_bytes(),
        }
    }
}

/// Result of an admin upload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminUploadResponse {
    /// Keys the files were stored under.
    pub keys: Vec<String>,
    /// Hidden system files skipped.
    pub skipped: usize,
}

/// Result of creating a directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DirectoryCreatedResponse {
    /// Path of the new directory.
    pub path: String,
}

/// Result of deleting a directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DirectoryDeletedResponse {
    /// Path of the deleted directory.
    pub path: String,
    /// Files removed with it.
    pub removed_files: usize,
}

/// Result of a move.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MoveResponse {
    /// Every file key that changed.
    pub moved: Vec<KeyRename>,
}

/// Result of revoking a share.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RevokeResponse {
    /// Revoked token.
    pub token: String,
}

fn download_path(token: &str) -> String {
    format!("/share/download/{token}")
}
