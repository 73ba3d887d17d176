//! Upload share service: resumable chunk ingestion and atomic batches.

use std::sync::Arc;

use bytes::Bytes;
use serde::Serialize;
use tracing::{info, warn};

use sharebox_core::error::AppError;
use sharebox_core::result::AppResult;
use sharebox_core::traits::storage::{StorageProvider, WriteOptions};
use sharebox_core::types::path::{join_key, key_name};
use sharebox_core::types::size::format_bytes;
use sharebox_entity::share::UploadShare;
use sharebox_entity::upload::{ContentRange, ResumableMeta};
use sharebox_storage::chunked::{ChunkOutcome, ResumableError, ResumableSlot, ResumableStore};

use crate::share::ShareRegistry;

const IGNORED_FILE_NAMES: [&str; 3] = [".DS_Store", "Thumbs.db", "desktop.ini"];
const MAX_NAME_ATTEMPTS: u32 = 10_000;

/// One chunk of a resumable upload, as declared by the client.
#[derive(Debug, Clone)]
pub struct ChunkRequest {
    /// Client-chosen upload identifier (already sanitized, non-empty).
    pub upload_id: String,
    /// File identity declared with this chunk.
    pub meta: ResumableMeta,
    /// Declared chunk position, absent for single-request uploads.
    pub range: Option<ContentRange>,
}

/// Result of one accepted chunk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChunkReply {
    /// More data is expected.
    Continue {
        /// Offset the client should send next.
        next_offset: u64,
        /// Bytes staged so far.
        staged: u64,
    },
    /// The upload finished.
    Completed(UploadSummary),
}

/// Outcome of a finished upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UploadSummary {
    /// Message for the uploader.
    pub message: String,
    /// Whether the share reached its quota and closed.
    pub completed: bool,
    /// Keys the files were stored under.
    pub keys: Vec<String>,
}

/// One file of a multipart batch.
#[derive(Debug, Clone)]
pub struct UploadedPart {
    /// Client file name, possibly with a relative folder path.
    pub file_name: String,
    /// File content.
    pub data: Bytes,
}

/// Accepts files sent through upload shares.
#[derive(Debug, Clone)]
pub struct UploadService {
    /// File storage receiving finished uploads.
    storage: Arc<dyn StorageProvider>,
    /// Share registry.
    registry: Arc<ShareRegistry>,
    /// Staging for resumable uploads.
    resumable: ResumableStore,
}

impl UploadService {
    /// Creates a new upload service.
    pub fn new(
        storage: Arc<dyn StorageProvider>,
        registry: Arc<ShareRegistry>,
        resumable: ResumableStore,
    ) -> Self {
        Self {
            storage,
            registry,
            resumable,
        }
    }

    /// Resolve a live upload share.
    pub async fn share(&self, token: &str) -> AppResult<UploadShare> {
        self.registry
            .find_upload(token)
            .await
            .ok_or_else(|| AppError::not_found("Upload share not found or expired."))
    }

    /// Accept one chunk of a resumable upload.
    ///
    /// The final chunk moves the staged data into the share's target
    /// directory and counts it against the quota. Once finalization starts
    /// the slot is removed whatever the outcome; earlier failures keep it so
    /// the client can resume.
    pub async fn ingest_chunk(
        &self,
        share: &UploadShare,
        request: ChunkRequest,
        payload: Bytes,
    ) -> AppResult<ChunkReply> {
        let declared = request.meta.declared_size;
        if declared == 0 {
            return Err(ResumableError::InvalidFileSize.into());
        }
        let range = match request.range {
            Some(range) => range,
            None if payload.len() as u64 == declared => ContentRange {
                start: 0,
                end: declared - 1,
                total: declared,
            },
            None => return Err(ResumableError::MissingContentRange.into()),
        };
        sharebox_storage::chunked::check_chunk(declared, &range, payload.len() as u64)?;

        if let Some(remaining) = share.remaining_bytes() {
            if remaining == 0 {
                return Err(self.close_exhausted(share).await?);
            }
            if range.start == 0 && declared > remaining {
                return Err(quota_exceeded(remaining));
            }
        }

        let slot = self.resumable.slot(&share.token, &request.upload_id);
        let outcome = match slot.accept(&request.meta, range, payload).await {
            Ok(outcome) => outcome,
            Err(e @ ResumableError::IncompleteUpload { .. }) => {
                slot.cleanup().await;
                return Err(e.into());
            }
            Err(e) => return Err(e.into()),
        };

        match outcome {
            ChunkOutcome::Continue {
                next_offset,
                staged,
            } => Ok(ChunkReply::Continue {
                next_offset,
                staged,
            }),
            ChunkOutcome::Completed { meta } => {
                let result = self.finalize(share, &slot, &meta).await;
                slot.cleanup().await;
                result.map(ChunkReply::Completed)
            }
        }
    }

    async fn finalize(
        &self,
        share: &UploadShare,
        slot: &ResumableSlot,
        meta: &ResumableMeta,
    ) -> AppResult<UploadSummary> {
        let label = meta
            .relative_path
            .as_deref()
            .filter(|p| !p.is_empty())
            .unwrap_or(&meta.name)
            .to_string();

        if is_ignored_upload(&meta.name) {
            info!(token = %share.token, file = %label, "Skipped hidden upload");
            return Ok(UploadSummary {
                message: format!("Skipped hidden file “{label}”."),
                completed: false,
                keys: Vec::new(),
            });
        }

        let key = reserve_key(self.storage.as_ref(), &share.target_directory, &label).await?;
        let data = slot.open_data().await?;
        let written = self
            .storage
            .write_stream(&key, data, Some(meta.last_modified))
            .await?;
        info!(token = %share.token, key = %key, size = written, "Stored resumable upload");

        let closed = self
            .registry
            .register_upload(&share.token, meta.declared_size)
            .await?
            .is_none();

        let summary = format!("Uploaded {label} ({}).", format_bytes(meta.declared_size));
        Ok(UploadSummary {
            message: closing_message(summary, closed),
            completed: closed,
            keys: vec![key],
        })
    }

    /// Store a multipart batch atomically with respect to the quota: the
    /// whole batch is checked before anything is written.
    pub async fn ingest_batch(
        &self,
        share: &UploadShare,
        parts: Vec<UploadedPart>,
    ) -> AppResult<UploadSummary> {
        let submitted = parts.len();
        let accepted: Vec<UploadedPart> = parts
            .into_iter()
            .filter(|part| !is_ignored_upload(&part.file_name))
            .collect();
        let skipped = submitted - accepted.len();

        if accepted.is_empty() {
            return Err(AppError::invalid_argument(if submitted > 0 {
                "Only system files were selected."
            } else {
                "Select one or more files to send."
            }));
        }

        let total: u64 = accepted.iter().map(|p| p.data.len() as u64).sum();
        if let Some(remaining) = share.remaining_bytes() {
            if remaining == 0 {
                return Err(self.close_exhausted(share).await?);
            }
            if total > remaining {
                return Err(quota_exceeded(remaining));
            }
        }

        let keys = store_parts(self.storage.as_ref(), &share.target_directory, accepted).await?;
        let closed = self
            .registry
            .register_upload(&share.token, total)
            .await?
            .is_none();
        info!(token = %share.token, files = keys.len(), bytes = total, "Stored upload batch");

        let mut summary = format!(
            "Uploaded {} ({}).",
            plural(keys.len(), "file"),
            format_bytes(total)
        );
        if skipped > 0 {
            summary.push_str(&format!(" Skipped {}.", plural(skipped, "hidden file")));
        }
        Ok(UploadSummary {
            message: closing_message(summary, closed),
            completed: closed,
            keys,
        })
    }

    /// Revoke a share whose quota is used up and build the error reported
    /// to the uploader.
    async fn close_exhausted(&self, share: &UploadShare) -> AppResult<AppError> {
        self.registry.revoke(&share.token).await?;
        Ok(AppError::not_found("This upload link has reached its limit.")
            .with_details(serde_json::json!({ "completed": true })))
    }
}

fn quota_exceeded(remaining: u64) -> AppError {
    AppError::payload_too_large(format!(
        "Only {} remaining for this link.",
        format_bytes(remaining)
    ))
}

fn closing_message(summary: String, closed: bool) -> String {
    if closed {
        format!("{summary} Upload link has reached its limit and is now closed.")
    } else {
        format!("{summary} Files delivered successfully.")
    }
}

fn plural(count: usize, noun: &str) -> String {
    if count == 1 {
        format!("1 {noun}")
    } else {
        format!("{count} {noun}s")
    }
}

/// Whether a file is operating-system clutter that uploads skip.
pub fn is_ignored_upload(file_name: &str) -> bool {
    let name = key_name(&file_name.replace('\\', "/")).to_string();
    IGNORED_FILE_NAMES.contains(&name.as_str()) || name.starts_with("._")
}

/// Write each part below `directory`, returning the keys used.
pub async fn store_parts(
    storage: &dyn StorageProvider,
    directory: &str,
    parts: Vec<UploadedPart>,
) -> AppResult<Vec<String>> {
    let mut keys = Vec::with_capacity(parts.len());
    for part in parts {
        let key = reserve_key(storage, directory, &part.file_name).await?;
        storage.write(&key, part.data, WriteOptions::default()).await?;
        keys.push(key);
    }
    Ok(keys)
}

/// Pick a free key for `relative` below `directory`.
///
/// Each segment is reduced to a safe file name; when the key is taken a
/// ` (n)` suffix is added before the extension.
pub async fn reserve_key(
    storage: &dyn StorageProvider,
    directory: &str,
    relative: &str,
) -> AppResult<String> {
    let segments: Vec<String> = relative
        .replace('\\', "/")
        .split('/')
        .map(sanitize_file_name)
        .filter(|s| !s.is_empty())
        .collect();
    let relative = if segments.is_empty() {
        "upload.bin".to_string()
    } else {
        segments.join("/")
    };

    let candidate = join_key(directory, &relative);
    if !storage.exists(&candidate).await? {
        return Ok(candidate);
    }

    let (parent, name) = match candidate.rsplit_once('/') {
        Some((parent, name)) => (parent.to_string(), name.to_string()),
        None => (String::new(), candidate.clone()),
    };
    let (stem, extension) = split_extension(&name);
    for n in 1..=MAX_NAME_ATTEMPTS {
        let next = join_key(&parent, &format!("{stem} ({n}){extension}"));
        if !storage.exists(&next).await? {
            return Ok(next);
        }
    }
    warn!(key = %candidate, "No free name for upload");
    Err(AppError::conflict("No free name for the uploaded file"))
}

fn sanitize_file_name(segment: &str) -> String {
    let cleaned: String = segment
        .chars()
        .filter(|c| !c.is_control() && !matches!(c, '<' | '>' | ':' | '"' | '|' | '?' | '*'))
        .collect();
    let trimmed = cleaned.trim();
    if trimmed == "." || trimmed == ".." {
        String::new()
    } else {
        trimmed.to_string()
    }
}

fn split_extension(name: &str) -> (&str, &str) {
    match name.rfind('.') {
        Some(idx) if idx > 0 => (&name[..idx], &name[idx..]),
        _ => (name, ""),
    }
}
