//! Resumable upload slots.

use std::sync::Arc;

use bytes::{Bytes, BytesMut};
use futures::StreamExt;
use tracing::{debug, warn};

use sharebox_core::result::AppResult;
use sharebox_core::traits::storage::{ByteStream, StorageProvider, WriteOptions};
use sharebox_entity::upload::{ContentRange, ResumableMeta};

use super::content_range::sanitize_segment;
use super::error::ResumableError;

const DATA_NAME: &str = "data.bin";
const META_NAME: &str = "meta.json";

/// Result of accepting one chunk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChunkOutcome {
    /// More data is expected.
    Continue {
        /// Offset the client should send next.
        next_offset: u64,
        /// Bytes staged so far.
        staged: u64,
    },
    /// The final chunk arrived and the staged data is complete.
    Completed {
        /// Metadata fixed by the first chunk, now marked completed.
        meta: ResumableMeta,
    },
}

/// Hands out slots under the staging provider.
#[derive(Debug, Clone)]
pub struct ResumableStore {
    staging: Arc<dyn StorageProvider>,
}

impl ResumableStore {
    /// Stage uploads through `staging`, which must not be the file store itself.
    pub fn new(staging: Arc<dyn StorageProvider>) -> Self {
        Self { staging }
    }

    /// The slot for `upload_id` within `scope`.
    ///
    /// Both parts are sanitized, so two different scopes never share a slot
    /// and neither part can name a path outside the staging root.
    pub fn slot(&self, scope: &str, upload_id: &str) -> ResumableSlot {
        let scope = non_empty(sanitize_segment(scope), "scope");
        let upload_id = non_empty(sanitize_segment(upload_id), "upload");
        ResumableSlot {
            staging: Arc::clone(&self.staging),
            dir: format!("{scope}/{upload_id}"),
        }
    }
}

/// Staging area of one in-progress upload.
#[derive(Debug, Clone)]
pub struct ResumableSlot {
    staging: Arc<dyn StorageProvider>,
    dir: String,
}

impl ResumableSlot {
    /// Staging key of the slot directory.
    pub fn key(&self) -> &str {
        &self.dir
    }

    fn data_key(&self) -> String {
        format!("{}/{DATA_NAME}", self.dir)
    }

    fn meta_key(&self) -> String {
        format!("{}/{META_NAME}", self.dir)
    }

    /// Load the slot's metadata, if the first chunk has been accepted.
    pub async fn read_meta(&self) -> AppResult<Option<ResumableMeta>> {
        let key = self.meta_key();
        if self.staging.stat(&key).await?.is_none() {
            return Ok(None);
        }

        let mut stream = self.staging.read(&key, None).await?;
        let mut buf = BytesMut::new();
        while let Some(chunk) = stream.next().await {
            buf.extend_from_slice(&chunk?);
        }

        match serde_json::from_slice(&buf) {
            Ok(meta) => Ok(Some(meta)),
            Err(e) => {
                warn!(slot = %self.dir, error = %e, "Ignoring unreadable upload metadata");
                Ok(None)
            }
        }
    }

    /// Persist the slot's metadata.
    pub async fn write_meta(&self, meta: &ResumableMeta) -> AppResult<()> {
        let json = serde_json::to_vec(meta)?;
        self.staging
            .write(&self.meta_key(), Bytes::from(json), WriteOptions::default())
            .await
    }

    /// Bytes staged so far.
    pub async fn staged_len(&self) -> AppResult<u64> {
        Ok(self
            .staging
            .stat(&self.data_key())
            .await?
            .map(|f| f.size)
            .unwrap_or(0))
    }

    /// Write `chunk` at `offset`, tolerating retransmission.
    ///
    /// A chunk already fully staged is a no-op; one that overlaps the staged
    /// tail appends only its new suffix; one starting past the staged length
    /// is refused. Returns the staged length afterwards.
    pub async fn write_chunk(&self, offset: u64, chunk: Bytes) -> Result<u64, ResumableError> {
        let staged = self.staged_len().await?;
        if offset > staged {
            return Err(ResumableError::UnexpectedOffset { expected: staged });
        }

        let overlap = staged - offset;
        if overlap >= chunk.len() as u64 {
            return Ok(staged);
        }

        let fresh = chunk.slice(overlap as usize..);
        let appended = fresh.len() as u64;
        self.staging
            .write(
                &self.data_key(),
                fresh,
                WriteOptions {
                    append: staged > 0,
                    modified: None,
                },
            )
            .await?;
        Ok(staged + appended)
    }

    /// Drive the slot with one chunk.
    ///
    /// `incoming` describes the file as declared by this request. The first
    /// chunk (offset 0) on an empty slot fixes it; later chunks must agree.
    pub async fn accept(
        &self,
        incoming: &ResumableMeta,
        range: ContentRange,
        payload: Bytes,
    ) -> Result<ChunkOutcome, ResumableError> {
        check_chunk(incoming.declared_size, &range, payload.len() as u64)?;

        let mut meta = match self.read_meta().await? {
            Some(meta) if !meta.matches(&incoming.name, incoming.declared_size) => {
                return Err(ResumableError::MetadataMismatch);
            }
            Some(meta) => meta,
            None if range.start != 0 => return Err(ResumableError::MetadataMissing),
            None => {
                let meta = ResumableMeta {
                    completed: false,
                    ..incoming.clone()
                };
                self.write_meta(&meta).await?;
                meta
            }
        };

        let staged = self.write_chunk(range.start, payload).await?;
        debug!(
            slot = %self.dir,
            start = range.start,
            end = range.end,
            staged,
            "Accepted chunk"
        );

        if !range.is_final() {
            return Ok(ChunkOutcome::Continue {
                next_offset: (range.end + 1).min(staged),
                staged,
            });
        }

        meta.completed = true;
        self.write_meta(&meta).await?;

        if staged != meta.declared_size {
            return Err(ResumableError::IncompleteUpload {
                expected: meta.declared_size,
                staged,
            });
        }
        Ok(ChunkOutcome::Completed { meta })
    }

    /// Stream the staged data.
    pub async fn open_data(&self) -> AppResult<ByteStream> {
        self.staging.read(&self.data_key(), None).await
    }

    /// Remove the slot and everything staged in it.
    pub async fn cleanup(&self) {
        if let Err(e) = self.staging.delete_dir(&self.dir).await {
            warn!(slot = %self.dir, error = %e, "Failed to clean up upload slot");
        }
    }
}

/// Validate a chunk's range against the declared size and its payload.
///
/// A chunk may not extend past the last byte of the declared file.
pub fn check_chunk(
    declared_size: u64,
    range: &ContentRange,
    payload_len: u64,
) -> Result<(), ResumableError> {
    if range.total != declared_size || range.end >= range.total {
        return Err(ResumableError::ChunkSizeMismatch);
    }
    if payload_len == 0 {
        return Err(ResumableError::EmptyChunk);
    }
    if payload_len != range.len() {
        return Err(ResumableError::ChunkPayloadMismatch);
    }
    Ok(())
}

fn non_empty(value: String, fallback: &str) -> String {
    if value.is_empty() {
        fallback.to_string()
    } else {
        value
    }
}
