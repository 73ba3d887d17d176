//! Failures of the resumable upload protocol.

use thiserror::Error;

use sharebox_core::error::{AppError, ErrorKind};

/// Reasons a chunk is refused.
///
/// Messages are shown to uploaders verbatim and never include paths.
#[derive(Debug, Error)]
pub enum ResumableError {
    /// No `X-Upload-Id` header.
    #[error("Missing upload identifier.")]
    MissingUploadId,
    /// `X-File-Size` missing, unparsable, or zero.
    #[error("Invalid file size.")]
    InvalidFileSize,
    /// No `Content-Range` and the body is not the whole file.
    #[error("Missing content range metadata.")]
    MissingContentRange,
    /// The range total disagrees with the declared file size.
    #[error("Chunk size mismatch.")]
    ChunkSizeMismatch,
    /// The request carried no bytes.
    #[error("Empty chunk received.")]
    EmptyChunk,
    /// The body length disagrees with the declared range.
    #[error("Chunk payload mismatch.")]
    ChunkPayloadMismatch,
    /// A chunk past offset 0 arrived for a slot that was never started.
    #[error("Upload metadata missing for chunk.")]
    MetadataMissing,
    /// The chunk names a different file than the slot was started with.
    #[error("Upload metadata mismatch.")]
    MetadataMismatch,
    /// The chunk starts beyond the staged data.
    #[error("Unexpected chunk offset.")]
    UnexpectedOffset {
        /// Next offset the server can accept.
        expected: u64,
    },
    /// The final chunk arrived but the staged data is short.
    #[error("Incomplete upload data.")]
    IncompleteUpload {
        /// Declared file size.
        expected: u64,
        /// Bytes actually staged.
        staged: u64,
    },
    /// Staging I/O failed.
    #[error(transparent)]
    Storage(#[from] AppError),
}

impl From<ResumableError> for AppError {
    fn from(err: ResumableError) -> Self {
        let message = err.to_string();
        match err {
            ResumableError::Storage(inner) => inner,
            ResumableError::UnexpectedOffset { expected } => {
                AppError::new(ErrorKind::Conflict, message).with_details(serde_json::json!({
                    "expected_offset": expected,
                }))
            }
            ResumableError::MetadataMissing | ResumableError::MetadataMismatch => {
                AppError::new(ErrorKind::Conflict, message)
            }
            ResumableError::IncompleteUpload { expected, staged } => {
                AppError::new(ErrorKind::InvalidArgument, message).with_details(
                    serde_json::json!({
                        "declared_size": expected,
                        "staged_length": staged,
                    }),
                )
            }
            ResumableError::MissingUploadId
            | ResumableError::InvalidFileSize
            | ResumableError::MissingContentRange
            | ResumableError::ChunkSizeMismatch
            | ResumableError::EmptyChunk
            | ResumableError::ChunkPayloadMismatch => {
                AppError::new(ErrorKind::InvalidArgument, message)
            }
        }
    }
}
