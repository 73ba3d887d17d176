//! Resumable upload staging.
//!
//! Each in-progress upload owns a slot directory under the staging root,
//! keyed by `(scope, upload id)`, holding `data.bin` and `meta.json`.

pub mod content_range;
pub mod error;
pub mod slot;

pub use content_range::{parse_content_range, sanitize_segment};
pub use error::ResumableError;
pub use slot::{ChunkOutcome, ResumableSlot, ResumableStore, check_chunk};
