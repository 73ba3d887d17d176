//! # sharebox-storage
//!
//! Storage layer for Sharebox: the confined local filesystem provider,
//! resumable upload staging slots, and the streaming ZIP archive encoder
//! used for folder downloads.

pub mod archive;
pub mod chunked;
pub mod confinement;
pub mod providers;

pub use archive::{ArchiveEntry, ArchivePlan, ArchivePlanBuilder, ArchiveStreamer};
pub use chunked::{ChunkOutcome, ResumableError, ResumableSlot, ResumableStore};
pub use confinement::PathConfinement;
pub use providers::local::LocalStorageProvider;
