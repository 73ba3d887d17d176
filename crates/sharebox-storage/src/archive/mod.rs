//! Streaming ZIP archives of stored files.
//!
//! Entries are stored uncompressed so the archive's exact length is known
//! before the first byte is produced. That length is what lets folder
//! downloads answer `Range` requests.

pub mod encoder;
pub mod entry;
pub mod layout;
pub mod slice;
pub mod stream;

pub use entry::{ArchiveEntry, ArchivePlan, ArchivePlanBuilder, verify_tree};
pub use layout::archive_size;
pub use slice::RangeSlice;
pub use stream::ArchiveStreamer;
