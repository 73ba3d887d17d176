//! Closed-form archive length.
//!
//! These lengths describe exactly what [`super::encoder`] writes; the two
//! modules change together.

use sharebox_core::error::AppError;
use sharebox_core::result::AppResult;

use super::entry::ArchiveEntry;

/// Fixed part of a local file header.
pub const LOCAL_HEADER_LEN: u64 = 30;
/// Data descriptor following each file's content.
pub const DATA_DESCRIPTOR_LEN: u64 = 16;
/// Fixed part of a central directory header.
pub const CENTRAL_HEADER_LEN: u64 = 46;
/// Extended-timestamp extra field carried by every central header.
pub const TIMESTAMP_EXTRA_LEN: u64 = 9;
/// End of central directory record.
pub const END_OF_CENTRAL_DIRECTORY_LEN: u64 = 22;

const MAX_ENTRIES: usize = 0xFFFF;
const MAX_NAME_LEN: u64 = 0xFFFF;
const MAX_OFFSET: u64 = u32::MAX as u64;

/// Bytes an entry contributes before the central directory.
pub fn local_len(entry: &ArchiveEntry) -> u64 {
    let header = LOCAL_HEADER_LEN + entry.name_len();
    match entry {
        ArchiveEntry::Directory { .. } => header,
        ArchiveEntry::File { size, .. } => header + size + DATA_DESCRIPTOR_LEN,
    }
}

/// Bytes an entry contributes to the central directory.
pub fn central_len(entry: &ArchiveEntry) -> u64 {
    CENTRAL_HEADER_LEN + entry.name_len() + TIMESTAMP_EXTRA_LEN
}

/// Exact length of the archive [`super::ArchiveStreamer`] produces.
///
/// Fails with `PayloadTooLarge` when the entries need ZIP64 (more than
/// 65535 entries, or a size or offset beyond 4 GiB).
pub fn archive_size(entries: &[ArchiveEntry]) -> AppResult<u64> {
    if entries.len() > MAX_ENTRIES {
        return Err(too_large("Folder has too many entries to archive."));
    }

    let mut local_total = 0u64;
    let mut central_total = 0u64;
    for entry in entries {
        if entry.name_len() > MAX_NAME_LEN {
            return Err(too_large("Archive path is too long."));
        }
        if local_total > MAX_OFFSET || entry.data_len() > MAX_OFFSET {
            return Err(too_large("Folder is too large to archive."));
        }
        local_total += local_len(entry);
        central_total += central_len(entry);
    }

    if local_total > MAX_OFFSET || central_total > MAX_OFFSET {
        return Err(too_large("Folder is too large to archive."));
    }
    Ok(local_total + central_total + END_OF_CENTRAL_DIRECTORY_LEN)
}

fn too_large(message: &str) -> AppError {
    AppError::payload_too_large(message)
}
