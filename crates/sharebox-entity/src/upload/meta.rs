//! Resumable upload metadata and chunk ranges.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identity of the file being reconstructed in a resumable slot.
///
/// Written by the first chunk and checked against every later chunk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResumableMeta {
    /// Client-side file name.
    pub name: String,
    /// Declared MIME type.
    #[serde(default = "default_mime_type")]
    pub mime_type: String,
    /// Total size fixed by the first chunk.
    pub declared_size: u64,
    /// Path relative to the upload target, for folder uploads.
    #[serde(default)]
    pub relative_path: Option<String>,
    /// Client-side modification time.
    #[serde(default = "Utc::now")]
    pub last_modified: DateTime<Utc>,
    /// Set once the final chunk has been accepted.
    #[serde(default)]
    pub completed: bool,
}

impl ResumableMeta {
    /// Whether a later chunk describes the same file.
    pub fn matches(&self, name: &str, declared_size: u64) -> bool {
        self.declared_size == declared_size && self.name == name
    }
}

fn default_mime_type() -> String {
    "application/octet-stream".to_string()
}

/// A parsed `Content-Range: bytes start-end/total` header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentRange {
    /// First byte offset of the chunk.
    pub start: u64,
    /// Last byte offset of the chunk (inclusive).
    pub end: u64,
    /// Total size of the file.
    pub total: u64,
}

impl ContentRange {
    /// Payload length the chunk must carry.
    pub fn len(&self) -> u64 {
        self.end - self.start + 1
    }

    /// Chunks always carry at least one byte.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Whether this chunk ends the file.
    pub fn is_final(&self) -> bool {
        self.end + 1 == self.total
    }
}
