//! Inclusive byte ranges shared by storage reads, archive slicing, and HTTP.

use serde::{Deserialize, Serialize};

/// An inclusive `[start, end]` byte range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ByteRange {
    /// First byte offset.
    pub start: u64,
    /// Last byte offset (inclusive).
    pub end: u64,
}

impl ByteRange {
    /// Create a range. Returns `None` when `end < start`.
    pub fn new(start: u64, end: u64) -> Option<Self> {
        (end >= start).then_some(Self { start, end })
    }

    /// Number of bytes covered.
    pub fn len(&self) -> u64 {
        self.end - self.start + 1
    }

    /// Ranges are never empty.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Whether the range spans the whole of a `total`-byte resource.
    pub fn is_full(&self, total: u64) -> bool {
        self.start == 0 && self.end + 1 == total
    }
}
