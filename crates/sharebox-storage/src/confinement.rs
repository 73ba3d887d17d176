//! Confinement of caller-supplied keys to a storage root.

use std::path::{Path, PathBuf};

use sharebox_core::error::AppError;
use sharebox_core::result::AppResult;

/// Resolves `/`-separated keys against a root directory.
///
/// Resolution is lexical: `..` segments, NUL bytes, and drive prefixes
/// are rejected outright rather than clamped, so a hostile key never
/// silently maps onto a different file. Symbolic links that already
/// exist inside the root are followed.
#[derive(Debug, Clone)]
pub struct PathConfinement {
    root: PathBuf,
}

impl PathConfinement {
    /// Confine keys to `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The confinement root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a key to an absolute path inside the root.
    ///
    /// The empty key (or `/`) resolves to the root itself.
    pub fn resolve(&self, key: &str) -> AppResult<PathBuf> {
        let mut path = self.root.clone();
        for segment in split_segments(key)? {
            path.push(segment);
        }
        Ok(path)
    }

    /// Normalize a key into its canonical `/`-joined form without resolving it.
    pub fn normalize(&self, key: &str) -> AppResult<String> {
        Ok(split_segments(key)?.join("/"))
    }

    /// Map a path under the root back to its key.
    pub fn key_for(&self, path: &Path) -> Option<String> {
        let relative = path.strip_prefix(&self.root).ok()?;
        let parts: Vec<String> = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect();
        Some(parts.join("/"))
    }
}

fn split_segments(key: &str) -> AppResult<Vec<&str>> {
    let mut segments = Vec::new();
    for segment in key.split(['/', '\\']) {
        match segment {
            "" | "." => continue,
            ".." => return Err(escape_error(key)),
            s if s.contains('\0') => return Err(escape_error(key)),
            s if segments.is_empty() && is_drive_prefix(s) => return Err(escape_error(key)),
            s => segments.push(s),
        }
    }
    Ok(segments)
}

fn is_drive_prefix(segment: &str) -> bool {
    let bytes = segment.as_bytes();
    bytes.len() == 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':'
}

fn escape_error(key: &str) -> AppError {
    AppError::invalid_argument(format!("Path escapes storage root: {key}"))
}
