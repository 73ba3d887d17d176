//! Storage provider trait for the file store behind shares and uploads.
//!
//! Keys are `/`-separated paths relative to the provider root. Every
//! implementation must refuse keys that would resolve outside that root.

use std::path::PathBuf;
use std::pin::Pin;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use futures::Stream;
use serde::{Deserialize, Serialize};

use crate::result::AppResult;
use crate::types::range::ByteRange;

/// A stored file as seen by shares, downloads, and archives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredFile {
    /// Storage key relative to the provider root.
    pub key: String,
    /// Last path segment of the key.
    pub name: String,
    /// MIME type inferred from the file name.
    pub mime_type: String,
    /// Size in bytes.
    pub size: u64,
    /// Last modification time.
    pub last_modified: DateTime<Utc>,
}

/// A sub-directory inside a [`DirectoryListing`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryEntry {
    /// Storage key of the directory.
    pub key: String,
    /// Directory name.
    pub name: String,
    /// Last modification time.
    pub last_modified: DateTime<Utc>,
}

/// The immediate children of a directory.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryListing {
    /// Normalized path of the listed directory (`""` for the root).
    pub path: String,
    /// Sub-directories, sorted by name.
    pub directories: Vec<DirectoryEntry>,
    /// Files, sorted by name.
    pub files: Vec<StoredFile>,
}

/// A file key rewritten by a move.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyRename {
    /// Key before the move.
    pub from: String,
    /// Key after the move.
    pub to: String,
}

/// Options for [`StorageProvider::write`].
#[derive(Debug, Clone, Copy, Default)]
pub struct WriteOptions {
    /// Append to an existing file instead of replacing it.
    pub append: bool,
    /// Modification time to stamp on the written file.
    pub modified: Option<DateTime<Utc>>,
}

/// A byte stream type used for reading file contents.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, std::io::Error>> + Send>>;

/// Trait for file storage backends.
#[async_trait]
pub trait StorageProvider: Send + Sync + std::fmt::Debug + 'static {
    /// Return the provider type name (e.g., "local").
    fn provider_type(&self) -> &str;

    /// Check whether the provider is healthy and reachable.
    async fn health_check(&self) -> AppResult<bool>;

    /// Resolve a key to an absolute path, rejecting keys that escape the root.
    fn resolve(&self, key: &str) -> AppResult<PathBuf>;

    /// Stat a file. Returns `None` when nothing (or a directory) lives at `key`.
    async fn stat(&self, key: &str) -> AppResult<Option<StoredFile>>;

    /// Read a file, optionally limited to an inclusive byte range.
    async fn read(&self, key: &str, range: Option<ByteRange>) -> AppResult<ByteStream>;

    /// Write (or append) bytes to a file, creating parent directories.
    async fn write(&self, key: &str, data: Bytes, options: WriteOptions) -> AppResult<()>;

    /// Write a byte stream to a file, replacing any existing content.
    async fn write_stream(
        &self,
        key: &str,
        stream: ByteStream,
        modified: Option<DateTime<Utc>>,
    ) -> AppResult<u64>;

    /// Check whether a file or directory exists at `key`.
    async fn exists(&self, key: &str) -> AppResult<bool>;

    /// List the immediate children of a directory.
    async fn list_dir(&self, path: &str) -> AppResult<DirectoryListing>;

    /// List files below a directory, optionally descending into sub-directories.
    async fn list_files(&self, path: &str, recursive: bool) -> AppResult<Vec<StoredFile>>;

    /// Create a directory (and any missing parents).
    async fn create_dir(&self, path: &str) -> AppResult<()>;

    /// Move files or directories into `destination`.
    ///
    /// Returns one rename per file that changed key, including files nested
    /// inside moved directories. Fails with a conflict if a target is occupied.
    async fn move_entries(&self, keys: &[String], destination: &str) -> AppResult<Vec<KeyRename>>;

    /// Delete a file. Missing files are not an error.
    async fn delete(&self, key: &str) -> AppResult<()>;

    /// Delete a directory and all its contents recursively.
    async fn delete_dir(&self, path: &str) -> AppResult<()>;
}
