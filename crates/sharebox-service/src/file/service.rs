//! Admin file operations that keep shares consistent with storage.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::info;

use sharebox_core::error::AppError;
use sharebox_core::result::AppResult;
use sharebox_core::traits::storage::{DirectoryListing, KeyRename, StorageProvider};
use sharebox_core::types::path::{join_key, normalize_directory_path, normalize_file_key};

use super::upload::{UploadedPart, is_ignored_upload, store_parts};
use crate::share::ShareRegistry;

/// A selection made in the admin file browser.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    /// A single stored file.
    File(String),
    /// A directory and everything below it.
    Directory(String),
}

impl Selection {
    /// Parse `file:<key>` or `directory:<path>`. Bare values are files.
    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim();
        let selection = if let Some(path) = value.strip_prefix("directory:") {
            Self::Directory(path.trim().to_string())
        } else {
            Self::File(value.strip_prefix("file:").unwrap_or(value).trim().to_string())
        };
        match &selection {
            Self::File(key) if key.is_empty() => None,
            _ => Some(selection),
        }
    }

    /// The selected key or path.
    pub fn key(&self) -> &str {
        match self {
            Self::File(key) | Self::Directory(key) => key,
        }
    }
}

/// Result of an admin batch upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdminUpload {
    /// Keys the files were stored under.
    pub keys: Vec<String>,
    /// Number of hidden system files skipped.
    pub skipped: usize,
}

/// File operations for the admin API.
///
/// Every operation that removes or renames files updates the share
/// registry in the same call, so shares never point at stale keys.
#[derive(Debug, Clone)]
pub struct FileService {
    /// File storage.
    storage: Arc<dyn StorageProvider>,
    /// Share registry.
    registry: Arc<ShareRegistry>,
}

impl FileService {
    /// Creates a new file service.
    pub fn new(storage: Arc<dyn StorageProvider>, registry: Arc<ShareRegistry>) -> Self {
        Self { storage, registry }
    }

    /// The storage provider behind this service.
    pub fn storage(&self) -> &Arc<dyn StorageProvider> {
        &self.storage
    }

    /// List the immediate children of a directory.
    pub async fn list_directory(&self, path: &str) -> AppResult<DirectoryListing> {
        let path = normalize_directory_path(path)?;
        self.storage.list_dir(&path).await
    }

    /// Create `name` inside `parent`.
    pub async fn create_directory(&self, parent: &str, name: &str) -> AppResult<String> {
        let name = name.trim();
        if name.is_empty() {
            return Err(AppError::invalid_argument("Folder name is required."));
        }
        if name.contains(['/', '\\']) || name == "." || name == ".." {
            return Err(AppError::invalid_argument(
                "Folder name contains invalid characters.",
            ));
        }

        let parent = normalize_directory_path(parent)?;
        let path = join_key(&parent, name);
        if self.storage.exists(&path).await? {
            return Err(AppError::conflict(format!("“{name}” already exists.")));
        }
        self.storage.create_dir(&path).await?;
        info!(path = %path, "Created directory");
        Ok(path)
    }

    /// Store uploaded files below `directory`, skipping system clutter.
    pub async fn upload_files(
        &self,
        directory: &str,
        parts: Vec<UploadedPart>,
    ) -> AppResult<AdminUpload> {
        let directory = normalize_directory_path(directory)?;
        let submitted = parts.len();
        let accepted: Vec<UploadedPart> = parts
            .into_iter()
            .filter(|part| !is_ignored_upload(&part.file_name))
            .collect();
        let skipped = submitted - accepted.len();

        if accepted.is_empty() {
            return Err(AppError::invalid_argument(if submitted > 0 {
                "Only system files were selected."
            } else {
                "Select at least one file to upload."
            }));
        }

        let keys = store_parts(self.storage.as_ref(), &directory, accepted).await?;
        info!(directory = %directory, files = keys.len(), skipped, "Stored admin upload");
        Ok(AdminUpload { keys, skipped })
    }

    /// Delete a file and drop it from every share.
    pub async fn delete_file(&self, key: &str) -> AppResult<()> {
        let key = normalize_file_key(key)?;
        self.storage.delete(&key).await?;
        self.registry.remove_file_from_shares(&key).await?;
        info!(key = %key, "Deleted file");
        Ok(())
    }

    /// Delete a directory recursively and drop its files from every share.
    pub async fn delete_directory(&self, path: &str) -> AppResult<usize> {
        let path = normalize_directory_path(path)?;
        if path.is_empty() {
            return Err(AppError::invalid_argument("Invalid directory path."));
        }

        let files = self.storage.list_files(&path, true).await?;
        let keys: Vec<String> = files.into_iter().map(|f| f.key).collect();
        self.storage.delete_dir(&path).await?;
        self.registry.remove_files_from_shares(&keys).await?;
        info!(path = %path, files = keys.len(), "Deleted directory");
        Ok(keys.len())
    }

    /// Move entries into `destination`, rewriting share keys.
    pub async fn move_entries(
        &self,
        selections: &[Selection],
        destination: &str,
    ) -> AppResult<Vec<KeyRename>> {
        let mut seen = HashSet::new();
        let keys: Vec<String> = selections
            .iter()
            .map(|s| s.key().to_string())
            .filter(|key| !key.is_empty() && seen.insert(key.clone()))
            .collect();
        if keys.is_empty() {
            return Err(AppError::invalid_argument("Select one or more items to move."));
        }

        let destination = normalize_directory_path(destination)?;
        let renames = self.storage.move_entries(&keys, &destination).await?;
        self.registry.replace_file_keys(&renames).await?;
        info!(destination = %destination, files = renames.len(), "Moved entries");
        Ok(renames)
    }

    /// Expand a selection into the file keys a download share should hold.
    pub async fn collect_download_share_keys(&self, selections: &[Selection]) -> AppResult<Vec<String>> {
        let mut seen = HashSet::new();
        let mut keys = Vec::new();
        for selection in selections {
            match selection {
                Selection::File(key) => {
                    let file = self
                        .storage
                        .stat(&normalize_file_key(key)?)
                        .await?
                        .ok_or_else(|| AppError::not_found(format!("File not found: {key}")))?;
                    if seen.insert(file.key.clone()) {
                        keys.push(file.key);
                    }
                }
                Selection::Directory(path) => {
                    let path = normalize_directory_path(path)?;
                    for file in self.storage.list_files(&path, true).await? {
                        if seen.insert(file.key.clone()) {
                            keys.push(file.key);
                        }
                    }
                }
            }
        }

        if keys.is_empty() {
            return Err(AppError::invalid_argument(
                "The selected folders do not contain any files to share yet.",
            ));
        }
        Ok(keys)
    }
}
