//! Download share service: shared file listing, single files, and folder
//! archives.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use sharebox_core::error::AppError;
use sharebox_core::result::AppResult;
use sharebox_core::traits::storage::{ByteStream, StorageProvider, StoredFile};
use sharebox_core::types::path::{normalize_directory_path, sanitize_archive_path};
use sharebox_core::types::range::ByteRange;
use sharebox_entity::share::DownloadShare;
use sharebox_storage::archive::{ArchivePlanBuilder, ArchiveStreamer};

use crate::share::ShareRegistry;

/// A folder archive ready to be served.
#[derive(Debug)]
pub struct FolderArchive {
    /// Suggested download name, `<root>.zip`.
    pub file_name: String,
    /// Weak validator derived from the share, folder, and archive size.
    pub etag: String,
    /// Producer of the archive bytes.
    pub streamer: ArchiveStreamer,
}

/// Serves the contents of download shares.
///
/// Files that disappeared from storage are dropped from every share as
/// they are discovered; a share left with nothing to offer is revoked.
#[derive(Debug, Clone)]
pub struct DownloadService {
    /// File storage.
    storage: Arc<dyn StorageProvider>,
    /// Share registry.
    registry: Arc<ShareRegistry>,
}

impl DownloadService {
    /// Creates a new download service.
    pub fn new(storage: Arc<dyn StorageProvider>, registry: Arc<ShareRegistry>) -> Self {
        Self { storage, registry }
    }

    /// Resolve a live download share.
    pub async fn share(&self, token: &str) -> AppResult<DownloadShare> {
        self.registry
            .find_download(token)
            .await
            .ok_or_else(|| AppError::not_found("Download share not found or expired."))
    }

    /// Every shared file still present in storage, in share order.
    pub async fn list_files(&self, share: &DownloadShare) -> AppResult<Vec<StoredFile>> {
        let mut files = Vec::with_capacity(share.file_keys.len());
        for key in &share.file_keys {
            match self.storage.stat(key).await? {
                Some(file) => files.push(file),
                None => self.forget_missing(key).await?,
            }
        }

        if files.is_empty() {
            self.registry.revoke(&share.token).await?;
            return Err(AppError::not_found("All shared files were removed."));
        }
        Ok(files)
    }

    /// Stat one shared file.
    pub async fn shared_file(&self, share: &DownloadShare, key: &str) -> AppResult<StoredFile> {
        if !share.contains(key) {
            return Err(AppError::not_found("File not found"));
        }
        match self.storage.stat(key).await? {
            Some(file) => Ok(file),
            None => {
                self.forget_missing(key).await?;
                Err(AppError::not_found("File not found"))
            }
        }
    }

    /// Open a stored file, optionally limited to a byte range.
    pub async fn open(&self, key: &str, range: Option<ByteRange>) -> AppResult<ByteStream> {
        self.storage.read(key, range).await
    }

    /// Plan an archive of the shared files under `folder`.
    ///
    /// An empty folder means the whole share.
    pub async fn folder_archive(&self, share: &DownloadShare, folder: &str) -> AppResult<FolderArchive> {
        let folder = normalize_directory_path(folder)?;
        let mut keys: Vec<&String> = if folder.is_empty() {
            share.file_keys.iter().collect()
        } else {
            let prefix = format!("{folder}/");
            share
                .file_keys
                .iter()
                .filter(|key| key.starts_with(&prefix))
                .collect()
        };
        if keys.is_empty() {
            return Err(AppError::not_found("Folder not found or contains no files."));
        }
        keys.sort();

        let fallback_root = format!("share-{}", token_prefix(&share.token));
        let root_name = folder
            .rsplit('/')
            .next()
            .map(sanitize_archive_path)
            .filter(|name| !name.is_empty())
            .unwrap_or(fallback_root);

        let mut builder = ArchivePlanBuilder::new(root_name.clone());
        let mut found = 0usize;
        let mut newest = None;
        for key in keys {
            let Some(file) = self.storage.stat(key).await? else {
                self.forget_missing(key).await?;
                continue;
            };
            let modified = normalize_time(file.last_modified);
            let relative = relative_path(key, &folder, &file.name);
            if builder.add_file(&relative, file.size, modified, key.clone()) {
                found += 1;
                newest = newest.max(Some(modified));
            }
        }

        let Some(newest) = newest else {
            if self.registry.find_download(&share.token).await.is_none() {
                return Err(AppError::not_found("All shared files were removed."));
            }
            return Err(AppError::not_found("Folder not found or contains no files."));
        };

        // Directory entries take the newest file time so repeated requests
        // produce identical bytes.
        let plan = builder.directory_time(newest).build();
        let streamer = ArchiveStreamer::new(Arc::clone(&self.storage), plan)?;
        let etag = folder_etag(&share.token, &folder, streamer.total_size());
        info!(
            token = %share.token,
            folder = %folder,
            files = found,
            size = streamer.total_size(),
            "Prepared folder archive"
        );

        Ok(FolderArchive {
            file_name: format!("{root_name}.zip"),
            etag,
            streamer,
        })
    }

    async fn forget_missing(&self, key: &str) -> AppResult<()> {
        debug!(key, "Shared file is missing from storage");
        self.registry.remove_file_from_shares(key).await
    }
}

/// Weak validator for a single stored file.
pub fn file_etag(file: &StoredFile) -> String {
    format!("W/\"{}-{}\"", file.last_modified.timestamp_millis(), file.size)
}

fn folder_etag(token: &str, folder: &str, size: u64) -> String {
    let clean = if folder.is_empty() {
        "root".to_string()
    } else {
        folder
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                    c
                } else {
                    '-'
                }
            })
            .collect()
    };
    format!("W/\"folder-{token}-{clean}-{size}\"")
}

fn token_prefix(token: &str) -> &str {
    token.char_indices().nth(8).map_or(token, |(idx, _)| &token[..idx])
}

/// Path of `key` inside the archive, relative to `folder`.
///
/// Falls back to the whole key, then the file name, then a name derived
/// from a hash of the key, so every file gets a non-empty path.
fn relative_path(key: &str, folder: &str, file_name: &str) -> String {
    let relative = if folder.is_empty() {
        key
    } else {
        key.get(folder.len() + 1..).unwrap_or("")
    };

    [relative, key, file_name]
        .into_iter()
        .map(sanitize_archive_path)
        .find(|path| !path.is_empty())
        .unwrap_or_else(|| format!("file-{:x}", simple_hash(key)))
}

fn simple_hash(input: &str) -> u32 {
    input
        .encode_utf16()
        .fold(0u32, |hash, unit| hash.wrapping_mul(31).wrapping_add(unit as u32))
}

fn normalize_time(time: DateTime<Utc>) -> DateTime<Utc> {
    if time.timestamp_millis() <= 0 {
        Utc::now()
    } else {
        time
    }
}
