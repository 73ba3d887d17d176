//! Local filesystem storage provider.

use std::collections::HashSet;
use std::io::SeekFrom;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use futures::stream::StreamExt;
use tokio::fs;
use tokio::io::{AsyncReadExt, AsyncSeekExt, AsyncWriteExt};
use tokio_util::io::ReaderStream;
use tracing::debug;

use sharebox_core::error::{AppError, ErrorKind};
use sharebox_core::result::AppResult;
use sharebox_core::traits::storage::{
    ByteStream, DirectoryEntry, DirectoryListing, KeyRename, StorageProvider, StoredFile,
    WriteOptions,
};
use sharebox_core::types::path::{join_key, key_name};
use sharebox_core::types::range::ByteRange;

use crate::confinement::PathConfinement;

const PARTIAL_SUFFIX: &str = ".part";

/// Local filesystem storage provider.
#[derive(Debug, Clone)]
pub struct LocalStorageProvider {
    /// Confinement of keys to the storage root.
    jail: PathConfinement,
}

impl LocalStorageProvider {
    /// Create a new local storage provider rooted at the given path.
    pub async fn new(root_path: impl Into<PathBuf>) -> AppResult<Self> {
        let root = root_path.into();
        fs::create_dir_all(&root).await.map_err(|e| {
            AppError::with_source(
                ErrorKind::Storage,
                format!("Failed to create storage root: {}", root.display()),
                e,
            )
        })?;
        Ok(Self {
            jail: PathConfinement::new(root),
        })
    }

    /// The storage root.
    pub fn root(&self) -> &Path {
        self.jail.root()
    }

    /// Ensure the parent directory of a path exists.
    async fn ensure_parent(&self, path: &Path, key: &str) -> AppResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| storage_error("create parent directory for", key, e))?;
        }
        Ok(())
    }

    async fn write_stream_to(
        &self,
        temp_path: &Path,
        key: &str,
        mut stream: ByteStream,
    ) -> AppResult<u64> {
        let mut file = fs::File::create(temp_path)
            .await
            .map_err(|e| storage_error("create", key, e))?;

        let mut total_bytes = 0u64;
        while let Some(chunk) = stream.next().await {
            let chunk = chunk
                .map_err(|e| AppError::with_source(ErrorKind::Storage, "Stream read error", e))?;
            total_bytes += chunk.len() as u64;
            file.write_all(&chunk)
                .await
                .map_err(|e| storage_error("write", key, e))?;
        }

        file.flush()
            .await
            .map_err(|e| storage_error("flush", key, e))?;
        file.sync_all()
            .await
            .map_err(|e| storage_error("sync", key, e))?;
        Ok(total_bytes)
    }
}

#[async_trait]
impl StorageProvider for LocalStorageProvider {
    fn provider_type(&self) -> &str {
        "local"
    }

    async fn health_check(&self) -> AppResult<bool> {
        Ok(fs::metadata(self.jail.root())
            .await
            .map(|m| m.is_dir())
            .unwrap_or(false))
    }

    fn resolve(&self, key: &str) -> AppResult<PathBuf> {
        self.jail.resolve(key)
    }

    async fn stat(&self, key: &str) -> AppResult<Option<StoredFile>> {
        let key = self.jail.normalize(key)?;
        let path = self.jail.resolve(&key)?;
        match fs::metadata(&path).await {
            Ok(meta) if meta.is_file() => Ok(Some(stored_file(key, &meta))),
            Ok(_) => Ok(None),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(storage_error("stat", &key, e)),
        }
    }

    async fn read(&self, key: &str, range: Option<ByteRange>) -> AppResult<ByteStream> {
        let path = self.jail.resolve(key)?;
        let mut file = fs::File::open(&path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                AppError::not_found(format!("File not found: {key}"))
            } else {
                storage_error("open", key, e)
            }
        })?;

        match range {
            Some(range) => {
                file.seek(SeekFrom::Start(range.start))
                    .await
                    .map_err(|e| storage_error("seek", key, e))?;
                Ok(Box::pin(ReaderStream::new(file.take(range.len()))))
            }
            None => Ok(Box::pin(ReaderStream::new(file))),
        }
    }

    async fn write(&self, key: &str, data: Bytes, options: WriteOptions) -> AppResult<()> {
        let path = self.jail.resolve(key)?;
        self.ensure_parent(&path, key).await?;

        let mut file = fs::OpenOptions::new()
            .create(true)
            .write(true)
            .append(options.append)
            .truncate(!options.append)
            .open(&path)
            .await
            .map_err(|e| storage_error("open", key, e))?;
        file.write_all(&data)
            .await
            .map_err(|e| storage_error("write", key, e))?;
        file.flush()
            .await
            .map_err(|e| storage_error("flush", key, e))?;
        drop(file);

        if let Some(modified) = options.modified {
            stamp_modified(path, modified)
                .await
                .map_err(|e| storage_error("set modification time of", key, e))?;
        }

        debug!(key, bytes = data.len(), append = options.append, "Wrote file");
        Ok(())
    }

    async fn write_stream(
        &self,
        key: &str,
        stream: ByteStream,
        modified: Option<DateTime<Utc>>,
    ) -> AppResult<u64> {
        let path = self.jail.resolve(key)?;
        self.ensure_parent(&path, key).await?;

        let temp_path = path.with_file_name(format!(
            ".{}.{}{PARTIAL_SUFFIX}",
            key_name(key),
            uuid::Uuid::new_v4().simple()
        ));

        let total_bytes = match self.write_stream_to(&temp_path, key, stream).await {
            Ok(total) => total,
            Err(e) => {
                let _ = fs::remove_file(&temp_path).await;
                return Err(e);
            }
        };

        if let Err(e) = fs::rename(&temp_path, &path).await {
            let _ = fs::remove_file(&temp_path).await;
            return Err(storage_error("store", key, e));
        }

        if let Some(modified) = modified {
            stamp_modified(path, modified)
                .await
                .map_err(|e| storage_error("set modification time of", key, e))?;
        }

        debug!(key, bytes = total_bytes, "Wrote file from stream");
        Ok(total_bytes)
    }

    async fn exists(&self, key: &str) -> AppResult<bool> {
        let path = self.jail.resolve(key)?;
        fs::try_exists(&path)
            .await
            .map_err(|e| storage_error("check", key, e))
    }

    async fn list_dir(&self, path: &str) -> AppResult<DirectoryListing> {
        let normalized = self.jail.normalize(path)?;
        let dir_path = self.jail.resolve(&normalized)?;

        let mut dir = fs::read_dir(&dir_path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                AppError::not_found(format!("Directory not found: {normalized}"))
            } else {
                storage_error("list directory", &normalized, e)
            }
        })?;

        let mut listing = DirectoryListing {
            path: normalized.clone(),
            ..Default::default()
        };

        while let Some(entry) = dir
            .next_entry()
            .await
            .map_err(|e| storage_error("read entry in", &normalized, e))?
        {
            let name = entry.file_name().to_string_lossy().to_string();
            if is_partial(&name) {
                continue;
            }
            let Ok(meta) = fs::metadata(entry.path()).await else {
                continue;
            };
            let key = join_key(&normalized, &name);
            if meta.is_dir() {
                listing.directories.push(DirectoryEntry {
                    key,
                    name,
                    last_modified: modified_time(&meta),
                });
            } else if meta.is_file() {
                listing.files.push(stored_file(key, &meta));
            }
        }

        listing.directories.sort_by(|a, b| a.name.cmp(&b.name));
        listing.files.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(listing)
    }

    async fn list_files(&self, path: &str, recursive: bool) -> AppResult<Vec<StoredFile>> {
        let normalized = self.jail.normalize(path)?;
        let mut pending = vec![normalized];
        let mut files = Vec::new();

        while let Some(prefix) = pending.pop() {
            let dir_path = self.jail.resolve(&prefix)?;
            let mut dir = match fs::read_dir(&dir_path).await {
                Ok(dir) => dir,
                Err(e)
                    if e.kind() == std::io::ErrorKind::NotFound
                        || e.kind() == std::io::ErrorKind::NotADirectory =>
                {
                    continue;
                }
                Err(e) => return Err(storage_error("list directory", &prefix, e)),
            };

            while let Some(entry) = dir
                .next_entry()
                .await
                .map_err(|e| storage_error("read entry in", &prefix, e))?
            {
                let name = entry.file_name().to_string_lossy().to_string();
                if is_partial(&name) {
                    continue;
                }
                let Ok(meta) = fs::metadata(entry.path()).await else {
                    continue;
                };
                let key = join_key(&prefix, &name);
                if meta.is_dir() {
                    if recursive {
                        pending.push(key);
                    }
                } else if meta.is_file() {
                    files.push(stored_file(key, &meta));
                }
            }
        }

        files.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(files)
    }

    async fn create_dir(&self, path: &str) -> AppResult<()> {
        let full_path = self.jail.resolve(path)?;
        fs::create_dir_all(&full_path)
            .await
            .map_err(|e| storage_error("create directory", path, e))?;
        Ok(())
    }

    async fn move_entries(&self, keys: &[String], destination: &str) -> AppResult<Vec<KeyRename>> {
        let destination = self.jail.normalize(destination)?;
        let dest_path = self.jail.resolve(&destination)?;
        if let Ok(meta) = fs::metadata(&dest_path).await {
            if !meta.is_dir() {
                return Err(AppError::conflict(format!(
                    "Destination is not a folder: {destination}"
                )));
            }
        }

        let mut planned = Vec::new();
        let mut targets = HashSet::new();
        for key in keys {
            let key = self.jail.normalize(key)?;
            if key.is_empty() {
                return Err(AppError::invalid_argument("Cannot move the storage root"));
            }
            let source = self.jail.resolve(&key)?;
            let meta = fs::metadata(&source).await.map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    AppError::not_found(format!("Entry not found: {key}"))
                } else {
                    storage_error("stat", &key, e)
                }
            })?;

            let target = join_key(&destination, key_name(&key));
            if target == key {
                continue;
            }
            if meta.is_dir() && (destination == key || destination.starts_with(&format!("{key}/")))
            {
                return Err(AppError::invalid_argument(format!(
                    "Cannot move a folder into itself: {key}"
                )));
            }
            let occupied = fs::try_exists(self.jail.resolve(&target)?)
                .await
                .map_err(|e| storage_error("check", &target, e))?;
            if occupied || !targets.insert(target.clone()) {
                return Err(AppError::conflict(format!(
                    "Destination already contains {}",
                    key_name(&key)
                )));
            }
            planned.push((key, target, meta.is_dir()));
        }

        fs::create_dir_all(&dest_path)
            .await
            .map_err(|e| storage_error("create directory", &destination, e))?;

        let mut renames = Vec::new();
        for (from, to, is_dir) in planned {
            let nested = if is_dir {
                self.list_files(&from, true).await?
            } else {
                Vec::new()
            };

            fs::rename(self.jail.resolve(&from)?, self.jail.resolve(&to)?)
                .await
                .map_err(|e| storage_error("move", &from, e))?;
            debug!(from = %from, to = %to, "Moved entry");

            if is_dir {
                renames.extend(nested.into_iter().map(|file| KeyRename {
                    to: format!("{to}{}", &file.key[from.len()..]),
                    from: file.key,
                }));
            } else {
                renames.push(KeyRename { from, to });
            }
        }

        Ok(renames)
    }

    async fn delete(&self, key: &str) -> AppResult<()> {
        let full_path = self.jail.resolve(key)?;
        match fs::remove_file(&full_path).await {
            Ok(()) => {
                debug!(key, "Deleted file");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(storage_error("delete", key, e)),
        }
    }

    async fn delete_dir(&self, path: &str) -> AppResult<()> {
        let normalized = self.jail.normalize(path)?;
        if normalized.is_empty() {
            return Err(AppError::invalid_argument("Cannot delete the storage root"));
        }
        let full_path = self.jail.resolve(&normalized)?;
        match fs::remove_dir_all(&full_path).await {
            Ok(()) => {
                debug!(path = %normalized, "Deleted directory");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(storage_error("delete directory", &normalized, e)),
        }
    }
}

fn storage_error(action: &str, key: &str, e: std::io::Error) -> AppError {
    AppError::with_source(ErrorKind::Storage, format!("Failed to {action} {key}"), e)
}

fn stored_file(key: String, meta: &std::fs::Metadata) -> StoredFile {
    let name = key_name(&key).to_string();
    StoredFile {
        mime_type: mime_guess::from_path(&name)
            .first_or_octet_stream()
            .essence_str()
            .to_string(),
        name,
        key,
        size: meta.len(),
        last_modified: modified_time(meta),
    }
}

fn modified_time(meta: &std::fs::Metadata) -> DateTime<Utc> {
    meta.modified()
        .map(DateTime::<Utc>::from)
        .unwrap_or_else(|_| Utc::now())
}

fn is_partial(name: &str) -> bool {
    name.starts_with('.') && name.ends_with(PARTIAL_SUFFIX)
}

async fn stamp_modified(path: PathBuf, modified: DateTime<Utc>) -> std::io::Result<()> {
    let time = SystemTime::from(modified);
    tokio::task::spawn_blocking(move || {
        std::fs::File::options()
            .write(true)
            .open(&path)?
            .set_modified(time)
    })
    .await
    .map_err(std::io::Error::other)?
}
