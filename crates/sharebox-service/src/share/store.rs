//! JSON persistence for the share table.

use std::path::{Path, PathBuf};

use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::warn;

use sharebox_core::error::{AppError, ErrorKind};
use sharebox_core::result::AppResult;
use sharebox_entity::share::ShareRecord;

/// The share table as one JSON document on disk.
///
/// Every write replaces the whole document: the table is written to a
/// sibling temp file, flushed to disk, then renamed over the store.
#[derive(Debug, Clone)]
pub struct ShareStore {
    path: PathBuf,
}

impl ShareStore {
    /// Store the table at `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Location of the store file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load every persisted record.
    ///
    /// A missing or empty file is an empty table. An unreadable or
    /// malformed file is logged and also treated as empty.
    pub async fn load(&self) -> AppResult<Vec<ShareRecord>> {
        let raw = match fs::read(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Failed to read share store");
                return Ok(Vec::new());
            }
        };

        if raw.iter().all(u8::is_ascii_whitespace) {
            return Ok(Vec::new());
        }

        match serde_json::from_slice(&raw) {
            Ok(records) => Ok(records),
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Failed to parse share store");
                Ok(Vec::new())
            }
        }
    }

    /// Atomically replace the persisted table with `records`.
    pub async fn persist(&self, records: &[ShareRecord]) -> AppResult<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| persist_error("create share store directory", e))?;
        }

        let json = serde_json::to_vec_pretty(records)?;
        let temp_path = self.temp_path();

        let mut file = fs::File::create(&temp_path)
            .await
            .map_err(|e| persist_error("create share store", e))?;
        file.write_all(&json)
            .await
            .map_err(|e| persist_error("write share store", e))?;
        file.sync_all()
            .await
            .map_err(|e| persist_error("flush share store", e))?;
        drop(file);

        fs::rename(&temp_path, &self.path)
            .await
            .map_err(|e| persist_error("replace share store", e))
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "shares.json".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

fn persist_error(action: &str, e: std::io::Error) -> AppError {
    AppError::with_source(ErrorKind::Internal, format!("Failed to {action}"), e)
}
