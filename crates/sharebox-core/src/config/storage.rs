//! Storage configuration.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Top-level storage configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Root directory holding shared and uploaded files.
    #[serde(default = "default_root")]
    pub root: String,
    /// Directory holding the persisted share table.
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
    /// Staging directory for resumable uploads.
    #[serde(default = "default_resumable_root")]
    pub resumable_root: String,
    /// Maximum request body size in bytes (default 5 GB).
    #[serde(default = "default_max_upload")]
    pub max_upload_size_bytes: u64,
}

impl StorageConfig {
    /// Path of the JSON document holding the share table.
    pub fn share_store_path(&self) -> PathBuf {
        PathBuf::from(&self.data_dir).join("shares.json")
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            root: default_root(),
            data_dir: default_data_dir(),
            resumable_root: default_resumable_root(),
            max_upload_size_bytes: default_max_upload(),
        }
    }
}

fn default_root() -> String {
    "./data/files".to_string()
}

fn default_data_dir() -> String {
    "./data".to_string()
}

fn default_resumable_root() -> String {
    "./data/resumable".to_string()
}

fn default_max_upload() -> u64 {
    5_368_709_120 // 5 GB
}
