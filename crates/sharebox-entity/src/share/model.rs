//! Share record model.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Kind of share, used for filtering and logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShareKind {
    /// Grants download access to a fixed set of files.
    Download,
    /// Grants upload access to one directory.
    Upload,
}

impl std::fmt::Display for ShareKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Download => write!(f, "download"),
            Self::Upload => write!(f, "upload"),
        }
    }
}

/// A share granting download access to a set of stored files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadShare {
    /// Opaque capability token.
    pub token: String,
    /// Storage keys this share exposes. Order is insignificant; no duplicates.
    pub file_keys: Vec<String>,
    /// When the share was created.
    pub created_at: DateTime<Utc>,
    /// When the share stops being usable.
    pub expires_at: Option<DateTime<Utc>>,
}

impl DownloadShare {
    /// Whether `key` is exposed by this share.
    pub fn contains(&self, key: &str) -> bool {
        self.file_keys.iter().any(|k| k == key)
    }

    /// Remove a key. Returns `true` if the key was present.
    pub fn remove_key(&mut self, key: &str) -> bool {
        let before = self.file_keys.len();
        self.file_keys.retain(|k| k != key);
        self.file_keys.len() != before
    }

    /// Rewrite keys through `renames`, keeping the set free of duplicates.
    /// Returns `true` if any key changed.
    pub fn apply_renames(&mut self, renames: &HashMap<&str, &str>) -> bool {
        let mut changed = false;
        let mut next: Vec<String> = Vec::with_capacity(self.file_keys.len());
        for key in &self.file_keys {
            let mapped = match renames.get(key.as_str()) {
                Some(to) => {
                    changed = true;
                    (*to).to_string()
                }
                None => key.clone(),
            };
            if !next.contains(&mapped) {
                next.push(mapped);
            }
        }
        self.file_keys = next;
        changed
    }
}

/// A share granting upload access into one directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadShare {
    /// Opaque capability token.
    pub token: String,
    /// When the share was created.
    pub created_at: DateTime<Utc>,
    /// When the share stops being usable.
    pub expires_at: Option<DateTime<Utc>>,
    /// Optional cap on cumulative uploaded bytes.
    pub max_bytes: Option<u64>,
    /// Bytes uploaded so far. Only ever increases.
    #[serde(default)]
    pub uploaded_bytes: u64,
    /// Directory (storage key prefix) receiving uploads.
    pub target_directory: String,
}

impl UploadShare {
    /// Bytes still accepted by this share, or `None` when uncapped.
    pub fn remaining_bytes(&self) -> Option<u64> {
        self.max_bytes
            .filter(|max| *max > 0)
            .map(|max| max.saturating_sub(self.uploaded_bytes))
    }

    /// Whether the cap has been reached.
    pub fn is_exhausted(&self) -> bool {
        matches!(self.remaining_bytes(), Some(0))
    }
}

/// A persisted share, tagged by kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ShareRecord {
    /// Download share.
    Download(DownloadShare),
    /// Upload share.
    Upload(UploadShare),
}

impl ShareRecord {
    /// The share's token.
    pub fn token(&self) -> &str {
        match self {
            Self::Download(share) => &share.token,
            Self::Upload(share) => &share.token,
        }
    }

    /// The share's kind.
    pub fn kind(&self) -> ShareKind {
        match self {
            Self::Download(_) => ShareKind::Download,
            Self::Upload(_) => ShareKind::Upload,
        }
    }

    /// When the share was created.
    pub fn created_at(&self) -> DateTime<Utc> {
        match self {
            Self::Download(share) => share.created_at,
            Self::Upload(share) => share.created_at,
        }
    }

    /// When the share expires, if ever.
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::Download(share) => share.expires_at,
            Self::Upload(share) => share.expires_at,
        }
    }

    /// A share is usable iff it has no expiry or the expiry is in the future.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at().is_some_and(|at| at <= now)
    }

    /// Borrow as a download share.
    pub fn as_download(&self) -> Option<&DownloadShare> {
        match self {
            Self::Download(share) => Some(share),
            Self::Upload(_) => None,
        }
    }

    /// Borrow as an upload share.
    pub fn as_upload(&self) -> Option<&UploadShare> {
        match self {
            Self::Upload(share) => Some(share),
            Self::Download(_) => None,
        }
    }
}
