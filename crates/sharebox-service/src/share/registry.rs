//! The share registry: single source of truth for share records.

use std::collections::{HashMap, HashSet};

use chrono::{Duration, Utc};
use tokio::sync::Mutex;
use tracing::{info, warn};

use sharebox_core::error::AppError;
use sharebox_core::result::AppResult;
use sharebox_core::traits::storage::KeyRename;
use sharebox_core::types::path::normalize_directory_path;
use sharebox_entity::share::{DownloadShare, ShareRecord, UploadShare};

use super::link::LinkService;
use super::store::ShareStore;

type ShareTable = HashMap<String, ShareRecord>;

/// Persisted table of download and upload shares.
///
/// Mutations are serialized behind one lock. Each one is applied to a copy
/// of the table, persisted, and only then made visible, so a failed write
/// never leaves the in-memory view ahead of the disk. Expired records are
/// purged lazily by [`find`](Self::find) and [`list`](Self::list).
#[derive(Debug)]
pub struct ShareRegistry {
    shares: Mutex<ShareTable>,
    store: ShareStore,
    links: LinkService,
}

impl ShareRegistry {
    /// Open the registry, loading whatever `store` holds.
    pub async fn open(store: ShareStore) -> AppResult<Self> {
        let records = store.load().await?;
        let shares: ShareTable = records
            .into_iter()
            .map(|record| (record.token().to_string(), record))
            .collect();
        info!(count = shares.len(), path = %store.path().display(), "Loaded share registry");

        Ok(Self {
            shares: Mutex::new(shares),
            store,
            links: LinkService::new(),
        })
    }

    /// Create a download share over `file_keys`.
    pub async fn create_download_share(
        &self,
        file_keys: Vec<String>,
        expires_in_minutes: Option<i64>,
    ) -> AppResult<DownloadShare> {
        if file_keys.is_empty() {
            return Err(AppError::invalid_argument(
                "At least one file key is required to create a download share",
            ));
        }

        let mut unique = Vec::with_capacity(file_keys.len());
        let mut seen = HashSet::new();
        for key in file_keys {
            if seen.insert(key.clone()) {
                unique.push(key);
            }
        }

        let share = self
            .mutate(|table| {
                let share = DownloadShare {
                    token: self.unique_token(table),
                    file_keys: unique,
                    created_at: Utc::now(),
                    expires_at: resolve_expiry(expires_in_minutes),
                };
                table.insert(share.token.clone(), ShareRecord::Download(share.clone()));
                Ok((share, true))
            })
            .await?;

        info!(token = %share.token, files = share.file_keys.len(), "Created download share");
        Ok(share)
    }

    /// Create an upload share receiving files into `target_directory`.
    pub async fn create_upload_share(
        &self,
        expires_in_minutes: Option<i64>,
        max_bytes: Option<u64>,
        target_directory: &str,
    ) -> AppResult<UploadShare> {
        let target_directory = normalize_directory_path(target_directory)?;

        let share = self
            .mutate(|table| {
                let share = UploadShare {
                    token: self.unique_token(table),
                    created_at: Utc::now(),
                    expires_at: resolve_expiry(expires_in_minutes),
                    max_bytes: max_bytes.filter(|max| *max > 0),
                    uploaded_bytes: 0,
                    target_directory,
                };
                table.insert(share.token.clone(), ShareRecord::Upload(share.clone()));
                Ok((share, true))
            })
            .await?;

        info!(token = %share.token, target = %share.target_directory, "Created upload share");
        Ok(share)
    }

    /// Look up a live share. Expired shares are absent and are purged.
    pub async fn find(&self, token: &str) -> Option<ShareRecord> {
        let mut shares = self.shares.lock().await;
        let record = shares.get(token)?;
        if !record.is_expired(Utc::now()) {
            return Some(record.clone());
        }

        shares.remove(token);
        self.persist_best_effort(&shares).await;
        None
    }

    /// Look up a live download share.
    pub async fn find_download(&self, token: &str) -> Option<DownloadShare> {
        match self.find(token).await? {
            ShareRecord::Download(share) => Some(share),
            ShareRecord::Upload(_) => None,
        }
    }

    /// Look up a live upload share.
    pub async fn find_upload(&self, token: &str) -> Option<UploadShare> {
        match self.find(token).await? {
            ShareRecord::Upload(share) => Some(share),
            ShareRecord::Download(_) => None,
        }
    }

    /// Every live share, newest first. Expired shares are purged first.
    pub async fn list(&self) -> AppResult<Vec<ShareRecord>> {
        let mut shares = self.shares.lock().await;
        let now = Utc::now();
        let before = shares.len();
        shares.retain(|_, record| !record.is_expired(now));
        if shares.len() != before {
            self.persist_best_effort(&shares).await;
        }

        let mut records: Vec<ShareRecord> = shares.values().cloned().collect();
        records.sort_by(|a, b| b.created_at().cmp(&a.created_at()));
        Ok(records)
    }

    /// Revoke a share. Returns `false` when no such share existed.
    pub async fn revoke(&self, token: &str) -> AppResult<bool> {
        let removed = self
            .mutate(|table| {
                let removed = table.remove(token).is_some();
                Ok((removed, removed))
            })
            .await?;
        if removed {
            info!(token, "Revoked share");
        }
        Ok(removed)
    }

    /// Count `bytes` against an upload share's quota.
    ///
    /// Returns the updated share, or `None` when the upload used up the
    /// quota and the share was deleted.
    pub async fn register_upload(&self, token: &str, bytes: u64) -> AppResult<Option<UploadShare>> {
        let updated = self
            .mutate(|table| {
                let Some(ShareRecord::Upload(share)) = table.get_mut(token) else {
                    return Err(AppError::not_found("Upload share not found"));
                };
                share.uploaded_bytes = share.uploaded_bytes.saturating_add(bytes);

                if share.is_exhausted() {
                    table.remove(token);
                    return Ok((None, true));
                }
                Ok((Some(share.clone()), true))
            })
            .await?;

        if updated.is_none() {
            info!(token, "Upload share reached its limit and was closed");
        }
        Ok(updated)
    }

    /// Drop `key` from every download share; shares left empty are deleted.
    pub async fn remove_file_from_shares(&self, key: &str) -> AppResult<()> {
        self.remove_files_from_shares(&[key.to_string()]).await
    }

    /// Drop several keys at once; shares left empty are deleted.
    pub async fn remove_files_from_shares(&self, keys: &[String]) -> AppResult<()> {
        if keys.is_empty() {
            return Ok(());
        }

        self.mutate(|table| {
            let mut changed = false;
            let mut emptied = Vec::new();
            for (token, record) in table.iter_mut() {
                let ShareRecord::Download(share) = record else {
                    continue;
                };
                for key in keys {
                    changed |= share.remove_key(key);
                }
                if share.file_keys.is_empty() {
                    emptied.push(token.clone());
                }
            }
            for token in emptied {
                info!(token = %token, "Removed download share with no files left");
                table.remove(&token);
            }
            Ok(((), changed))
        })
        .await
    }

    /// Rewrite moved keys in every download share.
    pub async fn replace_file_keys(&self, renames: &[KeyRename]) -> AppResult<()> {
        let mapping: HashMap<&str, &str> = renames
            .iter()
            .filter(|r| r.from != r.to)
            .map(|r| (r.from.as_str(), r.to.as_str()))
            .collect();
        if mapping.is_empty() {
            return Ok(());
        }

        self.mutate(|table| {
            let mut changed = false;
            for record in table.values_mut() {
                if let ShareRecord::Download(share) = record {
                    changed |= share.apply_renames(&mapping);
                }
            }
            Ok(((), changed))
        })
        .await
    }

    /// Apply `change` to a copy of the table and persist it if it reports
    /// a change. The live table is replaced only after a successful write.
    async fn mutate<T, F>(&self, change: F) -> AppResult<T>
    where
        F: FnOnce(&mut ShareTable) -> AppResult<(T, bool)>,
    {
        let mut shares = self.shares.lock().await;
        let mut next = shares.clone();
        let (value, changed) = change(&mut next)?;
        if changed {
            self.store.persist(&sorted(&next)).await?;
            *shares = next;
        }
        Ok(value)
    }

    async fn persist_best_effort(&self, shares: &ShareTable) {
        if let Err(e) = self.store.persist(&sorted(shares)).await {
            warn!(error = %e, "Failed to persist share registry after expiry purge");
        }
    }

    fn unique_token(&self, table: &ShareTable) -> String {
        loop {
            let token = self.links.generate_token();
            if !table.contains_key(&token) {
                return token;
            }
        }
    }
}

fn sorted(shares: &ShareTable) -> Vec<ShareRecord> {
    let mut records: Vec<ShareRecord> = shares.values().cloned().collect();
    records.sort_by(|a, b| {
        a.created_at()
            .cmp(&b.created_at())
            .then_with(|| a.token().cmp(b.token()))
    });
    records
}

fn resolve_expiry(expires_in_minutes: Option<i64>) -> Option<chrono::DateTime<Utc>> {
    expires_in_minutes
        .filter(|minutes| *minutes > 0)
        .and_then(Duration::try_minutes)
        .map(|duration| Utc::now() + duration)
}
