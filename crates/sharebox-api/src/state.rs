//! Application state shared across all handlers and middleware.

use std::sync::Arc;

use sharebox_core::config::AppConfig;
use sharebox_core::result::AppResult;
use sharebox_core::traits::storage::StorageProvider;
use sharebox_service::file::{DownloadService, FileService, UploadService};
use sharebox_service::share::{ShareRegistry, ShareStore};
use sharebox_storage::{LocalStorageProvider, ResumableStore};

/// Application state containing all shared dependencies.
///
/// Passed to every Axum handler via `State<AppState>`.
/// All fields are `Arc`-wrapped for cheap cloning across tasks.
#[derive(Debug, Clone)]
pub struct AppState {
    // ── Configuration ────────────────────────────────────────
    /// Application configuration
    pub config: Arc<AppConfig>,

    // ── Infrastructure ───────────────────────────────────────
    /// File storage holding shared and uploaded files
    pub storage: Arc<dyn StorageProvider>,
    /// Share table
    pub registry: Arc<ShareRegistry>,

    // ── Services ─────────────────────────────────────────────
    /// Download shares and folder archives
    pub download_service: Arc<DownloadService>,
    /// Upload shares
    pub upload_service: Arc<UploadService>,
    /// Admin file operations
    pub file_service: Arc<FileService>,
}

impl AppState {
    /// Open storage and the share registry described by `config`.
    pub async fn initialize(config: AppConfig) -> AppResult<Self> {
        let storage: Arc<dyn StorageProvider> =
            Arc::new(LocalStorageProvider::new(&config.storage.root).await?);
        let staging: Arc<dyn StorageProvider> =
            Arc::new(LocalStorageProvider::new(&config.storage.resumable_root).await?);
        let registry = Arc::new(
            ShareRegistry::open(ShareStore::new(config.storage.share_store_path())).await?,
        );

        Ok(Self::from_parts(config, storage, staging, registry))
    }

    /// Wire services over already-open storage.
    pub fn from_parts(
        config: AppConfig,
        storage: Arc<dyn StorageProvider>,
        staging: Arc<dyn StorageProvider>,
        registry: Arc<ShareRegistry>,
    ) -> Self {
        let download_service = Arc::new(DownloadService::new(
            Arc::clone(&storage),
            Arc::clone(&registry),
        ));
        let upload_service = Arc::new(UploadService::new(
            Arc::clone(&storage),
            Arc::clone(&registry),
            ResumableStore::new(staging),
        ));
        let file_service = Arc::new(FileService::new(
            Arc::clone(&storage),
            Arc::clone(&registry),
        ));

        Self {
            config: Arc::new(config),
            storage,
            registry,
            download_service,
            upload_service,
            file_service,
        }
    }
}
