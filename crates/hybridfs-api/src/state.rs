//! Application state shared across all handlers and middleware.

use std::sync::Arc;

use hybridfs_core::config::AppConfig;
use hybridfs_core::traits::{BridgeBackend, ObjectStore};
use hybridfs_database::store::{FileStore, FolderStore};
use hybridfs_service::{
    DownloadRouter, FileService, FolderService, MetadataService, PlacementResolver,
    ReconciliationEngine, TreeService, UploadService,
};

/// Application state containing all shared dependencies.
///
/// Passed to every Axum handler via `State<AppState>`.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Application configuration
    pub config: Arc<AppConfig>,
    /// Whether a bridge URL is configured at all
    pub bridge_configured: bool,
    /// Upload flow
    pub upload_service: Arc<UploadService>,
    /// Explicit removal
    pub file_service: Arc<FileService>,
    /// Download routing
    pub download_router: Arc<DownloadRouter>,
    /// Listings and stats
    pub metadata_service: Arc<MetadataService>,
    /// Folder create/delete
    pub folder_service: Arc<FolderService>,
    /// Reconciliation events
    pub sync_engine: Arc<ReconciliationEngine>,
}

impl AppState {
    /// Wire every service over the given stores and backends.
    pub fn new(
        config: AppConfig,
        folders: Arc<dyn FolderStore>,
        files: Arc<dyn FileStore>,
        bridge: Arc<dyn BridgeBackend>,
        cloud: Arc<dyn ObjectStore>,
    ) -> Self {
        let storage = &config.storage;
        let tree = Arc::new(TreeService::new(
            Arc::clone(&folders),
            storage.max_tree_depth,
        ));
        let placement = Arc::new(PlacementResolver::new(Arc::clone(&bridge)));

        let upload_service = Arc::new(UploadService::new(
            Arc::clone(&files),
            Arc::clone(&tree),
            placement,
            Arc::clone(&bridge),
            Arc::clone(&cloud),
            storage.clone(),
        ));
        let file_service = Arc::new(FileService::new(
            Arc::clone(&files),
            Arc::clone(&tree),
            Arc::clone(&bridge),
            Arc::clone(&cloud),
        ));
        let download_router = Arc::new(DownloadRouter::new(
            Arc::clone(&files),
            Arc::clone(&tree),
            Arc::clone(&bridge),
            cloud,
            storage,
        ));
        let metadata_service = Arc::new(MetadataService::new(
            Arc::clone(&files),
            folders,
            Arc::clone(&tree),
            Arc::clone(&bridge),
        ));
        let folder_service = Arc::new(FolderService::new(Arc::clone(&tree), Arc::clone(&bridge)));
        let sync_engine = Arc::new(ReconciliationEngine::new(files, tree));

        Self {
            bridge_configured: bridge.is_configured(),
            config: Arc::new(config),
            upload_service,
            file_service,
            download_router,
            metadata_service,
            folder_service,
            sync_engine,
        }
    }
}
