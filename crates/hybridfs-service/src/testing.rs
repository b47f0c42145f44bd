//! In-process bridge and object-store doubles.
//!
//! Compiled for this crate's tests and, with the `testing` feature, for
//! downstream integration tests.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::Mutex;

use hybridfs_core::config::StorageConfig;
use hybridfs_core::error::AppError;
use hybridfs_core::result::AppResult;
use hybridfs_core::traits::{
    BatchInfoEntry, BridgeBackend, BridgeDownload, BridgeFileInfo, DeleteOutcome, Liveness,
    ObjectStore,
};
use hybridfs_core::types::Owner;
use hybridfs_database::MemoryStore;

use crate::file::{DownloadRouter, FileService, UploadService};
use crate::folder::{FolderService, TreeService};
use crate::metadata::MetadataService;
use crate::placement::PlacementResolver;
use crate::sync::ReconciliationEngine;

/// Base URL the fake bridge pretends to live at.
pub const FAKE_BRIDGE_URL: &str = "https://bridge.test";
/// Base URL the fake object store serves public objects from.
pub const FAKE_CLOUD_URL: &str = "https://cloud.test/bucket";

/// A bridge backed by a map of path to bytes.
///
/// `set_alive(false)` makes the probe fail and every other call return
/// `BackendUnavailable`. Sizes can be overridden to simulate huge files
/// without allocating them.
#[derive(Debug, Clone)]
pub struct FakeBridge {
    alive: Arc<AtomicBool>,
    files: Arc<Mutex<BTreeMap<String, Bytes>>>,
    reported_sizes: Arc<Mutex<BTreeMap<String, Option<u64>>>>,
    folders: Arc<Mutex<Vec<String>>>,
}

impl Default for FakeBridge {
    fn default() -> Self {
        Self {
            alive: Arc::new(AtomicBool::new(true)),
            files: Arc::default(),
            reported_sizes: Arc::default(),
            folders: Arc::default(),
        }
    }
}

impl FakeBridge {
    /// A live, empty bridge.
    pub fn new() -> Self {
        Self::default()
    }

    /// Toggle reachability.
    pub fn set_alive(&self, alive: bool) {
        self.alive.store(alive, Ordering::SeqCst);
    }

    /// Place a file directly on the fake disk.
    pub async fn seed(&self, path: &str, data: &[u8]) {
        self.files
            .lock()
            .await
            .insert(path.to_string(), Bytes::copy_from_slice(data));
    }

    /// Make `get_info` report `size` for `path` regardless of its bytes.
    pub async fn report_size(&self, path: &str, size: Option<u64>) {
        self.reported_sizes
            .lock()
            .await
            .insert(path.to_string(), size);
    }

    /// Whether `path` currently holds a file.
    pub async fn contains(&self, path: &str) -> bool {
        self.files.lock().await.contains_key(path)
    }

    /// Paths passed to `create_folder`, in call order.
    pub async fn created_folders(&self) -> Vec<String> {
        self.folders.lock().await.clone()
    }

    fn check_alive(&self) -> AppResult<()> {
        if self.alive.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(AppError::backend_unavailable("fake bridge is offline"))
        }
    }
}

#[async_trait]
impl BridgeBackend for FakeBridge {
    fn is_configured(&self) -> bool {
        true
    }

    async fn probe(&self) -> Liveness {
        if self.alive.load(Ordering::SeqCst) {
            Liveness::Alive
        } else {
            Liveness::Dead
        }
    }

    async fn put_file(&self, path: &str, _content_type: &str, data: Bytes) -> AppResult<String> {
        self.check_alive()?;
        self.files.lock().await.insert(path.to_string(), data);
        Ok(path.to_string())
    }

    async fn delete_by_path(&self, path: &str) -> AppResult<DeleteOutcome> {
        self.check_alive()?;
        Ok(match self.files.lock().await.remove(path) {
            Some(_) => DeleteOutcome::Deleted,
            None => DeleteOutcome::NotFound,
        })
    }

    async fn get_info(&self, path: &str) -> AppResult<Option<BridgeFileInfo>> {
        self.check_alive()?;
        if let Some(size) = self.reported_sizes.lock().await.get(path) {
            return Ok(Some(BridgeFileInfo { size: *size }));
        }
        Ok(self.files.lock().await.get(path).map(|b| BridgeFileInfo {
            size: Some(b.len() as u64),
        }))
    }

    async fn batch_info(&self, paths: &[String]) -> AppResult<Vec<BatchInfoEntry>> {
        self.check_alive()?;
        let files = self.files.lock().await;
        Ok(paths
            .iter()
            .map(|p| match files.get(p) {
                Some(b) => BatchInfoEntry::Found {
                    name: p.clone(),
                    size: b.len() as u64,
                },
                None => BatchInfoEntry::Missing {
                    name: p.clone(),
                    error: "ENOENT".to_string(),
                },
            })
            .collect())
    }

    async fn create_folder(&self, path: &str) -> AppResult<()> {
        self.check_alive()?;
        self.folders.lock().await.push(path.to_string());
        Ok(())
    }

    fn download_url(&self, path: &str) -> AppResult<String> {
        Ok(format!("{FAKE_BRIDGE_URL}/api/bridge/download/{path}"))
    }

    async fn open_download(&self, path: &str) -> AppResult<BridgeDownload> {
        self.check_alive()?;
        let data = self
            .files
            .lock()
            .await
            .get(path)
            .cloned()
            .ok_or_else(|| AppError::not_found(format!("'{path}' is not on the bridge")))?;
        let length = data.len() as u64;
        let stream = futures::stream::once(async move { Ok::<_, std::io::Error>(data) });
        Ok(BridgeDownload {
            content_type: Some("application/octet-stream".to_string()),
            content_length: Some(length),
            stream: Box::pin(stream),
        })
    }
}

/// An object store backed by a map of key to bytes.
#[derive(Debug, Clone, Default)]
pub struct FakeObjectStore {
    objects: Arc<Mutex<BTreeMap<String, Bytes>>>,
    public: Arc<Mutex<Vec<String>>>,
}

impl FakeObjectStore {
    /// An empty bucket.
    pub fn new() -> Self {
        Self::default()
    }

    /// Keys currently stored.
    pub async fn keys(&self) -> Vec<String> {
        self.objects.lock().await.keys().cloned().collect()
    }

    /// Keys that were made public.
    pub async fn public_keys(&self) -> Vec<String> {
        self.public.lock().await.clone()
    }
}

#[async_trait]
impl ObjectStore for FakeObjectStore {
    async fn put_object(&self, key: &str, _content_type: &str, data: Bytes) -> AppResult<()> {
        self.objects.lock().await.insert(key.to_string(), data);
        Ok(())
    }

    async fn make_public(&self, key: &str) -> AppResult<()> {
        self.public.lock().await.push(key.to_string());
        Ok(())
    }

    fn public_url(&self, key: &str) -> String {
        format!("{FAKE_CLOUD_URL}/{key}")
    }

    fn object_key(&self, path_or_url: &str) -> String {
        path_or_url
            .strip_prefix(FAKE_CLOUD_URL)
            .map(|rest| rest.trim_start_matches('/'))
            .unwrap_or(path_or_url)
            .to_string()
    }

    async fn signed_read_url(&self, key: &str, expires_in: Duration) -> AppResult<String> {
        Ok(format!(
            "{FAKE_CLOUD_URL}/{key}?X-Amz-Expires={}",
            expires_in.as_secs()
        ))
    }

    async fn delete_object(&self, key: &str) -> AppResult<DeleteOutcome> {
        Ok(match self.objects.lock().await.remove(key) {
            Some(_) => DeleteOutcome::Deleted,
            None => DeleteOutcome::NotFound,
        })
    }
}

/// Every service wired over one [`MemoryStore`] and the two fakes.
#[derive(Debug, Clone)]
pub struct Harness {
    /// Shared folder and file rows.
    pub store: MemoryStore,
    /// Fake bridge.
    pub bridge: FakeBridge,
    /// Fake object store.
    pub cloud: FakeObjectStore,
    /// Configuration the services were built with.
    pub config: StorageConfig,
    /// Tree service.
    pub tree: Arc<TreeService>,
    /// Upload service.
    pub upload: UploadService,
    /// Explicit file removal.
    pub file: FileService,
    /// Download routing.
    pub download: DownloadRouter,
    /// Listings and stats.
    pub metadata: MetadataService,
    /// Explicit folder operations.
    pub folder: FolderService,
    /// Reconciliation engine.
    pub sync: ReconciliationEngine,
}

impl Default for Harness {
    fn default() -> Self {
        Self::new()
    }
}

impl Harness {
    /// Default storage settings.
    pub fn new() -> Self {
        Self::with_config(StorageConfig::default())
    }

    /// Custom storage settings.
    pub fn with_config(config: StorageConfig) -> Self {
        let store = MemoryStore::new();
        let bridge = FakeBridge::new();
        let cloud = FakeObjectStore::new();

        let folders = Arc::new(store.clone());
        let files = Arc::new(store.clone());
        let bridge_dyn: Arc<dyn BridgeBackend> = Arc::new(bridge.clone());
        let cloud_dyn: Arc<dyn ObjectStore> = Arc::new(cloud.clone());

        let tree = Arc::new(TreeService::new(folders.clone(), config.max_tree_depth));
        let placement = Arc::new(PlacementResolver::new(Arc::clone(&bridge_dyn)));

        Self {
            upload: UploadService::new(
                files.clone(),
                Arc::clone(&tree),
                placement,
                Arc::clone(&bridge_dyn),
                Arc::clone(&cloud_dyn),
                config.clone(),
            ),
            file: FileService::new(
                files.clone(),
                Arc::clone(&tree),
                Arc::clone(&bridge_dyn),
                Arc::clone(&cloud_dyn),
            ),
            download: DownloadRouter::new(
                files.clone(),
                Arc::clone(&tree),
                Arc::clone(&bridge_dyn),
                Arc::clone(&cloud_dyn),
                &config,
            ),
            metadata: MetadataService::new(
                files.clone(),
                folders,
                Arc::clone(&tree),
                Arc::clone(&bridge_dyn),
            ),
            folder: FolderService::new(Arc::clone(&tree), bridge_dyn),
            sync: ReconciliationEngine::new(files, Arc::clone(&tree)),
            tree,
            store,
            bridge,
            cloud,
            config,
        }
    }

    /// The owner most tests act as.
    pub fn owner() -> Owner {
        Owner::parse("alice").expect("static owner is valid")
    }
}
